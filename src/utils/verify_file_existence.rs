use std::path::Path;

/// Checks that `path` exists and is a directory before `Engine::open` does
/// any further work.
///
/// # Returns
/// - `Ok(())` if the path exists and is a directory.
/// - `Err(std::io::Error)` otherwise.
pub fn verify_file_existence(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("directory '{}' does not exist", path.display()),
        ));
    }

    if !path.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("'{}' is not a directory", path.display()),
        ));
    }

    Ok(())
}
