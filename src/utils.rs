mod mmap_file;
pub use mmap_file::map_file;

mod verify_file_existence;
pub use verify_file_existence::verify_file_existence;
