use crate::cli::{Commands, HELP_TEMPLATE};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
   // Obtain during build time, not runtime
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None
)]
#[command(
    after_help = HELP_TEMPLATE.replace("%BINARY_NAME%", env!("CARGO_PKG_NAME"))
)]
pub struct Cli {
    /// The directory where index/key/value generation files and `meta`
    /// live. Created automatically if it does not exist.
    #[arg(
        value_name = "dir",
        help = "Path to the storage directory. Created automatically if it does not exist."
    )]
    pub dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}
