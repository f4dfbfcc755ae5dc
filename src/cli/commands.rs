use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Get the value stored for a key.
    Get {
        /// The key to look up.
        key: String,
    },

    /// Put a value for a key, inserting or overwriting it.
    Put {
        /// The key to write.
        key: String,

        /// The value to store (reads from stdin if not provided).
        value: Option<String>,
    },

    /// Delete a key.
    Del {
        /// The key to delete.
        key: String,
    },

    /// Request compaction. Runs asynchronously on the maintenance thread.
    Compact,

    /// Print index/region counters for the storage directory.
    Info,
}
