use crate::cli::{Cli, Commands};
use latch_drive::{Engine, EngineConfig};
use std::io::{self, IsTerminal, Read};

/// Executes the parsed CLI command against the storage directory named
/// by `cli.dir`, opening (and creating, if needed) the directory first.
pub fn execute_command(cli: &Cli) {
    if let Err(err) = std::fs::create_dir_all(&cli.dir) {
        eprintln!("Error: could not create storage directory '{}': {err}", cli.dir.display());
        std::process::exit(1);
    }

    let engine = match Engine::open(&cli.dir, EngineConfig::default()) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("Error: failed to open storage directory '{}': {err}", cli.dir.display());
            std::process::exit(1);
        }
    };

    match &cli.command {
        Commands::Get { key } => match engine.get(key.as_bytes()) {
            Ok(Some(value)) => match std::str::from_utf8(&value) {
                Ok(text) if io::stdout().is_terminal() => println!("{text}"),
                _ => {
                    use std::io::Write;
                    io::stdout().write_all(&value).expect("failed to write to stdout");
                }
            },
            Ok(None) => {
                eprintln!("Error: key '{key}' not found");
                std::process::exit(1);
            }
            Err(err) => {
                eprintln!("Error: {err}");
                std::process::exit(1);
            }
        },

        Commands::Put { key, value } => {
            let value_bytes = if let Some(value) = value {
                value.clone().into_bytes()
            } else if !io::stdin().is_terminal() {
                let mut buf = Vec::new();
                io::stdin()
                    .read_to_end(&mut buf)
                    .expect("failed to read stdin");
                buf
            } else {
                eprintln!("Error: no value provided and stdin is empty.");
                std::process::exit(1);
            };

            if let Err(err) = engine.put(key.as_bytes(), &value_bytes) {
                eprintln!("Error: {err}");
                std::process::exit(1);
            }
            println!("Stored '{key}'");
        }

        Commands::Del { key } => {
            if let Err(err) = engine.del(key.as_bytes()) {
                eprintln!("Error: {err}");
                std::process::exit(1);
            }
            println!("Deleted '{key}'");
        }

        Commands::Compact => {
            engine.compact();
            println!("Compaction requested.");
        }

        Commands::Info => {
            let stats = engine.stats();
            println!("\n{:=^50}", " STORAGE INFO ");
            println!("{:<25} {:?}", "DIRECTORY:", cli.dir);
            println!("{:-<50}", "");
            println!("{:<25} {}", "KEYS (LIVE + TOMBSTONES):", stats.key_count);
            println!("{:<25} {}", "UPDATES SINCE COMPACTION:", stats.updated_count);
            println!("{:<25} {}", "INDEX CAPACITY:", stats.capacity);
            println!("{:<25} {} bytes", "INDEX FILE SIZE:", stats.index_bytes);
            println!("{:<25} {} bytes", "KEY REGION SIZE:", stats.key_region_bytes);
            println!("{:<25} {} bytes", "KEY REGION USED:", stats.key_pos);
            println!("{:<25} {} bytes", "VALUE REGION SIZE:", stats.value_region_bytes);
            println!("{:<25} {} bytes", "VALUE REGION USED:", stats.value_pos);
            println!("{:=<50}", "");
        }
    }
}
