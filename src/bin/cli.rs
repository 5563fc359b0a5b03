//! gridstore CLI Client
//!
//! Command-line interface for interacting with a gridstore server.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Args as ClapArgs, Parser, Subcommand};
use gridstore::network::Client;
use gridstore::protocol::payload;
use gridstore::protocol::{Command, Response};
use gridstore::{GridError, ResourceKey, Result, TableSnapshot};
use serde_json::Value;

/// gridstore CLI
#[derive(Parser, Debug)]
#[command(name = "gridstore-cli")]
#[command(about = "CLI for the gridstore table store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:5002")]
    server: String,

    /// Give up on a request after this many milliseconds (0 = never)
    #[arg(long, default_value = "0")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

/// Which table a command addresses
#[derive(ClapArgs, Debug)]
struct Table {
    /// Connection target, e.g. mem://shared or file:///var/lib/grids
    #[arg(short, long)]
    target: String,

    /// Logical database name
    #[arg(short, long)]
    database: String,

    /// Collection name
    #[arg(short, long)]
    collection: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ping the server
    Ping,

    /// Print all rows
    GetTable {
        #[command(flatten)]
        table: Table,
    },

    /// Print the merge spans
    GetMerges {
        #[command(flatten)]
        table: Table,
    },

    /// Print rows and merge spans together
    GetAll {
        #[command(flatten)]
        table: Table,
    },

    /// Replace all rows with the JSON array in FILE
    SaveTable {
        #[command(flatten)]
        table: Table,

        /// JSON file holding an array of rows
        file: PathBuf,
    },

    /// Append the rows in FILE
    AppendTable {
        #[command(flatten)]
        table: Table,

        /// JSON file holding an array of rows
        file: PathBuf,
    },

    /// Replace the merge spans with the JSON array in FILE
    SaveMerges {
        #[command(flatten)]
        table: Table,

        /// JSON file holding an array of merge spans
        file: PathBuf,
    },

    /// Replace rows and merge spans in one step
    SaveAll {
        #[command(flatten)]
        table: Table,

        /// JSON file holding an array of rows
        rows: PathBuf,

        /// JSON file holding an array of merge spans
        merges: PathBuf,
    },
}

fn main() {
    let args = Args::parse();

    match run(args) {
        Ok(response) => {
            let failed = !response.is_success();
            match serde_json::to_string_pretty(&response) {
                Ok(text) => println!("{}", text),
                Err(e) => eprintln!("error: {}", e),
            }
            if failed {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    }
}

fn run(args: Args) -> Result<Response> {
    // Payloads are validated locally before anything is sent
    let command = build_command(args.command)?;

    let mut client = Client::connect(args.server.as_str())?;
    if args.timeout_ms > 0 {
        client.set_timeout(Some(Duration::from_millis(args.timeout_ms)))?;
    }

    let started = Instant::now();
    let response = client.call(&command)?;
    eprintln!(
        "{} took {:.4} seconds",
        command.command_type().name(),
        started.elapsed().as_secs_f64()
    );
    Ok(response)
}

fn build_command(command: Commands) -> Result<Command> {
    let command = match command {
        Commands::Ping => Command::Ping,
        Commands::GetTable { table } => Command::GetTable { key: table.key() },
        Commands::GetMerges { table } => Command::GetMerges { key: table.key() },
        Commands::GetAll { table } => Command::GetAll { key: table.key() },
        Commands::SaveTable { table, file } => Command::SaveTable {
            key: table.key(),
            rows: payload::parse_rows(&read_json(&file)?)?,
        },
        Commands::AppendTable { table, file } => Command::AppendTable {
            key: table.key(),
            rows: payload::parse_rows(&read_json(&file)?)?,
        },
        Commands::SaveMerges { table, file } => Command::SaveMerges {
            key: table.key(),
            spans: payload::parse_spans(&read_json(&file)?)?,
        },
        Commands::SaveAll { table, rows, merges } => Command::SaveAll {
            key: table.key(),
            snapshot: TableSnapshot::new(
                payload::parse_rows(&read_json(&rows)?)?,
                payload::parse_spans(&read_json(&merges)?)?,
            ),
        },
    };

    if let Some(key) = command.key() {
        key.validate()?;
    }
    Ok(command)
}

impl Table {
    fn key(&self) -> ResourceKey {
        ResourceKey::new(&self.target, &self.database, &self.collection)
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| GridError::MalformedPayload(format!("{}: {}", path.display(), e)))
}
