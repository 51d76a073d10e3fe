//! DriftKV CLI Client
//!
//! Command-line interface for interacting with a DriftKV node.

use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};
use driftkv::{Client, Record, Result};

/// DriftKV CLI
#[derive(Parser, Debug)]
#[command(name = "driftkv-cli")]
#[command(about = "CLI for the DriftKV key-value store")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:9400")]
    server: String,

    /// Subject to identify as (empty means anonymous)
    #[arg(short = 'u', long, default_value = "")]
    subject: String,

    /// Connect and I/O timeout in milliseconds
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// List every key
    List,

    /// Get several keys in one stream
    Mget {
        /// Keys to fetch, in order
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Set several key=value pairs in one stream
    Mset {
        /// Pairs as key=value
        #[arg(required = true)]
        pairs: Vec<String>,
    },

    /// Ping the server
    Ping,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let timeout = Duration::from_millis(args.timeout_ms);
    let mut client = Client::connect_as(&args.server, &args.subject, timeout)?;

    match args.command {
        Commands::Get { key } => {
            let value = client.get_key(&key)?;
            println!("{}", String::from_utf8_lossy(&value));
        }
        Commands::Set { key, value } => {
            client.set_key(&key, value.as_bytes())?;
            println!("OK");
        }
        Commands::List => {
            for key in client.list_keys()? {
                println!("{}", key);
            }
        }
        Commands::Mget { keys } => {
            for item in client.get_stream(keys)? {
                let record = item?;
                println!("{}\t{}", record.key, String::from_utf8_lossy(&record.value));
            }
        }
        Commands::Mset { pairs } => {
            let records = pairs
                .iter()
                .map(|pair| parse_pair(pair))
                .collect::<std::result::Result<Vec<_>, _>>();

            let records = match records {
                Ok(records) => records,
                Err(bad) => {
                    eprintln!("error: expected key=value, got {:?}", bad);
                    process::exit(2);
                }
            };

            let count = records.len();
            let mut stream = client.set_stream()?;
            for record in records {
                stream.send(record)?;
            }
            stream.finish()?;
            println!("OK ({} keys)", count);
        }
        Commands::Ping => {
            client.ping()?;
            println!("PONG");
        }
    }

    Ok(())
}

fn parse_pair(pair: &str) -> std::result::Result<Record, String> {
    match pair.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok(Record::new(key, value)),
        _ => Err(pair.to_string()),
    }
}
