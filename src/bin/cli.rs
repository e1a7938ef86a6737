//! ssdbkv CLI Client
//!
//! Command-line interface for issuing single commands to an SSDB server.

use bytes::Bytes;
use clap::{Parser, Subcommand};
use ssdbkv::{Client, Config};
use tracing_subscriber::{fmt, EnvFilter};

/// ssdbkv CLI
#[derive(Parser, Debug)]
#[command(name = "ssdbkv-cli")]
#[command(about = "CLI for SSDB-protocol key-value servers")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "8888")]
    port: u16,

    /// Read/write timeout in milliseconds (0 disables)
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    /// Password sent with `auth` after connecting
    #[arg(long)]
    password: Option<String>,

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

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// List keys in (start, end]
    Keys {
        start: String,
        end: String,
        #[arg(default_value = "100")]
        limit: u64,
    },

    /// Push items to the back of a queue
    Qpush {
        name: String,
        #[arg(required = true)]
        items: Vec<String>,
    },

    /// Pop items from the front of a queue
    Qpop {
        name: String,
        #[arg(default_value = "1")]
        count: u64,
    },

    /// Size of a queue
    Qsize { name: String },

    /// Set a hash field
    Hset {
        name: String,
        key: String,
        value: String,
    },

    /// Get a hash field
    Hget { name: String, key: String },

    /// All fields and values of a hash
    Hgetall { name: String },

    /// Set a sorted set score
    Zset {
        name: String,
        key: String,
        #[arg(allow_hyphen_values = true)]
        score: i64,
    },

    /// Get a sorted set score
    Zget { name: String, key: String },

    /// Send any command verbatim and print the raw reply
    Raw {
        #[arg(required = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("(error) {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> ssdbkv::Result<()> {
    let mut builder = Config::builder()
        .host(args.host)
        .port(args.port)
        .timeout_ms(args.timeout_ms);
    if let Some(password) = args.password {
        builder = builder.password(password);
    }
    let config = builder.build();

    tracing::debug!("Connecting to {}", config.addr());
    let client = Client::with_config(config)?;

    match args.command {
        Commands::Get { key } => print_optional(client.get(key)?),
        Commands::Set { key, value } => {
            client.set(key, value)?;
            println!("ok");
        }
        Commands::Del { key } => {
            client.del(key)?;
            println!("ok");
        }
        Commands::Keys { start, end, limit } => print_list(&client.keys(start, end, limit)?),
        Commands::Qpush { name, items } => println!("{}", client.qpush_back(name, items)?),
        Commands::Qpop { name, count } => print_list(&client.qpop_front(name, count)?),
        Commands::Qsize { name } => println!("{}", client.qsize(name)?),
        Commands::Hset { name, key, value } => println!("{}", client.hset(name, key, value)?),
        Commands::Hget { name, key } => print_optional(client.hget(name, key)?),
        Commands::Hgetall { name } => print_list(&client.hgetall(name)?),
        Commands::Zset { name, key, score } => println!("{}", client.zset(name, key, score)?),
        Commands::Zget { name, key } => match client.zget(name, key)? {
            Some(score) => println!("{}", score),
            None => println!("(not found)"),
        },
        Commands::Raw { args } => {
            let response = client.execute(args)?;
            println!("{}", response.status);
            print_list(&response.payload);
        }
    }

    client.close();
    Ok(())
}

fn print_optional(value: Option<Bytes>) {
    match value {
        Some(value) => println!("{}", String::from_utf8_lossy(&value)),
        None => println!("(not found)"),
    }
}

fn print_list(values: &[Bytes]) {
    for value in values {
        println!("{}", String::from_utf8_lossy(value));
    }
}
