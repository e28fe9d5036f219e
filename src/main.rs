//! docstack CLI Entry Point
//!
//! Diagnostic front end for the connection cache. It provides two subcommands:
//! - `list` - Show configured connections with resolved settings
//! - `ping` - Connect to one named connection and round-trip a `ping`
//!
//! All output to stdout is JSON-only. Logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use docstack::config::{load_with_precedence, redact_host, ConnectionOptions};
use docstack::driver::mongo::MongoDriver;
use docstack::output::{Metadata, Report};
use docstack::{ConnectionCache, DocstackError};

/// docstack - named, cached document database connections
#[derive(Parser)]
#[command(name = "docstack")]
#[command(about = "Inspect and test named document database connections")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to .docstack/config.json, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured connections
    List,

    /// Connect to a named connection and ping the server
    Ping {
        /// Connection name
        #[arg(long)]
        name: String,
    },
}

#[derive(Serialize)]
struct ListedConnection {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ConnectionOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct PingResult {
    database: String,
    host: String,
}

#[derive(Serialize)]
#[serde(untagged)]
enum CommandData {
    List(Vec<ListedConnection>),
    Ping(PingResult),
}

type Cache = ConnectionCache<MongoDriver>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.debug) {
        eprintln!("Warning: could not initialize logging: {e}");
    }

    let started = Instant::now();
    let (connection, command) = match &cli.command {
        Commands::List => (None, "list"),
        Commands::Ping { name } => (Some(name.clone()), "ping"),
    };

    let result = match build_cache(cli.config.as_deref()).await {
        Ok(cache) => {
            let outcome = match &cli.command {
                Commands::List => list(&cache).await.map(CommandData::List),
                Commands::Ping { name } => ping(&cache, name).await.map(CommandData::Ping),
            };
            // Teardown always runs; a command error takes precedence over a teardown error
            let teardown = cache.dinit().await;
            outcome.and_then(|data| teardown.map(|()| data))
        }
        Err(e) => Err(e),
    };

    let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let report = Report::from_result(command, connection, result, Metadata::new(elapsed));

    match serde_json::to_string(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error: could not serialize output: {e}"),
    }

    if report.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn init_tracing(debug: bool) -> anyhow::Result<()> {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

async fn build_cache(config_path: Option<&std::path::Path>) -> docstack::Result<Cache> {
    let config = load_with_precedence(config_path)?;
    let cache = ConnectionCache::new(Arc::new(config), Arc::new(MongoDriver::new()));
    cache.init().await?;
    Ok(cache)
}

async fn list(cache: &Cache) -> docstack::Result<Vec<ListedConnection>> {
    let mut listed = Vec::new();
    for name in cache.connection_names().await? {
        let entry = match cache.settings(&name).await {
            Ok(settings) => ListedConnection {
                host: Some(redact_host(&settings.host)),
                options: Some(settings.effective_options()),
                error: None,
                name,
            },
            Err(e) => ListedConnection {
                host: None,
                options: None,
                error: Some(e.message()),
                name,
            },
        };
        listed.push(entry);
    }
    Ok(listed)
}

async fn ping(cache: &Cache, name: &str) -> docstack::Result<PingResult> {
    let settings = cache.settings(name).await?;
    let connection = cache.get_connection(name).await?;
    connection.ping().await.map_err(DocstackError::driver_connection)?;

    Ok(PingResult {
        database: connection.database().name().to_string(),
        host: redact_host(&settings.host),
    })
}
