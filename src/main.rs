//! # transit-sync CLI (`tsync`)
//!
//! The `tsync` binary drives the ingestion pipeline and query engine from
//! the command line and hosts the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! tsync --config ./config/tsync.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tsync init` | Create the SQLite database and run schema migrations |
//! | `tsync sync` | Run one ingestion of the configured source |
//! | `tsync search <route>` | Time-nearest records for a route |
//! | `tsync records` | List recently synced records |
//! | `tsync get <source_key>` | Retrieve one record by key |
//! | `tsync status` | Show the latest sync run |
//! | `tsync serve` | Start the HTTP API with periodic sync |

mod catalog;
mod config;
mod db;
mod error;
mod migrate;
mod models;
mod scan;
mod search;
mod server;
mod source;
mod store;
mod sync;
mod transform;
mod value;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// transit-sync — schema-agnostic open-data ingestion with time-nearest
/// route search.
#[derive(Parser)]
#[command(
    name = "tsync",
    about = "Schema-agnostic open-data ingestion with time-nearest route search",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/tsync.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the `synced_records` and
    /// `sync_runs` tables. Idempotent.
    Init,

    /// Run one ingestion of the configured source.
    ///
    /// Resolves the source descriptor, normalizes the document into keyed
    /// records, and atomically replaces the stored generation.
    Sync,

    /// Search stored records for a route, ranked by time distance.
    Search {
        /// Route identifier (raw; normalized before matching).
        route: String,

        /// Query instant (ISO date/time or bare HH:MM). Defaults to now.
        #[arg(long)]
        at: Option<String>,

        /// Maximum number of ranked matches to show.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List recently synced records, newest first.
    Records {
        /// Maximum number of records to list.
        #[arg(long, default_value_t = 25)]
        limit: i64,
    },

    /// Retrieve one record by its source key.
    Get {
        /// The record's source key.
        source_key: String,
    },

    /// Show the latest sync run from the audit trail.
    Status,

    /// Start the HTTP API server with the periodic sync scheduler.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Sync => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            let result = sync::run_sync(&cfg, &pool).await;
            pool.close().await;

            let outcome = result?;
            println!("sync {}", cfg.source.descriptor);
            println!("  status: {}", outcome.status.as_str());
            println!("  records: {}", outcome.record_count);
            if let Some(ref message) = outcome.message {
                println!("  message: {}", message);
            }
            println!("ok");
        }
        Commands::Search { route, at, limit } => {
            let pool = db::connect(&cfg).await?;
            search::run_search(&cfg, &pool, &route, at, limit).await?;
            pool.close().await;
        }
        Commands::Records { limit } => {
            let pool = db::connect(&cfg).await?;
            let records = store::list_recent(&pool, limit.clamp(1, 1000)).await?;
            pool.close().await;

            if records.is_empty() {
                println!("No records synced yet.");
            }
            for record in &records {
                println!("{:<24} updated: {}", record.source_key, record.updated_at);
            }
        }
        Commands::Get { source_key } => {
            let pool = db::connect(&cfg).await?;
            let record = store::get_by_key(&pool, &source_key).await?;
            pool.close().await;

            match record {
                Some(record) => {
                    println!("source_key: {}", record.source_key);
                    println!("updated_at: {}", record.updated_at);
                    println!("payload:    {}", record.payload);
                }
                None => {
                    eprintln!("Record not found: {}", source_key);
                    std::process::exit(1);
                }
            }
        }
        Commands::Status => {
            let pool = db::connect(&cfg).await?;
            let latest = store::latest_run(&pool).await?;
            pool.close().await;

            match latest {
                Some(run) => {
                    println!("ran_at:  {}", run.ran_at);
                    println!("status:  {}", run.status);
                    println!("records: {}", run.record_count);
                    if let Some(ref message) = run.message {
                        println!("message: {}", message);
                    }
                }
                None => println!("No sync run recorded yet."),
            }
        }
        Commands::Serve => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| "transit_sync=info,tsync=info".into()),
                )
                .init();

            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            server::run_server(&cfg, pool).await?;
        }
    }

    Ok(())
}
