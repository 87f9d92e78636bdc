use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, warn};

use comprobantes::logging;
use comprobantes::pipeline::aliases::AliasTable;
use comprobantes::pipeline::batch::{ingest_batch, SourceFile};
use comprobantes::reports::SummaryReport;
use comprobantes::server::start_server;
use comprobantes::storage::{InMemoryStorage, Storage};

#[derive(Parser)]
#[command(name = "comprobantes")]
#[command(about = "Electronic tax document normalization and reporting")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize files into the store and print the batch summary
    Ingest {
        /// Files to process, in submission order (.xml, .csv, .txt)
        files: Vec<PathBuf>,
        /// Header alias table (TOML); the built-in table if omitted
        #[arg(long)]
        aliases: Option<PathBuf>,
    },
    /// Start the HTTP server
    Serve {
        #[arg(long, default_value_t = 3000)]
        port: u16,
        /// Header alias table (TOML); the built-in table if omitted
        #[arg(long)]
        aliases: Option<PathBuf>,
    },
}

fn load_aliases(path: Option<PathBuf>) -> Result<AliasTable, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(AliasTable::load(&path)?),
        None => Ok(AliasTable::builtin()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { files, aliases } => {
            let aliases = load_aliases(aliases)?;
            let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());

            let mut batch = Vec::new();
            for path in &files {
                match std::fs::read(path) {
                    Ok(contents) => batch.push(SourceFile {
                        name: path
                            .file_name()
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_else(|| path.display().to_string()),
                        contents,
                    }),
                    Err(e) => {
                        error!("Failed to read {}: {}", path.display(), e);
                        println!("❌ Could not read {}: {}", path.display(), e);
                    }
                }
            }

            let summary = ingest_batch(storage.clone(), &aliases, batch).await;

            println!("\n📊 Batch results:");
            println!("   Files succeeded: {}", summary.succeeded);
            println!("   Files failed: {}", summary.failed);
            for outcome in &summary.outcomes {
                match &outcome.error {
                    None => println!("   ✅ {} ({} records)", outcome.file, outcome.records),
                    Some(reason) => println!("   ⚠️  {}: {}", outcome.file, reason),
                }
            }
            if summary.failed > 0 {
                warn!("{} file(s) failed during ingestion", summary.failed);
            }

            let records = storage.all_records().await?;
            let report = SummaryReport::build(&records);
            println!("\n📈 Reports:");
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Serve { port, aliases } => {
            let aliases = load_aliases(aliases)?;
            let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
            start_server(storage, aliases, port).await?;
        }
    }
    Ok(())
}
