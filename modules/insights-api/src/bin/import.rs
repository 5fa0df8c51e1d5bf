use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use insights_store::{import::import_json_file, MongoClient, MongoInsightStore};

#[derive(Parser)]
#[command(name = "insights-import", about = "Seed the insights collection from a JSON export")]
struct Cli {
    /// JSON file holding an array of records (or a single record)
    #[arg(long)]
    file: PathBuf,

    #[arg(long, env = "MONGO_URI", default_value = "mongodb://localhost:27017")]
    uri: String,

    #[arg(long, env = "MONGO_DB", default_value = "dashboard_db")]
    database: String,

    #[arg(long, env = "MONGO_COLLECTION", default_value = "insights")]
    collection: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let client = MongoClient::connect(&cli.uri, &cli.database)
        .await
        .with_context(|| format!("Failed to connect to {}", cli.uri))?;
    let store = MongoInsightStore::from_client(&client, &cli.collection);

    let inserted = import_json_file(&store, &cli.file)
        .await
        .with_context(|| format!("Import of {} failed", cli.file.display()))?;

    tracing::info!(
        inserted,
        database = %cli.database,
        collection = %cli.collection,
        "Import finished"
    );
    Ok(())
}
