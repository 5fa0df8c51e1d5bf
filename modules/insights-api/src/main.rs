use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use insights_api::{build_router, AppState};
use insights_common::Config;
use insights_store::{InsightAnalytics, MongoClient, MongoInsightStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("insights=info".parse()?))
        .init();

    let config = Config::from_env()?;

    let client = MongoClient::connect(&config.mongo_uri, &config.mongo_db).await?;
    let store = MongoInsightStore::from_client(&client, &config.mongo_collection);
    info!(
        db = %config.mongo_db,
        collection = %config.mongo_collection,
        "Serving insights collection"
    );

    let host = std::env::var("API_HOST").unwrap_or_else(|_| config.web_host.clone());
    let port = std::env::var("API_PORT").unwrap_or_else(|_| config.web_port.to_string());

    let state = Arc::new(AppState {
        analytics: InsightAnalytics::new(Arc::new(store)),
    });
    let app = build_router(state);

    let addr = format!("{host}:{port}");
    info!("Dashboard API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
