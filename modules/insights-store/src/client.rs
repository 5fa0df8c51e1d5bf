use bson::{doc, Document};
use mongodb::{Client, Collection};
use tracing::info;

use insights_common::InsightsError;

/// Thin wrapper around the MongoDB client providing connection setup.
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and verify the server answers a ping.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, InsightsError> {
        info!(db = db_name, "Connecting to MongoDB");

        // Fail fast instead of hanging on an unreachable server
        let separator = if uri.contains('?') { '&' } else { '?' };
        let timeout_uri =
            format!("{uri}{separator}serverSelectionTimeoutMS=3000&connectTimeoutMS=3000");

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| InsightsError::Database(format!("Failed to connect to MongoDB: {e}")))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| InsightsError::Database(format!("MongoDB ping failed: {e}")))?;

        info!(db = db_name, "Connected to MongoDB");

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Untyped handle to a collection in the configured database.
    pub fn collection(&self, name: &str) -> Collection<Document> {
        self.client.database(&self.db_name).collection(name)
    }
}
