use std::env;

use crate::InsightsError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // MongoDB
    pub mongo_uri: String,
    pub mongo_db: String,
    pub mongo_collection: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    /// Every variable has a local-development default; only a malformed
    /// `WEB_PORT` is an error.
    pub fn from_env() -> Result<Self, InsightsError> {
        let web_port = env_or("WEB_PORT", "5000");
        let web_port = web_port.parse().map_err(|_| {
            InsightsError::Config(format!("WEB_PORT must be a number, got {web_port:?}"))
        })?;

        Ok(Self {
            mongo_uri: env_or("MONGO_URI", "mongodb://localhost:27017"),
            mongo_db: env_or("MONGO_DB", "dashboard_db"),
            mongo_collection: env_or("MONGO_COLLECTION", "insights"),
            web_host: env_or("WEB_HOST", "0.0.0.0"),
            web_port,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
