use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
///
/// `GOOGLE_API_KEY` is deliberately optional: a missing credential is a
/// runtime configuration error surfaced as 503 on analysis requests, not a
/// startup panic, so the service can still come up and report its health.
#[derive(Debug, Clone)]
pub struct Config {
    pub google_api_key: Option<String>,
    pub google_project_id: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            google_api_key: std::env::var("GOOGLE_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            google_project_id: std::env::var("GOOGLE_PROJECT_ID")
                .unwrap_or_else(|_| "salary-genkit".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}
