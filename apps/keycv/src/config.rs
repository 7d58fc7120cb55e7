use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_GATEWAY_BASE_URL: &str = "https://keycv.onrender.com";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub gateway_base_url: String,
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub auth_url: String,
    pub auth_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub http_timeout: Duration,
    pub upload_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gateway_base_url: resolve_gateway_base_url(std::env::var("GATEWAY_BASE_URL").ok()),
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            auth_url: require_env("AUTH_URL")?,
            auth_api_key: require_env("AUTH_API_KEY")?,
            port: parse_env("PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            http_timeout: Duration::from_secs(
                parse_env("HTTP_TIMEOUT_SECS", 120)
                    .context("HTTP_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            upload_limit_bytes: parse_env("UPLOAD_LIMIT_BYTES", 10 * 1024 * 1024)
                .context("UPLOAD_LIMIT_BYTES must be a byte count")?,
        })
    }
}

/// Falls back to the hosted gateway when unset or blank; drops trailing slashes.
pub fn resolve_gateway_base_url(value: Option<String>) -> String {
    let raw = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_GATEWAY_BASE_URL.to_string());
    raw.trim_end_matches('/').to_string()
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Could not parse '{key}'")),
        Err(_) => Ok(default),
    }
}
