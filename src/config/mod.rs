//! Configuration module for the CMS backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;

/// Default port when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 5000;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key guarding write requests (optional)
    pub api_psk: Option<String>,
    /// Path to the line-delimited content store file
    pub db_path: PathBuf,
    /// Directory served as static assets
    pub public_dir: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines
    pub log_json: bool,
    /// Insert the example records when the store is empty
    pub seed: bool,
    /// Share of unparseable store lines tolerated on load
    pub corrupt_threshold: f64,
    /// Period of background journal compaction (disabled when `None`)
    pub compact_interval: Option<Duration>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let api_psk = env::var("CMS_API_PSK").ok().filter(|k| !k.is_empty());

        let db_path = env::var("CMS_DB_PATH")
            .unwrap_or_else(|_| "./data/content.db".to_string())
            .into();

        let public_dir = env::var("CMS_PUBLIC_DIR")
            .unwrap_or_else(|_| "./public".to_string())
            .into();

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| AppError::Config(format!("Invalid PORT {:?}: {}", raw, e)))?,
            Err(_) => DEFAULT_PORT,
        };

        let host = env::var("CMS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let bind_addr = format!("{}:{}", host, port)
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("Invalid CMS_HOST {:?}: {}", host, e)))?;

        let log_level = env::var("CMS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_json = env_bool("CMS_LOG_JSON", false);
        let seed = env_bool("CMS_SEED", true);

        let corrupt_threshold = match env::var("CMS_CORRUPT_THRESHOLD") {
            Ok(raw) => {
                let value = raw.trim().parse::<f64>().map_err(|e| {
                    AppError::Config(format!("Invalid CMS_CORRUPT_THRESHOLD {:?}: {}", raw, e))
                })?;
                if !(0.0..=1.0).contains(&value) {
                    return Err(AppError::Config(format!(
                        "CMS_CORRUPT_THRESHOLD must be between 0 and 1, got {}",
                        value
                    )));
                }
                value
            }
            Err(_) => crate::db::DEFAULT_CORRUPT_THRESHOLD,
        };

        let compact_interval = match env::var("CMS_COMPACT_INTERVAL_SECS") {
            Ok(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|e| {
                    AppError::Config(format!("Invalid CMS_COMPACT_INTERVAL_SECS {:?}: {}", raw, e))
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            Err(_) => None,
        };

        Ok(Self {
            api_psk,
            db_path,
            public_dir,
            bind_addr,
            log_level,
            log_json,
            seed,
            corrupt_threshold,
            compact_interval,
        })
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}
