use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,
    /// Required as `X-API-Key` on write endpoints when set.
    pub api_key: Option<String>,

    // Persistence
    pub cache_path: PathBuf,
    pub backup_dir: PathBuf,
    pub remote_store_url: Option<String>,
    pub remote_store_token: Option<String>,
    pub save_debounce: Duration,
    pub sync_poll_interval: Duration,

    // Backups, HH:MM in UTC
    pub backup_schedule: Vec<String>,

    // Audit
    pub activity_capacity: usize,
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    optional(name).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = match optional("PORT") {
            Some(port) => port
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {port}"))?,
            None => 8080,
        };

        Ok(Self {
            port,
            api_key: optional("API_KEY"),

            cache_path: optional("CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/translations.json")),
            backup_dir: optional("BACKUP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/backups")),
            remote_store_url: optional("REMOTE_STORE_URL"),
            remote_store_token: optional("REMOTE_STORE_TOKEN"),
            save_debounce: Duration::from_millis(parsed_or("SAVE_DEBOUNCE_MS", 1000)),
            sync_poll_interval: Duration::from_secs(parsed_or("SYNC_POLL_SECS", 5).max(1)),

            backup_schedule: optional("BACKUP_SCHEDULE")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),

            activity_capacity: parsed_or("ACTIVITY_CAPACITY", 500),
        })
    }
}
