//! Export binary - writes the local cache as flattened per-language JSON files
//!
//! Usage:
//!   cargo run --bin export                # Write into ./exports
//!   cargo run --bin export -- out/i18n    # Write into out/i18n
//!
//! Writes `<lang>.json` for every active language plus `all.json`.
//!
//! Optional:
//! - CACHE_PATH (defaults to data/translations.json)

use anyhow::{Context, Result};
use futures::future::try_join_all;
use std::path::{Path, PathBuf};
use tracing::info;
use translation_manager::config::Config;
use translation_manager::export::{bulk_export, language_export};
use translation_manager::store::{DocumentStore, FileStore};

async fn write_json(path: PathBuf, value: serde_json::Value) -> Result<PathBuf> {
    let json = serde_json::to_vec_pretty(&value)?;
    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("translation_manager=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("exports"));

    let store = FileStore::new(config.cache_path.clone(), config.backup_dir.clone());
    let tree = store
        .load_all()
        .await
        .with_context(|| format!("Failed to read {}", config.cache_path.display()))?;
    info!(
        "Loaded {} pages in {} languages",
        tree.pages.len(),
        tree.languages.len()
    );

    tokio::fs::create_dir_all(&out_dir)
        .await
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let target = |name: &str| Path::new(&out_dir).join(format!("{name}.json"));
    let mut writes: Vec<_> = tree
        .languages
        .iter()
        .map(|lang| write_json(target(lang), language_export(&tree, lang)))
        .collect();
    writes.push(write_json(target("all"), bulk_export(&tree)));

    for path in try_join_all(writes).await? {
        info!("Wrote {}", path.display());
    }
    Ok(())
}
