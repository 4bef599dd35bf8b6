//! Import binary - merges a flattened JSON file into the local cache
//!
//! Usage:
//!   cargo run --bin import -- en locales/en.json            # Merge and save
//!   cargo run --bin import -- en locales/en.json --dry-run  # Show what would change
//!
//! The language code is lower-cased. Keys that clash with an existing space
//! or translation are skipped and listed.
//!
//! Optional:
//! - CACHE_PATH (defaults to data/translations.json)

use anyhow::{bail, Context, Result};
use translation_manager::config::Config;
use translation_manager::store::{DocumentStore, FileStore};
use translation_manager::tree::ImportReport;
use tracing::{info, warn};

fn print_report(report: &ImportReport) {
    for change in &report.additions {
        println!("  + {} = {}", change.path, change.value.to_json());
    }
    for change in &report.updates {
        let previous = change
            .previous
            .as_ref()
            .map(|v| v.to_json().to_string())
            .unwrap_or_else(|| "(none)".to_string());
        println!("  ~ {}: {} -> {}", change.path, previous, change.value.to_json());
    }
    for skipped in &report.skipped {
        println!("  ! {}/{} skipped ({:?})", skipped.path, skipped.key, skipped.reason);
    }
    println!(
        "{}: {} added, {} updated, {} unchanged, {} skipped",
        report.language,
        report.additions.len(),
        report.updates.len(),
        report.unchanged,
        report.skipped.len()
    );
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

    let args: Vec<String> = std::env::args().skip(1).collect();
    let dry_run = args.iter().any(|a| a == "--dry-run");
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();
    let [lang, file] = positional.as_slice() else {
        bail!("Usage: import <lang> <file.json> [--dry-run]");
    };
    let lang = lang.trim().to_lowercase();

    let config = Config::from_env()?;
    let contents = tokio::fs::read_to_string(file.as_str())
        .await
        .with_context(|| format!("Failed to read {file}"))?;
    let data: serde_json::Value =
        serde_json::from_str(&contents).with_context(|| format!("{file} is not valid JSON"))?;

    let store = FileStore::new(config.cache_path.clone(), config.backup_dir.clone());
    let mut tree = store
        .load_all()
        .await
        .with_context(|| format!("Failed to read {}", config.cache_path.display()))?;

    if dry_run {
        let report = tree.preview_import(&lang, &data)?;
        print_report(&report);
        info!("Dry run, nothing written");
        return Ok(());
    }

    let before = tree.clone();
    let report = tree.import_translations(&lang, &data)?;
    print_report(&report);
    if report.is_noop() {
        info!("Nothing changed");
        return Ok(());
    }

    if !before.is_empty() {
        if let Err(e) = store.create_backup(&before).await {
            warn!("Could not back up the previous document: {}", e);
        }
    }
    store
        .save_all(&tree)
        .await
        .with_context(|| format!("Failed to write {}", config.cache_path.display()))?;
    info!("Saved {}", config.cache_path.display());
    Ok(())
}
