use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};
use translation_manager::activity::MemoryActivityLog;
use translation_manager::config::Config;
use translation_manager::server::{self, AppState};
use translation_manager::state::{ManagerOptions, StateManager};
use translation_manager::scheduler;
use translation_manager::store::{DocumentStore, FileStore, RemoteStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("translation_manager=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    info!("Starting translation manager");

    let file_store: Arc<dyn DocumentStore> =
        Arc::new(FileStore::new(config.cache_path.clone(), config.backup_dir.clone()));
    let (store, fallback) = match &config.remote_store_url {
        Some(url) => {
            info!("Using remote document store at {}", url);
            let remote: Arc<dyn DocumentStore> =
                Arc::new(RemoteStore::new(url.clone(), config.remote_store_token.clone()));
            (remote, Some(file_store))
        }
        None => {
            info!("No REMOTE_STORE_URL set, using {}", config.cache_path.display());
            (file_store, None)
        }
    };
    let remote_sync = fallback.is_some();

    let activity = Arc::new(MemoryActivityLog::new(config.activity_capacity));
    let manager = StateManager::load(
        store,
        activity,
        ManagerOptions {
            fallback,
            save_debounce: config.save_debounce,
        },
    )
    .await;

    let saver = manager.spawn_saver();
    // Only a remote store can change behind our back.
    let _sync = remote_sync.then(|| manager.start_sync(config.sync_poll_interval));
    let _scheduler = scheduler::start_backup_scheduler(manager.clone(), &config.backup_schedule)
        .await
        .context("Failed to start backup scheduler")?;

    let app = server::router(AppState::new(manager.clone(), config.api_key.clone()));
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    saver.abort();
    if let Err(e) = manager.flush().await {
        error!("Final save failed: {}", e);
    }
    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
