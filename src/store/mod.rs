//! Document persistence.
//!
//! The whole tree is stored as one document. [`RemoteStore`] talks to a
//! document service over HTTP; [`FileStore`] keeps a JSON file on disk and
//! doubles as the local fallback cache when the remote is unreachable.

mod file;
mod remote;

pub use file::FileStore;
pub use remote::RemoteStore;

use crate::tree::TranslationTree;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to document store failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("document store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("file store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid document JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

impl StoreError {
    /// Network failures, rate limiting and server errors are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Http(e) => !e.is_decode() && !e.is_builder(),
            StoreError::Status { status, .. } => *status == 429 || *status >= 500,
            StoreError::Io(_) | StoreError::Decode(_) => false,
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Current stored tree. A missing document loads as an empty tree.
    async fn load_all(&self) -> Result<TranslationTree, StoreError>;

    /// Replace the stored document with `tree`.
    async fn save_all(&self, tree: &TranslationTree) -> Result<(), StoreError>;

    /// Write a timestamped copy of `tree`; returns the backup's id.
    async fn create_backup(&self, tree: &TranslationTree) -> Result<String, StoreError>;

    /// Short name for logs.
    fn describe(&self) -> String;
}

/// Handle to a running change subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {}

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Poll `store` every `interval` and hand each snapshot that differs from
/// the previous one to `on_change`. The first successful load sets the
/// baseline and is not delivered. Failed polls are logged and skipped.
pub fn subscribe<F>(store: Arc<dyn DocumentStore>, interval: Duration, on_change: F) -> Subscription
where
    F: Fn(TranslationTree) + Send + Sync + 'static,
{
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last: Option<TranslationTree> = None;

        loop {
            ticker.tick().await;
            let snapshot = match store.load_all().await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("Polling {} failed: {}", store.describe(), e);
                    continue;
                }
            };
            match &last {
                None => debug!("Subscription baseline taken from {}", store.describe()),
                Some(previous) if *previous == snapshot => continue,
                Some(_) => {
                    debug!("Change detected in {}", store.describe());
                    on_change(snapshot.clone());
                }
            }
            last = Some(snapshot);
        }
    });

    Subscription { task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory store the tests can poke directly.
    #[derive(Default)]
    struct MemoryStore {
        doc: Mutex<TranslationTree>,
    }

    #[async_trait]
    impl DocumentStore for MemoryStore {
        async fn load_all(&self) -> Result<TranslationTree, StoreError> {
            Ok(self.doc.lock().unwrap().clone())
        }

        async fn save_all(&self, tree: &TranslationTree) -> Result<(), StoreError> {
            *self.doc.lock().unwrap() = tree.clone();
            Ok(())
        }

        async fn create_backup(&self, _tree: &TranslationTree) -> Result<String, StoreError> {
            Ok("backup".to_string())
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }

    #[test]
    fn test_retryable_statuses() {
        let status = |status| StoreError::Status {
            status,
            body: String::new(),
        };
        assert!(status(429).is_retryable());
        assert!(status(503).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(!StoreError::Io(std::io::Error::other("disk")).is_retryable());
    }

    #[tokio::test]
    async fn test_subscribe_delivers_only_changes() {
        let store = Arc::new(MemoryStore::default());
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();

        let sub = subscribe(store.clone(), Duration::from_millis(10), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        let mut tree = TranslationTree::with_languages(["en"]);
        tree.add_page("home").unwrap();
        store.save_all(&tree).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        sub.unsubscribe();
        store.save_all(&TranslationTree::new()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
