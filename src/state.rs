//! Shared application state: the live tree plus its persistence and
//! observers.
//!
//! Mutations run synchronously under a write lock. Each committed change
//! bumps the revision, is broadcast to observers, goes to the activity log
//! and marks the document dirty; a background saver writes it out once
//! changes have been quiet for the debounce period.

use crate::activity::{ActivityAction, ActivityEvent, ActivityLog, Actor, EntityType};
use crate::mutation::{Applied, Mutation};
use crate::store::{self, DocumentStore, StoreError, Subscription};
use crate::tree::{ImportReport, TranslationTree, TreeError};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    Local,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub revision: u64,
    pub origin: ChangeOrigin,
}

pub struct ManagerOptions {
    /// Where snapshots go when the primary store rejects a save, and where
    /// the tree is loaded from when the primary cannot be read.
    pub fallback: Option<Arc<dyn DocumentStore>>,
    pub save_debounce: Duration,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            fallback: None,
            save_debounce: Duration::from_millis(1000),
        }
    }
}

struct Inner {
    tree: RwLock<TranslationTree>,
    revision: AtomicU64,
    saving: AtomicBool,
    pending: AtomicBool,
    last_saved: Mutex<Option<TranslationTree>>,
    events: broadcast::Sender<ChangeEvent>,
    dirty: Notify,
    store: Arc<dyn DocumentStore>,
    fallback: Option<Arc<dyn DocumentStore>>,
    activity: Arc<dyn ActivityLog>,
    save_debounce: Duration,
}

/// Clears the `saving` flag however the save ends, cancellation included.
struct SavingGuard<'a>(&'a AtomicBool);

impl<'a> SavingGuard<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct StateManager {
    inner: Arc<Inner>,
}

impl StateManager {
    pub fn new(
        tree: TranslationTree,
        store: Arc<dyn DocumentStore>,
        activity: Arc<dyn ActivityLog>,
        options: ManagerOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Inner {
                tree: RwLock::new(tree),
                revision: AtomicU64::new(0),
                saving: AtomicBool::new(false),
                pending: AtomicBool::new(false),
                last_saved: Mutex::new(None),
                events,
                dirty: Notify::new(),
                store,
                fallback: options.fallback,
                activity,
                save_debounce: options.save_debounce,
            }),
        }
    }

    /// Load the initial tree from `store`, or from the fallback when the
    /// store cannot be read. Starts empty if neither works.
    pub async fn load(store: Arc<dyn DocumentStore>, activity: Arc<dyn ActivityLog>, options: ManagerOptions) -> Self {
        let tree = match store.load_all().await {
            Ok(tree) => {
                info!(
                    "Loaded {} pages and {} languages from {}",
                    tree.pages.len(),
                    tree.languages.len(),
                    store.describe()
                );
                tree
            }
            Err(e) => {
                warn!("Loading from {} failed: {}", store.describe(), e);
                load_fallback(options.fallback.as_deref()).await
            }
        };
        Self::new(tree, store, activity, options)
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, TranslationTree> {
        self.inner.tree.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, TranslationTree> {
        self.inner.tree.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the current tree under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&TranslationTree) -> R) -> R {
        f(&*self.read_guard())
    }

    pub fn snapshot(&self) -> TranslationTree {
        self.read_guard().clone()
    }

    pub fn revision(&self) -> u64 {
        self.inner.revision.load(Ordering::SeqCst)
    }

    pub fn is_saving(&self) -> bool {
        self.inner.saving.load(Ordering::SeqCst)
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.inner.pending.load(Ordering::SeqCst)
    }

    pub fn activity(&self) -> &dyn ActivityLog {
        self.inner.activity.as_ref()
    }

    /// Observe committed changes.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.events.subscribe()
    }

    /// Bump the revision. Called with the write lock held so revisions
    /// follow commit order.
    fn next_revision(&self) -> u64 {
        self.inner.revision.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn publish(&self, revision: u64, origin: ChangeOrigin) {
        // No receivers is fine.
        let _ = self.inner.events.send(ChangeEvent { revision, origin });
    }

    fn mark_dirty(&self) {
        self.inner.pending.store(true, Ordering::SeqCst);
        self.inner.dirty.notify_one();
    }

    pub fn apply(&self, actor: &Actor, mutation: &Mutation) -> Result<Applied, TreeError> {
        let (applied, revision) = {
            let mut tree = self.write_guard();
            let applied = mutation.apply(&mut tree)?;
            let revision = applied.changed.then(|| self.next_revision());
            (applied, revision)
        };

        let Some(revision) = revision else {
            debug!("{} left the tree unchanged", mutation.name());
            return Ok(applied);
        };
        debug!("{} committed as revision {}", mutation.name(), revision);
        self.publish(revision, ChangeOrigin::Local);
        if let Some(event) = &applied.event {
            self.inner.activity.record(actor, event.clone());
        }
        self.mark_dirty();
        Ok(applied)
    }

    pub fn import(&self, actor: &Actor, lang: &str, data: &Value) -> Result<ImportReport, TreeError> {
        let (report, revision) = {
            let mut tree = self.write_guard();
            let report = tree.import_translations(lang, data)?;
            let revision = (!report.is_noop()).then(|| self.next_revision());
            (report, revision)
        };

        if let Some(revision) = revision {
            self.publish(revision, ChangeOrigin::Local);
            self.inner.activity.record(
                actor,
                ActivityEvent::new(ActivityAction::Import, EntityType::Language, lang).details(format!(
                    "Imported {} new and {} updated translations",
                    report.additions.len(),
                    report.updates.len()
                )),
            );
            self.mark_dirty();
        }
        Ok(report)
    }

    /// What [`StateManager::import`] would do, without doing it.
    pub fn preview_import(&self, lang: &str, data: &Value) -> Result<ImportReport, TreeError> {
        self.read_guard().preview_import(lang, data)
    }

    /// Replace the whole tree with a snapshot observed in the store.
    ///
    /// Dropped while a save is in flight, when it is the echo of our own
    /// last save, or when it matches the current tree. Returns whether the
    /// tree was replaced.
    pub fn apply_remote_snapshot(&self, snapshot: TranslationTree) -> bool {
        if self.is_saving() {
            debug!("Save in flight, ignoring remote snapshot");
            return false;
        }
        {
            let last_saved = self.inner.last_saved.lock().unwrap_or_else(PoisonError::into_inner);
            if last_saved.as_ref() == Some(&snapshot) {
                debug!("Remote snapshot is our own last save");
                return false;
            }
        }

        let revision = {
            let mut tree = self.write_guard();
            if *tree == snapshot {
                return false;
            }
            *tree = snapshot;
            self.next_revision()
        };
        info!("Applied remote snapshot as revision {}", revision);
        self.publish(revision, ChangeOrigin::Remote);
        true
    }

    /// Save the current tree now. Empty documents are never written. On
    /// failure the snapshot goes to the fallback store and the primary
    /// store's error is returned.
    pub async fn save_now(&self) -> Result<(), StoreError> {
        self.inner.pending.store(false, Ordering::SeqCst);
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            debug!("Skipping save of empty document");
            return Ok(());
        }

        let result = {
            let _saving = SavingGuard::set(&self.inner.saving);
            self.inner.store.save_all(&snapshot).await
        };

        match result {
            Ok(()) => {
                debug!("Saved revision {} to {}", self.revision(), self.inner.store.describe());
                *self.inner.last_saved.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
                Ok(())
            }
            Err(e) => {
                warn!("Saving to {} failed: {}", self.inner.store.describe(), e);
                if let Some(fallback) = &self.inner.fallback {
                    match fallback.save_all(&snapshot).await {
                        Ok(()) => info!("Wrote snapshot to {}", fallback.describe()),
                        Err(fe) => error!("Fallback save to {} failed: {}", fallback.describe(), fe),
                    }
                }
                Err(e)
            }
        }
    }

    /// Save if there are changes the saver has not written yet.
    pub async fn flush(&self) -> Result<(), StoreError> {
        if self.has_unsaved_changes() {
            self.save_now().await
        } else {
            Ok(())
        }
    }

    /// Spawn the debounced saver: after a change, wait until no further
    /// change has arrived for the debounce period, then save.
    pub fn spawn_saver(&self) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let debounce = manager.inner.save_debounce;
            loop {
                manager.inner.dirty.notified().await;
                loop {
                    tokio::select! {
                        _ = tokio::time::sleep(debounce) => break,
                        _ = manager.inner.dirty.notified() => {}
                    }
                }
                if let Err(e) = manager.save_now().await {
                    error!("Auto-save failed: {}", e);
                }
            }
        })
    }

    /// Follow the store: snapshots written elsewhere replace the tree.
    pub fn start_sync(&self, interval: Duration) -> Subscription {
        let manager = self.clone();
        store::subscribe(self.inner.store.clone(), interval, move |snapshot| {
            manager.apply_remote_snapshot(snapshot);
        })
    }

    pub async fn create_backup(&self) -> Result<String, StoreError> {
        let snapshot = self.snapshot();
        self.inner.store.create_backup(&snapshot).await
    }
}

async fn load_fallback(fallback: Option<&dyn DocumentStore>) -> TranslationTree {
    let Some(fallback) = fallback else {
        return TranslationTree::new();
    };
    match fallback.load_all().await {
        Ok(tree) => {
            info!("Loaded {} pages from {}", tree.pages.len(), fallback.describe());
            tree
        }
        Err(e) => {
            error!("Loading from {} failed too, starting empty: {}", fallback.describe(), e);
            TranslationTree::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ActivityQuery, MemoryActivityLog};
    use crate::store::FileStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    /// Store that counts saves and can be told to fail.
    #[derive(Default)]
    struct ScriptedStore {
        doc: Mutex<TranslationTree>,
        saves: AtomicUsize,
        fail: AtomicBool,
    }

    #[async_trait]
    impl DocumentStore for ScriptedStore {
        async fn load_all(&self) -> Result<TranslationTree, StoreError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::Status {
                    status: 503,
                    body: "down".to_string(),
                });
            }
            Ok(self.doc.lock().unwrap().clone())
        }

        async fn save_all(&self, tree: &TranslationTree) -> Result<(), StoreError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::Status {
                    status: 503,
                    body: "down".to_string(),
                });
            }
            *self.doc.lock().unwrap() = tree.clone();
            Ok(())
        }

        async fn create_backup(&self, _tree: &TranslationTree) -> Result<String, StoreError> {
            Ok("backup_1".to_string())
        }

        fn describe(&self) -> String {
            "scripted store".to_string()
        }
    }

    fn manager_with(store: Arc<ScriptedStore>, options: ManagerOptions) -> (StateManager, Arc<MemoryActivityLog>) {
        let activity = Arc::new(MemoryActivityLog::new(100));
        let manager = StateManager::new(
            TranslationTree::with_languages(["en"]),
            store,
            activity.clone(),
            options,
        );
        (manager, activity)
    }

    fn add_page(key: &str) -> Mutation {
        Mutation::AddPage {
            page_key: key.to_string(),
        }
    }

    // ==================== Mutations ====================

    #[tokio::test]
    async fn test_apply_bumps_revision_and_notifies() {
        let (manager, activity) = manager_with(Arc::default(), ManagerOptions::default());
        let mut events = manager.subscribe();

        manager.apply(&Actor::anonymous(), &add_page("home")).unwrap();

        assert_eq!(manager.revision(), 1);
        assert_eq!(
            events.recv().await.unwrap(),
            ChangeEvent {
                revision: 1,
                origin: ChangeOrigin::Local
            }
        );
        assert_eq!(activity.len(), 1);
        assert!(manager.has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_failed_mutation_changes_nothing() {
        let (manager, activity) = manager_with(Arc::default(), ManagerOptions::default());
        manager.apply(&Actor::anonymous(), &add_page("home")).unwrap();

        let err = manager.apply(&Actor::anonymous(), &add_page("home")).unwrap_err();
        assert!(matches!(err, TreeError::AlreadyExists { .. }));
        assert_eq!(manager.revision(), 1);
        assert_eq!(activity.len(), 1);
    }

    #[tokio::test]
    async fn test_noop_mutation_is_not_recorded() {
        let (manager, activity) = manager_with(Arc::default(), ManagerOptions::default());
        manager.apply(&Actor::anonymous(), &add_page("home")).unwrap();
        manager.apply(&Actor::anonymous(), &Mutation::DeletePage { page_key: "ghost".into() }).unwrap();
        assert_eq!(manager.revision(), 1);
        assert_eq!(activity.len(), 1);
    }

    #[tokio::test]
    async fn test_import_records_activity() {
        let (manager, activity) = manager_with(Arc::default(), ManagerOptions::default());
        let actor = Actor::from_email("ada@example.com");

        let report = manager.import(&actor, "tr", &json!({"home": {"title": "Merhaba"}})).unwrap();
        assert!(report.language_added);
        assert_eq!(report.additions.len(), 1);

        let records = activity.recent(&ActivityQuery::default());
        assert_eq!(records[0].event.action, ActivityAction::Import);
        assert_eq!(records[0].actor.user_name, "ada");
        assert!(manager.read(|tree| tree.has_language("tr")));
    }

    #[tokio::test]
    async fn test_preview_import_leaves_tree_alone() {
        let (manager, _) = manager_with(Arc::default(), ManagerOptions::default());
        let before = manager.snapshot();
        let report = manager.preview_import("en", &json!({"home": {"title": "Hi"}})).unwrap();
        assert_eq!(report.additions.len(), 1);
        assert_eq!(manager.snapshot(), before);
        assert_eq!(manager.revision(), 0);
    }

    // ==================== Remote Snapshots ====================

    #[tokio::test]
    async fn test_remote_snapshot_replaces_tree() {
        let (manager, _) = manager_with(Arc::default(), ManagerOptions::default());
        let mut events = manager.subscribe();
        let mut remote = TranslationTree::with_languages(["en", "de"]);
        remote.add_page("about").unwrap();

        assert!(manager.apply_remote_snapshot(remote.clone()));
        assert_eq!(manager.snapshot(), remote);
        assert_eq!(events.recv().await.unwrap().origin, ChangeOrigin::Remote);
        assert!(!manager.has_unsaved_changes());

        assert!(!manager.apply_remote_snapshot(remote));
    }

    #[tokio::test]
    async fn test_remote_snapshot_ignored_while_saving() {
        let (manager, _) = manager_with(Arc::default(), ManagerOptions::default());
        let _saving = SavingGuard::set(&manager.inner.saving);

        assert!(!manager.apply_remote_snapshot(TranslationTree::with_languages(["fr"])));
        assert_eq!(manager.snapshot().languages, vec!["en"]);
    }

    #[tokio::test]
    async fn test_echo_of_own_save_is_ignored() {
        let store = Arc::new(ScriptedStore::default());
        let (manager, _) = manager_with(store, ManagerOptions::default());
        manager.apply(&Actor::anonymous(), &add_page("home")).unwrap();
        manager.save_now().await.unwrap();
        let saved = manager.snapshot();

        manager.apply(&Actor::anonymous(), &add_page("about")).unwrap();
        assert!(!manager.apply_remote_snapshot(saved));
        assert!(manager.read(|tree| tree.page("about").is_some()));
    }

    // ==================== Persistence ====================

    #[tokio::test]
    async fn test_empty_document_is_not_saved() {
        let store = Arc::new(ScriptedStore::default());
        let manager = StateManager::new(
            TranslationTree::new(),
            store.clone(),
            Arc::new(MemoryActivityLog::new(10)),
            ManagerOptions::default(),
        );
        manager.save_now().await.unwrap();
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_saver_debounces_bursts() {
        let store = Arc::new(ScriptedStore::default());
        let options = ManagerOptions {
            save_debounce: Duration::from_millis(50),
            ..ManagerOptions::default()
        };
        let (manager, _) = manager_with(store.clone(), options);
        let saver = manager.spawn_saver();

        for page in ["a", "b", "c"] {
            manager.apply(&Actor::anonymous(), &add_page(page)).unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
        assert_eq!(store.doc.lock().unwrap().pages.len(), 3);
        assert!(!manager.has_unsaved_changes());
        saver.abort();
    }

    #[tokio::test]
    async fn test_failed_save_writes_fallback() {
        let dir = TempDir::new().unwrap();
        let fallback = Arc::new(FileStore::new(dir.path().join("cache.json"), dir.path().join("backups")));
        let store = Arc::new(ScriptedStore::default());
        store.fail.store(true, Ordering::SeqCst);

        let options = ManagerOptions {
            fallback: Some(fallback.clone()),
            ..ManagerOptions::default()
        };
        let (manager, _) = manager_with(store, options);
        manager.apply(&Actor::anonymous(), &add_page("home")).unwrap();

        assert!(manager.save_now().await.is_err());
        assert!(!manager.is_saving());
        let cached = fallback.load_all().await.unwrap();
        assert!(cached.page("home").is_some());
    }

    #[tokio::test]
    async fn test_load_falls_back_when_store_fails() {
        let dir = TempDir::new().unwrap();
        let fallback = Arc::new(FileStore::new(dir.path().join("cache.json"), dir.path().join("backups")));
        let mut cached = TranslationTree::with_languages(["en"]);
        cached.add_page("cached").unwrap();
        fallback.save_all(&cached).await.unwrap();

        let store = Arc::new(ScriptedStore::default());
        store.fail.store(true, Ordering::SeqCst);
        let manager = StateManager::load(
            store,
            Arc::new(MemoryActivityLog::new(10)),
            ManagerOptions {
                fallback: Some(fallback),
                ..ManagerOptions::default()
            },
        )
        .await;

        assert_eq!(manager.snapshot(), cached);
    }
}
