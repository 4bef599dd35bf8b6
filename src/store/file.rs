//! Local JSON file store.

use super::{DocumentStore, StoreError};
use crate::tree::TranslationTree;
use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

pub struct FileStore {
    path: PathBuf,
    backup_dir: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            backup_dir: backup_dir.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }
}

/// Write via a sibling temp file and rename, so readers never see a
/// half-written document.
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn load_all(&self) -> Result<TranslationTree, StoreError> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} does not exist yet, starting empty", self.path.display());
                Ok(TranslationTree::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save_all(&self, tree: &TranslationTree) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(tree)?;
        write_atomic(&self.path, &json).await?;
        debug!("Wrote {} pages to {}", tree.pages.len(), self.path.display());
        Ok(())
    }

    async fn create_backup(&self, tree: &TranslationTree) -> Result<String, StoreError> {
        let now = Utc::now();
        let id = format!("backup_{}", now.timestamp_millis());
        let mut document = serde_json::to_value(tree)?;
        if let Some(map) = document.as_object_mut() {
            map.insert("timestamp".to_string(), now.to_rfc3339().into());
        }

        let path = self.backup_dir.join(format!("{id}.json"));
        write_atomic(&path, &serde_json::to_vec_pretty(&document)?).await?;
        info!("Created backup {}", path.display());
        Ok(id)
    }

    fn describe(&self) -> String {
        format!("file store at {}", self.path.display())
    }
}
