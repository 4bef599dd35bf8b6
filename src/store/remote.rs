//! HTTP JSON document store.
//!
//! Layout on the service:
//! - `GET  {base}/documents/data` returns the current document (404 when none)
//! - `PUT  {base}/documents/data` replaces it
//! - `PUT  {base}/documents/backup_<millis>` writes a backup copy

use super::{DocumentStore, StoreError};
use crate::retry::{with_retry_if, RetryConfig};
use crate::tree::TranslationTree;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Response, StatusCode};
use serde::Serialize;
use tracing::{debug, info};

const DATA_DOCUMENT: &str = "data";

#[derive(Serialize)]
struct BackupDocument<'a> {
    #[serde(flatten)]
    tree: &'a TranslationTree,
    timestamp: String,
}

pub struct RemoteStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    load_retry: RetryConfig,
    save_retry: RetryConfig,
}

impl RemoteStore {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            load_retry: RetryConfig::store_load(),
            save_retry: RetryConfig::store_save(),
        }
    }

    /// Use one retry schedule for every call.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.load_retry = retry.clone();
        self.save_retry = retry;
        self
    }

    fn document_url(&self, name: &str) -> String {
        format!("{}/documents/{}", self.base_url, name)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn put_document<T: Serialize + Sync>(&self, name: &str, body: &T) -> Result<(), StoreError> {
        let url = self.document_url(name);
        let response = self
            .authorize(self.client.put(&url).json(body))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn fetch_data(&self) -> Result<TranslationTree, StoreError> {
        let url = self.document_url(DATA_DOCUMENT);
        let response = self.authorize(self.client.get(&url)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("No document at {}, starting empty", url);
            return Ok(TranslationTree::new());
        }
        let body = ensure_success(response).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

async fn ensure_success(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl DocumentStore for RemoteStore {
    async fn load_all(&self) -> Result<TranslationTree, StoreError> {
        with_retry_if(&self.load_retry, "Load document", || self.fetch_data(), StoreError::is_retryable).await
    }

    async fn save_all(&self, tree: &TranslationTree) -> Result<(), StoreError> {
        with_retry_if(
            &self.save_retry,
            "Save document",
            || self.put_document(DATA_DOCUMENT, tree),
            StoreError::is_retryable,
        )
        .await?;
        debug!("Saved {} pages to {}", tree.pages.len(), self.base_url);
        Ok(())
    }

    async fn create_backup(&self, tree: &TranslationTree) -> Result<String, StoreError> {
        let now = Utc::now();
        let id = format!("backup_{}", now.timestamp_millis());
        let document = BackupDocument {
            tree,
            timestamp: now.to_rfc3339(),
        };
        with_retry_if(
            &RetryConfig::backup(),
            "Create backup",
            || self.put_document(&id, &document),
            StoreError::is_retryable,
        )
        .await?;
        info!("Created remote backup {}", id);
        Ok(id)
    }

    fn describe(&self) -> String {
        format!("remote store at {}", self.base_url)
    }
}
