//! Job state persistence: one JSON blob per job, stored in Dropbox.
//!
//! The store is the single source of truth across invocations. Reads and
//! writes are atomic from the caller's point of view, but there is no
//! transaction spanning read, decide, send, and write; the jobs preserve
//! consistency by only writing after a successful send.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::JobError;

const DOWNLOAD_URL: &str = "https://content.dropboxapi.com/2/files/download";
const UPLOAD_URL: &str = "https://content.dropboxapi.com/2/files/upload";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    NotFound { filename: String },
    Failed { filename: String },
}

#[derive(Debug, Clone, Copy)]
pub struct WriteError;

/// Raw file access to the remote store.
#[async_trait]
pub trait DropboxClient: Send + Sync {
    async fn read_file(&self, filename: &str) -> Result<String, ReadError>;
    async fn write_file(&self, filename: &str, contents: &str) -> Result<(), WriteError>;
}

/// Live client for the Dropbox content API.
pub struct HttpDropboxClient {
    http: reqwest::Client,
    access_token: String,
}

impl HttpDropboxClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token: access_token.into(),
        }
    }
}

#[async_trait]
impl DropboxClient for HttpDropboxClient {
    async fn read_file(&self, filename: &str) -> Result<String, ReadError> {
        let failed = || ReadError::Failed {
            filename: filename.to_string(),
        };

        let response = self
            .http
            .post(DOWNLOAD_URL)
            .bearer_auth(&self.access_token)
            .header(
                "Dropbox-API-Arg",
                serde_json::json!({ "path": filename }).to_string(),
            )
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Dropbox download request for {} failed: {}", filename, e);
                failed()
            })?;

        // The content API reports a missing path as 409 with a lookup error.
        if response.status() == reqwest::StatusCode::CONFLICT {
            return Err(ReadError::NotFound {
                filename: filename.to_string(),
            });
        }
        if !response.status().is_success() {
            tracing::warn!(
                "Dropbox download of {} returned status {}",
                filename,
                response.status()
            );
            return Err(failed());
        }

        response.text().await.map_err(|e| {
            tracing::warn!("Failed to read Dropbox download body for {}: {}", filename, e);
            failed()
        })
    }

    async fn write_file(&self, filename: &str, contents: &str) -> Result<(), WriteError> {
        let response = self
            .http
            .post(UPLOAD_URL)
            .bearer_auth(&self.access_token)
            .header(
                "Dropbox-API-Arg",
                serde_json::json!({ "path": filename, "mode": "overwrite" }).to_string(),
            )
            .header("Content-Type", "application/octet-stream")
            .body(contents.to_string())
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Dropbox upload request for {} failed: {}", filename, e);
                WriteError
            })?;

        if !response.status().is_success() {
            tracing::error!(
                "Dropbox upload of {} returned status {}",
                filename,
                response.status()
            );
            return Err(WriteError);
        }

        Ok(())
    }
}

/// Typed access to one state file.
pub struct Datastore<T> {
    client: Arc<dyn DropboxClient>,
    filename: String,
    _state: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> Datastore<T> {
    pub fn new(client: Arc<dyn DropboxClient>, filename: impl Into<String>) -> Self {
        Self {
            client,
            filename: filename.into(),
            _state: PhantomData,
        }
    }

    pub async fn current_state(&self) -> Result<T, JobError> {
        let contents = self
            .client
            .read_file(&self.filename)
            .await
            .map_err(|_| JobError::StateUnavailable(self.filename.clone()))?;

        serde_json::from_str(&contents).map_err(|e| {
            tracing::warn!("State file {} did not parse: {}", self.filename, e);
            JobError::StateUnavailable(self.filename.clone())
        })
    }

    /// Persist the new state. The success string carries the description so
    /// the caller's outcome line reads
    /// `{description}\nCurrent state has been stored in Dropbox`.
    pub async fn store(&self, state: &T, description: &str) -> Result<String, JobError> {
        let store_failed = || JobError::StoreWriteFailed {
            description: description.to_string(),
        };

        let contents = serde_json::to_string_pretty(state).map_err(|e| {
            tracing::error!("Could not serialize state for {}: {}", self.filename, e);
            store_failed()
        })?;

        self.client
            .write_file(&self.filename, &contents)
            .await
            .map_err(|_| store_failed())?;

        Ok(format!(
            "{description}\nCurrent state has been stored in Dropbox"
        ))
    }
}
