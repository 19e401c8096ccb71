//! JSON document stores with whole-document replace semantics.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use tokio::sync::{Mutex, MutexGuard};
use tracing::warn;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A single JSON document persisted with full-read / full-replace
/// semantics.
///
/// A read that fails (missing file, unreadable JSON) degrades to the
/// configured default: corruption is treated as a fresh install, never
/// an error. A save writes a sibling temp file and renames it over the
/// document, so a concurrent reader observes either the old snapshot or
/// the new one. The embedded mutex serializes read-modify-write
/// sections within this process; cross-process writers remain
/// last-write-wins.
pub struct JsonStore<T> {
    path: PathBuf,
    default: T,
    lock: Mutex<()>,
}

impl<T> JsonStore<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>, default: T) -> Self {
        Self {
            path: path.into(),
            default,
            lock: Mutex::new(()),
        }
    }

    /// Take the store lock for the duration of a read-modify-write
    /// section. Plain reads do not need it.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    /// Location of the persisted document.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Load the current document, or the default when absent or
    /// unreadable.
    pub async fn load(&self) -> T {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "failed to read document, using defaults"
                    );
                }
                return self.default.clone();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "unreadable document, using defaults"
                );
                self.default.clone()
            }
        }
    }

    /// Replace the document in one atomic step.
    pub async fn save(&self, doc: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
