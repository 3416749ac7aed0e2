//! services/journal/src/adapters/dismissal.rs
//!
//! File-backed implementation of the `DismissalStore` port. The only state this
//! application persists locally is the moment the install banner was dismissed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nala_core::ports::{DismissalStore, PortError, PortResult};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;

#[derive(Serialize, Deserialize)]
struct DismissalRecord {
    dismissed_at: DateTime<Utc>,
}

/// Stores the dismissal timestamp as a small JSON document.
#[derive(Clone, Debug)]
pub struct FileDismissalStore {
    path: PathBuf,
}

impl FileDismissalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DismissalStore for FileDismissalStore {
    async fn load_dismissed_at(&self) -> PortResult<Option<DateTime<Utc>>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PortError::Unexpected(e.to_string())),
        };
        let record: DismissalRecord = serde_json::from_str(&raw).map_err(|e| {
            PortError::Unexpected(format!("Corrupt dismissal file {}: {}", self.path.display(), e))
        })?;
        Ok(Some(record.dismissed_at))
    }

    async fn save_dismissed_at(&self, at: DateTime<Utc>) -> PortResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
        }
        let raw = serde_json::to_string(&DismissalRecord { dismissed_at: at })
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }
}
