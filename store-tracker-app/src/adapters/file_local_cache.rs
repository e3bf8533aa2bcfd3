//! File-backed local cache.
//!
//! Keeps `backup.json` (last successful snapshot) and `metrics.json`
//! (operation history) in one directory. Writes go to a temp file that is
//! then renamed over the target, so a crash never leaves a half-written file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use store_tracker_core::error::{CoreError, CoreResult};
use store_tracker_core::traits::LocalCache;
use store_tracker_core::types::{BackupSnapshot, HistoryEntry};

const BACKUP_FILE: &str = "backup.json";
const METRICS_FILE: &str = "metrics.json";

pub struct FileLocalCache {
    dir: PathBuf,
}

impl FileLocalCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_json<T: DeserializeOwned>(&self, name: &str) -> CoreResult<Option<T>> {
        let path = self.dir.join(name);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CoreError::StorageError(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| CoreError::SerializationError(format!("{}: {e}", path.display())))
    }

    async fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> CoreResult<()> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| CoreError::SerializationError(e.to_string()))?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CoreError::StorageError(format!("failed to create cache dir: {e}")))?;

        let target = self.dir.join(name);
        let tmp = self.dir.join(format!("{name}.tmp"));
        tokio::fs::write(&tmp, json.as_bytes())
            .await
            .map_err(|e| CoreError::StorageError(format!("failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &target).await.map_err(|e| {
            CoreError::StorageError(format!("failed to replace {}: {e}", target.display()))
        })?;

        log::debug!("Cache file written: {}", target.display());
        Ok(())
    }
}

#[async_trait]
impl LocalCache for FileLocalCache {
    async fn load_snapshot(&self) -> CoreResult<Option<BackupSnapshot>> {
        self.read_json(BACKUP_FILE).await
    }

    async fn save_snapshot(&self, snapshot: &BackupSnapshot) -> CoreResult<()> {
        self.write_json(BACKUP_FILE, snapshot).await
    }

    async fn load_metrics(&self) -> CoreResult<Vec<HistoryEntry>> {
        Ok(self.read_json(METRICS_FILE).await?.unwrap_or_default())
    }

    async fn save_metrics(&self, history: &[HistoryEntry]) -> CoreResult<()> {
        self.write_json(METRICS_FILE, history).await
    }
}
