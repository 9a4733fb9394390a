//! Durable progress for a harvest run.
//!
//! A checkpoint is the full accumulator written under
//! `checkpoint_{output file name}` next to the final output. Both files are
//! written through a temp file and a rename, so a reader never observes a
//! truncated array.

use harvest_core::{output_file_name, CollectedItem, CoreError};
use serde::Serialize;
use std::io::ErrorKind;
use tokio::io::AsyncWriteExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[cfg(test)]
mod tests;

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn checkpoint_path(&self, subreddit: &str) -> PathBuf {
        self.dir
            .join(format!("checkpoint_{}", output_file_name(subreddit)))
    }

    /// Previously saved items, or an empty list when there is no usable checkpoint.
    pub async fn load(&self, subreddit: &str) -> Vec<CollectedItem> {
        let path = self.checkpoint_path(subreddit);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No checkpoint at {}", path.display());
                return Vec::new();
            }
            Err(e) => {
                warn!(
                    "Failed to read checkpoint {}: {}, starting fresh",
                    path.display(),
                    e
                );
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<CollectedItem>>(&raw) {
            Ok(items) => {
                info!("Loaded checkpoint with {} posts", items.len());
                items
            }
            Err(e) => {
                warn!(
                    "Failed to load checkpoint {}: {}, starting fresh",
                    path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Overwrite the checkpoint with the whole accumulator.
    pub async fn save(&self, subreddit: &str, items: &[CollectedItem]) -> Result<(), CoreError> {
        let path = self.checkpoint_path(subreddit);
        write_json_atomic(&path, items).await?;
        info!(
            "Checkpoint saved to {} ({} posts)",
            path.display(),
            items.len()
        );
        Ok(())
    }

    pub async fn clear(&self, subreddit: &str) -> Result<(), CoreError> {
        let path = self.checkpoint_path(subreddit);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed checkpoint {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write the final output array.
pub async fn write_output(path: &Path, items: &[CollectedItem]) -> Result<(), CoreError> {
    write_json_atomic(path, items).await?;
    info!("Saved {} posts to {}", items.len(), path.display());
    Ok(())
}

/// Pretty-printed JSON written to a synced temp file, then renamed over `path`.
pub async fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    data: &T,
) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let json = serde_json::to_string_pretty(data)?;
    let temp_path = path.with_extension("json.tmp");

    let mut file = tokio::fs::File::create(&temp_path).await?;
    file.write_all(json.as_bytes()).await?;
    file.sync_all().await?;
    drop(file);

    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        if let Err(cleanup) = tokio::fs::remove_file(&temp_path).await {
            warn!(
                "Failed to remove temp file {}: {}",
                temp_path.display(),
                cleanup
            );
        }
        return Err(e.into());
    }

    debug!("Wrote {}", path.display());
    Ok(())
}
