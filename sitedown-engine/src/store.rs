use crate::error::{MirrorError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// What `save` did with the bytes it was handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Written(u64),
    AlreadyPresent,
}

/// Filesystem persistence for mirrored resources.
///
/// A path counts as present once it holds a non-empty regular file; such a
/// file is never overwritten, which keeps repeated runs idempotent.
#[derive(Debug, Clone, Default)]
pub struct ResourceStore;

impl ResourceStore {
    pub fn new() -> Self {
        Self
    }

    pub async fn exists(&self, path: &Path) -> bool {
        match fs::metadata(path).await {
            Ok(meta) => meta.is_file() && meta.len() > 0,
            Err(_) => false,
        }
    }

    pub async fn save(&self, path: &Path, bytes: &[u8]) -> Result<SaveOutcome> {
        if self.exists(path).await {
            debug!(path = %path.display(), "already present, not overwriting");
            return Ok(SaveOutcome::AlreadyPresent);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| MirrorError::store(parent, e))?;
        }

        // Write beside the target and rename so an interrupted run never
        // leaves a truncated file that would later count as present.
        let partial = partial_path(path);
        fs::write(&partial, bytes)
            .await
            .map_err(|e| MirrorError::store(&partial, e))?;
        fs::rename(&partial, path)
            .await
            .map_err(|e| MirrorError::store(path, e))?;

        Ok(SaveOutcome::Written(bytes.len() as u64))
    }

    pub async fn load(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).await.map_err(|e| MirrorError::store(path, e))
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}
