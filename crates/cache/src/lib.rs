use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Fixed cache slots, one per intermediate pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKey {
    VisualAnalysis,
    Synthesis,
}

impl ArtifactKey {
    /// Every artifact, in the order they are produced.
    pub const ALL: [ArtifactKey; 2] = [ArtifactKey::VisualAnalysis, ArtifactKey::Synthesis];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKey::VisualAnalysis => "visual_analysis",
            ArtifactKey::Synthesis => "synthesis",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directory-backed JSON store. One file per key, overwritten on every write.
///
/// Writes are plain `tokio::fs::write` calls: no locking and no rename-into-place, so a
/// crash mid-write can leave a truncated file behind.
#[derive(Debug, Clone)]
pub struct BlobCache {
    dir: PathBuf,
}

impl BlobCache {
    /// Open the cache, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .context(format!("Failed to create cache directory: {:?}", dir))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, key: ArtifactKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    pub async fn contains(&self, key: ArtifactKey) -> bool {
        fs::metadata(self.path(key))
            .await
            .is_ok_and(|meta| meta.is_file())
    }

    /// Serialize as pretty-printed JSON (UTF-8, non-ASCII kept as-is).
    pub async fn write<T: Serialize + ?Sized>(&self, key: ArtifactKey, document: &T) -> Result<PathBuf> {
        let path = self.path(key);
        let json = serde_json::to_string_pretty(document)
            .context(format!("Failed to serialize {}", key))?;
        fs::write(&path, json)
            .await
            .context(format!("Failed to write cache file: {:?}", path))?;

        debug!(key = %key, path = ?path, "Cache entry written");
        Ok(path)
    }

    /// `Ok(None)` when the entry has never been written.
    pub async fn read(&self, key: ArtifactKey) -> Result<Option<Value>> {
        if !self.contains(key).await {
            return Ok(None);
        }

        let path = self.path(key);
        let json = fs::read_to_string(&path)
            .await
            .context(format!("Failed to read cache file: {:?}", path))?;
        let value = serde_json::from_str(&json)
            .context(format!("Cache file is not valid JSON: {:?}", path))?;

        Ok(Some(value))
    }
}
