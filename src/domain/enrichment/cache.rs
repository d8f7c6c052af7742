use super::error::EnrichmentError;
use crate::domain::feed::ItemDetails;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::RwLock;

const MEMORY_CAPACITY: u64 = 1_000;
const MEMORY_TIME_TO_IDLE: Duration = Duration::from_secs(30 * 60);
const ENTRY_EXTENSION: &str = "json";

/// On-disk envelope. The identifier is stored alongside the payload so a
/// mismatching file is treated as a miss.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    id: String,
    cached_at: DateTime<Utc>,
    details: ItemDetails,
}

/// Content-addressed, file-backed memoization of enrichment payloads.
///
/// Files are named `<sha256(id) as lowercase hex>.json` inside the cache
/// directory. The same hash gives the same file across runs. A bounded
/// in-memory layer sits in front of the files.
pub struct EnrichmentCache {
    dir: Option<PathBuf>,
    memory: Option<Cache<String, ItemDetails>>,
    lock: RwLock<()>,
}

impl EnrichmentCache {
    pub fn new(dir: impl Into<PathBuf>, enabled: bool) -> Self {
        if !enabled {
            return Self::disabled();
        }

        let memory = Cache::builder()
            .max_capacity(MEMORY_CAPACITY)
            .time_to_idle(MEMORY_TIME_TO_IDLE)
            .build();

        Self {
            dir: Some(dir.into()),
            memory: Some(memory),
            lock: RwLock::new(()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            dir: None,
            memory: None,
            lock: RwLock::new(()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    pub fn key_for(id: &str) -> String {
        format!("{:x}", Sha256::digest(id.as_bytes()))
    }

    fn path_for(dir: &Path, id: &str) -> PathBuf {
        dir.join(format!("{}.{}", Self::key_for(id), ENTRY_EXTENSION))
    }

    /// `None` on miss, when disabled, or when the stored file is unreadable.
    pub async fn get(&self, id: &str) -> Option<ItemDetails> {
        let dir = self.dir.as_ref()?;

        if let Some(memory) = &self.memory {
            if let Some(details) = memory.get(id).await {
                return Some(details);
            }
        }

        let path = Self::path_for(dir, id);
        // held until the memory insert so a concurrent clear cannot be undone
        let _guard = self.lock.read().await;
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(item_id = %id, path = %path.display(), error = %e, "Enrichment cache read failed");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(item_id = %id, path = %path.display(), error = %e, "Corrupted enrichment cache entry, treating as miss");
                return None;
            }
        };

        if entry.id != id {
            tracing::warn!(item_id = %id, stored_id = %entry.id, "Enrichment cache key collision, treating as miss");
            return None;
        }

        if let Some(memory) = &self.memory {
            memory.insert(id.to_string(), entry.details.clone()).await;
        }

        tracing::debug!(item_id = %id, "Enrichment cache hit");
        Some(entry.details)
    }

    /// No-op when disabled.
    pub async fn put(&self, id: &str, details: &ItemDetails) -> Result<(), EnrichmentError> {
        let Some(dir) = self.dir.as_ref() else {
            return Ok(());
        };

        let entry = CacheEntry {
            id: id.to_string(),
            cached_at: Utc::now(),
            details: details.clone(),
        };
        let encoded = serde_json::to_vec(&entry)?;
        let path = Self::path_for(dir, id);
        let tmp_path = path.with_extension(format!("{}.tmp", ENTRY_EXTENSION));

        let _guard = self.lock.write().await;
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&tmp_path, &encoded).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        if let Some(memory) = &self.memory {
            memory.insert(id.to_string(), details.clone()).await;
        }

        Ok(())
    }

    /// Remove every cached payload. Returns the number of files deleted.
    pub async fn clear(&self) -> Result<usize, EnrichmentError> {
        let Some(dir) = self.dir.as_ref() else {
            return Ok(0);
        };

        let _guard = self.lock.write().await;
        if let Some(memory) = &self.memory {
            memory.invalidate_all();
        }

        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(ENTRY_EXTENSION) {
                tokio::fs::remove_file(&path).await?;
                removed += 1;
            }
        }

        tracing::info!(dir = %dir.display(), removed, "Enrichment cache cleared");
        Ok(removed)
    }
}
