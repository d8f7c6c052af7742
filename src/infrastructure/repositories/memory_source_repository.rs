use super::checkpoint_repository::{CheckpointRepository, SourceCatalog};
use crate::domain::feed::Source;
use crate::error::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Process-local store used when no database is configured. Checkpoints do
/// not survive a restart.
#[derive(Default)]
pub struct InMemorySourceRepository {
    sources: RwLock<BTreeMap<String, Source>>,
}

impl InMemorySourceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sources(sources: impl IntoIterator<Item = Source>) -> Self {
        let repo = Self::new();
        {
            let mut map = repo.sources.write();
            for source in sources {
                map.insert(source.id.clone(), source);
            }
        }
        repo
    }
}

#[async_trait]
impl CheckpointRepository for InMemorySourceRepository {
    async fn get_last_checked(&self, source_id: &str) -> AppResult<Option<DateTime<Utc>>> {
        Ok(self
            .sources
            .read()
            .get(source_id)
            .and_then(|s| s.last_checked_at))
    }

    async fn set_last_checked(&self, source_id: &str, at: DateTime<Utc>) -> AppResult<()> {
        let mut sources = self.sources.write();
        let source = sources
            .entry(source_id.to_string())
            .or_insert_with(|| Source::new(source_id, None));
        // never move backwards
        source.last_checked_at = Some(source.last_checked_at.map_or(at, |prev| prev.max(at)));
        Ok(())
    }
}

#[async_trait]
impl SourceCatalog for InMemorySourceRepository {
    async fn list_sources(&self) -> AppResult<Vec<Source>> {
        Ok(self.sources.read().values().cloned().collect())
    }

    async fn upsert_source(&self, source: &Source) -> AppResult<()> {
        let mut sources = self.sources.write();
        match sources.get_mut(&source.id) {
            Some(existing) => {
                if source.title.is_some() {
                    existing.title = source.title.clone();
                }
            }
            None => {
                sources.insert(source.id.clone(), source.clone());
            }
        }
        Ok(())
    }
}
