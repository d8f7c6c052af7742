//! Process-local cache of recently seen items and their per-item user state.

pub mod model;

pub use model::CachedItem;

use crate::domain::feed::Item;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Shared across concurrently running source cycles; every method takes the
/// internal lock for the duration of a single operation only.
pub struct ObservedItemCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedItem>>,
    last_refreshed_at: RwLock<Option<DateTime<Utc>>>,
}

impl ObservedItemCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            last_refreshed_at: RwLock::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Insert or refresh an item.
    ///
    /// On refresh the primary metadata is replaced, secondary details are
    /// merged field-wise (a bare re-fetch does not wipe earlier enrichment),
    /// the insertion time is reset and `watched`/`to_watch` are kept.
    pub fn upsert(&self, source_id: &str, item: Item) {
        self.upsert_at(source_id, item, Utc::now());
    }

    pub fn upsert_at(&self, source_id: &str, item: Item, now: DateTime<Utc>) {
        let mut entries = self.entries.write();
        match entries.entry(item.id.clone()) {
            Entry::Occupied(mut occupied) => {
                let existing = occupied.get_mut();
                let mut item = item;
                let mut details = std::mem::take(&mut existing.item.details);
                details.merge(std::mem::take(&mut item.details));
                item.details = details;

                existing.item = item;
                existing.source_id = source_id.to_string();
                existing.inserted_at = now;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CachedItem::new(source_id, item, now));
            }
        }
    }

    /// Every record still within the TTL. Order is unspecified.
    pub fn get_all(&self) -> Vec<CachedItem> {
        self.get_all_at(Utc::now())
    }

    pub fn get_all_at(&self, now: DateTime<Utc>) -> Vec<CachedItem> {
        self.entries
            .read()
            .values()
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .cloned()
            .collect()
    }

    /// Like [`Self::get_all`], newest published first.
    pub fn get_all_sorted(&self) -> Vec<CachedItem> {
        let mut items = self.get_all();
        items.sort_by(|a, b| b.item.published.cmp(&a.item.published));
        items
    }

    pub fn get(&self, id: &str) -> Option<CachedItem> {
        let now = Utc::now();
        self.entries
            .read()
            .get(id)
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .cloned()
    }

    /// Returns whether the identifier is currently visible. Unknown or
    /// expired identifiers are a no-op.
    pub fn set_watched(&self, id: &str) -> bool {
        self.update_flags(id, |entry| entry.watched = true)
    }

    pub fn set_to_watch(&self, id: &str) -> bool {
        self.update_flags(id, |entry| entry.to_watch = true)
    }

    pub fn unset_to_watch(&self, id: &str) -> bool {
        self.update_flags(id, |entry| entry.to_watch = false)
    }

    fn update_flags(&self, id: &str, apply: impl FnOnce(&mut CachedItem)) -> bool {
        let now = Utc::now();
        match self
            .entries
            .write()
            .get_mut(id)
            .filter(|entry| entry.is_fresh(now, self.ttl))
        {
            Some(entry) => {
                apply(entry);
                true
            }
            None => {
                tracing::debug!(item_id = %id, "Flag update for unknown or expired item ignored");
                false
            }
        }
    }

    /// Record the end of a refresh wave.
    pub fn mark_refreshed(&self) {
        self.mark_refreshed_at(Utc::now());
    }

    pub fn mark_refreshed_at(&self, at: DateTime<Utc>) {
        *self.last_refreshed_at.write() = Some(at);
    }

    pub fn last_refreshed_at(&self) -> Option<DateTime<Utc>> {
        *self.last_refreshed_at.read()
    }

    /// Physically drop expired records. Reads already hide them.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now, self.ttl));
        before - entries.len()
    }

    /// Physical size, including expired records not yet purged.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for ObservedItemCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
