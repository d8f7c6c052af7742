use crate::domain::feed::Item;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// An item as held by the observed-item cache, with the user's flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedItem {
    pub source_id: String,
    pub item: Item,
    pub inserted_at: DateTime<Utc>,
    pub watched: bool,
    pub to_watch: bool,
}

impl CachedItem {
    pub fn new(source_id: impl Into<String>, item: Item, inserted_at: DateTime<Utc>) -> Self {
        Self {
            source_id: source_id.into(),
            item,
            inserted_at,
            watched: false,
            to_watch: false,
        }
    }

    /// Visible while `now - inserted_at <= ttl`. Insertions stamped in the future count as fresh.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match (now - self.inserted_at).to_std() {
            Ok(age) => age <= ttl,
            Err(_) => true,
        }
    }
}
