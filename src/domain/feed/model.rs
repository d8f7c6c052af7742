use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A tracked feed. `last_checked_at` is the novelty checkpoint; `None` means never checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Source {
    pub id: String,
    pub title: Option<String>,
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl Source {
    pub fn new(id: impl Into<String>, title: Option<String>) -> Self {
        Self {
            id: id.into(),
            title,
            last_checked_at: None,
        }
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

/// One entry of a source's feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Globally unique across sources
    pub id: String,
    pub title: String,
    pub published: DateTime<Utc>,
    pub link: String,
    pub author: String,
    #[serde(default)]
    pub media: MediaInfo,
    #[serde(default)]
    pub details: ItemDetails,
}

/// Primary media metadata, delivered with the feed itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
}

/// Secondary metadata filled in by enrichment. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub top_comments: Vec<Comment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitles_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub text: String,
    #[serde(default)]
    pub likes: u64,
}

impl ItemDetails {
    pub fn is_empty(&self) -> bool {
        self.duration_secs.is_none()
            && self.tags.is_empty()
            && self.top_comments.is_empty()
            && self.subtitles_url.is_none()
            && self.summary.is_none()
    }

    /// Field-wise merge: whatever `other` carries wins, absent fields keep their current value.
    pub fn merge(&mut self, other: ItemDetails) {
        if other.duration_secs.is_some() {
            self.duration_secs = other.duration_secs;
        }
        if !other.tags.is_empty() {
            self.tags = other.tags;
        }
        if !other.top_comments.is_empty() {
            self.top_comments = other.top_comments;
        }
        if other.subtitles_url.is_some() {
            self.subtitles_url = other.subtitles_url;
        }
        if other.summary.is_some() {
            self.summary = other.summary;
        }
    }
}

/// A fetched feed: display title plus items in feed order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub title: String,
    pub items: Vec<Item>,
}
