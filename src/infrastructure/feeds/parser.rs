use super::error::FeedClientError;
use crate::domain::feed::{Feed, Item, ItemDetails, MediaInfo};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Parse an RSS 2.0 or Atom document. Element names are matched on their
/// local part, so namespaced extensions (`yt:videoId`, `media:group`) are
/// picked up without namespace resolution.
///
/// Entries lacking both an identifier and a link, or without a parseable
/// publish date, are skipped.
pub fn parse_feed(xml: &str) -> Result<Feed, FeedClientError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut feed = Feed::default();
    let mut path: Vec<String> = Vec::new();
    let mut current: Option<EntryBuilder> = None;
    let mut saw_root = false;
    let mut skipped = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                if is_root(&name) {
                    saw_root = true;
                }
                if is_entry(&name) {
                    current = Some(EntryBuilder::default());
                }
                if let Some(entry) = current.as_mut() {
                    entry.apply_attributes(&name, &e);
                }
                path.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e);
                if let Some(entry) = current.as_mut() {
                    entry.apply_attributes(&name, &e);
                }
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map(|s| s.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                apply_text(&path, &mut current, &mut feed, &text);
            }
            Ok(Event::CData(c)) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                apply_text(&path, &mut current, &mut feed, &text);
            }
            Ok(Event::End(_)) => {
                if let Some(name) = path.pop() {
                    if is_entry(&name) {
                        if let Some(item) = current.take().and_then(EntryBuilder::build) {
                            feed.items.push(item);
                        } else {
                            skipped += 1;
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FeedClientError::Parse(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    if !saw_root {
        return Err(FeedClientError::Parse(
            "document is neither an RSS nor an Atom feed".to_string(),
        ));
    }

    if skipped > 0 {
        tracing::warn!(skipped, "Skipped feed entries without identifier or publish date");
    }

    Ok(feed)
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key.as_bytes())
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

fn is_root(name: &str) -> bool {
    matches!(name, "rss" | "feed")
}

fn is_entry(name: &str) -> bool {
    matches!(name, "item" | "entry")
}

fn apply_text(path: &[String], current: &mut Option<EntryBuilder>, feed: &mut Feed, text: &str) {
    let Some(name) = path.last() else {
        return;
    };
    let parent = path
        .len()
        .checked_sub(2)
        .map(|i| path[i].as_str());

    match current {
        Some(entry) => entry.apply_text(name, parent, text),
        None => {
            if name == "title" && matches!(parent, Some("channel") | Some("feed")) {
                feed.title.push_str(text.trim());
            }
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Debug, Default)]
struct EntryBuilder {
    id: Option<String>,
    video_id: Option<String>,
    title: String,
    link: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    author: String,
    description: String,
    thumbnail_url: Option<String>,
    views: Option<u64>,
}

impl EntryBuilder {
    fn apply_text(&mut self, name: &str, parent: Option<&str>, text: &str) {
        let direct = matches!(parent, Some("item") | Some("entry"));
        let value = text.trim();

        match name {
            "title" if direct => self.title.push_str(value),
            "id" | "guid" if direct => self.id = Some(value.to_string()),
            "videoId" => self.video_id = Some(value.to_string()),
            "link" if direct && self.link.is_none() => self.link = Some(value.to_string()),
            "pubDate" | "published" | "date" => self.published = Some(value.to_string()),
            "updated" => self.updated = Some(value.to_string()),
            "name" if parent == Some("author") => self.author = value.to_string(),
            "author" | "creator" if direct => self.author = value.to_string(),
            "description" | "summary" => {
                if !self.description.is_empty() {
                    self.description.push(' ');
                }
                self.description.push_str(value);
            }
            _ => {}
        }
    }

    fn apply_attributes(&mut self, name: &str, e: &BytesStart<'_>) {
        match name {
            "link" => {
                let rel = attribute(e, "rel");
                if rel.as_deref().map_or(true, |rel| rel == "alternate") {
                    if let Some(href) = attribute(e, "href") {
                        self.link = Some(href);
                    }
                }
            }
            "thumbnail" if self.thumbnail_url.is_none() => {
                self.thumbnail_url = attribute(e, "url");
            }
            "statistics" => {
                self.views = attribute(e, "views").and_then(|v| v.parse().ok());
            }
            _ => {}
        }
    }

    fn build(self) -> Option<Item> {
        let published = self
            .published
            .as_deref()
            .or(self.updated.as_deref())
            .and_then(parse_timestamp)?;
        let id = self
            .video_id
            .or(self.id)
            .or_else(|| self.link.clone())?;

        Some(Item {
            id,
            title: self.title,
            published,
            link: self.link.unwrap_or_default(),
            author: self.author,
            media: MediaInfo {
                description: Some(self.description).filter(|d| !d.is_empty()),
                thumbnail_url: self.thumbnail_url,
                views: self.views,
            },
            details: ItemDetails::default(),
        })
    }
}
