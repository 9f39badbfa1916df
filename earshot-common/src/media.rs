//! Media data model
//!
//! Immutable descriptors for everything the player can queue: radio stations,
//! user-entered streams and podcast episodes. Identity is the `id` field, so two
//! values with the same id compare equal even when their other fields differ.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// What kind of source a [`MediaItem`] describes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Broadcast radio station (live)
    #[default]
    Station,
    /// User-supplied stream URL
    Stream,
    /// Podcast episode (finite)
    Episode,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Station => write!(f, "station"),
            MediaKind::Stream => write!(f, "stream"),
            MediaKind::Episode => write!(f, "episode"),
        }
    }
}

/// A playable media descriptor
///
/// Never mutated in place: the `with_*` methods return a new value that keeps the
/// same id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub url: String,
    #[serde(default)]
    pub is_live: bool,
    #[serde(default)]
    pub kind: MediaKind,
}

impl MediaItem {
    /// Create a live station descriptor with an empty description
    pub fn station(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            image_url: None,
            url: url.into(),
            is_live: true,
            kind: MediaKind::Station,
        }
    }

    /// Create a user-supplied live stream descriptor
    pub fn stream(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Stream,
            ..Self::station(id, title, url)
        }
    }

    /// Create a finite episode descriptor
    pub fn episode(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            image_url: None,
            url: url.into(),
            is_live: false,
            kind: MediaKind::Episode,
        }
    }

    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn with_live(mut self, is_live: bool) -> Self {
        self.is_live = is_live;
        self
    }
}

impl PartialEq for MediaItem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MediaItem {}

impl Hash for MediaItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Podcast show with its episodes
///
/// Produced by the (external) feed fetcher and persisted as one JSON file per show.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Podcast {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub feed_url: String,
    #[serde(default)]
    pub episodes: Vec<MediaItem>,
}

/// The item a playback state refers to, plus any live metadata override
///
/// Stations publish the current track title out of band; the engine places it in
/// `live_description` without touching the underlying `item`, so the persisted
/// record stays the catalogue entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowPlaying {
    pub item: MediaItem,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_description: Option<String>,
}

impl NowPlaying {
    pub fn new(item: MediaItem) -> Self {
        Self {
            item,
            live_description: None,
        }
    }

    /// Description to display: the live override when present
    pub fn description(&self) -> &str {
        self.live_description
            .as_deref()
            .unwrap_or(&self.item.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_by_id() {
        let a = MediaItem::station("abc", "Triple J", "https://example.com/jjj.aac");
        let b = a.clone().with_description("Live from Sydney");
        assert_eq!(a, b);

        let c = MediaItem::station("xyz", "Triple J", "https://example.com/jjj.aac");
        assert_ne!(a, c);
    }

    #[test]
    fn test_deserialize_minimal_record() {
        let item: MediaItem =
            serde_json::from_str(r#"{"id":"abc","title":"Triple J","url":"https://x/y"}"#).unwrap();
        assert_eq!(item.id, "abc");
        assert_eq!(item.description, "");
        assert!(!item.is_live);
        assert_eq!(item.kind, MediaKind::Station);
    }

    #[test]
    fn test_now_playing_prefers_live_description() {
        let item = MediaItem::station("abc", "Triple J", "https://x/y").with_description("Radio");
        let mut now = NowPlaying::new(item);
        assert_eq!(now.description(), "Radio");

        now.live_description = Some("Artist - Track".to_string());
        assert_eq!(now.description(), "Artist - Track");
        assert_eq!(now.item.description, "Radio");
    }
}
