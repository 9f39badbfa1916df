//! # Earshot Common Library
//!
//! Shared code for the earshot crates:
//! - Error type and configuration loading
//! - Media data model (stations, streams, episodes, podcasts)
//! - Playback state and the latest-value event publisher

pub mod config;
pub mod error;
pub mod events;
pub mod media;

pub use error::{Error, Result};
pub use events::{PlaybackError, PlaybackState, Publisher};
pub use media::{MediaItem, MediaKind, NowPlaying, Podcast};
