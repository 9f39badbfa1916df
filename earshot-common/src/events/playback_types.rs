//! Playback state definitions
//!
//! Exactly one `PlaybackState` value is current per player. It is only ever set by
//! the playback engine's internal observers, never directly by callers.

use crate::media::{MediaItem, NowPlaying};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Why playback ended up stopped
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlaybackError {
    /// The asset could not be loaded as playable media
    #[error("Could not play {url}. Check the URL is a valid streaming format.")]
    Unplayable { url: String },

    /// The transport reported a failure for the current item
    #[error("Playback failed: {message}")]
    Transport { message: String },
}

/// Playback state machine value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PlaybackState {
    /// Nothing has been played since startup
    #[default]
    Initial,
    /// Stopped, optionally because of an error
    Stopped { error: Option<PlaybackError> },
    /// Committed to an item that is not yet producing audio
    Loading { now: NowPlaying },
    /// Audio is flowing
    Playing {
        now: NowPlaying,
        /// None for live streams
        duration: Option<Duration>,
        position: Duration,
        rate: f32,
    },
    /// Paused by an explicit command or an interruption
    Paused { now: NowPlaying },
}

impl PlaybackState {
    pub fn stopped() -> Self {
        PlaybackState::Stopped { error: None }
    }

    pub fn loading(now: NowPlaying) -> Self {
        PlaybackState::Loading { now }
    }

    pub fn paused(now: NowPlaying) -> Self {
        PlaybackState::Paused { now }
    }

    /// The item this state refers to, if any
    pub fn now_playing(&self) -> Option<&NowPlaying> {
        match self {
            PlaybackState::Loading { now }
            | PlaybackState::Playing { now, .. }
            | PlaybackState::Paused { now } => Some(now),
            PlaybackState::Initial | PlaybackState::Stopped { .. } => None,
        }
    }

    pub fn item(&self) -> Option<&MediaItem> {
        self.now_playing().map(|now| &now.item)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing { rate, .. } if *rate > 0.0)
    }

    pub fn error(&self) -> Option<&PlaybackError> {
        match self {
            PlaybackState::Stopped { error } => error.as_ref(),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Initial => write!(f, "initial"),
            PlaybackState::Stopped { error: None } => write!(f, "stopped"),
            PlaybackState::Stopped { error: Some(e) } => write!(f, "stopped ({})", e),
            PlaybackState::Loading { now } => write!(f, "loading {}", now.item.id),
            PlaybackState::Playing {
                now, position, ..
            } => write!(f, "playing {} @ {:.1}s", now.item.id, position.as_secs_f64()),
            PlaybackState::Paused { now } => write!(f, "paused {}", now.item.id),
        }
    }
}
