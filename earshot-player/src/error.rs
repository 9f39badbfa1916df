//! Error types for earshot-player
//!
//! Commands on [`Player`](crate::Player) never return these; playback outcomes are
//! observed through the state stream. They surface from queries, statistics and
//! library operations.

use thiserror::Error;

/// Main error type for earshot-player
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration or bootstrap errors
    #[error(transparent)]
    Common(#[from] earshot_common::Error),

    /// Filesystem engine errors
    #[error(transparent)]
    Fs(#[from] earshot_fs::FsError),

    /// HTTP client construction errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// The playback engine task is no longer running
    #[error("Playback engine stopped")]
    EngineStopped,

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience Result type using earshot-player Error
pub type Result<T> = std::result::Result<T, Error>;
