//! Common error types for earshot

use thiserror::Error;

/// Common result type for earshot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across earshot crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
