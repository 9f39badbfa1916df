//! Assets and the loader seam
//!
//! Loading resolves a media descriptor's URL into playability metadata. The
//! loader is an external collaborator; [`HttpAssetLoader`](super::HttpAssetLoader)
//! is the network implementation.

use async_trait::async_trait;
use earshot_common::MediaItem;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// A media item whose playability metadata has been loaded
#[derive(Debug, Clone)]
pub struct Asset {
    /// The descriptor this asset was loaded for (same allocation as submitted)
    pub item: Arc<MediaItem>,
    /// None for live streams or when unknown
    pub duration: Option<Duration>,
    /// Whether the transport can play it
    pub playable: bool,
}

impl Asset {
    pub fn new(item: Arc<MediaItem>, duration: Option<Duration>, playable: bool) -> Self {
        Self {
            item,
            duration,
            playable,
        }
    }
}

/// Why an asset could not be loaded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Network error for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Not playable {url}: {reason}")]
    NotPlayable { url: String, reason: String },
}

/// Resolves a descriptor into an [`Asset`]
#[async_trait]
pub trait AssetLoader: Send + Sync + 'static {
    async fn load(&self, item: Arc<MediaItem>) -> Result<Asset, LoadError>;
}
