//! Network asset loader
//!
//! Probes a media URL with a GET and inspects the response headers only; the
//! body of a live stream is never read.

use super::asset::{Asset, AssetLoader, LoadError};
use crate::error::Result;
use async_trait::async_trait;
use earshot_common::MediaItem;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;

const USER_AGENT: &str = concat!("earshot/", env!("CARGO_PKG_VERSION"));

/// Content types the transport can decode
const STREAMING_TYPES: &[&str] = &[
    "application/ogg",
    "application/octet-stream",
    "application/vnd.apple.mpegurl",
    "application/x-mpegurl",
    "application/mpegurl",
    "audio/mpegurl",
    "audio/x-mpegurl",
    "video/mp2t",
];

/// Loads assets by probing their URL over HTTP
pub struct HttpAssetLoader {
    http_client: reqwest::Client,
}

impl HttpAssetLoader {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl AssetLoader for HttpAssetLoader {
    async fn load(&self, item: Arc<MediaItem>) -> std::result::Result<Asset, LoadError> {
        let url = Url::parse(&item.url).map_err(|e| LoadError::InvalidUrl {
            url: item.url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(LoadError::InvalidUrl {
                url: item.url.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        tracing::debug!(item = %item.id, url = %url, "Probing asset");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| LoadError::Network {
                url: item.url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::NotPlayable {
                url: item.url.clone(),
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let playable = is_streaming_content_type(&content_type);

        tracing::debug!(
            item = %item.id,
            content_type = %content_type,
            playable,
            "Probed asset"
        );

        // Live streams and most podcast hosts do not expose a duration up front
        Ok(Asset::new(item, None, playable))
    }
}

/// Whether a Content-Type header names a format the transport can decode
pub fn is_streaming_content_type(header: &str) -> bool {
    let mime = header
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.starts_with("audio/") || STREAMING_TYPES.contains(&mime.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_types_are_streaming() {
        assert!(is_streaming_content_type("audio/mpeg"));
        assert!(is_streaming_content_type("audio/aacp; charset=binary"));
        assert!(is_streaming_content_type("Application/vnd.apple.mpegURL"));
        assert!(is_streaming_content_type("application/ogg"));
    }

    #[test]
    fn test_documents_are_not_streaming() {
        assert!(!is_streaming_content_type("text/html; charset=utf-8"));
        assert!(!is_streaming_content_type("application/json"));
        assert!(!is_streaming_content_type(""));
    }

    #[tokio::test]
    async fn test_invalid_url_rejected_without_network() {
        let loader = HttpAssetLoader::new(Duration::from_secs(1)).unwrap();
        let item = Arc::new(MediaItem::station("s", "S", "not a url"));
        let err = loader.load(item).await.unwrap_err();
        assert!(matches!(err, LoadError::InvalidUrl { .. }));

        let item = Arc::new(MediaItem::station("s", "S", "ftp://example.com/a.mp3"));
        let err = loader.load(item).await.unwrap_err();
        assert!(matches!(err, LoadError::InvalidUrl { .. }));
    }
}
