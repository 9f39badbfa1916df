//! Transport seam
//!
//! The transport is the platform's media player: it decodes and outputs audio for
//! a queue of ready assets. The engine drives it through [`Transport`] and reacts
//! to the [`TransportEvent`]s it broadcasts.

use super::asset::Asset;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Out-of-band signals from the transport and the audio session
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The current item can start producing audio
    ReadyToPlay,
    /// Playback stalled waiting for data
    Buffering,
    /// The head of the transport queue changed (advanced, removed, cleared)
    CurrentItemChanged,
    /// The item failed to decode or play
    ItemFailed { item_id: String, message: String },
    /// Another process took the audio session
    InterruptionBegan,
    /// The audio session came back
    InterruptionEnded { should_resume: bool },
    /// Live metadata for an item, e.g. a station's current track title
    Metadata { item_id: String, description: String },
}

/// Platform media player driven by the engine
///
/// `items()[0]` is the current item; the rest are ready items queued behind it.
pub trait Transport: Send + Sync + 'static {
    fn play(&self);

    fn pause(&self);

    /// Playback rate; > 0 while audio is flowing
    fn rate(&self) -> f32;

    fn position(&self) -> Duration;

    /// Duration of the current item, None for live streams
    fn duration(&self) -> Option<Duration>;

    fn seek(&self, to: Duration);

    fn items(&self) -> Vec<Arc<Asset>>;

    fn current(&self) -> Option<Arc<Asset>> {
        self.items().into_iter().next()
    }

    /// Insert `asset` after `after`, or at the front when `after` is None
    fn insert(&self, asset: Arc<Asset>, after: Option<&Arc<Asset>>);

    fn remove(&self, asset: &Arc<Asset>);

    fn remove_all(&self);

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent>;
}
