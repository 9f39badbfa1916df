//! Test helper modules for earshot-player integration tests
//!
//! - MockTransport: in-memory transport that records commands and emits events
//! - ScriptedLoader: asset loader with per-URL outcomes and release gates

#![allow(dead_code)]

pub mod mock_transport;
pub mod scripted_loader;

pub use mock_transport::MockTransport;
pub use scripted_loader::{Outcome, ScriptedLoader};

use earshot_common::events::Subscription;
use earshot_common::{MediaItem, PlaybackState};
use earshot_player::{Player, PlayerConfig, PlayerSnapshot};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound for any single wait in these tests
pub const WAIT: Duration = Duration::from_secs(3);

/// Engine config with a fast tick so `playing` shows up quickly
pub fn test_config() -> PlayerConfig {
    PlayerConfig {
        skip_interval: Duration::from_secs(15),
        tick_interval: Duration::from_millis(20),
    }
}

pub fn station(id: &str) -> Arc<MediaItem> {
    Arc::new(MediaItem::station(
        id,
        format!("Station {}", id),
        format!("https://radio.test/{}", id),
    ))
}

pub fn episode(id: &str) -> Arc<MediaItem> {
    Arc::new(MediaItem::episode(
        id,
        format!("Episode {}", id),
        format!("https://pod.test/{}.mp3", id),
    ))
}

/// Player over a fresh mock transport and scripted loader
pub fn player() -> (Player, Arc<MockTransport>, Arc<ScriptedLoader>) {
    let transport = MockTransport::new();
    let loader = ScriptedLoader::new();
    let player = Player::new(transport.clone(), loader.clone(), test_config());
    (player, transport, loader)
}

/// Receive states until one matches `pred`
pub async fn wait_for_state<F>(states: &mut Subscription<PlaybackState>, pred: F) -> PlaybackState
where
    F: Fn(&PlaybackState) -> bool,
{
    tokio::time::timeout(WAIT, async {
        while let Some(state) = states.recv().await {
            if pred(&state) {
                return state;
            }
        }
        panic!("state publisher closed");
    })
    .await
    .expect("timed out waiting for state")
}

pub fn is_loading(id: &'static str) -> impl Fn(&PlaybackState) -> bool {
    move |state| matches!(state, PlaybackState::Loading { now } if now.item.id == id)
}

pub fn is_playing(id: &'static str) -> impl Fn(&PlaybackState) -> bool {
    move |state| matches!(state, PlaybackState::Playing { now, .. } if now.item.id == id)
}

pub fn is_paused(id: &'static str) -> impl Fn(&PlaybackState) -> bool {
    move |state| matches!(state, PlaybackState::Paused { now } if now.item.id == id)
}

pub fn is_stopped(state: &PlaybackState) -> bool {
    matches!(state, PlaybackState::Stopped { .. })
}

/// Poll engine snapshots until one matches `pred`
pub async fn wait_for_snapshot<F>(player: &Player, pred: F) -> PlayerSnapshot
where
    F: Fn(&PlayerSnapshot) -> bool,
{
    let pred = &pred;
    poll_until(move || async move {
        let snapshot = player.snapshot().await.expect("engine running");
        pred(&snapshot).then_some(snapshot)
    })
    .await
}

/// Retry `check` every few milliseconds until it yields a value
pub async fn poll_until<T, F, Fut>(mut check: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    tokio::time::timeout(WAIT, async {
        loop {
            if let Some(value) = check().await {
                return value;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out polling")
}

pub fn ids(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
