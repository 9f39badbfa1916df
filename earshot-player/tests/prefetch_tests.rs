//! Asset prefetch queue tests
//!
//! Readiness order, failure eviction and cancellation races.

mod helpers;

use earshot_common::events::Subscription;
use earshot_player::{AssetQueue, LoadError, ReadyAsset};
use helpers::{episode, station, Outcome, ScriptedLoader, WAIT};
use std::time::Duration;
use tokio::time::timeout;

/// Next ready item id, skipping the initial empty value
async fn next_ready(ready: &mut Subscription<Option<ReadyAsset>>) -> String {
    timeout(WAIT, async {
        loop {
            match ready.recv().await {
                Some(Some(asset)) => return asset.asset.item.id.clone(),
                Some(None) => continue,
                None => panic!("queue dropped"),
            }
        }
    })
    .await
    .expect("timed out waiting for ready asset")
}

/// Ready ids that arrive within a short quiet period
async fn drain_ready(ready: &mut Subscription<Option<ReadyAsset>>) -> Vec<String> {
    let mut ids = Vec::new();
    while let Ok(Some(value)) = timeout(Duration::from_millis(100), ready.recv()).await {
        if let Some(asset) = value {
            ids.push(asset.asset.item.id.clone());
        }
    }
    ids
}

#[tokio::test]
async fn test_failed_head_is_skipped_in_order() {
    let loader = ScriptedLoader::new();
    let (a, b, c) = (station("a"), station("b"), station("c"));
    loader.script(&a.url, Outcome::Fail);

    let queue = AssetQueue::new(loader.clone());
    let mut ready = queue.subscribe_ready();
    let mut failures = queue.subscribe_failures();

    queue.add(vec![a.clone(), b, c]);

    assert_eq!(next_ready(&mut ready).await, "b");
    assert_eq!(next_ready(&mut ready).await, "c");
    assert!(drain_ready(&mut ready).await.is_empty());

    let failure = failures.recv().await.flatten().expect("failure reported");
    assert_eq!(failure.item.id, "a");
    assert!(matches!(failure.error, LoadError::Network { .. }));

    // Loads ran one at a time, in submission order
    assert_eq!(
        loader.started(),
        vec!["https://radio.test/a", "https://radio.test/b", "https://radio.test/c"]
    );
}

#[tokio::test]
async fn test_not_playable_head_promotes_next_exactly_once() {
    let loader = ScriptedLoader::new();
    let (a, b) = (station("a"), station("b"));
    loader.script(&a.url, Outcome::NotPlayable);

    let queue = AssetQueue::new(loader);
    let mut ready = queue.subscribe_ready();

    queue.add(vec![a, b]);

    assert_eq!(drain_ready(&mut ready).await, vec!["b".to_string()]);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_removed_in_flight_load_never_becomes_ready() {
    let loader = ScriptedLoader::new();
    let (a, b) = (episode("a"), episode("b"));
    loader.gate(&a.url);

    let queue = AssetQueue::new(loader.clone());
    let mut ready = queue.subscribe_ready();

    queue.add(vec![a.clone(), b]);
    loader.wait_started(&a.url).await;

    assert_eq!(queue.remove(Some(&[a.clone()])), 1);
    loader.release(&a.url);

    assert_eq!(drain_ready(&mut ready).await, vec!["b".to_string()]);
    assert!(queue.latest_ready().is_some_and(|r| r.asset.item.id == "b"));
}

#[tokio::test]
async fn test_removing_queued_entry_keeps_head_loading() {
    let loader = ScriptedLoader::new();
    let (a, b, c) = (station("a"), station("b"), station("c"));
    loader.gate(&a.url);

    let queue = AssetQueue::new(loader.clone());
    let mut ready = queue.subscribe_ready();

    queue.add(vec![a.clone(), b.clone(), c]);
    loader.wait_started(&a.url).await;

    queue.remove(Some(&[b]));
    let pending: Vec<_> = queue.pending().iter().map(|i| i.id.clone()).collect();
    assert_eq!(pending, vec!["a", "c"]);

    loader.release(&a.url);
    assert_eq!(drain_ready(&mut ready).await, vec!["a".to_string(), "c".to_string()]);
    // The head load was not restarted
    assert_eq!(loader.started().iter().filter(|u| **u == a.url).count(), 1);
}

#[tokio::test]
async fn test_remove_matches_descriptor_identity() {
    let loader = ScriptedLoader::new();
    let first = station("same");
    let twin = station("same");
    loader.gate(&first.url);

    let queue = AssetQueue::new(loader.clone());
    queue.add(vec![first.clone(), twin.clone()]);
    loader.wait_started(&first.url).await;

    // Same id and URL, different descriptor: only the twin goes
    assert_eq!(queue.remove(Some(&[twin])), 1);
    assert_eq!(queue.len(), 1);
    assert!(std::sync::Arc::ptr_eq(&queue.head().unwrap(), &first));
}

#[tokio::test]
async fn test_remove_all_cancels_everything() {
    let loader = ScriptedLoader::new();
    let (a, b) = (station("a"), station("b"));
    loader.gate(&a.url);

    let queue = AssetQueue::new(loader.clone());
    let mut ready = queue.subscribe_ready();
    queue.add(vec![a.clone(), b]);
    loader.wait_started(&a.url).await;

    assert_eq!(queue.remove(None), 2);
    loader.release(&a.url);

    assert!(queue.is_empty());
    assert!(drain_ready(&mut ready).await.is_empty());
    assert_eq!(loader.started().len(), 1);
}

#[tokio::test]
async fn test_late_subscriber_sees_latest_ready() {
    let loader = ScriptedLoader::new();
    let queue = AssetQueue::new(loader);
    let mut early = queue.subscribe_ready();

    queue.add(vec![station("a")]);
    assert_eq!(next_ready(&mut early).await, "a");

    let mut late = queue.subscribe_ready();
    assert_eq!(next_ready(&mut late).await, "a");
}
