//! Asset prefetch queue
//!
//! Turns an ordered backlog of media descriptors into ready assets without
//! blocking the caller. Only the head of the backlog loads at any time; when it
//! finishes (ready or failed) it is dropped and the next entry starts, so
//! readiness is always reported in submission order.
//!
//! Entries move `queued -> loading -> ready | failed | cancelled`. A load that
//! completes after its entry left the head of the backlog is discarded.

use super::asset::{Asset, AssetLoader, LoadError};
use earshot_common::events::{Publisher, Subscription};
use earshot_common::MediaItem;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// An asset that finished loading and is safe to hand to the transport
#[derive(Debug, Clone)]
pub struct ReadyAsset {
    /// Backlog entry that produced it
    pub entry: Uuid,
    pub asset: Arc<Asset>,
}

impl PartialEq for ReadyAsset {
    fn eq(&self, other: &Self) -> bool {
        self.entry == other.entry
    }
}

/// Diagnostic for an entry evicted because its load failed
#[derive(Debug, Clone)]
pub struct LoadFailure {
    pub entry: Uuid,
    pub item: Arc<MediaItem>,
    pub error: LoadError,
}

impl PartialEq for LoadFailure {
    fn eq(&self, other: &Self) -> bool {
        self.entry == other.entry
    }
}

/// Sequential background loader
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct AssetQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    loader: Arc<dyn AssetLoader>,
    backlog: Mutex<Backlog>,
    ready: Publisher<Option<ReadyAsset>>,
    failures: Publisher<Option<LoadFailure>>,
}

#[derive(Default)]
struct Backlog {
    entries: VecDeque<Entry>,
    /// Load task for the head entry
    loading: Option<(Uuid, JoinHandle<()>)>,
}

struct Entry {
    id: Uuid,
    item: Arc<MediaItem>,
}

impl AssetQueue {
    pub fn new(loader: Arc<dyn AssetLoader>) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                loader,
                backlog: Mutex::new(Backlog::default()),
                ready: Publisher::new(None),
                failures: Publisher::new(None),
            }),
        }
    }

    /// Append to the backlog; loading starts immediately if it was empty
    ///
    /// Returns the entry id assigned to each item, in order. Ready and failure
    /// notifications carry these ids. Must be called from within a tokio runtime.
    pub fn add(&self, items: Vec<Arc<MediaItem>>) -> Vec<Uuid> {
        if items.is_empty() {
            return Vec::new();
        }
        let mut backlog = self.inner.lock();
        let was_empty = backlog.entries.is_empty();
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let id = Uuid::new_v4();
            debug!(entry = %id, item = %item.id, "Queued for prefetch");
            backlog.entries.push_back(Entry { id, item });
            ids.push(id);
        }
        if was_empty {
            QueueInner::start_head(&self.inner, &mut backlog);
        }
        ids
    }

    /// Cancel and evict entries
    ///
    /// `Some(items)` matches by descriptor identity (the same `Arc`), not value
    /// equality, since two descriptors may share a URL or id. `None` evicts
    /// everything. Returns the number of entries evicted.
    pub fn remove(&self, items: Option<&[Arc<MediaItem>]>) -> usize {
        let mut backlog = self.inner.lock();
        let before = backlog.entries.len();
        let head_before = backlog.entries.front().map(|e| e.id);

        match items {
            None => backlog.entries.clear(),
            Some(items) => backlog
                .entries
                .retain(|entry| !items.iter().any(|item| Arc::ptr_eq(item, &entry.item))),
        }

        let head_after = backlog.entries.front().map(|e| e.id);
        if head_after != head_before {
            if let Some((id, task)) = backlog.loading.take() {
                debug!(entry = %id, "Cancelling in-flight load");
                task.abort();
            }
            QueueInner::start_head(&self.inner, &mut backlog);
        }
        before - backlog.entries.len()
    }

    /// Descriptors not yet ready, head first
    pub fn pending(&self) -> Vec<Arc<MediaItem>> {
        self.inner
            .lock()
            .entries
            .iter()
            .map(|e| Arc::clone(&e.item))
            .collect()
    }

    /// Descriptor currently loading
    pub fn head(&self) -> Option<Arc<MediaItem>> {
        self.inner.lock().entries.front().map(|e| Arc::clone(&e.item))
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Most recent ready asset; retained for late subscribers
    pub fn latest_ready(&self) -> Option<ReadyAsset> {
        self.inner.ready.latest()
    }

    /// Readiness notifications, latest value first
    ///
    /// Each `Some` is a distinct readiness event and should be consumed once.
    pub fn subscribe_ready(&self) -> Subscription<Option<ReadyAsset>> {
        self.inner.ready.subscribe()
    }

    /// Load failure diagnostics, future ones only
    pub fn subscribe_failures(&self) -> Subscription<Option<LoadFailure>> {
        self.inner.failures.subscribe_changes()
    }
}

impl QueueInner {
    fn lock(&self) -> std::sync::MutexGuard<'_, Backlog> {
        self.backlog.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn the load for the backlog head, if any
    fn start_head(this: &Arc<Self>, backlog: &mut Backlog) {
        let Some(head) = backlog.entries.front() else {
            backlog.loading = None;
            return;
        };
        let id = head.id;
        let item = Arc::clone(&head.item);
        debug!(entry = %id, item = %item.id, "Loading asset");

        let inner = Arc::clone(this);
        let task = tokio::spawn(async move {
            let result = inner.loader.load(item).await;
            QueueInner::finish(&inner, id, result);
        });
        backlog.loading = Some((id, task));
    }

    fn finish(this: &Arc<Self>, id: Uuid, result: Result<Asset, LoadError>) {
        let mut backlog = this.lock();
        if backlog.entries.front().map(|e| e.id) != Some(id) {
            debug!(entry = %id, "Discarding load for evicted entry");
            return;
        }
        let Some(entry) = backlog.entries.pop_front() else {
            return;
        };
        backlog.loading = None;

        let outcome = match result {
            Ok(asset) if asset.playable => Ok(asset),
            Ok(_) => Err(LoadError::NotPlayable {
                url: entry.item.url.clone(),
                reason: "asset reported not playable".to_string(),
            }),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(asset) => {
                debug!(entry = %id, item = %entry.item.id, "Asset ready");
                this.ready.publish(Some(ReadyAsset {
                    entry: id,
                    asset: Arc::new(asset),
                }));
            }
            Err(error) => {
                warn!(entry = %id, item = %entry.item.id, %error, "Asset failed to load");
                this.failures.publish(Some(LoadFailure {
                    entry: id,
                    item: entry.item,
                    error,
                }));
            }
        }

        QueueInner::start_head(this, &mut backlog);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct InstantLoader;

    #[async_trait]
    impl AssetLoader for InstantLoader {
        async fn load(&self, item: Arc<MediaItem>) -> Result<Asset, LoadError> {
            let playable = !item.url.contains("bad");
            Ok(Asset::new(item, None, playable))
        }
    }

    fn item(id: &str, url: &str) -> Arc<MediaItem> {
        Arc::new(MediaItem::stream(id, id, url))
    }

    #[tokio::test]
    async fn test_ready_in_submission_order() {
        let queue = AssetQueue::new(Arc::new(InstantLoader));
        let mut ready = queue.subscribe_ready();
        assert_eq!(ready.recv().await, Some(None));

        queue.add(vec![item("a", "https://x/a"), item("b", "https://x/b")]);

        let first = ready.recv().await.flatten().unwrap();
        let second = ready.recv().await.flatten().unwrap();
        assert_eq!(first.asset.item.id, "a");
        assert_eq!(second.asset.item.id, "b");
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_not_playable_reports_failure() {
        let queue = AssetQueue::new(Arc::new(InstantLoader));
        let mut failures = queue.subscribe_failures();
        let bad = item("a", "https://x/bad");

        queue.add(vec![Arc::clone(&bad)]);
        let failure = failures.recv().await.flatten().unwrap();
        assert!(Arc::ptr_eq(&failure.item, &bad));
        assert!(matches!(failure.error, LoadError::NotPlayable { .. }));
        assert!(queue.latest_ready().is_none());
    }

    #[tokio::test]
    async fn test_remove_matches_identity_not_value() {
        let queue = AssetQueue::new(Arc::new(InstantLoader));
        let twin_a = item("same", "https://x/same");
        let twin_b = item("same", "https://x/same");
        {
            // Queue both without starting a load
            let mut backlog = queue.inner.lock();
            backlog.entries.push_back(Entry { id: Uuid::new_v4(), item: Arc::clone(&twin_a) });
            backlog.entries.push_back(Entry { id: Uuid::new_v4(), item: Arc::clone(&twin_b) });
        }

        assert_eq!(queue.remove(Some(&[Arc::clone(&twin_b)])), 1);
        let pending = queue.pending();
        assert_eq!(pending.len(), 1);
        assert!(Arc::ptr_eq(&pending[0], &twin_a));
    }
}
