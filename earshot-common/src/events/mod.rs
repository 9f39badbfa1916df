//! Observable state for earshot
//!
//! [`Publisher`] is a broadcast-of-latest channel: new subscribers first see the
//! current value, then every later change in order. Dropping a subscription never
//! affects the producer.

mod playback_types;

pub use playback_types::{PlaybackError, PlaybackState};

use futures::stream::{self, Stream, StreamExt};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;

/// Default number of buffered changes per subscriber
pub const DEFAULT_CAPACITY: usize = 64;

/// Latest-value broadcaster
///
/// Cloning a `Publisher` yields another handle to the same channel.
pub struct Publisher<T> {
    inner: Arc<PublisherInner<T>>,
}

struct PublisherInner<T> {
    latest: Mutex<T>,
    tx: broadcast::Sender<T>,
}

impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Publisher<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    pub fn new(initial: T) -> Self {
        Self::with_capacity(initial, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(initial: T, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(PublisherInner {
                latest: Mutex::new(initial),
                tx,
            }),
        }
    }

    /// Current value
    pub fn latest(&self) -> T {
        self.lock().clone()
    }

    /// Publish a new value
    ///
    /// A value equal to the current one is not a transition and is dropped.
    /// Returns whether the value was broadcast.
    pub fn publish(&self, value: T) -> bool {
        let mut latest = self.lock();
        if *latest == value {
            return false;
        }
        *latest = value.clone();
        // No receivers is OK
        let _ = self.inner.tx.send(value);
        true
    }

    /// Subscribe, starting with the current value
    pub fn subscribe(&self) -> Subscription<T> {
        let latest = self.lock();
        Subscription {
            pending: Some(latest.clone()),
            rx: self.inner.tx.subscribe(),
        }
    }

    /// Subscribe to future changes only
    pub fn subscribe_changes(&self) -> Subscription<T> {
        let _latest = self.lock();
        Subscription {
            pending: None,
            rx: self.inner.tx.subscribe(),
        }
    }

    /// Same as [`subscribe`](Self::subscribe), as a `Stream`
    pub fn stream(&self) -> impl Stream<Item = T> {
        let (first, rx) = {
            let latest = self.lock();
            (latest.clone(), self.inner.tx.subscribe())
        };
        stream::once(async move { first }).chain(BroadcastStream::new(rx).filter_map(
            |result| async move {
                match result {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!("Subscriber lagged: {:?}", e);
                        None
                    }
                }
            },
        ))
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, T> {
        self.inner.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Receiving side of a [`Publisher`]
pub struct Subscription<T> {
    pending: Option<T>,
    rx: broadcast::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    /// Next value, or None once every publisher handle is gone
    ///
    /// A subscriber that falls more than the channel capacity behind skips
    /// ahead to the oldest retained value.
    pub async fn recv(&mut self) -> Option<T> {
        if let Some(value) = self.pending.take() {
            return Some(value);
        }
        loop {
            match self.rx.recv().await {
                Ok(value) => return Some(value),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Subscriber lagged behind publisher");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
