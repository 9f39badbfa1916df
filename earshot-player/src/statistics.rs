//! Recents and play history
//!
//! Follows the engine's state publisher and, on every `loading(item)` transition
//! to a new item, moves the item to the front of a bounded recents list and
//! appends a [`PlayRecord`] to the play history. Both are written through the
//! filesystem engine straight away, so a crash loses at most the update in
//! flight.
//!
//! Layout under the documents root:
//! - `recents/streams.json`: the recents list, most recent first
//! - `statistics/history.ndjson`: one `PlayRecord` per line, oldest first

use crate::config::StatisticsConfig;
use crate::error::Result;
use chrono::{DateTime, Utc};
use earshot_common::events::Publisher;
use earshot_common::{MediaItem, MediaKind, PlaybackState};
use earshot_fs::{Directory, File, FileSystem};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

const RECENTS_DIR: &str = "recents";
const RECENTS_FILE: &str = "streams.json";
const HISTORY_DIR: &str = "statistics";
const HISTORY_FILE: &str = "history.ndjson";

/// One committed play, as stored in the history log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayRecord {
    pub item_id: String,
    pub title: String,
    pub kind: MediaKind,
    pub started_at: DateTime<Utc>,
}

impl PlayRecord {
    pub fn new(item: &MediaItem) -> Self {
        Self {
            item_id: item.id.clone(),
            title: item.title.clone(),
            kind: item.kind,
            started_at: Utc::now(),
        }
    }
}

/// Recents/statistics tracker
///
/// Cloning yields another handle to the same tracker.
#[derive(Clone)]
pub struct PlayStatistics {
    inner: Arc<StatsInner>,
}

struct StatsInner {
    fs: FileSystem,
    config: StatisticsConfig,
    recents_file: File,
    history_file: File,
    /// Held across the write so updates persist in order
    recents: Mutex<Vec<MediaItem>>,
    binding: StdMutex<Option<JoinHandle<()>>>,
}

impl PlayStatistics {
    /// Open the tracker, reading any persisted recents
    ///
    /// A corrupt recents file is logged and replaced on the next update.
    pub async fn load(fs: FileSystem, config: StatisticsConfig) -> Result<Self> {
        let recents_file = fs.file(&Directory::documents(RECENTS_DIR), RECENTS_FILE)?;
        let history_file = fs.file(&Directory::documents(HISTORY_DIR), HISTORY_FILE)?;

        let recents = match fs.retrieve_one::<Vec<MediaItem>>(&recents_file).await {
            Ok(recents) => recents.unwrap_or_default(),
            Err(e) if e.is_decode() => {
                warn!("Discarding unreadable recents: {}", e);
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        debug!(count = recents.len(), "Loaded recents");

        Ok(Self {
            inner: Arc::new(StatsInner {
                fs,
                config,
                recents_file,
                history_file,
                recents: Mutex::new(recents),
                binding: StdMutex::new(None),
            }),
        })
    }

    /// Follow a state publisher, replacing any previous binding
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(&self, states: &Publisher<PlaybackState>) {
        let mut subscription = states.subscribe_changes();
        let mut previous = states.latest().item().map(|item| item.id.clone());
        let stats = self.clone();

        let task = tokio::spawn(async move {
            while let Some(state) = subscription.recv().await {
                let current = state.item().map(|item| item.id.clone());
                if let PlaybackState::Loading { now } = &state {
                    if previous.as_deref() != Some(now.item.id.as_str()) {
                        if let Err(e) = stats.record(&now.item).await {
                            error!(item = %now.item.id, "Failed to record play: {}", e);
                        }
                    }
                }
                previous = current;
            }
            debug!("State publisher closed; statistics binding ended");
        });

        let mut binding = self.lock_binding();
        if let Some(prior) = binding.replace(task) {
            debug!("Replacing statistics binding");
            prior.abort();
        }
    }

    /// Stop following the state publisher
    pub fn unbind(&self) {
        if let Some(task) = self.lock_binding().take() {
            task.abort();
        }
    }

    /// Move `item` to the front of the recents and log the play
    pub async fn record(&self, item: &MediaItem) -> Result<()> {
        let mut recents = self.inner.recents.lock().await;
        recents.retain(|existing| existing.id != item.id);
        recents.insert(0, item.clone());
        recents.truncate(self.inner.config.capacity);

        self.inner
            .fs
            .save_object(&*recents, &self.inner.recents_file)
            .await?;
        self.inner
            .fs
            .append_object(&PlayRecord::new(item), &self.inner.history_file)
            .await?;

        debug!(item = %item.id, count = recents.len(), "Recorded play");
        Ok(())
    }

    /// Recently loaded items, most recent first
    pub async fn recents(&self) -> Vec<MediaItem> {
        self.inner.recents.lock().await.clone()
    }

    /// Every recorded play, oldest first
    pub async fn history(&self) -> Result<Vec<PlayRecord>> {
        Ok(self.inner.fs.retrieve_all(&self.inner.history_file).await?)
    }

    fn lock_binding(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inner
            .binding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
