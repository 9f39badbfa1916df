//! Queue operations
//!
//! The queue is split in two: the transport holds the current item and any
//! ready items behind it; the prefetch backlog holds items still loading.
//! Removal matches descriptors by identity, except for the active item, which
//! matches by id.

use super::core::Worker;
use earshot_common::{MediaItem, PlaybackError, PlaybackState};
use std::sync::Arc;
use tracing::{debug, info, warn};

impl Worker {
    /// Append to the backlog; an idle engine commits to the first item
    pub(super) fn add_to_queue(&mut self, items: Vec<Arc<MediaItem>>) {
        let Some(first) = items.first().cloned() else {
            return;
        };
        debug!(count = items.len(), "Adding to queue");

        let idle = self.active.is_none()
            && self.transport.items().is_empty()
            && self.expected.is_empty();
        self.enqueue(items);

        if idle {
            self.active = Some(Arc::clone(&first));
            self.force_play = true;
            self.publish_loading(&first);
        }
    }

    pub(super) fn remove_from_queue(&mut self, items: Option<Vec<Arc<MediaItem>>>) {
        let Some(items) = items else {
            self.stop(None);
            return;
        };

        let removes_active = self
            .active
            .as_ref()
            .is_some_and(|active| items.iter().any(|item| item.id == active.id));
        if removes_active {
            info!("Active item removed from queue; stopping");
            self.stop(None);
            return;
        }

        let is_removed = |candidate: &Arc<MediaItem>| items.iter().any(|item| Arc::ptr_eq(item, candidate));

        self.expected.retain(|(_, queued)| !is_removed(queued));
        let evicted = self.queue.remove(Some(items.as_slice()));

        let trailing: Vec<_> = self
            .transport
            .items()
            .into_iter()
            .skip(1)
            .filter(|asset| is_removed(&asset.item))
            .collect();
        for asset in &trailing {
            self.transport.remove(asset);
        }

        debug!(evicted, ready_removed = trailing.len(), "Removed from queue");
    }

    /// Reorder the backlog by rebuilding it
    pub(super) fn move_in_queue(&mut self, from: usize, to: usize) {
        let mut pending = self.queue.pending();
        if from >= pending.len() || to >= pending.len() {
            warn!(from, to, len = pending.len(), "Queue move out of range");
            return;
        }
        if from == to {
            return;
        }

        let item = pending.remove(from);
        pending.insert(to, item);

        // Outcomes for the old entries are stale once the backlog is rebuilt
        self.expected
            .retain(|(_, queued)| !pending.iter().any(|item| Arc::ptr_eq(item, queued)));
        self.queue.remove(None);
        self.enqueue(pending);

        debug!(from, to, "Moved in queue");
    }

    /// Hard reset, then publish `stopped`
    pub(super) fn stop(&mut self, error: Option<PlaybackError>) {
        match &error {
            Some(e) => info!("Stopping: {}", e),
            None => info!("Stopping"),
        }
        self.clear();
        self.state.publish(PlaybackState::Stopped { error });
    }

    /// Empty the transport and the backlog and forget the active item
    pub(super) fn clear(&mut self) {
        self.transport.pause();
        self.transport.remove_all();
        self.queue.remove(None);
        self.expected.clear();
        self.active = None;
        self.force_play = false;
        self.paused = false;
        self.live_descriptions.clear();
    }
}
