//! Engine core: command surface, worker loop and observers

use crate::config::PlayerConfig;
use crate::error::{Error, Result};
use crate::playback::asset::AssetLoader;
use crate::playback::prefetch::{AssetQueue, LoadFailure, ReadyAsset};
use crate::playback::transport::{Transport, TransportEvent};
use earshot_common::events::{Publisher, Subscription};
use earshot_common::{MediaItem, NowPlaying, PlaybackError, PlaybackState};
use futures::Stream;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Work items funnelled to the engine worker
pub(super) enum Command {
    Play(Option<Arc<MediaItem>>),
    Pause,
    TogglePlay,
    SeekForward,
    SeekBackward,
    Seek(Duration),
    AddToQueue(Vec<Arc<MediaItem>>),
    RemoveFromQueue(Option<Vec<Arc<MediaItem>>>),
    MoveInQueue { from: usize, to: usize },
    Stop,
    Rebind(Arc<dyn Transport>),
    Snapshot(oneshot::Sender<PlayerSnapshot>),
}

/// Point-in-time view of the engine, for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct PlayerSnapshot {
    pub state: PlaybackState,
    /// Item ids held by the transport, current first
    pub transport_items: Vec<String>,
    /// Item ids still waiting in the prefetch backlog, head first
    pub backlog: Vec<String>,
}

/// Handle to the playback engine
///
/// Cloning yields another handle to the same engine. The worker task exits once
/// every handle is dropped; dropping state subscriptions never affects playback.
#[derive(Clone)]
pub struct Player {
    commands: mpsc::UnboundedSender<Command>,
    state: Publisher<PlaybackState>,
    queue: AssetQueue,
}

impl Player {
    /// Spawn the engine worker
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        transport: Arc<dyn Transport>,
        loader: Arc<dyn AssetLoader>,
        config: PlayerConfig,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Publisher::new(PlaybackState::Initial);
        let queue = AssetQueue::new(loader);

        let worker = Worker {
            events: transport.subscribe(),
            events_open: true,
            transport,
            queue: queue.clone(),
            state: state.clone(),
            config,
            active: None,
            force_play: false,
            paused: false,
            expected: Vec::new(),
            live_descriptions: HashMap::new(),
        };
        tokio::spawn(worker.run(rx));

        Self {
            commands: tx,
            state,
            queue,
        }
    }

    /// Resume the current item, or commit to `item` and play it when ready
    pub fn play(&self, item: Option<Arc<MediaItem>>) {
        self.send(Command::Play(item));
    }

    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    /// Pause while audio is flowing, play otherwise
    pub fn toggle_play(&self) {
        self.send(Command::TogglePlay);
    }

    /// Jump forward by the configured skip interval
    pub fn seek_forward(&self) {
        self.send(Command::SeekForward);
    }

    /// Jump backward by the configured skip interval
    pub fn seek_backward(&self) {
        self.send(Command::SeekBackward);
    }

    pub fn seek(&self, to: Duration) {
        self.send(Command::Seek(to));
    }

    /// Append items to the backlog
    pub fn add_to_queue(&self, items: Vec<Arc<MediaItem>>) {
        self.send(Command::AddToQueue(items));
    }

    /// Remove items (matched by identity); `None` clears everything
    ///
    /// Removing the active item stops playback.
    pub fn remove_from_queue(&self, items: Option<Vec<Arc<MediaItem>>>) {
        self.send(Command::RemoveFromQueue(items));
    }

    /// Move a backlog entry from one index to another
    pub fn move_in_queue(&self, from: usize, to: usize) {
        self.send(Command::MoveInQueue { from, to });
    }

    /// Hard reset: empty both queues and publish `stopped`
    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    /// Switch to a new transport instance, stopping playback on the old one
    pub fn rebind(&self, transport: Arc<dyn Transport>) {
        self.send(Command::Rebind(transport));
    }

    /// Current state
    pub fn state(&self) -> PlaybackState {
        self.state.latest()
    }

    /// Subscribe to state changes, starting with the current state
    pub fn subscribe(&self) -> Subscription<PlaybackState> {
        self.state.subscribe()
    }

    /// State changes as a `Stream`, starting with the current state
    pub fn stream(&self) -> impl Stream<Item = PlaybackState> {
        self.state.stream()
    }

    /// The underlying state publisher, for observers that bind to it
    pub fn states(&self) -> &Publisher<PlaybackState> {
        &self.state
    }

    /// The prefetch backlog
    pub fn queue(&self) -> &AssetQueue {
        &self.queue
    }

    /// Ask the worker for a consistent view of its state
    ///
    /// Answered after every previously issued command has been handled.
    pub async fn snapshot(&self) -> Result<PlayerSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Snapshot(tx))
            .map_err(|_| Error::EngineStopped)?;
        rx.await.map_err(|_| Error::EngineStopped)
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!("Playback engine stopped; command dropped");
        }
    }
}

/// State owned by the engine worker task
pub(super) struct Worker {
    pub(super) transport: Arc<dyn Transport>,
    events: broadcast::Receiver<TransportEvent>,
    events_open: bool,
    pub(super) queue: AssetQueue,
    pub(super) state: Publisher<PlaybackState>,
    config: PlayerConfig,
    /// Item the engine is committed to
    pub(super) active: Option<Arc<MediaItem>>,
    /// Start the transport on its next ready-to-play signal
    pub(super) force_play: bool,
    /// Set only by explicit pause or interruption
    pub(super) paused: bool,
    /// Prefetch entries whose outcome has not been consumed yet, oldest first
    pub(super) expected: Vec<(Uuid, Arc<MediaItem>)>,
    /// Live description overrides keyed by item id
    pub(super) live_descriptions: HashMap<String, String>,
}

impl Worker {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut ready = self.queue.subscribe_ready();
        let mut failures = self.queue.subscribe_failures();
        let mut tick = interval(self.config.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!("Playback engine started");

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                event = self.events.recv(), if self.events_open => match event {
                    Ok(event) => self.on_transport_event(event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Transport events lagged");
                    }
                    Err(RecvError::Closed) => {
                        warn!("Transport event channel closed");
                        self.events_open = false;
                    }
                },
                Some(asset) = ready.recv() => {
                    if let Some(asset) = asset {
                        self.on_ready(asset);
                    }
                }
                Some(failure) = failures.recv() => {
                    if let Some(failure) = failure {
                        self.on_load_failure(failure);
                    }
                }
                _ = tick.tick() => self.refresh(),
            }
        }

        debug!("Playback engine stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Play(None) => self.resume(),
            Command::Play(Some(item)) => self.play_item(item),
            Command::Pause => self.pause(),
            Command::TogglePlay => {
                if self.transport.rate() > 0.0 {
                    self.pause();
                } else {
                    self.resume();
                }
            }
            Command::SeekForward => self.seek_by(true),
            Command::SeekBackward => self.seek_by(false),
            Command::Seek(to) => self.transport.seek(to),
            Command::AddToQueue(items) => self.add_to_queue(items),
            Command::RemoveFromQueue(items) => self.remove_from_queue(items),
            Command::MoveInQueue { from, to } => self.move_in_queue(from, to),
            Command::Stop => self.stop(None),
            Command::Rebind(transport) => self.rebind(transport),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn play_item(&mut self, item: Arc<MediaItem>) {
        if self.active.as_ref().is_some_and(|active| active.id == item.id) {
            debug!(item = %item.id, "Already active; resuming");
            self.resume();
            return;
        }

        info!(item = %item.id, title = %item.title, "Play");
        self.clear();
        self.active = Some(Arc::clone(&item));
        self.force_play = true;
        self.enqueue(vec![Arc::clone(&item)]);
        self.publish_loading(&item);
    }

    /// Resume the current item; no-op when nothing is loaded
    pub(super) fn resume(&mut self) {
        if self.transport.current().is_none() && self.active.is_none() {
            debug!("Nothing loaded; ignoring play");
            return;
        }
        self.paused = false;
        self.transport.play();
        self.refresh();
    }

    fn pause(&mut self) {
        self.transport.pause();
        self.force_play = false;

        let current = self
            .transport
            .current()
            .map(|asset| Arc::clone(&asset.item))
            .or_else(|| self.active.clone());
        match current {
            Some(item) => {
                self.paused = true;
                let now = self.now_playing(&item);
                self.state.publish(PlaybackState::paused(now));
            }
            None => self.stop(None),
        }
    }

    fn seek_by(&mut self, forward: bool) {
        let position = self.transport.position();
        let step = self.config.skip_interval;
        let target = if forward {
            position + step
        } else {
            position.saturating_sub(step)
        };
        let target = match self.transport.duration() {
            Some(duration) => target.min(duration),
            None => target,
        };
        self.transport.seek(target);
    }

    fn rebind(&mut self, transport: Arc<dyn Transport>) {
        info!("Rebinding transport");
        self.clear();
        self.transport = transport;
        self.events = self.transport.subscribe();
        self.events_open = true;
        self.state.publish(PlaybackState::stopped());
    }

    fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            state: self.state.latest(),
            transport_items: self
                .transport
                .items()
                .iter()
                .map(|asset| asset.item.id.clone())
                .collect(),
            backlog: self
                .queue
                .pending()
                .iter()
                .map(|item| item.id.clone())
                .collect(),
        }
    }

    /// Readiness from the prefetch queue: hand the asset to the transport
    fn on_ready(&mut self, ready: ReadyAsset) {
        let Some(index) = self.expected.iter().position(|(id, _)| *id == ready.entry) else {
            debug!(entry = %ready.entry, "Ignoring stale ready asset");
            return;
        };
        self.expected.remove(index);

        debug!(item = %ready.asset.item.id, "Asset ready; inserting into transport");
        let last = self.transport.items().last().cloned();
        self.transport.insert(ready.asset, last.as_ref());
    }

    /// A load failure only matters when the engine was waiting on that item
    fn on_load_failure(&mut self, failure: LoadFailure) {
        let Some(index) = self.expected.iter().position(|(id, _)| *id == failure.entry) else {
            return;
        };
        let (_, item) = self.expected.remove(index);

        let was_active = self
            .active
            .as_ref()
            .is_some_and(|active| Arc::ptr_eq(active, &item) || active.id == item.id);
        if !was_active || !self.transport.items().is_empty() {
            return;
        }

        match self.awaited_item() {
            Some(next) => {
                info!(failed = %item.id, next = %next.id, "Load failed; moving to next item");
                self.await_next(next);
            }
            None => {
                warn!(item = %item.id, error = %failure.error, "Nothing playable left");
                self.stop(Some(PlaybackError::Unplayable {
                    url: item.url.clone(),
                }));
            }
        }
    }

    fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::ReadyToPlay => {
                if self.force_play {
                    debug!("Transport ready; starting playback");
                    self.force_play = false;
                    self.paused = false;
                    self.transport.play();
                }
            }
            TransportEvent::Buffering => {
                if self.is_idle() {
                    return;
                }
                match self.transport.current() {
                    Some(asset) => self.publish_loading(&asset.item),
                    None => match self.awaited_item() {
                        Some(next) => self.await_next(next),
                        None => {
                            debug!("Stalled with nothing left; treating as end of content");
                            self.stop(None);
                        }
                    },
                }
            }
            TransportEvent::CurrentItemChanged => match self.transport.current() {
                Some(asset) => {
                    self.active = Some(Arc::clone(&asset.item));
                    self.refresh();
                }
                None => match self.awaited_item() {
                    Some(next) => self.await_next(next),
                    None if self.is_idle() => {}
                    None => {
                        debug!("Transport queue drained");
                        self.stop(None);
                    }
                },
            },
            TransportEvent::ItemFailed { item_id, message } => {
                error!(item = %item_id, "Transport failed: {}", message);
                self.stop(Some(PlaybackError::Transport { message }));
            }
            TransportEvent::InterruptionBegan => {
                if self.state.latest().item().is_some() {
                    info!("Audio session interrupted; pausing");
                    self.pause();
                }
            }
            TransportEvent::InterruptionEnded { should_resume } => {
                if should_resume {
                    info!("Audio session interruption ended; resuming");
                    self.resume();
                } else {
                    debug!("Audio session interruption ended");
                }
            }
            TransportEvent::Metadata {
                item_id,
                description,
            } => self.on_metadata(item_id, description),
        }
    }

    fn on_metadata(&mut self, item_id: String, description: String) {
        let is_current = self
            .transport
            .current()
            .is_some_and(|asset| asset.item.id == item_id);
        if !is_current {
            debug!(item = %item_id, "Ignoring metadata for inactive item");
            return;
        }
        self.live_descriptions.insert(item_id, description);

        let restamped = match self.state.latest() {
            PlaybackState::Loading { now } => PlaybackState::Loading {
                now: self.now_playing(&now.item),
            },
            PlaybackState::Paused { now } => PlaybackState::Paused {
                now: self.now_playing(&now.item),
            },
            PlaybackState::Playing {
                now,
                duration,
                position,
                rate,
            } => PlaybackState::Playing {
                now: self.now_playing(&now.item),
                duration,
                position,
                rate,
            },
            other => other,
        };
        self.state.publish(restamped);
    }

    /// Republish `playing`/`loading` from the transport's clock
    ///
    /// Never sets `paused`; that only follows an explicit pause.
    pub(super) fn refresh(&mut self) {
        if self.paused {
            return;
        }
        let Some(asset) = self.transport.current() else {
            return;
        };
        let now = self.now_playing(&asset.item);
        let rate = self.transport.rate();
        let state = if rate > 0.0 {
            PlaybackState::Playing {
                now,
                duration: self.transport.duration().or(asset.duration),
                position: self.transport.position(),
                rate,
            }
        } else {
            PlaybackState::loading(now)
        };
        self.state.publish(state);
    }

    /// Queue items for prefetch and remember their entries
    pub(super) fn enqueue(&mut self, items: Vec<Arc<MediaItem>>) {
        let ids = self.queue.add(items.clone());
        self.expected.extend(ids.into_iter().zip(items));
    }

    /// The next item the engine expects from the prefetch queue
    pub(super) fn awaited_item(&self) -> Option<Arc<MediaItem>> {
        self.expected.first().map(|(_, item)| Arc::clone(item))
    }

    /// Commit to the next item the prefetch queue will deliver
    ///
    /// The item becomes active so its load failure or removal is handled as the
    /// current item's.
    fn await_next(&mut self, next: Arc<MediaItem>) {
        self.active = Some(Arc::clone(&next));
        self.publish_loading(&next);
    }

    pub(super) fn publish_loading(&mut self, item: &MediaItem) {
        let now = self.now_playing(item);
        self.state.publish(PlaybackState::loading(now));
    }

    fn now_playing(&self, item: &MediaItem) -> NowPlaying {
        NowPlaying {
            item: item.clone(),
            live_description: self.live_descriptions.get(&item.id).cloned(),
        }
    }

    /// Nothing committed: an earlier `stopped(error)` must survive late signals
    fn is_idle(&self) -> bool {
        matches!(
            self.state.latest(),
            PlaybackState::Initial | PlaybackState::Stopped { .. }
        )
    }
}
