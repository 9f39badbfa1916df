//! In-memory transport
//!
//! Plays whenever it has items and was last told to play. Inserting at the front
//! behaves like a real queue player: the current item changes and becomes ready.

use earshot_player::{Asset, Transport, TransportEvent};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Default)]
struct MockState {
    items: Vec<Arc<Asset>>,
    wants_play: bool,
    position: Duration,
    play_calls: usize,
    pause_calls: usize,
}

pub struct MockTransport {
    state: Mutex<MockState>,
    events: broadcast::Sender<TransportEvent>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            state: Mutex::new(MockState::default()),
            events,
        })
    }

    pub fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(event);
    }

    pub fn item_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .items
            .iter()
            .map(|asset| asset.item.id.clone())
            .collect()
    }

    pub fn play_calls(&self) -> usize {
        self.state.lock().unwrap().play_calls
    }

    pub fn pause_calls(&self) -> usize {
        self.state.lock().unwrap().pause_calls
    }

    pub fn set_position(&self, position: Duration) {
        self.state.lock().unwrap().position = position;
    }

    /// The current item plays to the end and the queue advances
    pub fn finish_current(&self) {
        {
            let mut state = self.state.lock().unwrap();
            if !state.items.is_empty() {
                state.items.remove(0);
            }
            state.position = Duration::ZERO;
        }
        self.emit(TransportEvent::CurrentItemChanged);
    }
}

impl Transport for MockTransport {
    fn play(&self) {
        let mut state = self.state.lock().unwrap();
        state.wants_play = true;
        state.play_calls += 1;
    }

    fn pause(&self) {
        let mut state = self.state.lock().unwrap();
        state.wants_play = false;
        state.pause_calls += 1;
    }

    fn rate(&self) -> f32 {
        let state = self.state.lock().unwrap();
        if state.wants_play && !state.items.is_empty() {
            1.0
        } else {
            0.0
        }
    }

    fn position(&self) -> Duration {
        self.state.lock().unwrap().position
    }

    fn duration(&self) -> Option<Duration> {
        self.state
            .lock()
            .unwrap()
            .items
            .first()
            .and_then(|asset| asset.duration)
    }

    fn seek(&self, to: Duration) {
        self.state.lock().unwrap().position = to;
    }

    fn items(&self) -> Vec<Arc<Asset>> {
        self.state.lock().unwrap().items.clone()
    }

    fn insert(&self, asset: Arc<Asset>, after: Option<&Arc<Asset>>) {
        let index = {
            let mut state = self.state.lock().unwrap();
            let index = match after {
                None => 0,
                Some(after) => state
                    .items
                    .iter()
                    .position(|a| Arc::ptr_eq(a, after))
                    .map_or(state.items.len(), |i| i + 1),
            };
            state.items.insert(index, asset);
            index
        };
        if index == 0 {
            self.emit(TransportEvent::CurrentItemChanged);
            self.emit(TransportEvent::ReadyToPlay);
        }
    }

    fn remove(&self, asset: &Arc<Asset>) {
        let removed = {
            let mut state = self.state.lock().unwrap();
            let index = state.items.iter().position(|a| Arc::ptr_eq(a, asset));
            if let Some(i) = index {
                state.items.remove(i);
            }
            index
        };
        if removed == Some(0) {
            self.emit(TransportEvent::CurrentItemChanged);
        }
    }

    fn remove_all(&self) {
        self.state.lock().unwrap().items.clear();
        self.emit(TransportEvent::CurrentItemChanged);
    }

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }
}
