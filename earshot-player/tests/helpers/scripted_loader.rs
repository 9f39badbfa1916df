//! Asset loader with scripted outcomes
//!
//! Every URL loads as playable unless scripted otherwise. A gated URL blocks
//! until released, which lets tests act while a load is in flight.

use async_trait::async_trait;
use earshot_common::MediaItem;
use earshot_player::{Asset, AssetLoader, LoadError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Playable,
    NotPlayable,
    Fail,
}

#[derive(Default)]
pub struct ScriptedLoader {
    outcomes: Mutex<HashMap<String, Outcome>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    started: Mutex<Vec<String>>,
}

impl ScriptedLoader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, url: &str, outcome: Outcome) {
        self.outcomes.lock().unwrap().insert(url.to_string(), outcome);
    }

    /// Hold loads of `url` until [`release`](Self::release)
    pub fn gate(&self, url: &str) {
        self.gates
            .lock()
            .unwrap()
            .insert(url.to_string(), Arc::new(Notify::new()));
    }

    pub fn release(&self, url: &str) {
        if let Some(gate) = self.gates.lock().unwrap().remove(url) {
            gate.notify_one();
        }
    }

    /// URLs whose load has begun, in start order
    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub async fn wait_started(&self, url: &str) {
        super::poll_until(move || async move {
            self.started().iter().any(|u| u == url).then_some(())
        })
        .await
    }
}

#[async_trait]
impl AssetLoader for ScriptedLoader {
    async fn load(&self, item: Arc<MediaItem>) -> Result<Asset, LoadError> {
        self.started.lock().unwrap().push(item.url.clone());

        let gate = self.gates.lock().unwrap().get(&item.url).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .get(&item.url)
            .copied()
            .unwrap_or(Outcome::Playable);
        let duration = (!item.is_live).then(|| Duration::from_secs(1800));
        match outcome {
            Outcome::Playable => Ok(Asset::new(item, duration, true)),
            Outcome::NotPlayable => Ok(Asset::new(item, duration, false)),
            Outcome::Fail => Err(LoadError::Network {
                url: item.url.clone(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}
