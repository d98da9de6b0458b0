use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::store::StorePath;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for per-path subtree snapshots.
///
/// A watched path is affected by a change when either contains the other:
/// a write below it changes its subtree, and a delete above it removes it.
pub struct SnapshotHub {
    channels: DashMap<StorePath, broadcast::Sender<Value>>,
}

impl SnapshotHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Watch a path. Creates the channel if needed.
    pub fn subscribe(&self, path: &StorePath) -> broadcast::Receiver<Value> {
        let sender = self
            .channels
            .entry(path.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Watched paths whose snapshot a change at `changed` invalidates.
    pub fn affected(&self, changed: &StorePath) -> Vec<StorePath> {
        self.channels
            .iter()
            .filter(|entry| {
                entry.key().is_prefix_of(changed) || changed.is_prefix_of(entry.key())
            })
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Push a snapshot. No-op if nobody is listening.
    pub fn send(&self, path: &StorePath, snapshot: Value) {
        if let Some(sender) = self.channels.get(path) {
            let _ = sender.send(snapshot);
        }
    }

    /// Drop a channel once its watchers are gone.
    pub fn remove(&self, path: &StorePath) {
        self.channels.remove(path);
    }
}

impl Default for SnapshotHub {
    fn default() -> Self {
        Self::new()
    }
}
