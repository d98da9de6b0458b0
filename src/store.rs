use std::fmt;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::notify::SnapshotHub;

/// Hierarchical key into the reservation store, e.g.
/// `bookings/2025-03-10/A1/full`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorePath(Vec<String>);

impl StorePath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.to_string());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if `other` lies inside this path's subtree (or is this path).
    pub fn is_prefix_of(&self, other: &StorePath) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Failure reported by the store collaborator. Logged and surfaced, never
/// retried automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError(pub String);

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store error: {}", self.0)
    }
}

impl std::error::Error for StoreError {}

/// The injected real-time key-value store.
///
/// `subscribe` pushes the full subtree snapshot at `path` whenever any
/// descendant changes; a receiver that lags can simply take the next
/// snapshot, since each one is a full replacement. Subscriptions end when
/// the receiver is dropped.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Read the full subtree at `path`. `Value::Null` when nothing is there.
    async fn snapshot(&self, path: &StorePath) -> Result<Value, StoreError>;

    /// Watch the subtree at `path`. Does not replay the current value;
    /// callers read an initial `snapshot` themselves.
    fn subscribe(&self, path: &StorePath) -> broadcast::Receiver<Value>;

    /// Upsert a leaf value. Last writer wins; no conditional semantics.
    async fn write(&self, path: &StorePath, value: Value) -> Result<(), StoreError>;

    /// Remove the leaf/subtree at `path`. Idempotent.
    async fn delete(&self, path: &StorePath) -> Result<(), StoreError>;
}

/// In-memory reference store: a flat leaf table plus a snapshot hub that
/// rebuilds and pushes affected subtrees on every mutation.
pub struct MemoryStore {
    leaves: DashMap<StorePath, Value>,
    hub: SnapshotHub,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            leaves: DashMap::new(),
            hub: SnapshotHub::new(),
        }
    }

    /// Assemble the nested JSON subtree rooted at `prefix` from the flat
    /// leaf table.
    fn assemble(&self, prefix: &StorePath) -> Value {
        let mut root = Value::Null;
        for entry in self.leaves.iter() {
            if prefix.is_prefix_of(entry.key()) {
                let rel = &entry.key().segments()[prefix.len()..];
                insert_nested(&mut root, rel, entry.value().clone());
            }
        }
        root
    }

    fn publish(&self, changed: &StorePath) {
        for watched in self.hub.affected(changed) {
            self.hub.send(&watched, self.assemble(&watched));
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_nested(node: &mut Value, rel: &[String], leaf: Value) {
    let Some((head, rest)) = rel.split_first() else {
        *node = leaf;
        return;
    };
    if !matches!(node, Value::Object(_)) {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        insert_nested(map.entry(head.clone()).or_insert(Value::Null), rest, leaf);
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn snapshot(&self, path: &StorePath) -> Result<Value, StoreError> {
        Ok(self.assemble(path))
    }

    fn subscribe(&self, path: &StorePath) -> broadcast::Receiver<Value> {
        self.hub.subscribe(path)
    }

    async fn write(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        self.leaves.insert(path.clone(), value);
        self.publish(path);
        Ok(())
    }

    async fn delete(&self, path: &StorePath) -> Result<(), StoreError> {
        // Subtree removal: drop every leaf at or under `path`.
        self.leaves.retain(|key, _| !path.is_prefix_of(key));
        self.publish(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf() -> Value {
        json!({"email": "x@example.com", "bookedAt": "2025-03-10T09:00:00Z"})
    }

    #[tokio::test]
    async fn snapshot_of_empty_subtree_is_null() {
        let store = MemoryStore::new();
        let path = StorePath::new(["bookings", "2025-03-10"]);
        assert_eq!(store.snapshot(&path).await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn write_then_snapshot_nests_by_path() {
        let store = MemoryStore::new();
        let path = StorePath::new(["bookings", "2025-03-10", "A1", "full"]);
        store.write(&path, leaf()).await.unwrap();

        let day = StorePath::new(["bookings", "2025-03-10"]);
        let snap = store.snapshot(&day).await.unwrap();
        assert_eq!(snap["A1"]["full"]["email"], "x@example.com");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        let path = StorePath::new(["bookings", "2025-03-10", "A1", "full"]);
        store.write(&path, leaf()).await.unwrap();
        store.delete(&path).await.unwrap();
        store.delete(&path).await.unwrap(); // absent record, still Ok

        let day = StorePath::new(["bookings", "2025-03-10"]);
        assert_eq!(store.snapshot(&day).await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn delete_removes_whole_subtree() {
        let store = MemoryStore::new();
        let a1 = StorePath::new(["bookings", "2025-03-10", "A1", "morning"]);
        let a2 = StorePath::new(["bookings", "2025-03-10", "A2", "full"]);
        store.write(&a1, leaf()).await.unwrap();
        store.write(&a2, leaf()).await.unwrap();

        store
            .delete(&StorePath::new(["bookings", "2025-03-10", "A1"]))
            .await
            .unwrap();
        let day = StorePath::new(["bookings", "2025-03-10"]);
        let snap = store.snapshot(&day).await.unwrap();
        assert!(snap.get("A1").is_none());
        assert!(snap.get("A2").is_some());
    }

    #[tokio::test]
    async fn subscriber_receives_full_subtree_on_descendant_change() {
        let store = MemoryStore::new();
        let day = StorePath::new(["bookings", "2025-03-10"]);
        let mut rx = store.subscribe(&day);

        let path = StorePath::new(["bookings", "2025-03-10", "A1", "full"]);
        store.write(&path, leaf()).await.unwrap();

        let snap = rx.recv().await.unwrap();
        assert_eq!(snap["A1"]["full"]["email"], "x@example.com");
    }

    #[tokio::test]
    async fn subscriber_sees_deletes_as_shrunk_snapshot() {
        let store = MemoryStore::new();
        let path = StorePath::new(["bookings", "2025-03-10", "A1", "full"]);
        store.write(&path, leaf()).await.unwrap();

        let day = StorePath::new(["bookings", "2025-03-10"]);
        let mut rx = store.subscribe(&day);
        store.delete(&path).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn last_write_to_same_path_wins() {
        let store = MemoryStore::new();
        let path = StorePath::new(["bookings", "2025-03-10", "A1", "full"]);
        store.write(&path, leaf()).await.unwrap();
        store
            .write(
                &path,
                json!({"email": "y@example.com", "bookedAt": "2025-03-10T09:00:01Z"}),
            )
            .await
            .unwrap();

        let snap = store.snapshot(&path).await.unwrap();
        assert_eq!(snap["email"], "y@example.com");
    }

    #[test]
    fn prefix_containment() {
        let root = StorePath::new(["bookings"]);
        let leaf_path = StorePath::new(["bookings", "2025-03-10", "A1", "full"]);
        assert!(root.is_prefix_of(&leaf_path));
        assert!(root.is_prefix_of(&root));
        assert!(!leaf_path.is_prefix_of(&root));
        assert!(!StorePath::new(["other"]).is_prefix_of(&leaf_path));
    }
}
