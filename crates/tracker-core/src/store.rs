//! Collaborator traits consumed by the data-access layer.

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, watch};

use crate::error::StoreError;
use crate::models::AuthState;

/// A path into the tree-shaped key-value namespace.
///
/// Segments never contain `/`; the joined form uses `/` as separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TreePath {
    segments: Vec<String>,
}

impl TreePath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment, builder style.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the segment contains `/`.
    pub fn child(mut self, segment: impl Into<String>) -> Self {
        let segment = segment.into();
        debug_assert!(
            !segment.contains('/'),
            "path segment must not contain '/': {segment}"
        );
        self.segments.push(segment);
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The `/`-joined form used as a flat storage key.
    pub fn join(&self) -> String {
        self.segments.join("/")
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join())
    }
}

/// Path-addressed key-value tree store with server-assigned timestamps.
///
/// This trait is object-safe and can be used with `Arc<dyn TreeStore>`.
#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Allocate a collision-resistant child id.
    fn generate_id(&self) -> String;

    /// The store's server clock, epoch milliseconds.
    fn server_time_millis(&self) -> i64;

    /// Write a node, replacing any existing value.
    async fn put(&self, path: &TreePath, value: Value) -> Result<(), StoreError>;

    /// Read a node. Absent nodes are `Ok(None)`.
    async fn get(&self, path: &TreePath) -> Result<Option<Value>, StoreError>;

    /// Shallow-merge fields into a node, creating it if absent.
    /// Existence checks are the caller's job.
    async fn merge(&self, path: &TreePath, fields: Map<String, Value>) -> Result<(), StoreError>;

    /// Remove a node and everything under it.
    async fn remove(&self, path: &TreePath) -> Result<(), StoreError>;

    /// Direct child node values, unordered.
    async fn children(&self, path: &TreePath) -> Result<Vec<Value>, StoreError>;

    /// Watch a node's direct children. The receiver gets the current snapshot
    /// immediately, then a full snapshot after every change under the node.
    /// Dropping the receiver detaches the listener.
    async fn watch_children(
        &self,
        path: &TreePath,
    ) -> Result<mpsc::UnboundedReceiver<Vec<Value>>, StoreError>;
}

/// External authentication collaborator.
///
/// The watch channel carries the current [`AuthState`] and all subsequent
/// transitions; the provider owns the principal lifecycle, the tracker only
/// observes it.
pub trait IdentityProvider: Send + Sync {
    fn watch(&self) -> watch::Receiver<AuthState>;
}

/// External blob storage collaborator.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write bytes under a key and return a durable opaque URL.
    async fn put_bytes(&self, key: &str, bytes: &[u8]) -> Result<String, StoreError>;
}
