//! In-memory path-addressed tree store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracker_core::{StoreError, TreePath, TreeStore};
use uuid::Uuid;

struct Watcher {
    root: String,
    tx: mpsc::UnboundedSender<Vec<Value>>,
}

/// Tree store over a flat map keyed by joined path.
///
/// Watchers registered on a node receive the current child snapshot
/// immediately and a fresh snapshot after every mutation under that node.
/// Tests can freeze the server clock with [`MemoryTree::set_server_time`] and
/// force failures with [`MemoryTree::set_offline`].
pub struct MemoryTree {
    nodes: Mutex<BTreeMap<String, Value>>,
    watchers: Mutex<Vec<Watcher>>,
    offline: AtomicBool,
    frozen_time: Mutex<Option<i64>>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self {
            nodes: Mutex::new(BTreeMap::new()),
            watchers: Mutex::new(Vec::new()),
            offline: AtomicBool::new(false),
            frozen_time: Mutex::new(None),
        }
    }

    /// Make every store operation fail with `StoreError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Freeze the server clock at the given epoch milliseconds.
    pub fn set_server_time(&self, millis: i64) {
        *self.frozen_time.lock().expect("lock poisoned") = Some(millis);
    }

    /// Number of stored nodes, for test assertions.
    pub fn node_count(&self) -> usize {
        self.nodes.lock().expect("lock poisoned").len()
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("store offline".to_string()))
        } else {
            Ok(())
        }
    }

    /// Push fresh child snapshots to every watcher above the changed path,
    /// pruning watchers whose receiver is gone.
    fn notify(&self, changed: &str) {
        let nodes = self.nodes.lock().expect("lock poisoned");
        let mut watchers = self.watchers.lock().expect("lock poisoned");
        watchers.retain(|w| {
            if !is_under(changed, &w.root) {
                return true;
            }
            w.tx.send(children_of(&nodes, &w.root)).is_ok()
        });
    }
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Direct child node values of `root`, in key order.
fn children_of(nodes: &BTreeMap<String, Value>, root: &str) -> Vec<Value> {
    let prefix = format!("{}/", root);
    nodes
        .iter()
        .filter(|(key, _)| {
            key.starts_with(&prefix) && !key[prefix.len()..].contains('/')
        })
        .map(|(_, value)| value.clone())
        .collect()
}

/// True when `path` lies strictly below `root`.
fn is_under(path: &str, root: &str) -> bool {
    path.len() > root.len() && path.starts_with(root) && path[root.len()..].starts_with('/')
}

#[async_trait]
impl TreeStore for MemoryTree {
    fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn server_time_millis(&self) -> i64 {
        self.frozen_time
            .lock()
            .expect("lock poisoned")
            .unwrap_or_else(|| Utc::now().timestamp_millis())
    }

    async fn put(&self, path: &TreePath, value: Value) -> Result<(), StoreError> {
        self.check_online()?;
        let key = path.join();
        self.nodes
            .lock()
            .expect("lock poisoned")
            .insert(key.clone(), value);
        self.notify(&key);
        Ok(())
    }

    async fn get(&self, path: &TreePath) -> Result<Option<Value>, StoreError> {
        self.check_online()?;
        Ok(self
            .nodes
            .lock()
            .expect("lock poisoned")
            .get(&path.join())
            .cloned())
    }

    async fn merge(&self, path: &TreePath, fields: Map<String, Value>) -> Result<(), StoreError> {
        self.check_online()?;
        let key = path.join();
        {
            let mut nodes = self.nodes.lock().expect("lock poisoned");
            match nodes.get_mut(&key) {
                Some(Value::Object(existing)) => {
                    existing.extend(fields);
                }
                _ => {
                    nodes.insert(key.clone(), Value::Object(fields));
                }
            }
        }
        self.notify(&key);
        Ok(())
    }

    async fn remove(&self, path: &TreePath) -> Result<(), StoreError> {
        self.check_online()?;
        let key = path.join();
        let subtree_prefix = format!("{}/", key);
        {
            let mut nodes = self.nodes.lock().expect("lock poisoned");
            nodes.retain(|k, _| k != &key && !k.starts_with(&subtree_prefix));
        }
        self.notify(&key);
        Ok(())
    }

    async fn children(&self, path: &TreePath) -> Result<Vec<Value>, StoreError> {
        self.check_online()?;
        let nodes = self.nodes.lock().expect("lock poisoned");
        Ok(children_of(&nodes, &path.join()))
    }

    async fn watch_children(
        &self,
        path: &TreePath,
    ) -> Result<mpsc::UnboundedReceiver<Vec<Value>>, StoreError> {
        self.check_online()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let root = path.join();
        {
            let nodes = self.nodes.lock().expect("lock poisoned");
            // Initial snapshot, then one per change.
            let _ = tx.send(children_of(&nodes, &root));
        }
        self.watchers
            .lock()
            .expect("lock poisoned")
            .push(Watcher { root, tx });
        Ok(rx)
    }
}
