//! The live profile feed.
//!
//! The feed re-materializes the entire profile collection on every
//! server-observed change and hands the snapshot to the callback. Full
//! snapshots trade bandwidth for simplicity; there is no diffing.

use tracing::{debug, warn};
use tracker_core::{Profile, Result};

use crate::paths;
use crate::Tracker;

impl Tracker {
    /// Attach a live listener on the principal's profile collection.
    ///
    /// The callback receives the current snapshot immediately, then a fresh
    /// snapshot after every create, update, or delete in the collection. At
    /// most one listener is live per tracker; subscribing again replaces the
    /// previous listener.
    pub async fn subscribe_profiles<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(Vec<Profile>) + Send + Sync + 'static,
    {
        let principal = self.gate().resolve().await?;
        let mut rx = self
            .tree
            .watch_children(&paths::profiles_root(&principal))
            .await?;

        let handle = tokio::spawn(async move {
            while let Some(values) = rx.recv().await {
                let mut profiles = Vec::with_capacity(values.len());
                for value in values {
                    match serde_json::from_value::<Profile>(value) {
                        Ok(profile) => profiles.push(profile),
                        Err(e) => warn!("skipping malformed profile in feed: {}", e),
                    }
                }
                callback(profiles);
            }
            debug!("profile feed closed by store");
        });

        if let Some(old) = self.feed.lock().await.replace(handle) {
            old.abort();
            debug!("profile feed replaced");
        }
        Ok(())
    }

    /// Detach the live listener. Idempotent: a no-op when nothing is
    /// subscribed, and safe to call even if identity was never resolved.
    pub async fn unsubscribe_profiles(&self) {
        if let Some(handle) = self.feed.lock().await.take() {
            handle.abort();
            debug!("profile feed unsubscribed");
        }
    }
}
