//! Authentication-gated data-access and scheduling layer for kittrack.
//!
//! The [`Tracker`] mediates between an application UI and a remote,
//! authenticated, real-time key-tree data store. Every operation first
//! resolves the current principal through the [`IdentityGate`]; the resolved
//! id scopes all storage paths, so no read or write can ever touch another
//! principal's data.
//!
//! Operation groups:
//!
//! - Profile CRUD with audit timestamps ([`Tracker::create_profile`] and
//!   friends)
//! - The append-only kit-exchange log and due-date scheduling
//!   ([`Tracker::record_exchange`])
//! - The live profile feed ([`Tracker::subscribe_profiles`])
//! - Receipt uploads ([`Tracker::upload_receipt`])
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tracker_client::Tracker;
//! use tracker_core::ProfileDraft;
//! # async fn example(
//! #     identity: Arc<dyn tracker_core::IdentityProvider>,
//! #     tree: Arc<dyn tracker_core::TreeStore>,
//! #     blobs: Arc<dyn tracker_core::BlobStore>,
//! # ) -> tracker_core::Result<()> {
//! let tracker = Tracker::new(identity, tree, blobs);
//!
//! let profile = tracker
//!     .create_profile(ProfileDraft::new("Ana Silva").with_cadence_days(30))
//!     .await?;
//! tracker.record_exchange(&profile.id, Some("first visit")).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod exchanges;
mod feed;
mod gate;
mod paths;
mod profiles;
mod receipts;

pub use config::TrackerConfig;
pub use gate::IdentityGate;

// Re-export core types for convenience
pub use tracker_core::{
    Attachment, AuthState, ExchangeEvent, PrincipalId, Profile, ProfileDraft, ProfilePatch,
    Result, Status, StatusChangeRecord, TrackerError,
};

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracker_core::{BlobStore, IdentityProvider, TreeStore};

/// The data-access layer. One instance per signed-in session.
///
/// Holds the identity gate, the storage collaborators, and the single live
/// profile-feed listener. Cheap to share behind an `Arc`.
pub struct Tracker {
    tree: Arc<dyn TreeStore>,
    blobs: Arc<dyn BlobStore>,
    gate: IdentityGate,
    config: TrackerConfig,
    feed: Mutex<Option<JoinHandle<()>>>,
}

impl Tracker {
    /// Create a tracker with the default configuration.
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        tree: Arc<dyn TreeStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self::with_config(identity, tree, blobs, TrackerConfig::default())
    }

    /// Create a tracker with a custom configuration.
    pub fn with_config(
        identity: Arc<dyn IdentityProvider>,
        tree: Arc<dyn TreeStore>,
        blobs: Arc<dyn BlobStore>,
        config: TrackerConfig,
    ) -> Self {
        let gate = IdentityGate::new(identity, config.auth_timeout);
        Self {
            tree,
            blobs,
            gate,
            config,
            feed: Mutex::new(None),
        }
    }

    /// The identity gate backing this tracker.
    pub fn gate(&self) -> &IdentityGate {
        &self.gate
    }

    /// Drop the session: invalidate the cached principal and detach the live
    /// feed. The identity provider itself is not touched.
    pub async fn end_session(&self) {
        self.unsubscribe_profiles().await;
        self.gate.invalidate().await;
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        if let Some(handle) = self.feed.get_mut().take() {
            handle.abort();
        }
    }
}
