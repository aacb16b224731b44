//! Scriptable identity provider.

use std::time::Duration;

use tokio::sync::watch;
use tracker_core::{AuthState, IdentityProvider, PrincipalId};

/// An identity provider driven by the test.
///
/// Starts in `Unknown` unless built with [`MockIdentity::signed_in`]. All
/// transitions are pushed through the watch channel, so gates observing the
/// provider see them in order.
pub struct MockIdentity {
    tx: watch::Sender<AuthState>,
}

impl MockIdentity {
    /// A provider that has not reported any state yet.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AuthState::Unknown);
        Self { tx }
    }

    /// A provider that is already signed in.
    pub fn signed_in(id: impl Into<String>) -> Self {
        let provider = Self::new();
        provider.sign_in(id);
        provider
    }

    /// Report a signed-in principal.
    pub fn sign_in(&self, id: impl Into<String>) {
        self.tx
            .send_replace(AuthState::SignedIn(PrincipalId::new(id)));
    }

    /// Report an explicit sign-out.
    pub fn sign_out(&self) {
        self.tx.send_replace(AuthState::SignedOut);
    }

    /// Report a signed-in principal after a delay, from a spawned task.
    pub fn sign_in_after(&self, id: impl Into<String>, delay: Duration) {
        let tx = self.tx.clone();
        let id = id.into();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tx.send_replace(AuthState::SignedIn(PrincipalId::new(id)));
        });
    }
}

impl Default for MockIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for MockIdentity {
    fn watch(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }
}
