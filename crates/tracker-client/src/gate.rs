//! The identity gate: no read or write proceeds before identity is resolved.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, warn};
use tracker_core::{AuthState, IdentityProvider, PrincipalId, Result, TrackerError};

/// Resolves the current authenticated principal, with timeout and
/// single-flight semantics.
///
/// The gate caches the resolved id for the lifetime of the session. A
/// provider state that contradicts the cache (a sign-out, or a different
/// signed-in principal) replaces it before the cache is trusted, so the gate
/// never hands out a stale principal across an account switch.
pub struct IdentityGate {
    provider: Arc<dyn IdentityProvider>,
    timeout: Duration,
    cached: Mutex<Option<PrincipalId>>,
    /// Serializes slow-path resolution so concurrent callers coalesce onto
    /// one pending wait instead of each registering their own.
    resolving: Mutex<()>,
}

impl IdentityGate {
    pub fn new(provider: Arc<dyn IdentityProvider>, timeout: Duration) -> Self {
        Self {
            provider,
            timeout,
            cached: Mutex::new(None),
            resolving: Mutex::new(()),
        }
    }

    /// Resolve the current principal.
    ///
    /// Returns immediately when the provider already reports a signed-in
    /// principal or one is cached. Otherwise suspends until a sign-in event
    /// arrives, failing with [`TrackerError::Unauthenticated`] on an explicit
    /// sign-out or when the timeout elapses.
    pub async fn resolve(&self) -> Result<PrincipalId> {
        let mut rx = self.provider.watch();

        // Reconcile the cache with the provider's current state before
        // trusting it.
        match rx.borrow_and_update().clone() {
            AuthState::SignedIn(id) => {
                let mut cached = self.cached.lock().await;
                if cached.as_ref() != Some(&id) {
                    debug!(principal = %id, "identity cache refreshed");
                    *cached = Some(id.clone());
                }
                return Ok(id);
            }
            AuthState::SignedOut => {
                if self.cached.lock().await.take().is_some() {
                    debug!("identity cache invalidated by sign-out");
                }
                return Err(TrackerError::Unauthenticated);
            }
            AuthState::Unknown => {}
        }

        if let Some(id) = self.cached.lock().await.clone() {
            return Ok(id);
        }

        // One timeout window covers the whole slow path, flight-lock
        // acquisition included: coalesced waiters share the winner's
        // resolution window and all fail together when it elapses, rather
        // than each starting a fresh timeout after the previous one expired.
        let resolved = timeout(self.timeout, async {
            // Single flight: late arrivals wait here and pick up the cache
            // the winner filled in.
            let _flight = self.resolving.lock().await;
            if let Some(id) = self.cached.lock().await.clone() {
                return Ok(id);
            }
            loop {
                if rx.changed().await.is_err() {
                    // Provider dropped its channel; treat as signed out.
                    return Err(TrackerError::Unauthenticated);
                }
                match rx.borrow_and_update().clone() {
                    AuthState::SignedIn(id) => return Ok(id),
                    AuthState::SignedOut => return Err(TrackerError::Unauthenticated),
                    AuthState::Unknown => {}
                }
            }
        })
        .await;

        match resolved {
            Ok(Ok(id)) => {
                *self.cached.lock().await = Some(id.clone());
                debug!(principal = %id, "identity resolved");
                Ok(id)
            }
            Ok(Err(e)) => {
                debug!("identity resolution refused: signed out");
                Err(e)
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "identity resolution timed out");
                Err(TrackerError::Unauthenticated)
            }
        }
    }

    /// Clear the cached principal. Called on sign-out.
    pub async fn invalidate(&self) {
        if self.cached.lock().await.take().is_some() {
            debug!("identity cache invalidated");
        }
    }

    /// The cached principal, if any. Does not consult the provider.
    pub async fn cached(&self) -> Option<PrincipalId> {
        self.cached.lock().await.clone()
    }
}
