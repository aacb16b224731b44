//! The kit-exchange log and due-date scheduling.
//!
//! Recording an exchange is two sequential writes: the event append, then the
//! profile's due-date update. The pair is not atomic; a crash in between
//! leaves an event without an updated due date. The log is the source of
//! truth, so [`Tracker::repair_schedule`] can always reconcile the profile
//! from the latest event.

use tracing::{info, warn};
use tracker_core::{validation, ExchangeEvent, ProfilePatch, Result};

use crate::paths;
use crate::profiles::decode_all;
use crate::Tracker;

pub(crate) const MILLIS_PER_DAY: i64 = 86_400_000;

impl Tracker {
    /// Append an exchange event for a profile and update the profile's
    /// `lastExchangeAt`/`nextExchangeAt` from its plan cadence (default when
    /// the profile has none).
    pub async fn record_exchange(
        &self,
        profile_id: &str,
        notes: Option<&str>,
    ) -> Result<ExchangeEvent> {
        if let Some(notes) = notes {
            validation::validate_notes(notes)?;
        }

        let principal = self.gate().resolve().await?;
        let profile = self.require_profile(&principal, profile_id).await?;

        let id = self.tree.generate_id();
        let occurred_at = self.tree.server_time_millis();
        let event = ExchangeEvent {
            id: id.clone(),
            profile_id: profile_id.to_string(),
            occurred_at,
            notes: notes.map(str::to_string),
        };
        self.tree
            .put(&paths::exchange(&principal, &id), serde_json::to_value(&event)?)
            .await?;

        let cadence = profile
            .plan_cadence_days
            .unwrap_or(self.config.default_cadence_days);
        let next_exchange_at = occurred_at + i64::from(cadence) * MILLIS_PER_DAY;
        let patch = ProfilePatch {
            last_exchange_at: Some(occurred_at),
            next_exchange_at: Some(next_exchange_at),
            ..Default::default()
        };
        self.apply_patch(&principal, profile_id, patch).await?;

        info!(
            profile = %profile_id,
            occurred_at,
            next_exchange_at,
            "recorded kit exchange"
        );
        Ok(event)
    }

    /// Exchange events for a profile, newest first by `occurredAt`. The sort
    /// is stable, so equal timestamps keep their enumeration order. A storage
    /// failure degrades to an empty list.
    pub async fn list_exchanges(&self, profile_id: &str) -> Result<Vec<ExchangeEvent>> {
        let principal = self.gate().resolve().await?;
        let values = match self.tree.children(&paths::exchanges_root(&principal)).await {
            Ok(values) => values,
            Err(e) => {
                warn!("listing exchanges failed, returning empty: {}", e);
                return Ok(Vec::new());
            }
        };
        let mut events: Vec<ExchangeEvent> = decode_all(values)?;
        events.retain(|e| e.profile_id == profile_id);
        events.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        Ok(events)
    }

    /// The most recent exchange event for a profile, if any.
    pub async fn last_exchange(&self, profile_id: &str) -> Result<Option<ExchangeEvent>> {
        Ok(self.list_exchanges(profile_id).await?.into_iter().next())
    }

    /// Recompute a profile's `lastExchangeAt`/`nextExchangeAt` from the
    /// latest logged event, rewriting the profile if it is stale. Returns the
    /// recomputed due date, or `None` when the profile has no exchanges.
    pub async fn repair_schedule(&self, profile_id: &str) -> Result<Option<i64>> {
        let principal = self.gate().resolve().await?;
        let profile = self.require_profile(&principal, profile_id).await?;

        let Some(latest) = self.list_exchanges(profile_id).await?.into_iter().next() else {
            return Ok(None);
        };

        let cadence = profile
            .plan_cadence_days
            .unwrap_or(self.config.default_cadence_days);
        let next_exchange_at = latest.occurred_at + i64::from(cadence) * MILLIS_PER_DAY;

        if profile.last_exchange_at != Some(latest.occurred_at)
            || profile.next_exchange_at != Some(next_exchange_at)
        {
            warn!(
                profile = %profile_id,
                "schedule out of date with exchange log, repairing"
            );
            let patch = ProfilePatch {
                last_exchange_at: Some(latest.occurred_at),
                next_exchange_at: Some(next_exchange_at),
                ..Default::default()
            };
            self.apply_patch(&principal, profile_id, patch).await?;
        }

        Ok(Some(next_exchange_at))
    }
}
