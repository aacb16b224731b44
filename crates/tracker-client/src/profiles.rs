//! Profile CRUD and status toggling.

use serde_json::Value;
use tracing::{debug, warn};
use tracker_core::{
    validation, PrincipalId, Profile, ProfileDraft, ProfilePatch, Result, Status,
    StatusChangeRecord, TrackerError,
};

use crate::paths;
use crate::Tracker;

impl Tracker {
    /// Create a profile. Allocates the id, stamps both timestamps from the
    /// store's server clock, and defaults the status to active.
    pub async fn create_profile(&self, draft: ProfileDraft) -> Result<Profile> {
        validation::validate_name(&draft.name)?;
        if let Some(days) = draft.plan_cadence_days {
            validation::validate_cadence(days)?;
        }

        let principal = self.gate().resolve().await?;
        let id = self.tree.generate_id();
        let now = self.tree.server_time_millis();

        let profile = Profile {
            id: id.clone(),
            name: draft.name.trim().to_string(),
            contact: draft.contact,
            status: Status::Active,
            plan_cadence_days: draft.plan_cadence_days,
            last_exchange_at: None,
            next_exchange_at: None,
            created_at: now,
            updated_at: now,
        };

        let value = serde_json::to_value(&profile)?;
        self.tree.put(&paths::profile(&principal, &id), value).await?;

        debug!(profile = %id, name = %profile.name, "created profile");
        Ok(profile)
    }

    /// Point lookup. An absent id is `Ok(None)`, never an error.
    pub async fn get_profile(&self, id: &str) -> Result<Option<Profile>> {
        let principal = self.gate().resolve().await?;
        match self.tree.get(&paths::profile(&principal, id)).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// All profiles under the current principal, unordered. A storage failure
    /// degrades to an empty list.
    pub async fn list_profiles(&self) -> Result<Vec<Profile>> {
        let principal = self.gate().resolve().await?;
        let values = match self.tree.children(&paths::profiles_root(&principal)).await {
            Ok(values) => values,
            Err(e) => {
                warn!("listing profiles failed, returning empty: {}", e);
                return Ok(Vec::new());
            }
        };
        decode_all(values)
    }

    /// Merge the set fields of `patch` into an existing profile, bumping
    /// `updatedAt`. Fails with `NotFound` when the id does not exist under
    /// this principal.
    pub async fn update_profile(&self, id: &str, patch: ProfilePatch) -> Result<()> {
        if let Some(name) = patch.name.as_deref() {
            validation::validate_name(name)?;
        }
        if let Some(days) = patch.plan_cadence_days {
            validation::validate_cadence(days)?;
        }

        let principal = self.gate().resolve().await?;
        self.apply_patch(&principal, id, patch).await
    }

    /// Remove a profile. Exchange events and receipts keyed by this profile
    /// are left in place; the exchange log stays the source of truth for
    /// cadence history.
    pub async fn delete_profile(&self, id: &str) -> Result<()> {
        let principal = self.gate().resolve().await?;
        let path = paths::profile(&principal, id);
        if self.tree.get(&path).await?.is_none() {
            return Err(TrackerError::NotFound {
                entity: "Profile",
                id: id.to_string(),
            });
        }
        self.tree.remove(&path).await?;
        debug!(profile = %id, "deleted profile");
        Ok(())
    }

    /// Flip a profile between active and inactive and append a status-change
    /// audit record.
    ///
    /// Read-modify-write without an optimistic-concurrency check: two
    /// overlapping toggles race, the later write wins, and one audit record
    /// may carry a stale previous status.
    pub async fn toggle_status(&self, id: &str) -> Result<Status> {
        let principal = self.gate().resolve().await?;
        let profile = self.require_profile(&principal, id).await?;

        let previous = profile.status;
        let next = previous.toggled();
        let patch = ProfilePatch {
            status: Some(next),
            ..Default::default()
        };
        self.apply_patch(&principal, id, patch).await?;

        let record_id = self.tree.generate_id();
        let record = StatusChangeRecord {
            id: record_id.clone(),
            profile_id: id.to_string(),
            previous_status: previous,
            new_status: next,
            changed_at: self.tree.server_time_millis(),
        };
        self.tree
            .put(
                &paths::status_history_entry(&principal, &record_id),
                serde_json::to_value(&record)?,
            )
            .await?;

        debug!(profile = %id, from = %previous, to = %next, "toggled status");
        Ok(next)
    }

    /// Status-change audit records for a profile, newest first.
    pub async fn list_status_history(&self, profile_id: &str) -> Result<Vec<StatusChangeRecord>> {
        let principal = self.gate().resolve().await?;
        let values = self
            .tree
            .children(&paths::status_history_root(&principal))
            .await?;
        let mut records: Vec<StatusChangeRecord> = decode_all(values)?;
        records.retain(|r| r.profile_id == profile_id);
        records.sort_by(|a, b| b.changed_at.cmp(&a.changed_at));
        Ok(records)
    }

    /// Fetch a profile or fail with `NotFound`.
    pub(crate) async fn require_profile(
        &self,
        principal: &PrincipalId,
        id: &str,
    ) -> Result<Profile> {
        match self.tree.get(&paths::profile(principal, id)).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Err(TrackerError::NotFound {
                entity: "Profile",
                id: id.to_string(),
            }),
        }
    }

    /// Merge a patch into an existing profile, stamping `updatedAt`. Shared
    /// by `update_profile`, `toggle_status`, and the exchange scheduler.
    pub(crate) async fn apply_patch(
        &self,
        principal: &PrincipalId,
        id: &str,
        patch: ProfilePatch,
    ) -> Result<()> {
        let path = paths::profile(principal, id);
        if self.tree.get(&path).await?.is_none() {
            return Err(TrackerError::NotFound {
                entity: "Profile",
                id: id.to_string(),
            });
        }

        let mut fields = patch.fields()?;
        fields.insert(
            "updatedAt".to_string(),
            Value::from(self.tree.server_time_millis()),
        );
        self.tree.merge(&path, fields).await?;
        Ok(())
    }
}

/// Decode a batch of child values, surfacing the first malformed record.
pub(crate) fn decode_all<T: serde::de::DeserializeOwned>(values: Vec<Value>) -> Result<Vec<T>> {
    let mut records = Vec::with_capacity(values.len());
    for value in values {
        records.push(serde_json::from_value(value)?);
    }
    Ok(records)
}
