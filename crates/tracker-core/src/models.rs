//! Stored record types.
//!
//! Records are serialized as camelCase JSON to match the wire layout of the
//! tree store. Timestamps are epoch milliseconds assigned by the store's
//! server clock, never by the caller.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque identity token scoping all storage paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State carried on the identity provider's watch channel.
///
/// `Unknown` means the provider has not reported yet; `SignedOut` is the
/// explicit logged-out signal and fails resolution immediately rather than
/// waiting out the timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unknown,
    SignedIn(PrincipalId),
    SignedOut,
}

/// Whether a client relationship is currently serviced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Inactive,
}

impl Status {
    /// The opposite status.
    pub fn toggled(self) -> Status {
        match self {
            Status::Active => Status::Inactive,
            Status::Inactive => Status::Active,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Active => f.write_str("active"),
            Status::Inactive => f.write_str("inactive"),
        }
    }
}

/// One serviced client relationship.
///
/// `id` is assigned once at creation and never changes. Every successful
/// mutation bumps `updated_at`, so `updated_at >= created_at` always holds.
/// When present, `next_exchange_at` equals `last_exchange_at` plus the plan
/// cadence in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    /// Display name of the client.
    pub name: String,
    /// Free-form contact details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    pub status: Status,
    /// Days between scheduled kit exchanges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_cadence_days: Option<u32>,
    /// When the most recent kit exchange occurred.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_exchange_at: Option<i64>,
    /// When the next kit exchange is due.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_exchange_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Caller input for creating a [`Profile`].
///
/// Ids, timestamps, and the initial status are never caller-supplied.
#[derive(Debug, Clone, Default)]
pub struct ProfileDraft {
    pub name: String,
    pub contact: Option<String>,
    pub plan_cadence_days: Option<u32>,
}

impl ProfileDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self
    }

    pub fn with_cadence_days(mut self, days: u32) -> Self {
        self.plan_cadence_days = Some(days);
        self
    }
}

/// Partial update for a [`Profile`]. Only `Some` fields are merged into the
/// stored record; `updatedAt` is stamped by the store on every merge.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_cadence_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_exchange_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_exchange_at: Option<i64>,
}

impl ProfilePatch {
    /// The patch as a flat field map, ready for a shallow merge.
    pub fn fields(&self) -> Result<Map<String, Value>, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.contact.is_none()
            && self.plan_cadence_days.is_none()
            && self.status.is_none()
            && self.last_exchange_at.is_none()
            && self.next_exchange_at.is_none()
    }
}

/// Immutable record of one completed kit exchange. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeEvent {
    pub id: String,
    pub profile_id: String,
    pub occurred_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Audit entry for one status toggle. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeRecord {
    pub id: String,
    pub profile_id: String,
    pub previous_status: Status,
    pub new_status: Status,
    pub changed_at: i64,
}

/// Metadata for one uploaded receipt. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub profile_id: String,
    pub file_name: String,
    /// Durable opaque reference into blob storage.
    pub url: String,
    pub uploaded_at: i64,
}
