//! Core types and collaborator traits for the kittrack data-access layer.
//!
//! This crate provides the shared interface between the data-access layer
//! (`tracker-client`) and its backends. It defines:
//!
//! - [`TreeStore`] / [`BlobStore`] / [`IdentityProvider`] - The collaborator
//!   traits a backend must implement
//! - [`Profile`], [`ExchangeEvent`], [`StatusChangeRecord`], [`Attachment`] -
//!   The stored record types
//! - [`TrackerError`] / [`StoreError`] - Error types for tracker and backend
//!   operations
//!
//! # Example
//!
//! ```rust
//! use tracker_core::{async_trait, BlobStore, StoreError};
//!
//! struct NullBlobs;
//!
//! #[async_trait]
//! impl BlobStore for NullBlobs {
//!     async fn put_bytes(&self, key: &str, _bytes: &[u8]) -> Result<String, StoreError> {
//!         Ok(format!("null://{}", key))
//!     }
//! }
//! ```

mod error;
mod models;
mod store;
pub mod validation;

pub use error::{Result, StoreError, TrackerError};
pub use models::{
    Attachment, AuthState, ExchangeEvent, PrincipalId, Profile, ProfileDraft, ProfilePatch,
    Status, StatusChangeRecord,
};
pub use store::{BlobStore, IdentityProvider, TreePath, TreeStore};
pub use validation::ValidationError;

// Re-export async_trait for convenience
pub use async_trait::async_trait;
