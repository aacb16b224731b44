//! In-memory backend implementations for testing the kittrack data-access
//! layer:
//!
//! - `MockIdentity` - Scriptable identity provider (sign in, sign out,
//!   delayed sign-in)
//! - `MemoryTree` - Path-addressed tree store with child watchers, a
//!   freezable server clock, and offline failure injection
//! - `MemoryBlobs` - Blob store over a map, with upload failure injection
//!
//! For production use, implement the `tracker-core` traits against a real
//! backend instead.
//!
//! # Example
//!
//! ```rust
//! use mock_backend::{MemoryBlobs, MemoryTree, MockIdentity};
//! use std::sync::Arc;
//!
//! let identity = Arc::new(MockIdentity::signed_in("user-1"));
//! let tree = Arc::new(MemoryTree::new());
//! let blobs = Arc::new(MemoryBlobs::new());
//! ```

mod blobs;
mod identity;
mod tree;

// Re-export tracker-core types for convenience
pub use tracker_core::{AuthState, PrincipalId, StoreError};

pub use blobs::MemoryBlobs;
pub use identity::MockIdentity;
pub use tree::MemoryTree;
