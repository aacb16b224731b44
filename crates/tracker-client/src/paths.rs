//! Storage path layout.
//!
//! All data lives under the owning principal. Exchanges, status history, and
//! receipts are centralized collections keyed by generated id; each child
//! record carries a `profileId` field instead of nesting under the profile
//! node. Deleting a profile therefore removes only the profile itself and
//! intentionally leaves its child records in place.

use tracker_core::{PrincipalId, TreePath};

fn user_root(principal: &PrincipalId) -> TreePath {
    TreePath::new().child("users").child(principal.as_str())
}

pub(crate) fn profiles_root(principal: &PrincipalId) -> TreePath {
    user_root(principal).child("manicures")
}

pub(crate) fn profile(principal: &PrincipalId, id: &str) -> TreePath {
    profiles_root(principal).child(id)
}

pub(crate) fn exchanges_root(principal: &PrincipalId) -> TreePath {
    user_root(principal).child("kitExchanges")
}

pub(crate) fn exchange(principal: &PrincipalId, id: &str) -> TreePath {
    exchanges_root(principal).child(id)
}

pub(crate) fn status_history_root(principal: &PrincipalId) -> TreePath {
    user_root(principal).child("statusHistory")
}

pub(crate) fn status_history_entry(principal: &PrincipalId, id: &str) -> TreePath {
    status_history_root(principal).child(id)
}

pub(crate) fn receipts_root(principal: &PrincipalId) -> TreePath {
    user_root(principal).child("receipts")
}

pub(crate) fn receipt(principal: &PrincipalId, id: &str) -> TreePath {
    receipts_root(principal).child(id)
}
