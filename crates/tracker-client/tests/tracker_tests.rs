//! Integration tests for the tracker, driven against the in-memory backend.
//!
//! Run with:
//!   cargo test -p tracker-client --test tracker_tests

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use mock_backend::{MemoryBlobs, MemoryTree, MockIdentity};
use serde_json::json;
use tracker_client::{Tracker, TrackerConfig};
use tracker_core::{
    ProfileDraft, ProfilePatch, Status, TrackerError, TreePath, TreeStore,
};

const DAY_MS: i64 = 86_400_000;

struct Harness {
    identity: Arc<MockIdentity>,
    tree: Arc<MemoryTree>,
    blobs: Arc<MemoryBlobs>,
    tracker: Tracker,
}

fn harness_with(identity: MockIdentity, config: TrackerConfig) -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let identity = Arc::new(identity);
    let tree = Arc::new(MemoryTree::new());
    let blobs = Arc::new(MemoryBlobs::new());
    let tracker = Tracker::with_config(identity.clone(), tree.clone(), blobs.clone(), config);
    Harness {
        identity,
        tree,
        blobs,
        tracker,
    }
}

/// Harness with a signed-in principal and a short auth timeout.
fn signed_in() -> Harness {
    harness_with(
        MockIdentity::signed_in("user-1"),
        TrackerConfig::default().with_auth_timeout(Duration::from_millis(200)),
    )
}

fn draft(name: &str) -> ProfileDraft {
    ProfileDraft::new(name)
}

/// Give the feed's forwarding task a chance to run.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

// ============================================================================
// Identity gate
// ============================================================================

#[tokio::test]
async fn gate_times_out_without_identity() {
    let h = harness_with(
        MockIdentity::new(),
        TrackerConfig::default().with_auth_timeout(Duration::from_millis(100)),
    );

    let start = Instant::now();
    let result = h.tracker.list_profiles().await;
    assert!(matches!(result, Err(TrackerError::Unauthenticated)));
    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn gate_fails_immediately_on_sign_out() {
    let h = harness_with(
        MockIdentity::new(),
        TrackerConfig::default().with_auth_timeout(Duration::from_millis(500)),
    );
    h.identity.sign_out();

    let start = Instant::now();
    let result = h.tracker.create_profile(draft("Ana")).await;
    assert!(matches!(result, Err(TrackerError::Unauthenticated)));
    // Explicit sign-out must not wait out the timeout
    assert!(start.elapsed() < Duration::from_millis(200));
}

#[tokio::test]
async fn gate_resolves_delayed_sign_in() {
    let h = harness_with(
        MockIdentity::new(),
        TrackerConfig::default().with_auth_timeout(Duration::from_millis(500)),
    );
    h.identity.sign_in_after("user-1", Duration::from_millis(50));

    let profile = h.tracker.create_profile(draft("Ana")).await.unwrap();
    assert_eq!(profile.name, "Ana");
    assert_eq!(h.tracker.gate().cached().await.unwrap().as_str(), "user-1");
}

#[tokio::test]
async fn gate_concurrent_waiters_share_one_timeout_window() {
    let h = harness_with(
        MockIdentity::new(),
        TrackerConfig::default().with_auth_timeout(Duration::from_millis(100)),
    );

    // No sign-in event ever arrives: both callers must fail together when
    // the single resolution window elapses, not one window apiece.
    let start = Instant::now();
    let (a, b) = tokio::join!(h.tracker.list_profiles(), h.tracker.list_profiles());
    let elapsed = start.elapsed();

    assert!(matches!(a, Err(TrackerError::Unauthenticated)));
    assert!(matches!(b, Err(TrackerError::Unauthenticated)));
    assert!(elapsed >= Duration::from_millis(100));
    assert!(
        elapsed < Duration::from_millis(180),
        "timeouts stacked instead of coalescing: {:?}",
        elapsed
    );
}

#[tokio::test]
async fn gate_coalesces_concurrent_resolutions() {
    let h = harness_with(
        MockIdentity::new(),
        TrackerConfig::default().with_auth_timeout(Duration::from_millis(500)),
    );
    h.identity.sign_in_after("user-1", Duration::from_millis(50));

    let (a, b) = tokio::join!(h.tracker.list_profiles(), h.tracker.list_profiles());
    assert!(a.is_ok());
    assert!(b.is_ok());
}

#[tokio::test]
async fn gate_invalidates_cache_on_sign_out() {
    let h = signed_in();
    h.tracker.create_profile(draft("Ana")).await.unwrap();
    assert!(h.tracker.gate().cached().await.is_some());

    h.identity.sign_out();
    let result = h.tracker.list_profiles().await;
    assert!(matches!(result, Err(TrackerError::Unauthenticated)));
    assert!(h.tracker.gate().cached().await.is_none());
}

#[tokio::test]
async fn gate_replaces_cache_on_principal_change() {
    let h = signed_in();
    h.tracker.create_profile(draft("Ana")).await.unwrap();

    // A different principal signs in; the old scope must not leak through.
    h.identity.sign_in("user-2");
    let profiles = h.tracker.list_profiles().await.unwrap();
    assert!(profiles.is_empty());
    assert_eq!(h.tracker.gate().cached().await.unwrap().as_str(), "user-2");
}

// ============================================================================
// Profile CRUD
// ============================================================================

#[tokio::test]
async fn create_then_get_round_trips() {
    let h = signed_in();
    h.tree.set_server_time(1000);

    let created = h
        .tracker
        .create_profile(draft("Ana").with_contact("+351 900 000 000").with_cadence_days(30))
        .await
        .unwrap();

    assert_eq!(created.status, Status::Active);
    assert_eq!(created.created_at, 1000);
    assert_eq!(created.updated_at, 1000);
    assert_eq!(created.last_exchange_at, None);

    let fetched = h.tracker.get_profile(&created.id).await.unwrap().unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn created_ids_are_unique_and_stable() {
    let h = signed_in();
    let a = h.tracker.create_profile(draft("A")).await.unwrap();
    let b = h.tracker.create_profile(draft("B")).await.unwrap();
    let c = h.tracker.create_profile(draft("C")).await.unwrap();

    assert_ne!(a.id, b.id);
    assert_ne!(b.id, c.id);
    assert_ne!(a.id, c.id);

    for profile in [&a, &b, &c] {
        let fetched = h.tracker.get_profile(&profile.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, profile.id);
    }

    assert_eq!(h.tracker.list_profiles().await.unwrap().len(), 3);
}

#[tokio::test]
async fn get_missing_returns_none() {
    let h = signed_in();
    let result = h.tracker.get_profile("missing-id").await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn update_merges_fields_and_bumps_updated_at() {
    let h = signed_in();
    h.tree.set_server_time(1000);
    let created = h
        .tracker
        .create_profile(draft("Ana").with_cadence_days(30))
        .await
        .unwrap();

    h.tree.set_server_time(2000);
    h.tracker
        .update_profile(
            &created.id,
            ProfilePatch {
                name: Some("Ana Silva".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let fetched = h.tracker.get_profile(&created.id).await.unwrap().unwrap();
    assert_eq!(fetched.name, "Ana Silva");
    // Untouched fields survive the merge
    assert_eq!(fetched.plan_cadence_days, Some(30));
    assert_eq!(fetched.created_at, 1000);
    assert_eq!(fetched.updated_at, 2000);
    assert!(fetched.updated_at >= fetched.created_at);
}

#[tokio::test]
async fn update_missing_fails_not_found() {
    let h = signed_in();
    let result = h
        .tracker
        .update_profile(
            "missing-id",
            ProfilePatch {
                name: Some("Ana".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(
        result,
        Err(TrackerError::NotFound { entity: "Profile", .. })
    ));
}

#[tokio::test]
async fn delete_removes_profile() {
    let h = signed_in();
    let created = h.tracker.create_profile(draft("Ana")).await.unwrap();

    h.tracker.delete_profile(&created.id).await.unwrap();
    assert!(h.tracker.get_profile(&created.id).await.unwrap().is_none());

    let result = h.tracker.delete_profile(&created.id).await;
    assert!(matches!(result, Err(TrackerError::NotFound { .. })));
}

#[tokio::test]
async fn delete_leaves_exchange_log_in_place() {
    let h = signed_in();
    let created = h.tracker.create_profile(draft("Ana")).await.unwrap();
    h.tracker.record_exchange(&created.id, None).await.unwrap();

    h.tracker.delete_profile(&created.id).await.unwrap();

    // The log is orphaned, not cascaded
    let exchanges = h.tracker.list_exchanges(&created.id).await.unwrap();
    assert_eq!(exchanges.len(), 1);
}

#[tokio::test]
async fn create_rejects_invalid_drafts() {
    let h = signed_in();

    let result = h.tracker.create_profile(draft("")).await;
    assert!(matches!(result, Err(TrackerError::Validation(_))));

    let result = h.tracker.create_profile(draft("Ana").with_cadence_days(0)).await;
    assert!(matches!(result, Err(TrackerError::Validation(_))));
}

// ============================================================================
// Status toggling
// ============================================================================

#[tokio::test]
async fn toggle_flips_status_and_appends_history() {
    let h = signed_in();
    let created = h.tracker.create_profile(draft("Ana")).await.unwrap();
    assert_eq!(created.status, Status::Active);

    let status = h.tracker.toggle_status(&created.id).await.unwrap();
    assert_eq!(status, Status::Inactive);

    let fetched = h.tracker.get_profile(&created.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, Status::Inactive);

    let history = h.tracker.list_status_history(&created.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].previous_status, Status::Active);
    assert_eq!(history[0].new_status, Status::Inactive);

    let status = h.tracker.toggle_status(&created.id).await.unwrap();
    assert_eq!(status, Status::Active);
    let history = h.tracker.list_status_history(&created.id).await.unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn concurrent_toggles_last_write_wins() {
    let h = signed_in();
    let created = h.tracker.create_profile(draft("Ana")).await.unwrap();

    let (a, b) = tokio::join!(
        h.tracker.toggle_status(&created.id),
        h.tracker.toggle_status(&created.id)
    );
    let last = b.or(a).unwrap();

    // Exactly one record per toggle, and the stored status is whatever the
    // later write set, even if one record carries a stale previous status.
    let history = h.tracker.list_status_history(&created.id).await.unwrap();
    assert_eq!(history.len(), 2);

    let fetched = h.tracker.get_profile(&created.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, last);
}

// ============================================================================
// Exchange log and scheduler
// ============================================================================

#[tokio::test]
async fn record_exchange_defaults_cadence_to_15_days() {
    let h = signed_in();
    h.tree.set_server_time(500);
    let created = h.tracker.create_profile(draft("Ana")).await.unwrap();

    h.tree.set_server_time(1000);
    let event = h.tracker.record_exchange(&created.id, None).await.unwrap();
    assert_eq!(event.occurred_at, 1000);

    let fetched = h.tracker.get_profile(&created.id).await.unwrap().unwrap();
    assert_eq!(fetched.last_exchange_at, Some(1000));
    assert_eq!(fetched.next_exchange_at, Some(1000 + 15 * DAY_MS));
}

#[tokio::test]
async fn record_exchange_uses_explicit_cadence() {
    let h = signed_in();
    h.tree.set_server_time(500);
    let created = h
        .tracker
        .create_profile(draft("Ana").with_cadence_days(30))
        .await
        .unwrap();

    h.tree.set_server_time(2000);
    h.tracker.record_exchange(&created.id, None).await.unwrap();

    let fetched = h.tracker.get_profile(&created.id).await.unwrap().unwrap();
    assert_eq!(fetched.last_exchange_at, Some(2000));
    assert_eq!(fetched.next_exchange_at, Some(2000 + 30 * DAY_MS));
}

#[tokio::test]
async fn last_exchange_matches_recorded_event() {
    let h = signed_in();
    let created = h.tracker.create_profile(draft("Ana")).await.unwrap();

    h.tracker
        .record_exchange(&created.id, Some("note"))
        .await
        .unwrap();

    let last = h.tracker.last_exchange(&created.id).await.unwrap().unwrap();
    assert_eq!(last.notes.as_deref(), Some("note"));

    let fetched = h.tracker.get_profile(&created.id).await.unwrap().unwrap();
    assert_eq!(fetched.last_exchange_at, Some(last.occurred_at));
}

#[tokio::test]
async fn last_exchange_absent_for_new_profile() {
    let h = signed_in();
    let created = h.tracker.create_profile(draft("Ana")).await.unwrap();
    assert!(h.tracker.last_exchange(&created.id).await.unwrap().is_none());
}

#[tokio::test]
async fn list_exchanges_sorted_newest_first() {
    let h = signed_in();
    let created = h.tracker.create_profile(draft("Ana")).await.unwrap();

    for t in [1000, 3000, 2000] {
        h.tree.set_server_time(t);
        h.tracker.record_exchange(&created.id, None).await.unwrap();
    }

    let exchanges = h.tracker.list_exchanges(&created.id).await.unwrap();
    let times: Vec<i64> = exchanges.iter().map(|e| e.occurred_at).collect();
    assert_eq!(times, vec![3000, 2000, 1000]);
}

#[tokio::test]
async fn record_exchange_missing_profile_fails() {
    let h = signed_in();
    let result = h.tracker.record_exchange("missing-id", None).await;
    assert!(matches!(result, Err(TrackerError::NotFound { .. })));
}

#[tokio::test]
async fn repair_schedule_reconciles_from_log() {
    let h = signed_in();
    h.tree.set_server_time(1000);
    let created = h
        .tracker
        .create_profile(draft("Ana").with_cadence_days(20))
        .await
        .unwrap();

    // Simulate a crash between the event append and the due-date update:
    // the event exists, the profile was never touched.
    let event_path = TreePath::new()
        .child("users")
        .child("user-1")
        .child("kitExchanges")
        .child("e-orphan");
    h.tree
        .put(
            &event_path,
            json!({
                "id": "e-orphan",
                "profileId": created.id,
                "occurredAt": 5000,
            }),
        )
        .await
        .unwrap();

    let next = h.tracker.repair_schedule(&created.id).await.unwrap();
    assert_eq!(next, Some(5000 + 20 * DAY_MS));

    let fetched = h.tracker.get_profile(&created.id).await.unwrap().unwrap();
    assert_eq!(fetched.last_exchange_at, Some(5000));
    assert_eq!(fetched.next_exchange_at, Some(5000 + 20 * DAY_MS));
}

#[tokio::test]
async fn repair_schedule_no_events_is_none() {
    let h = signed_in();
    let created = h.tracker.create_profile(draft("Ana")).await.unwrap();
    assert_eq!(h.tracker.repair_schedule(&created.id).await.unwrap(), None);
}

// ============================================================================
// Change feed
// ============================================================================

type Snapshots = Arc<Mutex<Vec<Vec<tracker_core::Profile>>>>;

fn collector() -> (Snapshots, impl Fn(Vec<tracker_core::Profile>) + Send + Sync + 'static) {
    let snapshots: Snapshots = Arc::new(Mutex::new(Vec::new()));
    let sink = snapshots.clone();
    (snapshots, move |profiles| {
        sink.lock().unwrap().push(profiles);
    })
}

#[tokio::test]
async fn feed_emits_full_snapshots_on_every_change() {
    let h = signed_in();
    let (snapshots, callback) = collector();

    h.tracker.subscribe_profiles(callback).await.unwrap();
    settle().await;

    let created = h.tracker.create_profile(draft("Ana")).await.unwrap();
    settle().await;
    h.tracker
        .update_profile(
            &created.id,
            ProfilePatch {
                name: Some("Ana Silva".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    settle().await;
    h.tracker.delete_profile(&created.id).await.unwrap();
    settle().await;

    let snapshots = snapshots.lock().unwrap();
    // Initial empty, after create, after update, after delete
    assert_eq!(snapshots.len(), 4);
    assert!(snapshots[0].is_empty());
    assert_eq!(snapshots[1].len(), 1);
    assert_eq!(snapshots[1][0].name, "Ana");
    assert_eq!(snapshots[2][0].name, "Ana Silva");
    assert!(snapshots[3].is_empty());
}

#[tokio::test]
async fn second_subscribe_replaces_the_first() {
    let h = signed_in();
    let (first, first_cb) = collector();
    let (second, second_cb) = collector();

    h.tracker.subscribe_profiles(first_cb).await.unwrap();
    settle().await;
    h.tracker.subscribe_profiles(second_cb).await.unwrap();
    settle().await;

    h.tracker.create_profile(draft("Ana")).await.unwrap();
    settle().await;

    // Only the replacement listener saw the create
    assert_eq!(first.lock().unwrap().len(), 1);
    let second = second.lock().unwrap();
    assert_eq!(second.len(), 2);
    assert_eq!(second[1].len(), 1);
}

#[tokio::test]
async fn unsubscribe_is_idempotent() {
    let h = signed_in();
    let (snapshots, callback) = collector();

    h.tracker.subscribe_profiles(callback).await.unwrap();
    settle().await;

    h.tracker.unsubscribe_profiles().await;
    h.tracker.unsubscribe_profiles().await;

    h.tracker.create_profile(draft("Ana")).await.unwrap();
    settle().await;
    assert_eq!(snapshots.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unsubscribe_without_identity_does_not_fail() {
    let h = harness_with(
        MockIdentity::new(),
        TrackerConfig::default().with_auth_timeout(Duration::from_millis(100)),
    );
    // Never subscribed, identity never resolved
    h.tracker.unsubscribe_profiles().await;
    h.tracker.unsubscribe_profiles().await;
}

// ============================================================================
// Receipts
// ============================================================================

#[tokio::test]
async fn upload_receipt_stores_blob_then_metadata() {
    let h = signed_in();
    h.tree.set_server_time(7000);
    let created = h.tracker.create_profile(draft("Ana")).await.unwrap();

    let attachment = h
        .tracker
        .upload_receipt(&created.id, "receipt.jpg", b"jpeg-bytes")
        .await
        .unwrap();

    assert_eq!(attachment.file_name, "receipt.jpg");
    assert_eq!(attachment.uploaded_at, 7000);
    assert_eq!(attachment.url, "mem://7000-receipt.jpg");
    assert_eq!(h.blobs.get("7000-receipt.jpg"), Some(b"jpeg-bytes".to_vec()));

    let receipts = h.tracker.list_receipts(&created.id).await.unwrap();
    assert_eq!(receipts, vec![attachment]);
}

#[tokio::test]
async fn list_receipts_sorted_newest_first() {
    let h = signed_in();
    let created = h.tracker.create_profile(draft("Ana")).await.unwrap();

    for (t, name) in [(1000, "a.jpg"), (3000, "b.jpg"), (2000, "c.jpg")] {
        h.tree.set_server_time(t);
        h.tracker
            .upload_receipt(&created.id, name, b"x")
            .await
            .unwrap();
    }

    let receipts = h.tracker.list_receipts(&created.id).await.unwrap();
    let names: Vec<&str> = receipts.iter().map(|r| r.file_name.as_str()).collect();
    assert_eq!(names, vec!["b.jpg", "c.jpg", "a.jpg"]);
}

#[tokio::test]
async fn failed_upload_leaves_no_metadata() {
    let h = signed_in();
    let created = h.tracker.create_profile(draft("Ana")).await.unwrap();
    h.blobs.fail_uploads(true);

    let result = h
        .tracker
        .upload_receipt(&created.id, "receipt.jpg", b"jpeg-bytes")
        .await;
    assert!(matches!(result, Err(TrackerError::UploadFailed(_))));

    assert!(h.tracker.list_receipts(&created.id).await.unwrap().is_empty());
    assert!(h.blobs.is_empty());
}

#[tokio::test]
async fn upload_rejects_bad_file_names() {
    let h = signed_in();
    let created = h.tracker.create_profile(draft("Ana")).await.unwrap();

    let result = h
        .tracker
        .upload_receipt(&created.id, "../escape.jpg", b"x")
        .await;
    assert!(matches!(result, Err(TrackerError::Validation(_))));
}

// ============================================================================
// Degraded storage
// ============================================================================

#[tokio::test]
async fn list_operations_degrade_to_empty_when_offline() {
    let h = signed_in();
    let created = h.tracker.create_profile(draft("Ana")).await.unwrap();
    h.tracker.record_exchange(&created.id, None).await.unwrap();

    h.tree.set_offline(true);

    // Documented degrade: collection listings return empty
    assert!(h.tracker.list_profiles().await.unwrap().is_empty());
    assert!(h.tracker.list_exchanges(&created.id).await.unwrap().is_empty());

    // Point lookups and writes surface the failure
    assert!(matches!(
        h.tracker.get_profile(&created.id).await,
        Err(TrackerError::StorageUnavailable(_))
    ));
    assert!(matches!(
        h.tracker.create_profile(draft("B")).await,
        Err(TrackerError::StorageUnavailable(_))
    ));
}

// ============================================================================
// Session lifecycle
// ============================================================================

#[tokio::test]
async fn end_session_clears_cache_and_feed() {
    let h = signed_in();
    let (snapshots, callback) = collector();
    h.tracker.subscribe_profiles(callback).await.unwrap();
    settle().await;

    h.tracker.end_session().await;
    assert!(h.tracker.gate().cached().await.is_none());

    // The detached feed no longer observes writes
    h.tracker.create_profile(draft("Ana")).await.unwrap();
    settle().await;
    assert_eq!(snapshots.lock().unwrap().len(), 1);
}
