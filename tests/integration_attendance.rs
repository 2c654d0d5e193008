mod common;

use agrifield::modules::attendance::{PunchError, PunchOutcome};
use agrifield::services::{DeviceRestriction, LocationError};
use agrifield_cache::{KeyStore, MemoryKeyStore, keys};
use agrifield_core::{ApiError, ErrorKind};
use agrifield_models::{AttendanceState, Coordinates, PunchId, PunchPhase};
use common::{FakeApi, Harness, daily_status, punch_in_response};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn punched_in(id: &str) -> PunchPhase {
    PunchPhase::PunchedIn(PunchId::new(id))
}

// ============ sync ============

#[tokio::test]
async fn test_sync_punched_in_mirrors_id() {
    let h = Harness::new();
    h.api.set_daily_status(Ok(daily_status(true, false, Some("42"))));

    let report = h.state.attendance.sync().await;

    assert!(report.online);
    assert_eq!(report.phase, punched_in("42"));
    assert_eq!(
        report.state,
        AttendanceState {
            punch_id: Some("42".into()),
            is_punched_in: true
        }
    );
    assert_eq!(h.stored(keys::PUNCH_ID).await.as_deref(), Some("42"));
    assert_eq!(h.state.attendance.phase(), punched_in("42"));
}

#[tokio::test]
async fn test_sync_complete_clears_mirror_regardless_of_prior_state() {
    let h = Harness::new();
    h.store.set(keys::PUNCH_ID, "42").await.unwrap();
    h.state.attendance.restore().await;
    assert!(h.state.attendance.phase().is_punched_in());

    h.api.set_daily_status(Ok(daily_status(true, true, Some("42"))));
    let report = h.state.attendance.sync().await;

    assert_eq!(report.phase, PunchPhase::Complete);
    assert_eq!(report.state, AttendanceState::default());
    assert_eq!(h.stored(keys::PUNCH_ID).await, None);
}

#[tokio::test]
async fn test_sync_not_punched_in_clears_mirror() {
    let h = Harness::new();
    h.store.set(keys::PUNCH_ID, "stale").await.unwrap();
    h.api.set_daily_status(Ok(daily_status(false, false, None)));

    let report = h.state.attendance.sync().await;

    assert_eq!(report.phase, PunchPhase::NoActivePunch);
    assert_eq!(h.stored(keys::PUNCH_ID).await, None);
}

#[tokio::test]
async fn test_sync_keeps_known_id_when_server_omits_it() {
    let h = Harness::new();
    h.store.set(keys::PUNCH_ID, "77").await.unwrap();
    h.api.set_daily_status(Ok(daily_status(true, false, None)));

    let report = h.state.attendance.sync().await;

    assert_eq!(report.phase, punched_in("77"));
    assert_eq!(h.stored(keys::PUNCH_ID).await.as_deref(), Some("77"));
}

#[tokio::test]
async fn test_sync_offline_keeps_state_and_uses_cached_name() {
    let store = Arc::new(MemoryKeyStore::new());
    store.set(keys::PUNCH_ID, "42").await.unwrap();
    store.set(keys::USER_NAME, "Ravi Kumar").await.unwrap();
    let h = Harness::with_store(store);
    h.api.set_daily_status(Err(ApiError::network("timeout")));

    h.state.attendance.restore().await;
    let report = h.state.attendance.sync().await;

    assert!(!report.online);
    assert!(report.status.is_none());
    assert_eq!(report.phase, punched_in("42"));
    assert_eq!(report.display_name.as_deref(), Some("Ravi Kumar"));
    assert_eq!(h.stored(keys::PUNCH_ID).await.as_deref(), Some("42"));
}

#[tokio::test]
async fn test_sync_failures_never_raise() {
    let h = Harness::new();
    for error in [
        ApiError::unauthorized(),
        ApiError::not_found("missing"),
        ApiError::status(500, "boom"),
        ApiError::Decode("bad body".into()),
    ] {
        h.api.set_daily_status(Err(error));
        let report = h.state.attendance.sync().await;
        assert!(!report.online);
        assert_eq!(report.phase, PunchPhase::NoActivePunch);
    }
}

#[tokio::test]
async fn test_sync_caches_display_name() {
    let h = Harness::new();
    let report = h.state.attendance.sync().await;

    assert_eq!(report.display_name.as_deref(), Some("Ravi Kumar"));
    assert_eq!(h.stored(keys::USER_NAME).await.as_deref(), Some("Ravi Kumar"));
}

#[tokio::test]
async fn test_sync_survives_storage_failure() {
    let h = Harness::new();
    h.store.set_unavailable(true);
    h.api.set_daily_status(Ok(daily_status(true, false, Some("42"))));

    let report = h.state.attendance.sync().await;

    assert!(report.online);
    assert_eq!(report.phase, punched_in("42"));
}

// ============ punch in ============

#[tokio::test]
async fn test_punch_in_submits_rounded_coordinates_and_resyncs() {
    let h = Harness::new();
    h.api.set_punch_in(Ok(punch_in_response("101")));
    h.api.set_daily_status(Ok(daily_status(true, false, Some("101"))));

    let outcome = h.state.attendance.request_punch_in().await.unwrap();

    let PunchOutcome::Completed(report) = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert_eq!(report.phase, punched_in("101"));
    assert_eq!(
        *h.api.last_coordinates.lock().unwrap(),
        Some(Coordinates::new(18.52043, 73.856744))
    );
    assert_eq!(h.stored(keys::PUNCH_ID).await.as_deref(), Some("101"));
    assert_eq!(FakeApi::calls(&h.api.status_calls), 1);
    assert_eq!(h.prompt.asked.load(Ordering::SeqCst), 1);
    assert!(!h.state.attendance.is_busy());
}

#[tokio::test]
async fn test_punch_in_keeps_id_when_follow_up_sync_is_offline() {
    let h = Harness::new();
    h.api.set_daily_status(Err(ApiError::network("flaky")));

    let outcome = h.state.attendance.request_punch_in().await.unwrap();

    assert!(matches!(outcome, PunchOutcome::Completed(ref r) if !r.online));
    assert_eq!(h.state.attendance.phase(), punched_in("101"));
    assert_eq!(h.stored(keys::PUNCH_ID).await.as_deref(), Some("101"));
}

#[tokio::test]
async fn test_concurrent_punch_in_submits_once() {
    let h = Harness::new();
    h.api.set_delay(Duration::from_millis(100));
    let attendance = h.state.attendance.clone();

    let (a, b) = tokio::join!(attendance.request_punch_in(), attendance.request_punch_in());

    assert_eq!(FakeApi::calls(&h.api.punch_in_calls), 1);
    let outcomes = [a.unwrap(), b.unwrap()];
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(o, PunchOutcome::Busy))
            .count(),
        1
    );
    assert!(!attendance.is_busy());
}

#[tokio::test]
async fn test_punch_in_rejected_when_already_punched_in() {
    let h = Harness::new();
    h.api.set_daily_status(Ok(daily_status(true, false, Some("42"))));
    h.state.attendance.sync().await;

    let outcome = h.state.attendance.request_punch_in().await.unwrap();

    assert_eq!(outcome, PunchOutcome::NotAllowed(punched_in("42")));
    assert_eq!(h.prompt.asked.load(Ordering::SeqCst), 0);
    assert_eq!(FakeApi::calls(&h.api.punch_in_calls), 0);
}

#[tokio::test]
async fn test_punch_in_allowed_after_complete_day() {
    let h = Harness::new();
    h.api.set_daily_status(Ok(daily_status(true, true, Some("42"))));
    h.state.attendance.sync().await;
    h.api
        .set_punch_in(Err(ApiError::status(400, "You have already punched in today")));

    let err = h.state.attendance.request_punch_in().await.unwrap_err();

    assert_eq!(
        err,
        PunchError::Restricted {
            message: "You have already punched in today".into()
        }
    );
    assert_eq!(err.kind(), Some(ErrorKind::ServerRejected));
    assert_eq!(h.state.attendance.phase(), PunchPhase::Complete);
}

#[tokio::test]
async fn test_device_restriction_aborts_before_prompt() {
    let h = Harness::new();
    *h.guard.0.lock().unwrap() = Some(DeviceRestriction::DeveloperMode);

    let outcome = h.state.attendance.request_punch_in().await.unwrap();

    assert_eq!(
        outcome,
        PunchOutcome::DeviceRestricted(DeviceRestriction::DeveloperMode)
    );
    assert!(outcome.resets_gesture());
    assert_eq!(h.prompt.asked.load(Ordering::SeqCst), 0);
    assert_eq!(FakeApi::calls(&h.api.punch_in_calls), 0);
    assert!(!h.state.attendance.is_busy());
}

#[tokio::test]
async fn test_declined_prompt_commits_nothing() {
    let h = Harness::new();
    h.prompt.answer.store(false, Ordering::SeqCst);

    let outcome = h.state.attendance.request_punch_in().await.unwrap();

    assert_eq!(outcome, PunchOutcome::Declined);
    assert_eq!(FakeApi::calls(&h.api.punch_in_calls), 0);
    assert_eq!(h.state.attendance.phase(), PunchPhase::NoActivePunch);
    assert_eq!(h.stored(keys::PUNCH_ID).await, None);
}

#[tokio::test]
async fn test_location_failure_leaves_no_active_punch() {
    let h = Harness::with_location(Err(LocationError::PermissionDenied));

    let err = h.state.attendance.request_punch_in().await.unwrap_err();

    assert_eq!(err, PunchError::Location(LocationError::PermissionDenied));
    assert_eq!(err.kind(), None);
    assert_eq!(h.state.attendance.phase(), PunchPhase::NoActivePunch);
    assert_eq!(FakeApi::calls(&h.api.punch_in_calls), 0);
}

#[tokio::test]
async fn test_punch_in_offline_is_deferred() {
    let h = Harness::new();
    h.api.set_punch_in(Err(ApiError::network("no route to host")));

    let outcome = h.state.attendance.request_punch_in().await.unwrap();

    assert_eq!(outcome, PunchOutcome::Deferred);
    assert_eq!(h.state.attendance.phase(), PunchPhase::NoActivePunch);
    assert_eq!(h.stored(keys::PUNCH_ID).await, None);
}

#[tokio::test]
async fn test_punch_in_unauthorized_propagates() {
    let h = Harness::new();
    h.api.set_punch_in(Err(ApiError::unauthorized()));

    let err = h.state.attendance.request_punch_in().await.unwrap_err();
    assert_eq!(err, PunchError::Unauthorized);
}

// ============ punch out ============

async fn punched_in_harness(id: &str) -> Harness {
    let h = Harness::new();
    h.api.set_daily_status(Ok(daily_status(true, false, Some(id))));
    h.state.attendance.sync().await;
    h
}

#[tokio::test]
async fn test_punch_out_uses_reconciled_id() {
    let h = punched_in_harness("42").await;
    h.api.set_daily_status(Ok(daily_status(true, true, Some("42"))));

    let outcome = h.state.attendance.request_punch_out().await.unwrap();

    assert!(matches!(outcome, PunchOutcome::Completed(ref r) if r.phase == PunchPhase::Complete));
    assert_eq!(
        h.api.last_punch_out_id.lock().unwrap().as_ref().map(PunchId::as_str),
        Some("42")
    );
    assert_eq!(h.stored(keys::PUNCH_ID).await, None);
}

#[tokio::test]
async fn test_punch_out_after_restart_uses_mirror() {
    let store = Arc::new(MemoryKeyStore::new());
    store.set(keys::PUNCH_ID, "55").await.unwrap();
    let h = Harness::with_store(store);
    h.state.attendance.restore().await;

    h.state.attendance.request_punch_out().await.unwrap();

    assert_eq!(
        h.api.last_punch_out_id.lock().unwrap().as_ref().map(PunchId::as_str),
        Some("55")
    );
}

#[tokio::test]
async fn test_punch_out_requires_active_punch() {
    let h = Harness::new();

    let outcome = h.state.attendance.request_punch_out().await.unwrap();

    assert_eq!(outcome, PunchOutcome::NotAllowed(PunchPhase::NoActivePunch));
    assert_eq!(FakeApi::calls(&h.api.punch_out_calls), 0);
}

#[tokio::test]
async fn test_punch_out_without_any_id_fails() {
    let h = Harness::new();
    h.api.set_daily_status(Ok(daily_status(true, false, None)));
    h.state.attendance.sync().await;

    let err = h.state.attendance.request_punch_out().await.unwrap_err();

    assert_eq!(err, PunchError::MissingPunchId);
    assert_eq!(h.prompt.asked.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_punch_out_not_found_is_distinct_and_not_retried() {
    let h = punched_in_harness("42").await;
    h.api.set_punch_out(Err(ApiError::not_found("Not Found")));

    let err = h.state.attendance.request_punch_out().await.unwrap_err();

    assert_eq!(err, PunchError::NotFound);
    assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    assert_eq!(FakeApi::calls(&h.api.punch_out_calls), 1);
    assert_eq!(h.state.attendance.phase(), punched_in("42"));
}

#[tokio::test]
async fn test_punch_out_offline_is_silently_deferred() {
    let h = punched_in_harness("42").await;
    h.api.set_punch_out(Err(ApiError::network("timeout")));

    let outcome = h.state.attendance.request_punch_out().await.unwrap();

    assert_eq!(outcome, PunchOutcome::Deferred);
    assert_eq!(h.state.attendance.phase(), punched_in("42"));
    assert_eq!(h.stored(keys::PUNCH_ID).await.as_deref(), Some("42"));
}

#[tokio::test]
async fn test_punch_out_unauthorized_is_ignored() {
    let h = punched_in_harness("42").await;
    h.api.set_punch_out(Err(ApiError::unauthorized()));

    let outcome = h.state.attendance.request_punch_out().await.unwrap();

    assert_eq!(outcome, PunchOutcome::Ignored);
    assert_eq!(h.state.attendance.phase(), punched_in("42"));
}

#[tokio::test]
async fn test_punch_out_other_failure_is_generic() {
    let h = punched_in_harness("42").await;
    h.api.set_punch_out(Err(ApiError::status(500, "Internal Server Error")));

    let err = h.state.attendance.request_punch_out().await.unwrap_err();

    assert!(matches!(err, PunchError::Failed(_)));
    assert_eq!(err.kind(), Some(ErrorKind::ServerError));
}

#[tokio::test]
async fn test_cancelled_punch_releases_busy_flag() {
    let h = Harness::new();
    h.api.set_delay(Duration::from_millis(200));
    let attendance = h.state.attendance.clone();

    let pending = tokio::spawn({
        let attendance = attendance.clone();
        async move { attendance.request_punch_in().await }
    });
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(attendance.is_busy());

    pending.abort();
    let _ = pending.await;

    assert!(!attendance.is_busy());
    assert_eq!(attendance.phase(), PunchPhase::NoActivePunch);
}

#[tokio::test]
async fn test_phase_subscribers_see_transitions() {
    let h = Harness::new();
    let mut phases = h.state.attendance.subscribe();
    h.api.set_daily_status(Ok(daily_status(true, false, Some("9"))));

    h.state.attendance.sync().await;

    assert!(phases.has_changed().unwrap());
    assert_eq!(*phases.borrow_and_update(), punched_in("9"));
}
