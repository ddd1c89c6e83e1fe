//! Exit flow scenarios against in-memory fakes.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::{TimeDelta, Utc};

use common::{CHANNEL, FlakyStore, Harness, PLATE, fee, inside, not_computed};
use parkgate_core::{CoreError, FeeSnapshot, VehicleStatus};
use parkgate_desk::{ExitError, ExitOutcome, ExitPhase, ExitRequest};

fn request() -> ExitRequest {
    ExitRequest::new(PLATE, "Customer leaving")
}

#[tokio::test]
async fn test_exit_credits_resolved_fee_and_cycles_barrier() {
    let h = Harness::new(vec![inside(1, PLATE)]).await;
    h.backend.script_lookups(vec![Ok(not_computed()), Ok(fee(45.0))]);

    let outcome = h
        .orchestrator
        .open_barrier_and_settle(request().with_barrier_label("Gate A"))
        .await
        .unwrap();

    match outcome {
        ExitOutcome::Settled {
            plate,
            fee,
            barrier_label,
            barrier,
            shift_total,
        } => {
            assert_eq!(plate, PLATE);
            assert_eq!(fee, 45.0);
            assert_eq!(barrier_label, "Gate A");
            assert!(barrier.is_ok());
            assert_eq!(shift_total, 45.0);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    assert_eq!(h.shift.ledger().total().await, 45.0);
    assert!(h.shift.processed().has_processed(PLATE).await);
    assert_eq!(
        h.barrier.calls(),
        vec![("open", CHANNEL.to_string()), ("close", CHANNEL.to_string())]
    );
    assert_eq!(h.backend.lookup_calls().len(), 2);

    let updates = h.backend.updates();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].1.total_payment, 0.0);
    assert_eq!(updates[0].1.paid, None);
    assert_eq!(updates[0].1.reason, "Customer leaving");
    assert_eq!(updates[1].1.total_payment, 45.0);
    assert_eq!(updates[1].1.paid, Some(true));
    assert_eq!(updates[1].1.status, VehicleStatus::Exited);

    let entry = h.directory.find_by_plate(PLATE).await.unwrap();
    assert_eq!(entry.status, VehicleStatus::Exited);
    assert_eq!(entry.fee, Some(45.0));

    let attempt = h.orchestrator.last_attempt(PLATE).await.unwrap();
    assert_eq!(
        attempt.phases(),
        vec![
            ExitPhase::Idle,
            ExitPhase::ExitRequested,
            ExitPhase::FeePending,
            ExitPhase::FeeResolved,
            ExitPhase::PaymentRecorded,
            ExitPhase::BarrierOpening,
            ExitPhase::Completed,
        ]
    );
}

#[tokio::test]
async fn test_zero_fee_is_settled_not_retried() {
    let h = Harness::new(vec![inside(1, PLATE)]).await;
    h.backend.script_lookups(vec![Ok(fee(0.0))]);

    let outcome = h.orchestrator.open_barrier_and_settle(request()).await.unwrap();

    assert!(matches!(outcome, ExitOutcome::Settled { fee, .. } if fee == 0.0));
    assert_eq!(h.backend.lookup_calls().len(), 1);
    assert!(h.shift.processed().has_processed(PLATE).await);
}

#[tokio::test]
async fn test_second_exit_is_a_no_op() {
    let h = Harness::new(vec![inside(1, PLATE)]).await;
    h.backend.script_lookups(vec![Ok(fee(45.0))]);
    h.orchestrator.open_barrier_and_settle(request()).await.unwrap();

    let again = h.orchestrator.open_barrier_and_settle(request()).await.unwrap();

    assert_eq!(
        again,
        ExitOutcome::AlreadySettled {
            plate: PLATE.to_string()
        }
    );
    assert_eq!(h.shift.ledger().total().await, 45.0);
    assert_eq!(h.backend.updates().len(), 2);
    assert_eq!(h.barrier.calls().len(), 2);
}

#[tokio::test]
async fn test_preconditions_have_no_side_effects() {
    let exited = inside(2, "XY98765").with_status(VehicleStatus::Exited);
    let h = Harness::new(vec![inside(1, PLATE), exited]).await;

    let missing = h
        .orchestrator
        .open_barrier_and_settle(ExitRequest::new("ZZ99999", "leaving"))
        .await;
    assert!(matches!(missing, Err(ExitError::NotFound { .. })));

    let invalid = h
        .orchestrator
        .open_barrier_and_settle(ExitRequest::new("XY98765", "leaving"))
        .await;
    assert!(matches!(
        invalid,
        Err(ExitError::InvalidState {
            status: VehicleStatus::Exited,
            ..
        })
    ));

    let no_reason = h
        .orchestrator
        .open_barrier_and_settle(ExitRequest::new(PLATE, "   "))
        .await;
    assert!(matches!(
        no_reason,
        Err(ExitError::Validation(CoreError::EmptyReason))
    ));

    let bad_plate = h
        .orchestrator
        .open_barrier_and_settle(ExitRequest::new("ab-12", "leaving"))
        .await;
    assert!(matches!(bad_plate, Err(ExitError::NotFound { .. })));

    assert!(h.backend.updates().is_empty());
    assert!(h.backend.lookup_calls().is_empty());
    assert!(h.barrier.calls().is_empty());
    assert_eq!(h.shift.ledger().total().await, 0.0);
}

#[tokio::test]
async fn test_missing_channel_is_rejected() {
    let session = parkgate_core::VehicleSession::new(1, PLATE, "Z9");
    let h = Harness::new(vec![session]).await;

    let result = h.orchestrator.open_barrier_and_settle(request()).await;

    assert!(matches!(
        result,
        Err(ExitError::Validation(CoreError::MissingChannel))
    ));
    assert!(h.backend.updates().is_empty());
}

#[tokio::test]
async fn test_fee_unavailable_leaves_books_untouched() {
    let h = Harness::new(vec![inside(1, PLATE)]).await;
    h.backend
        .script_lookups(vec![Ok(not_computed()), Ok(not_computed()), Ok(not_computed())]);

    let err = h.orchestrator.open_barrier_and_settle(request()).await.unwrap_err();

    assert!(matches!(err, ExitError::FeeUnavailable { attempts: 3, .. }));
    assert!(err.is_reconciliation_needed());
    assert_eq!(h.backend.lookup_calls().len(), 3);
    assert_eq!(h.backend.updates().len(), 1);
    assert!(h.barrier.calls().is_empty());
    assert_eq!(h.shift.ledger().total().await, 0.0);
    assert!(!h.shift.processed().has_processed(PLATE).await);

    let attempt = h.orchestrator.last_attempt(PLATE).await.unwrap();
    assert_eq!(attempt.phase, ExitPhase::Failed);
    assert!(attempt.error.is_some());
}

#[tokio::test]
async fn test_settled_elsewhere_is_not_credited() {
    let h = Harness::new(vec![inside(1, PLATE)]).await;
    h.backend.script_lookups(vec![Ok(FeeSnapshot {
        fee: Some(30.0),
        status: Some(VehicleStatus::Exited),
        exit_time: Some(Utc::now() - TimeDelta::minutes(10)),
        ..FeeSnapshot::default()
    })]);

    let outcome = h.orchestrator.open_barrier_and_settle(request()).await.unwrap();

    assert_eq!(
        outcome,
        ExitOutcome::SettledElsewhere {
            plate: PLATE.to_string(),
            fee: Some(30.0)
        }
    );
    assert!(outcome.needs_reconciliation());
    assert!(h.shift.processed().has_processed(PLATE).await);
    assert_eq!(h.shift.ledger().total().await, 0.0);
    assert_eq!(h.backend.updates().len(), 1);
    assert!(h.barrier.calls().is_empty());
}

#[tokio::test]
async fn test_returning_car_exits_from_current_visit() {
    let mut earlier = inside(1, PLATE).with_status(VehicleStatus::Exited).with_fee(20.0);
    earlier.entry_time = Some(Utc::now() - TimeDelta::days(3));
    let mut current = inside(2, PLATE);
    current.entry_time = Some(Utc::now() - TimeDelta::hours(2));
    let h = Harness::new(vec![earlier, current]).await;
    h.backend.script_lookups(vec![Ok(fee(45.0))]);

    let outcome = h.orchestrator.open_barrier_and_settle(request()).await.unwrap();

    assert!(matches!(outcome, ExitOutcome::Settled { fee, .. } if fee == 45.0));
    assert!(!outcome.needs_reconciliation());
    assert_eq!(h.shift.ledger().total().await, 45.0);
    assert_eq!(h.barrier.calls().len(), 2);
}

#[tokio::test]
async fn test_failed_payment_update_changes_nothing_locally() {
    let h = Harness::new(vec![inside(1, PLATE)]).await;
    h.backend.script_lookups(vec![Ok(fee(45.0))]);
    h.backend.fail_update(1);

    let err = h.orchestrator.open_barrier_and_settle(request()).await.unwrap_err();

    assert!(matches!(err, ExitError::Remote(_)));
    assert!(!err.is_reconciliation_needed());
    assert_eq!(h.shift.ledger().total().await, 0.0);
    assert!(!h.shift.processed().has_processed(PLATE).await);
    assert!(h.barrier.calls().is_empty());
}

#[tokio::test]
async fn test_failed_provisional_update_stops_before_lookup() {
    let h = Harness::new(vec![inside(1, PLATE)]).await;
    h.backend.fail_update(0);

    let err = h.orchestrator.open_barrier_and_settle(request()).await.unwrap_err();

    assert!(matches!(err, ExitError::Remote(_)));
    assert!(h.backend.lookup_calls().is_empty());
}

#[tokio::test]
async fn test_storage_failure_is_surfaced() {
    let store = Arc::new(FlakyStore::default());
    let h = Harness::with_store(vec![inside(1, PLATE)], store.clone()).await;
    h.backend.script_lookups(vec![Ok(fee(45.0))]);
    store.failing.store(true, Ordering::SeqCst);

    let err = h.orchestrator.open_barrier_and_settle(request()).await.unwrap_err();

    assert!(matches!(err, ExitError::Store(_)));
    assert!(err.is_reconciliation_needed());
    assert_eq!(h.shift.ledger().total().await, 0.0);
    assert!(!h.shift.processed().has_processed(PLATE).await);
    assert!(h.barrier.calls().is_empty());
}

#[tokio::test]
async fn test_barrier_failure_keeps_settlement() {
    let h = Harness::new(vec![inside(1, PLATE)]).await;
    h.backend.script_lookups(vec![Ok(fee(20.0))]);
    h.barrier.fail_open.store(true, Ordering::SeqCst);

    let outcome = h.orchestrator.open_barrier_and_settle(request()).await.unwrap();

    match outcome {
        ExitOutcome::Settled { barrier, .. } => {
            assert!(!barrier.opened);
            assert!(!barrier.closed);
            assert!(barrier.error.is_some());
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(h.barrier.calls(), vec![("open", CHANNEL.to_string())]);
    assert_eq!(h.shift.ledger().total().await, 20.0);
}

#[tokio::test]
async fn test_request_channel_overrides_record() {
    let h = Harness::new(vec![inside(1, PLATE)]).await;
    h.backend.script_lookups(vec![Ok(fee(5.0))]);

    h.orchestrator
        .open_barrier_and_settle(request().with_channel("override"))
        .await
        .unwrap();

    assert_eq!(h.backend.lookup_calls()[0].0.channel_id, "override");
    assert_eq!(h.barrier.calls()[0], ("open", "override".to_string()));
}

#[tokio::test]
async fn test_concurrent_attempt_is_refused() {
    let h = Harness::new(vec![inside(1, PLATE)]).await;
    h.backend.script_lookups(vec![Ok(fee(45.0))]);
    h.backend.hold_lookups();

    let first = h.orchestrator.open_barrier_and_settle(request());
    let second = async {
        tokio::task::yield_now().await;
        let result = h.orchestrator.open_barrier_and_settle(request()).await;
        h.backend.release_lookups();
        result
    };
    let (first, second) = tokio::join!(first, second);

    assert!(matches!(second, Err(ExitError::InProgress(_))));
    assert!(matches!(first, Ok(ExitOutcome::Settled { .. })));
    assert_eq!(h.shift.ledger().total().await, 45.0);
}
