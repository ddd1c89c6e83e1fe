//! Push-feed handling against in-memory fakes.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{CHANNEL, Harness, PLATE, ScriptedFeed, ZONE, fee, inside, zero_delay_quotes};
use parkgate_core::{Operator, PatchOutcome, VehicleStatus, ZoneChannels};
use parkgate_desk::{
    ExitRequest, MessageOutcome, Notice, NoticeReceiver, NotificationListener, PromptSource,
    notice_channel,
};
use parkgate_fetch::{ConnectionState, FeedConnection, FetchError, RetryStrategy};
use parkgate_store::VehicleDirectory;

const EXITED_45: &str =
    r#"{"id": 1, "car_number": "AB1234AG", "park_no": "P3", "status": "Exited", "total_payment": 45}"#;
const PENDING: &str =
    r#"{"id": 1, "car_number": "AB1234AG", "park_no": "P3", "status": "Pending", "total_payment": 12}"#;

fn listener_for(h: &Harness) -> (NotificationListener, NoticeReceiver) {
    let (tx, rx) = notice_channel();
    let quotes = zero_delay_quotes(h.backend.clone(), &Operator::for_zone(ZONE));
    (NotificationListener::new(h.directory.clone(), quotes, tx), rx)
}

fn drain(rx: &mut NoticeReceiver) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        notices.push(notice);
    }
    notices
}

fn prompts(notices: &[Notice]) -> usize {
    notices
        .iter()
        .filter(|n| matches!(n, Notice::PaymentPrompt(_)))
        .count()
}

#[tokio::test]
async fn test_exit_event_after_settlement_does_not_credit_again() {
    let h = Harness::new(vec![inside(1, PLATE)]).await;
    h.backend.script_lookups(vec![Ok(fee(45.0))]);
    h.orchestrator
        .open_barrier_and_settle(ExitRequest::new(PLATE, "leaving"))
        .await
        .unwrap();
    let (listener, _rx) = listener_for(&h);

    let outcome = listener.handle_message(EXITED_45).await;

    assert_eq!(outcome, MessageOutcome::Patched(PatchOutcome::Applied));
    assert_eq!(h.shift.ledger().total().await, 45.0);
    assert_eq!(h.shift.processed().len().await, 1);
}

#[tokio::test]
async fn test_exit_event_patches_directory() {
    let h = Harness::new(vec![inside(1, PLATE)]).await;
    let (listener, _rx) = listener_for(&h);

    listener.handle_message(EXITED_45).await;

    let entry = h.directory.find_by_plate(PLATE).await.unwrap();
    assert_eq!(entry.status, VehicleStatus::Exited);
    assert_eq!(entry.fee, Some(45.0));
    assert_eq!(h.shift.ledger().total().await, 0.0);
    assert!(!h.shift.processed().has_processed(PLATE).await);
}

#[tokio::test]
async fn test_duplicate_event_is_dropped() {
    let h = Harness::new(vec![inside(1, PLATE)]).await;
    h.backend.script_lookups(vec![Ok(fee(12.0)), Ok(fee(12.0))]);
    let (listener, mut rx) = listener_for(&h);

    let first = listener.handle_message(PENDING).await;
    let second = listener.handle_message(PENDING).await;

    assert_eq!(first, MessageOutcome::Prompted(PromptSource::Lookup));
    assert_eq!(second, MessageOutcome::Duplicate);
    assert_eq!(prompts(&drain(&mut rx)), 1);
    assert_eq!(h.backend.lookup_calls().len(), 1);
}

#[tokio::test]
async fn test_same_id_is_accepted_again_after_another_event() {
    let h = Harness::new(vec![inside(1, PLATE), inside(2, "XY98765")]).await;
    let (listener, _rx) = listener_for(&h);
    let other = r#"{"id": 2, "car_number": "XY98765", "park_no": "P3", "status": "Inside"}"#;

    assert_eq!(listener.handle_message(EXITED_45).await, MessageOutcome::Patched(PatchOutcome::Applied));
    assert_eq!(listener.handle_message(other).await, MessageOutcome::Ignored);
    assert_eq!(listener.handle_message(EXITED_45).await, MessageOutcome::Patched(PatchOutcome::Applied));
}

#[tokio::test]
async fn test_other_zone_events_are_dropped() {
    let h = Harness::new(vec![inside(1, PLATE)]).await;
    let (listener, mut rx) = listener_for(&h);
    let foreign = r#"{"id": 1, "car_number": "AB1234AG", "park_no": "P4", "status": "Exited", "total_payment": 9}"#;

    let outcome = listener.handle_message(foreign).await;

    assert_eq!(outcome, MessageOutcome::OtherZone);
    assert!(drain(&mut rx).is_empty());
    let entry = h.directory.find_by_plate(PLATE).await.unwrap();
    assert_eq!(entry.status, VehicleStatus::Inside);
}

#[tokio::test]
async fn test_refresh_reloads_directory_once() {
    let h = Harness::new(vec![inside(1, PLATE)]).await;
    let (listener, _rx) = listener_for(&h);
    let before = h.backend.searches();

    let outcome = listener.handle_message("\"refresh\"").await;

    assert_eq!(outcome, MessageOutcome::Refreshed);
    assert_eq!(h.backend.searches(), before + 1);
}

#[tokio::test]
async fn test_failed_refresh_raises_error_notice() {
    let h = Harness::new(vec![inside(1, PLATE)]).await;
    let (listener, mut rx) = listener_for(&h);
    h.backend.fail_searches();

    let outcome = listener.handle_message("refresh").await;

    assert_eq!(outcome, MessageOutcome::RefreshFailed);
    assert!(matches!(drain(&mut rx).as_slice(), [Notice::Error { .. }]));
    assert_eq!(h.directory.entries().await.len(), 1);
}

#[tokio::test]
async fn test_invalid_payloads_are_dropped() {
    let h = Harness::new(vec![inside(1, PLATE)]).await;
    let (listener, mut rx) = listener_for(&h);

    for text in ["not json", "[1,2]", r#"{"id": 1}"#, r#"{"car_number": "AB1234AG"}"#] {
        assert_eq!(listener.handle_message(text).await, MessageOutcome::Invalid);
    }
    assert!(drain(&mut rx).is_empty());
    assert!(listener.last_event_id().await.is_none());
}

#[tokio::test]
async fn test_pending_prompt_uses_lookup_and_zone_channel() {
    let h = Harness::new(vec![inside(1, PLATE)]).await;
    h.backend.script_lookups(vec![Ok(fee(30.0))]);
    let (listener, mut rx) = listener_for(&h);

    let outcome = listener.handle_message(PENDING).await;

    assert_eq!(outcome, MessageOutcome::Prompted(PromptSource::Lookup));
    let default_channel = ZoneChannels::default().get(ZONE).unwrap().to_string();
    let calls = h.backend.lookup_calls();
    assert_eq!(calls[0].0.channel_id, default_channel);
    assert_eq!(calls[0].0.zone, ZONE);

    let notices = drain(&mut rx);
    let prompt = notices
        .iter()
        .find_map(|n| match n {
            Notice::PaymentPrompt(p) => Some(p.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(prompt.fee, Some(30.0));
    assert_eq!(prompt.channel_id, default_channel);
    assert_eq!(prompt.price.to_string(), "30 TMT");
}

#[tokio::test]
async fn test_pending_prompt_prefers_event_channel() {
    let h = Harness::new(vec![inside(1, PLATE)]).await;
    h.backend.script_lookups(vec![Ok(fee(30.0))]);
    let (listener, _rx) = listener_for(&h);
    let text = format!(
        r#"{{"id": 1, "car_number": "AB1234AG", "park_no": "P3", "status": "Pending", "ChannelId": "{CHANNEL}"}}"#
    );

    listener.handle_message(&text).await;

    assert_eq!(h.backend.lookup_calls()[0].0.channel_id, CHANNEL);
}

#[tokio::test]
async fn test_pending_prompt_falls_back_to_event_fields() {
    let h = Harness::new(vec![inside(1, PLATE)]).await;
    h.backend
        .script_lookups(vec![Err(FetchError::remote(500, Some("boom".to_string())))]);
    h.backend
        .script_alternate(vec![Err(FetchError::remote(500, Some("still boom".to_string())))]);
    let (listener, mut rx) = listener_for(&h);

    let outcome = listener.handle_message(PENDING).await;

    assert_eq!(outcome, MessageOutcome::Prompted(PromptSource::Event));
    let calls = h.backend.lookup_calls();
    assert_eq!(calls.len(), 2);
    assert!(!calls[0].1);
    assert!(calls[1].1);

    let notices = drain(&mut rx);
    assert!(notices.iter().any(|n| matches!(n, Notice::Error { .. })));
    let prompt = notices
        .iter()
        .find_map(|n| match n {
            Notice::PaymentPrompt(p) => Some(p.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(prompt.fee, Some(12.0));
    assert_eq!(prompt.source, PromptSource::Event);
}

#[tokio::test]
async fn test_pending_without_channel_warns() {
    let backend = common::FakeBackend::with_sessions(vec![]);
    let operator = Operator::for_zone("Z9");
    let directory = Arc::new(VehicleDirectory::new(
        backend.clone(),
        operator.clone(),
        ZoneChannels::default(),
    ));
    let (tx, mut rx) = notice_channel();
    let listener =
        NotificationListener::new(directory, zero_delay_quotes(backend.clone(), &operator), tx);
    let text = r#"{"id": 5, "car_number": "AB1234AG", "park_no": "Z9", "status": "Pending"}"#;

    let outcome = listener.handle_message(text).await;

    assert_eq!(outcome, MessageOutcome::NoChannel);
    assert!(backend.lookup_calls().is_empty());
    assert!(drain(&mut rx).iter().any(|n| matches!(n, Notice::Warning { .. })));
}

#[tokio::test]
async fn test_admin_is_not_prompted() {
    let backend = common::FakeBackend::with_sessions(vec![inside(1, PLATE)]);
    let directory = Arc::new(VehicleDirectory::new(
        backend.clone(),
        Operator::admin(),
        ZoneChannels::default(),
    ));
    let (tx, mut rx) = notice_channel();
    let listener =
        NotificationListener::new(directory, zero_delay_quotes(backend.clone(), &Operator::admin()), tx);
    let foreign_pending =
        r#"{"id": 1, "car_number": "AB1234AG", "park_no": "P4", "status": "Pending"}"#;

    let outcome = listener.handle_message(foreign_pending).await;

    assert_eq!(outcome, MessageOutcome::Ignored);
    assert_eq!(prompts(&drain(&mut rx)), 0);
    assert!(backend.lookup_calls().is_empty());
}

#[tokio::test]
async fn test_spawned_listener_runs_until_terminal() {
    let h = Harness::new(vec![inside(1, PLATE)]).await;
    let (listener, mut rx) = listener_for(&h);
    let feed = ScriptedFeed::new(vec![vec!["refresh".to_string(), EXITED_45.to_string()]]);
    let connection = FeedConnection::new(feed.clone())
        .with_retry_strategy(RetryStrategy::fixed(2, Duration::ZERO));

    let handle = Arc::new(listener).spawn(connection);
    let mut seen = Vec::new();
    while let Some(notice) = rx.recv().await {
        let done = matches!(notice, Notice::ConnectionLost { .. });
        seen.push(notice);
        if done {
            break;
        }
    }
    let state = handle.join().await;

    assert_eq!(state, ConnectionState::Terminal);
    assert_eq!(feed.connects(), 3);
    assert!(matches!(seen.first(), Some(Notice::Connected)));
    assert!(seen.contains(&Notice::Reconnecting { attempt: 1, max: 2 }));
    assert!(seen.contains(&Notice::ConnectionLost { attempts: 2 }));
    let entry = h.directory.find_by_plate(PLATE).await.unwrap();
    assert_eq!(entry.status, VehicleStatus::Exited);
}

#[tokio::test]
async fn test_shutdown_stops_listener() {
    let h = Harness::new(vec![inside(1, PLATE)]).await;
    let (listener, _rx) = listener_for(&h);
    let feed = ScriptedFeed::new(vec![]);
    let connection = FeedConnection::new(feed)
        .with_retry_strategy(RetryStrategy::fixed(5, Duration::from_secs(60)));

    let handle = Arc::new(listener).spawn(connection);
    let state = handle.shutdown().await;

    assert_eq!(state, ConnectionState::Disconnected);
}
