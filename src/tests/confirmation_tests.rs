//! Confirmation polling scenarios

use solana_sdk::signature::Signature;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::test_helpers::*;
use crate::cancel::{cancel_pair, CancelSignal};
use crate::config::ConfirmationConfig;
use crate::confirmation::PollState;
use crate::events::{ClientEvent, LogLevel};
use crate::test_utils::{status_at, MockRpc};
use crate::types::{ConfirmationLevel, SignatureStatusReport};

fn sample_signature() -> String {
    Signature::from([3u8; 64]).to_string()
}

#[tokio::test(start_paused = true)]
async fn test_finalized_satisfies_confirmed_target() {
    let mut h = Harness::new();
    h.rpc
        .push_status(Ok(Some(status_at(ConfirmationLevel::Finalized))));

    let outcome = h
        .poller
        .wait_for(&sample_signature(), ConfirmationLevel::Confirmed, &CancelSignal::never())
        .await;

    assert_eq!(outcome.state, PollState::Finalized);
    assert_eq!(outcome.attempts, 1);
    assert!(outcome.is_success());
    assert_eq!(h.rpc.status_calls(), 1);
    assert_eq!(value_changed_count(&h.drain()), 1);
}

#[tokio::test(start_paused = true)]
async fn test_climbs_to_finalized_target() {
    let h = Harness::new();
    h.rpc
        .push_status(Ok(None))
        .push_status(Ok(Some(status_at(ConfirmationLevel::Processed))))
        .push_status(Ok(Some(status_at(ConfirmationLevel::Confirmed))))
        .push_status(Ok(Some(status_at(ConfirmationLevel::Finalized))));

    let outcome = h
        .poller
        .wait_for(&sample_signature(), ConfirmationLevel::Finalized, &CancelSignal::never())
        .await;

    assert_eq!(outcome.state, PollState::Finalized);
    assert_eq!(outcome.attempts, 4);
}

#[tokio::test(start_paused = true)]
async fn test_times_out_after_thirty_attempts() {
    let mut h = Harness::new();
    h.rpc
        .set_status_fallback(Some(status_at(ConfirmationLevel::Processed)));

    let calls = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&calls);
    let started = tokio::time::Instant::now();
    let outcome = h
        .poller
        .check_signature_status(
            &sample_signature(),
            ConfirmationLevel::Confirmed,
            &CancelSignal::never(),
            move |ok| seen.lock().unwrap().push(ok),
        )
        .await;

    assert_eq!(outcome.state, PollState::TimedOut);
    assert_eq!(outcome.attempts, 30);
    assert_eq!(h.rpc.status_calls(), 30);
    assert_eq!(*calls.lock().unwrap(), vec![false]);
    // settle + retry per attempt
    assert!(started.elapsed() >= Duration::from_secs(30));

    let messages = log_messages(&h.drain());
    assert_eq!(
        messages.last().map(String::as_str),
        Some("Tried 30 times. The transaction probably failed :( ")
    );
}

#[tokio::test(start_paused = true)]
async fn test_rpc_errors_log_and_keep_polling() {
    let mut h = Harness::new();
    h.rpc
        .push_status(Err(MockRpc::rate_limited()))
        .push_status(Ok(Some(status_at(ConfirmationLevel::Confirmed))));

    let sig = sample_signature();
    let started = tokio::time::Instant::now();
    let outcome = h
        .poller
        .wait_for(&sig, ConfirmationLevel::Confirmed, &CancelSignal::never())
        .await;

    assert_eq!(outcome.state, PollState::Confirmed);
    assert_eq!(outcome.attempts, 2);
    // no-result wait, then settle
    assert!(started.elapsed() >= Duration::from_millis(2000));

    let events = h.drain();
    let no_tx = events.iter().find_map(|e| match e {
        ClientEvent::LogMessage { message, level, .. }
            if message.starts_with("There is no transaction") =>
        {
            Some((message.clone(), *level))
        }
        _ => None,
    });
    assert_eq!(
        no_tx,
        Some((format!("There is no transaction for Signature: {}.", sig), LogLevel::Info))
    );
}

#[tokio::test(start_paused = true)]
async fn test_empty_signature_rejected_without_polling() {
    let mut h = Harness::new();
    let called = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&called);

    let outcome = h
        .poller
        .check_signature_status(
            "",
            ConfirmationLevel::Confirmed,
            &CancelSignal::never(),
            move |ok| {
                assert!(!ok);
                counter.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await;

    assert_eq!(outcome.state, PollState::Rejected);
    assert_eq!(outcome.attempts, 0);
    assert_eq!(h.rpc.status_calls(), 0);
    assert_eq!(called.load(Ordering::SeqCst), 1);
    assert_eq!(log_messages(&h.drain()), vec!["Signature was empty".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_on_chain_error_ends_poll() {
    let mut h = Harness::new();
    h.rpc.push_status(Ok(Some(SignatureStatusReport {
        err: Some("InstructionError(0, Custom(1))".to_string()),
        ..status_at(ConfirmationLevel::Confirmed)
    })));

    let outcome = h
        .poller
        .wait_for(&sample_signature(), ConfirmationLevel::Confirmed, &CancelSignal::never())
        .await;

    assert_eq!(
        outcome.state,
        PollState::Failed("InstructionError(0, Custom(1))".to_string())
    );
    assert_eq!(h.rpc.status_calls(), 1);

    let events = h.drain();
    assert!(events.iter().any(|e| matches!(
        e,
        ClientEvent::LogMessage { message, level: LogLevel::Error, .. }
            if message.starts_with("Transaction failed")
    )));
    assert_eq!(value_changed_count(&events), 0);
}

#[tokio::test(start_paused = true)]
async fn test_progress_messages_only_when_enabled() {
    let quiet = {
        let mut h = Harness::new();
        h.rpc
            .push_status(Ok(None))
            .push_status(Ok(Some(status_at(ConfirmationLevel::Confirmed))));
        h.poller
            .wait_for(&sample_signature(), ConfirmationLevel::Confirmed, &CancelSignal::never())
            .await;
        log_messages(&h.drain())
    };
    assert!(quiet.is_empty(), "{:?}", quiet);

    let mut h = Harness::with_confirmation(ConfirmationConfig {
        show_progress_messages: true,
        ..ConfirmationConfig::default()
    });
    h.rpc
        .push_status(Ok(None))
        .push_status(Ok(Some(status_at(ConfirmationLevel::Processed))))
        .push_status(Ok(Some(status_at(ConfirmationLevel::Confirmed))));
    h.poller
        .wait_for(&sample_signature(), ConfirmationLevel::Confirmed, &CancelSignal::never())
        .await;

    let messages = log_messages(&h.drain());
    assert_eq!(messages[0], "Waiting for signature. Try: 1");
    assert_eq!(
        messages[1],
        "Signature result 0/31 status: processed target: confirmed"
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_polling() {
    let h = Harness::new();
    let (handle, signal) = cancel_pair();
    let signature = sample_signature();

    let poll = h
        .poller
        .wait_for(&signature, ConfirmationLevel::Finalized, &signal);
    let cancel_later = async {
        tokio::time::sleep(Duration::from_millis(2_200)).await;
        handle.cancel();
    };
    let (outcome, ()) = tokio::join!(poll, cancel_later);

    assert_eq!(outcome.state, PollState::Cancelled);
    assert!(!outcome.is_success());
    assert_eq!(h.rpc.status_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_spawned_check_reports_once() {
    let h = Harness::new();
    h.rpc
        .push_status(Ok(Some(status_at(ConfirmationLevel::Confirmed))));

    let (tx, rx) = tokio::sync::oneshot::channel();
    let handle = Arc::clone(&h.poller).spawn_check(
        sample_signature(),
        ConfirmationLevel::Confirmed,
        CancelSignal::never(),
        move |ok| {
            let _ = tx.send(ok);
        },
    );

    let outcome = handle.await.unwrap();
    assert!(outcome.is_success());
    assert!(rx.await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_smaller_attempt_budget() {
    let h = Harness::with_confirmation(ConfirmationConfig {
        max_attempts: 3,
        ..ConfirmationConfig::default()
    });

    let outcome = h
        .poller
        .wait_for(&sample_signature(), ConfirmationLevel::Confirmed, &CancelSignal::never())
        .await;

    assert_eq!(outcome.state, PollState::TimedOut);
    assert_eq!(outcome.attempts, 3);
}
