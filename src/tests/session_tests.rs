//! End-to-end session flows: submit, announce, confirm

use solana_sdk::{pubkey::Pubkey, signature::Signature, system_program};
use std::sync::{Arc, Mutex};

use super::test_helpers::*;
use crate::cancel::CancelSignal;
use crate::confirmation::PollState;
use crate::events::TransactionInfoStatus;
use crate::session::parse_pubkey;
use crate::test_utils::{status_at, MockRpc, MockSigner, SignerBehavior};
use crate::types::ConfirmationLevel;
use crate::wallet::TransactionSigner;

#[tokio::test(start_paused = true)]
async fn test_next_block_send_with_callback() {
    let mut h = Harness::new();
    h.rpc
        .push_status(Ok(Some(status_at(ConfirmationLevel::Confirmed))));
    let session = h.session();

    let received = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&received);
    let receipt = session
        .send_instruction_in_next_block(
            "move_right",
            move_right_ix(&session.wallet_pubkey()),
            &CancelSignal::never(),
            Some(move |sig: Signature| {
                *slot.lock().unwrap() = Some(sig);
            }),
        )
        .await
        .unwrap();

    assert!(receipt.is_confirmed());
    let signature = receipt.signature().expect("sent");
    assert_eq!(*received.lock().unwrap(), Some(signature));

    let events = h.drain();
    assert_eq!(
        transaction_statuses(&events),
        vec![
            TransactionInfoStatus::Pending,
            TransactionInfoStatus::SignatureReady(signature.to_string()),
            TransactionInfoStatus::Confirmed,
        ]
    );
    // One from the poller, one from the session once the callback runs
    assert_eq!(value_changed_count(&events), 2);
}

#[tokio::test(start_paused = true)]
async fn test_next_block_send_without_callback_does_not_poll() {
    let mut h = Harness::new();
    let session = h.session();

    let receipt = session
        .send_instruction_in_next_block::<fn(Signature)>(
            "move_right",
            move_right_ix(&session.wallet_pubkey()),
            &CancelSignal::never(),
            None,
        )
        .await
        .unwrap();

    assert!(receipt.confirmation.is_none());
    assert!(receipt.signature().is_some());
    assert_eq!(h.rpc.status_calls(), 0);

    let events = h.drain();
    assert_eq!(transaction_statuses(&events).len(), 2);
    assert_eq!(value_changed_count(&events), 0);
}

#[tokio::test(start_paused = true)]
async fn test_callback_runs_even_when_confirmation_times_out() {
    let h = Harness::new();
    let session = h.session();
    let called = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&called);

    let receipt = session
        .send_instruction_in_next_block(
            "move_right",
            move_right_ix(&session.wallet_pubkey()),
            &CancelSignal::never(),
            Some(move |_sig: Signature| *flag.lock().unwrap() = true),
        )
        .await
        .unwrap();

    assert_eq!(
        receipt.confirmation.as_ref().map(|c| c.state.clone()),
        Some(PollState::TimedOut)
    );
    assert!(*called.lock().unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_signing_failure_reported_on_bus() {
    let mut h = Harness::with_signer(MockSigner::with_behavior(SignerBehavior::Fail));
    let session = h.session();

    let result = session
        .submit_and_confirm(
            "move_right",
            &[move_right_ix(&session.wallet_pubkey())],
            ConfirmationLevel::Confirmed,
            &CancelSignal::never(),
        )
        .await;
    assert!(result.is_err());

    let statuses = transaction_statuses(&h.drain());
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[0], TransactionInfoStatus::Pending);
    assert!(matches!(
        &statuses[1],
        TransactionInfoStatus::Error(reason) if reason.contains("User rejected")
    ));
}

#[tokio::test(start_paused = true)]
async fn test_refused_send_skips_confirmation() {
    let mut h = Harness::new();
    h.rpc.push_send(Err(MockRpc::server_error(-32002)));
    let session = h.session();

    let receipt = session
        .submit_and_confirm(
            "move_right",
            &[move_right_ix(&session.wallet_pubkey())],
            ConfirmationLevel::Confirmed,
            &CancelSignal::never(),
        )
        .await
        .unwrap();

    assert!(receipt.confirmation.is_none());
    assert!(!receipt.is_confirmed());
    assert_eq!(h.rpc.status_calls(), 0);

    let statuses = transaction_statuses(&h.drain());
    assert!(matches!(statuses.last(), Some(TransactionInfoStatus::Error(_))));
}

#[tokio::test(start_paused = true)]
async fn test_callback_runs_once_when_send_is_refused() {
    let mut h = Harness::new();
    h.rpc.push_send(Err(MockRpc::server_error(-32002)));
    let session = h.session();
    let received = Arc::new(Mutex::new(Vec::new()));
    let calls = Arc::clone(&received);

    let receipt = session
        .send_instruction_in_next_block(
            "move_right",
            move_right_ix(&session.wallet_pubkey()),
            &CancelSignal::never(),
            Some(move |sig: Signature| calls.lock().unwrap().push(sig)),
        )
        .await
        .unwrap();

    assert!(receipt.confirmation.is_none());
    assert_eq!(*received.lock().unwrap(), vec![Signature::default()]);
    assert_eq!(h.rpc.status_calls(), 0);
    assert_eq!(value_changed_count(&h.drain()), 1);
}

#[tokio::test(start_paused = true)]
async fn test_callback_runs_once_when_signing_fails() {
    let mut h = Harness::with_signer(MockSigner::with_behavior(SignerBehavior::Fail));
    let session = h.session();
    let received = Arc::new(Mutex::new(Vec::new()));
    let calls = Arc::clone(&received);

    let result = session
        .send_instruction_in_next_block(
            "move_right",
            move_right_ix(&session.wallet_pubkey()),
            &CancelSignal::never(),
            Some(move |sig: Signature| calls.lock().unwrap().push(sig)),
        )
        .await;

    assert!(result.is_err());
    assert_eq!(*received.lock().unwrap(), vec![Signature::default()]);
    assert_eq!(value_changed_count(&h.drain()), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sol_transfer() {
    let h = Harness::new();
    h.rpc
        .push_status(Ok(Some(status_at(ConfirmationLevel::Confirmed))));
    let session = h.session();
    let to = Pubkey::new_unique();

    let receipt = session
        .transfer_sol(&to, 1_000_000, &CancelSignal::never())
        .await
        .unwrap();
    assert!(receipt.is_confirmed());

    let sent = h.rpc.sent_transactions();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message.instructions.len(), 1);
    assert_eq!(sent[0].message.program_id(0), Some(&system_program::id()));
    assert_eq!(sent[0].message.account_keys[0], h.signer.pubkey());
}

#[tokio::test(start_paused = true)]
async fn test_token_transfer_creates_destination_account_when_missing() {
    let h = Harness::new();
    h.rpc
        .set_status_fallback(Some(status_at(ConfirmationLevel::Confirmed)));
    let session = h.session();
    let mint = Pubkey::new_unique();
    let holder = Pubkey::new_unique();
    let newcomer = Pubkey::new_unique();
    h.rpc.add_token_account(holder, mint);

    session
        .transfer_token(&holder, &mint, 500, &CancelSignal::never())
        .await
        .unwrap();
    session
        .transfer_token(&newcomer, &mint, 500, &CancelSignal::never())
        .await
        .unwrap();

    let sent = h.rpc.sent_transactions();
    assert_eq!(sent.len(), 2);

    assert_eq!(sent[0].message.instructions.len(), 1);
    assert_eq!(sent[0].message.program_id(0), Some(&spl_token::id()));

    assert_eq!(sent[1].message.instructions.len(), 2);
    assert_eq!(
        sent[1].message.program_id(0),
        Some(&spl_associated_token_account::id())
    );
    assert_eq!(sent[1].message.program_id(1), Some(&spl_token::id()));
}

#[tokio::test(start_paused = true)]
async fn test_nft_transfer_moves_one_unit() {
    let h = Harness::new();
    h.rpc
        .set_status_fallback(Some(status_at(ConfirmationLevel::Confirmed)));
    let session = h.session();
    let mint = Pubkey::new_unique();
    let destination = Pubkey::new_unique();
    h.rpc.add_token_account(destination, mint);

    session
        .transfer_nft(&destination, &mint, &Pubkey::new_unique(), &CancelSignal::never())
        .await
        .unwrap();

    let sent = h.rpc.sent_transactions();
    let data = &sent[0].message.instructions[0].data;
    // spl-token Transfer: tag 3 then amount
    assert_eq!(data[0], 3);
    assert_eq!(u64::from_le_bytes(data[1..9].try_into().unwrap()), 1);
}

#[test]
fn test_parse_pubkey_names_field() {
    let key = Pubkey::new_unique();
    assert_eq!(parse_pubkey("mint", &key.to_string()).unwrap(), key);

    let err = parse_pubkey("mint", "not-a-key").unwrap_err();
    assert!(err.to_string().contains("mint"));
}
