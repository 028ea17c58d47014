//! Adventure Client - Solana game client library
//!
//! Encodes instructions and decodes accounts for the adventure program,
//! submits transactions with per-fee-payer blockhash pinning, polls
//! signatures to a target commitment and reports everything on an event bus.

#![warn(unused_imports)]
#![warn(unused_mut)]
#![warn(dead_code)]
#![warn(unused_must_use)]

pub mod cancel;
pub mod config;
pub mod confirmation;
pub mod endpoints;
pub mod events;
pub mod metrics;
pub mod observability;
pub mod pricing;
pub mod program;
pub mod session;
pub mod tx_builder;
pub mod types;
pub mod wallet;

// Component modules with non-standard paths (directories with spaces)
#[path = "rpc manager/mod.rs"]
pub mod rpc_manager;

pub mod test_utils;

// Re-export commonly used types
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use config::Config;
pub use confirmation::{ConfirmationOutcome, ConfirmationPoller, PollState};
pub use events::{ClientEvent, EventBus};
pub use session::TxSession;
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
pub use tx_builder::{SubmitError, SubmitOutcome, TransactionSubmitter};
pub use types::ConfirmationLevel;
