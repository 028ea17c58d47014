//! Transaction submission
//!
//! The component is split into focused modules:
//! - **errors**: error taxonomy with retryability and categories
//! - **blockhash**: per-fee-payer blockhash claim and fetch retry policy
//! - **output**: `SubmitOutcome` returned for every send
//! - **submitter**: assemble, sign, size-check and send
//! - **transfers**: SOL / SPL token / NFT instruction planning
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use adventure_client::cancel::CancelSignal;
//! use adventure_client::tx_builder::{SubmitError, TransactionSubmitter};
//! use adventure_client::wallet::{TransactionSigner, WalletManager};
//! use solana_sdk::instruction::Instruction;
//!
//! # async fn example(
//! #     submitter: &TransactionSubmitter,
//! #     wallet: &WalletManager,
//! #     ix: Instruction,
//! # ) -> Result<(), SubmitError> {
//! let outcome = submitter
//!     .submit("move_right", &[ix], &wallet.pubkey(), wallet, &CancelSignal::never())
//!     .await?;
//! if !outcome.success {
//!     eprintln!("refused: {:?}", outcome.reason);
//! }
//! # Ok(())
//! # }
//! ```

pub mod blockhash;
pub mod errors;
pub mod output;
pub mod submitter;
pub mod transfers;

pub use blockhash::{BlockhashGuard, BlockhashRetryPolicy};
pub use errors::SubmitError;
pub use output::SubmitOutcome;
pub use submitter::TransactionSubmitter;
pub use transfers::{
    plan_nft_transfer, plan_sol_transfer, plan_token_transfer, plan_token_transfer_from_ata,
    TransferPlan,
};
