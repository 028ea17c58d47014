//! A signed-in player session: one wallet, one submitter, one poller
//!
//! UI actions come through here. Each one announces itself on the event bus,
//! submits with the session wallet and optionally waits for confirmation.

use solana_sdk::{instruction::Instruction, pubkey::Pubkey, signature::Signature};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cancel::CancelSignal;
use crate::confirmation::{ConfirmationOutcome, ConfirmationPoller};
use crate::events::{EventBus, TransactionInfoStatus};
use crate::observability::CorrelationId;
use crate::tx_builder::{
    plan_nft_transfer, plan_sol_transfer, plan_token_transfer_from_ata, SubmitError,
    SubmitOutcome, TransactionSubmitter,
};
use crate::types::ConfirmationLevel;
use crate::wallet::TransactionSigner;

/// Submission plus, when requested, its confirmation
#[derive(Debug, Clone)]
pub struct SessionReceipt {
    pub submit: SubmitOutcome,
    pub confirmation: Option<ConfirmationOutcome>,
}

impl SessionReceipt {
    pub fn signature(&self) -> Option<Signature> {
        self.submit.confirmed_signature().copied()
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmation
            .as_ref()
            .map_or(false, ConfirmationOutcome::is_success)
    }
}

pub struct TxSession {
    submitter: Arc<TransactionSubmitter>,
    poller: Arc<ConfirmationPoller>,
    wallet: Arc<dyn TransactionSigner>,
    events: EventBus,
}

impl TxSession {
    pub fn new(
        submitter: Arc<TransactionSubmitter>,
        poller: Arc<ConfirmationPoller>,
        wallet: Arc<dyn TransactionSigner>,
        events: EventBus,
    ) -> Self {
        Self {
            submitter,
            poller,
            wallet,
            events,
        }
    }

    pub fn wallet_pubkey(&self) -> Pubkey {
        self.wallet.pubkey()
    }

    pub fn submitter(&self) -> &Arc<TransactionSubmitter> {
        &self.submitter
    }

    pub fn poller(&self) -> &Arc<ConfirmationPoller> {
        &self.poller
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Submit one instruction in the next block with the session wallet
    ///
    /// With `on_done`, waits for the default target level, then raises
    /// `ValueChanged` and calls `on_done` exactly once, whatever happened:
    /// confirmed, timed out, refused by the node or failed before sending.
    /// The callback gets the default signature when nothing was sent.
    pub async fn send_instruction_in_next_block<F>(
        &self,
        name: &str,
        instruction: Instruction,
        cancel: &CancelSignal,
        on_done: Option<F>,
    ) -> Result<SessionReceipt, SubmitError>
    where
        F: FnOnce(Signature) + Send,
    {
        let wait = on_done.is_some();
        let result = self
            .run(name, &[instruction], wait, self.poller.default_target(), cancel)
            .await;

        if let Some(on_done) = on_done {
            let signature = match &result {
                Ok(receipt) => {
                    match &receipt.confirmation {
                        Some(c) if c.is_success() => {}
                        Some(c) => warn!(name, state = ?c.state, "Finished without confirmation"),
                        None => warn!(name, reason = ?receipt.submit.reason, "Send refused"),
                    }
                    receipt.signature()
                }
                Err(e) => {
                    warn!(name, error = %e, "Submission failed");
                    None
                }
            };
            self.events.value_changed();
            on_done(signature.unwrap_or_default());
        }
        result
    }

    /// Submit `instructions` and wait for `target`
    pub async fn submit_and_confirm(
        &self,
        name: &str,
        instructions: &[Instruction],
        target: ConfirmationLevel,
        cancel: &CancelSignal,
    ) -> Result<SessionReceipt, SubmitError> {
        self.run(name, instructions, true, target, cancel).await
    }

    pub async fn transfer_sol(
        &self,
        to: &Pubkey,
        lamports: u64,
        cancel: &CancelSignal,
    ) -> Result<SessionReceipt, SubmitError> {
        info!(from = %self.wallet_pubkey(), to = %to, lamports, "Transferring SOL");
        let plan = plan_sol_transfer(&self.wallet_pubkey(), to, lamports);
        let target = self.poller.default_target();
        self.submit_and_confirm("transfer_sol", &plan.instructions, target, cancel)
            .await
    }

    /// Transfer `amount` base units of `mint` from the wallet's ATA
    pub async fn transfer_token(
        &self,
        destination: &Pubkey,
        mint: &Pubkey,
        amount: u64,
        cancel: &CancelSignal,
    ) -> Result<SessionReceipt, SubmitError> {
        let has_account = self.destination_has_account(destination, mint, cancel).await?;
        let plan = plan_token_transfer_from_ata(
            &self.wallet_pubkey(),
            destination,
            mint,
            amount,
            has_account,
        )?;
        let target = self.poller.default_target();
        self.submit_and_confirm("transfer_token", &plan.instructions, target, cancel)
            .await
    }

    /// Move one NFT out of `source_token_account`
    pub async fn transfer_nft(
        &self,
        destination: &Pubkey,
        mint: &Pubkey,
        source_token_account: &Pubkey,
        cancel: &CancelSignal,
    ) -> Result<SessionReceipt, SubmitError> {
        let has_account = self.destination_has_account(destination, mint, cancel).await?;
        let plan = plan_nft_transfer(
            &self.wallet_pubkey(),
            destination,
            mint,
            source_token_account,
            has_account,
        )?;
        let target = self.poller.default_target();
        self.submit_and_confirm("transfer_nft", &plan.instructions, target, cancel)
            .await
    }

    async fn destination_has_account(
        &self,
        destination: &Pubkey,
        mint: &Pubkey,
        cancel: &CancelSignal,
    ) -> Result<bool, SubmitError> {
        let lookup = cancel
            .run(self.submitter.rpc().token_account_exists(destination, mint))
            .await
            .ok_or(SubmitError::Cancelled("token account lookup"))?;

        // Failed lookup counts as no account
        match lookup {
            Ok(exists) => Ok(exists),
            Err(e) => {
                warn!(
                    owner = %destination,
                    mint = %mint,
                    error = %e,
                    "Token account lookup failed"
                );
                Ok(false)
            }
        }
    }

    async fn run(
        &self,
        name: &str,
        instructions: &[Instruction],
        wait: bool,
        target: ConfirmationLevel,
        cancel: &CancelSignal,
    ) -> Result<SessionReceipt, SubmitError> {
        let payer = self.wallet.pubkey();
        let id = CorrelationId::new();
        self.events.transaction_info(name, &id, TransactionInfoStatus::Pending);

        let submit = match self
            .submitter
            .submit_tagged(name, instructions, &payer, self.wallet.as_ref(), cancel, id)
            .await
        {
            Ok(submit) => submit,
            Err(e) => {
                let status = TransactionInfoStatus::Error(e.to_string());
                self.events.transaction_info(name, &id, status);
                return Err(e);
            }
        };

        let Some(signature) = submit.confirmed_signature().copied() else {
            let reason = submit.reason.clone().unwrap_or_else(|| "send refused".to_string());
            self.events.transaction_info(name, &id, TransactionInfoStatus::Error(reason));
            return Ok(SessionReceipt {
                submit,
                confirmation: None,
            });
        };
        self.events.signature_ready(name, &id, &signature);

        if !wait {
            return Ok(SessionReceipt {
                submit,
                confirmation: None,
            });
        }

        let confirmation = self
            .poller
            .wait_for(&signature.to_string(), target, cancel)
            .await;
        let status = if confirmation.is_success() {
            TransactionInfoStatus::Confirmed
        } else {
            TransactionInfoStatus::Error(format!("{:?}", confirmation.state))
        };
        self.events.transaction_info(name, &id, status);

        Ok(SessionReceipt {
            submit,
            confirmation: Some(confirmation),
        })
    }
}

/// Parse a base58 pubkey argument, naming the field on failure
pub fn parse_pubkey(field: &str, value: &str) -> Result<Pubkey, SubmitError> {
    Pubkey::from_str(value).map_err(|e| {
        SubmitError::InvalidRequest(format!("{} is not a valid pubkey: {}", field, e))
    })
}
