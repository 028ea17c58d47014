//! Transaction submission with per-fee-payer blockhash pinning
//!
//! Flow for one submission:
//! 1. fetch a recent blockhash, retrying transient failures with linear
//!    backoff and refetching when the node hands back the fee payer's
//!    previous hash
//! 2. assemble and sign the transaction
//! 3. check the serialized size against the packet limit
//! 4. claim the blockhash for the fee payer; losing the claim to a
//!    concurrent submission starts over at 1
//! 5. send it; a refused send becomes an unsuccessful [`SubmitOutcome`]
//!
//! A submission that fails before step 4 leaves the payer's last hash as it
//! was, so the next send may still use the same block.

use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, instruction::Instruction, message::Message,
    packet::PACKET_DATA_SIZE, pubkey::Pubkey, transaction::Transaction,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::blockhash::{BlockhashGuard, BlockhashRetryPolicy};
use super::errors::SubmitError;
use super::output::SubmitOutcome;
use crate::cancel::CancelSignal;
use crate::config::Config;
use crate::events::{EventBus, LogLevel};
use crate::metrics::metrics;
use crate::observability::CorrelationId;
use crate::rpc_manager::{ChainRpc, RpcManagerError};
use crate::wallet::TransactionSigner;

pub struct TransactionSubmitter {
    rpc: Arc<dyn ChainRpc>,
    events: EventBus,
    blockhashes: BlockhashGuard,
    retry: BlockhashRetryPolicy,
    commitment: CommitmentConfig,
}

impl TransactionSubmitter {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        events: EventBus,
        retry: BlockhashRetryPolicy,
        commitment: CommitmentConfig,
    ) -> Self {
        Self {
            rpc,
            events,
            blockhashes: BlockhashGuard::new(),
            retry,
            commitment,
        }
    }

    pub fn from_config(rpc: Arc<dyn ChainRpc>, events: EventBus, config: &Config) -> Self {
        Self::new(
            rpc,
            events,
            BlockhashRetryPolicy::from_config(&config.blockhash),
            config.commitment(),
        )
    }

    pub fn rpc(&self) -> &Arc<dyn ChainRpc> {
        &self.rpc
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn blockhash_guard(&self) -> &BlockhashGuard {
        &self.blockhashes
    }

    /// Assemble, sign and send `instructions` paid for by `fee_payer`
    ///
    /// `Err` means nothing reached the node. A send the node refused is
    /// `Ok` with `success == false`.
    #[instrument(skip_all, fields(name = name, fee_payer = %fee_payer))]
    pub async fn submit(
        &self,
        name: &str,
        instructions: &[Instruction],
        fee_payer: &Pubkey,
        signer: &dyn TransactionSigner,
        cancel: &CancelSignal,
    ) -> Result<SubmitOutcome, SubmitError> {
        self.submit_tagged(name, instructions, fee_payer, signer, cancel, CorrelationId::new())
            .await
    }

    /// [`submit`](Self::submit) under a caller-chosen correlation id
    pub async fn submit_tagged(
        &self,
        name: &str,
        instructions: &[Instruction],
        fee_payer: &Pubkey,
        signer: &dyn TransactionSigner,
        cancel: &CancelSignal,
        correlation_id: CorrelationId,
    ) -> Result<SubmitOutcome, SubmitError> {
        metrics().submissions_total.inc();

        let result = self
            .submit_inner(name, instructions, fee_payer, signer, cancel, correlation_id)
            .await;

        match &result {
            Ok(outcome) if outcome.success => {}
            Ok(_) => metrics().submissions_failed.inc(),
            Err(e) => {
                metrics().submissions_failed.inc();
                warn!(error = %e, category = e.category(), "Submission aborted");
            }
        }
        result
    }

    async fn submit_inner(
        &self,
        name: &str,
        instructions: &[Instruction],
        fee_payer: &Pubkey,
        signer: &dyn TransactionSigner,
        cancel: &CancelSignal,
        correlation_id: CorrelationId,
    ) -> Result<SubmitOutcome, SubmitError> {
        if instructions.is_empty() {
            return Err(SubmitError::InvalidRequest(format!(
                "{} has no instructions",
                name
            )));
        }

        let (blockhash, signed, serialized_size) = loop {
            let blockhash = self.fresh_blockhash(fee_payer, cancel).await?;
            let (signed, size) = self
                .sign_checked(instructions, fee_payer, &blockhash, signer, cancel)
                .await?;
            if self.blockhashes.try_claim(fee_payer, blockhash) {
                debug!(%blockhash, correlation_id = %correlation_id, "Blockhash claimed");
                break (blockhash, signed, size);
            }
            debug!(%blockhash, "Blockhash taken by a concurrent submission, refetching");
        };

        let signature = signed.signatures.first().copied();
        let sent = cancel
            .run(self.rpc.send_transaction(&signed))
            .await
            .ok_or(SubmitError::Cancelled("send"))?;

        match sent {
            Ok(returned) => {
                info!(
                    signature = %returned,
                    correlation_id = %correlation_id,
                    size = serialized_size,
                    "Transaction sent"
                );
                Ok(SubmitOutcome {
                    signature: Some(returned),
                    blockhash,
                    success: true,
                    reason: None,
                    correlation_id,
                    serialized_size,
                })
            }
            Err(e) => {
                let reason = e.to_string();
                self.events.log(reason.clone(), LogLevel::Warning);
                Ok(SubmitOutcome {
                    signature,
                    blockhash,
                    success: false,
                    reason: Some(reason),
                    correlation_id,
                    serialized_size,
                })
            }
        }
    }

    /// Sign against `blockhash` and enforce the packet size limit
    async fn sign_checked(
        &self,
        instructions: &[Instruction],
        fee_payer: &Pubkey,
        blockhash: &Hash,
        signer: &dyn TransactionSigner,
        cancel: &CancelSignal,
    ) -> Result<(Transaction, usize), SubmitError> {
        let message = Message::new_with_blockhash(instructions, Some(fee_payer), blockhash);
        let unsigned = Transaction::new_unsigned(message);

        let signed = cancel
            .run(signer.sign_transaction(unsigned))
            .await
            .ok_or(SubmitError::Cancelled("signing"))?
            .map_err(|e| SubmitError::signing(format!("{:#}", e)))?;

        if !signed.is_signed() {
            return Err(SubmitError::signing("transaction is missing a required signature"));
        }

        let size = bincode::serialized_size(&signed)
            .map_err(|e| SubmitError::Serialize(e.to_string()))? as usize;
        if size > PACKET_DATA_SIZE {
            return Err(SubmitError::TransactionTooLarge {
                size,
                limit: PACKET_DATA_SIZE,
            });
        }
        Ok((signed, size))
    }

    /// Fetch a blockhash other than the one the fee payer used last
    ///
    /// Nothing is claimed here; the submitter claims the hash only once the
    /// transaction is signed and within size.
    pub async fn fresh_blockhash(
        &self,
        fee_payer: &Pubkey,
        cancel: &CancelSignal,
    ) -> Result<Hash, SubmitError> {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let fetched = cancel
                .run(self.rpc.latest_blockhash(self.commitment))
                .await
                .ok_or(SubmitError::Cancelled("blockhash fetch"))?;

            match fetched {
                Ok(hash) => {
                    if self.blockhashes.is_fresh(fee_payer, &hash) {
                        if attempt > 1 {
                            debug!(attempts = attempt, "Blockhash obtained after retry");
                        }
                        return Ok(hash);
                    }
                    debug!(%hash, attempt, "Node returned the previous blockhash, refetching");
                }
                Err(e) if e.is_retryable() => self.report_blockhash_error(&e, attempt),
                Err(e) => {
                    warn!(error = %e, "Permanent error, not retrying blockhash fetch");
                    self.report_blockhash_error(&e, attempt);
                    return Err(SubmitError::Rpc(e));
                }
            }

            if !self.retry.allows(attempt + 1) {
                return Err(SubmitError::blockhash(format!(
                    "no fresh blockhash after {} attempts",
                    attempt
                )));
            }

            metrics().blockhash_retries.inc();
            if !cancel.sleep(self.retry.backoff(attempt)).await {
                return Err(SubmitError::Cancelled("blockhash backoff"));
            }
        }
    }

    fn report_blockhash_error(&self, error: &RpcManagerError, attempt: u32) {
        let message = if error.is_rate_limited() {
            "Rate limit reached!".to_string()
        } else {
            match error.server_code() {
                Some(code) => format!("Rpc error: {}", code),
                None => format!("Rpc error: {}", error.category()),
            }
        };
        debug!(error = %error, attempt, "Blockhash fetch failed");
        self.events.log(message, LogLevel::Warning);
    }
}

impl std::fmt::Debug for TransactionSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionSubmitter")
            .field("endpoint", &self.rpc.endpoint())
            .field("retry", &self.retry)
            .field("commitment", &self.commitment)
            .finish()
    }
}
