//! `ChainRpc` over the nonblocking `solana-client` RpcClient

use async_trait::async_trait;
use solana_account_decoder::UiAccountEncoding;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::{
    config::{RpcAccountInfoConfig, RpcProgramAccountsConfig, RpcSendTransactionConfig},
    filter::{Memcmp, MemcmpEncodedBytes, RpcFilterType},
    request::TokenAccountsFilter,
};
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};
use solana_transaction_status::UiTransactionEncoding;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

use super::{ChainRpc, RpcManagerError, RpcResult};
use crate::metrics::metrics;
use crate::types::{ConfirmationLevel, SignatureStatusReport};

/// HTTP JSON-RPC client bound to one endpoint
pub struct SolanaRpc {
    url: String,
    client: RpcClient,
    timeout: Duration,
    skip_preflight: bool,
}

impl std::fmt::Debug for SolanaRpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaRpc")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .field("skip_preflight", &self.skip_preflight)
            .finish_non_exhaustive()
    }
}

impl SolanaRpc {
    pub fn new(
        url: &str,
        timeout: Duration,
        commitment: CommitmentConfig,
        skip_preflight: bool,
    ) -> Self {
        Self {
            url: url.to_string(),
            client: RpcClient::new_with_timeout_and_commitment(
                url.to_string(),
                timeout,
                commitment,
            ),
            timeout,
            skip_preflight,
        }
    }

    fn classify(&self, err: solana_client::client_error::ClientError) -> RpcManagerError {
        let classified = RpcManagerError::from_client_error(&err, &self.url, self.timeout);
        if classified.is_rate_limited() {
            metrics().rate_limited_total.inc();
        }
        classified
    }

    fn observe(started: Instant) {
        metrics().rpc_latency.observe(started.elapsed().as_secs_f64());
    }
}

#[async_trait]
impl ChainRpc for SolanaRpc {
    fn endpoint(&self) -> &str {
        &self.url
    }

    #[instrument(skip(self), fields(endpoint = %self.url))]
    async fn latest_blockhash(&self, commitment: CommitmentConfig) -> RpcResult<Hash> {
        let started = Instant::now();
        let result = self
            .client
            .get_latest_blockhash_with_commitment(commitment)
            .await
            .map(|(hash, _last_valid_height)| hash)
            .map_err(|e| self.classify(e));
        Self::observe(started);
        result
    }

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> RpcResult<Option<SignatureStatusReport>> {
        let started = Instant::now();
        let response = self
            .client
            .get_signature_statuses_with_history(&[*signature])
            .await
            .map_err(|e| self.classify(e));
        Self::observe(started);

        let status = response?.value.into_iter().next().flatten();
        Ok(status.map(|status| SignatureStatusReport {
            slot: status.slot,
            confirmations: status.confirmations,
            level: ConfirmationLevel::from(status.confirmation_status()),
            err: status.err.map(|e| e.to_string()),
        }))
    }

    async fn account_data(
        &self,
        address: &Pubkey,
        commitment: CommitmentConfig,
    ) -> RpcResult<Option<Vec<u8>>> {
        let started = Instant::now();
        let response = self
            .client
            .get_account_with_commitment(address, commitment)
            .await
            .map_err(|e| self.classify(e));
        Self::observe(started);

        Ok(response?.value.map(|account| account.data))
    }

    async fn program_accounts(
        &self,
        program_id: &Pubkey,
        discriminator: [u8; 8],
        commitment: CommitmentConfig,
    ) -> RpcResult<Vec<(Pubkey, Vec<u8>)>> {
        let filter = RpcFilterType::Memcmp(Memcmp::new(
            0,
            MemcmpEncodedBytes::Base58(bs58::encode(discriminator).into_string()),
        ));
        let config = RpcProgramAccountsConfig {
            filters: Some(vec![filter]),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(commitment),
                data_slice: None,
                min_context_slot: None,
            },
            with_context: None,
            sort_results: None,
        };

        let started = Instant::now();
        let accounts = self
            .client
            .get_program_accounts_with_config(program_id, config)
            .await
            .map_err(|e| self.classify(e));
        Self::observe(started);

        let accounts = accounts?;
        debug!(program = %program_id, count = accounts.len(), "Program accounts fetched");
        Ok(accounts
            .into_iter()
            .map(|(address, account)| (address, account.data))
            .collect())
    }

    async fn token_account_exists(&self, owner: &Pubkey, mint: &Pubkey) -> RpcResult<bool> {
        let started = Instant::now();
        let accounts = self
            .client
            .get_token_accounts_by_owner(owner, TokenAccountsFilter::Mint(*mint))
            .await
            .map_err(|e| self.classify(e));
        Self::observe(started);

        Ok(!accounts?.is_empty())
    }

    #[instrument(skip(self, transaction), fields(endpoint = %self.url))]
    async fn send_transaction(&self, transaction: &Transaction) -> RpcResult<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight: self.skip_preflight,
            preflight_commitment: Some(CommitmentLevel::Confirmed),
            encoding: Some(UiTransactionEncoding::Base64),
            ..Default::default()
        };

        let started = Instant::now();
        let result = self
            .client
            .send_transaction_with_config(transaction, config)
            .await
            .map_err(|e| self.classify(e));
        Self::observe(started);
        result
    }
}
