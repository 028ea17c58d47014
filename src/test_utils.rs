//! Test Utilities Module
//!
//! Scriptable stand-ins for the RPC node and the wallet so the submitter,
//! poller and program client can be driven without a network.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::rpc_manager::{ChainRpc, RpcManagerError, RpcResult};
use crate::types::{ConfirmationLevel, SignatureStatusReport};
use crate::wallet::TransactionSigner;

pub const MOCK_ENDPOINT: &str = "mock://rpc";

#[derive(Default)]
struct MockState {
    blockhashes: VecDeque<RpcResult<Hash>>,
    statuses: VecDeque<RpcResult<Option<SignatureStatusReport>>>,
    status_fallback: Option<SignatureStatusReport>,
    sends: VecDeque<RpcResult<Signature>>,
    accounts: HashMap<Pubkey, Vec<u8>>,
    program_accounts: Vec<(Pubkey, Vec<u8>)>,
    token_accounts: HashSet<(Pubkey, Pubkey)>,
    sent: Vec<Transaction>,
    blockhash_calls: usize,
    status_calls: usize,
}

/// In-memory `ChainRpc` with per-method response queues
///
/// Each call pops the next scripted response; an empty queue falls back to
/// a fresh unique blockhash, "no status yet", or echoing the transaction's
/// first signature.
#[derive(Clone, Default)]
pub struct MockRpc {
    state: Arc<Mutex<MockState>>,
}

impl MockRpc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rate_limited() -> RpcManagerError {
        RpcManagerError::RateLimitExceeded {
            endpoint: MOCK_ENDPOINT.to_string(),
        }
    }

    pub fn server_error(code: i64) -> RpcManagerError {
        RpcManagerError::RpcResponse {
            endpoint: MOCK_ENDPOINT.to_string(),
            message: format!("server error {}", code),
            code: Some(code),
        }
    }

    pub fn push_blockhash(&self, result: RpcResult<Hash>) -> &Self {
        self.state.lock().blockhashes.push_back(result);
        self
    }

    pub fn push_status(&self, result: RpcResult<Option<SignatureStatusReport>>) -> &Self {
        self.state.lock().statuses.push_back(result);
        self
    }

    /// Status returned once the scripted queue is empty
    pub fn set_status_fallback(&self, report: Option<SignatureStatusReport>) -> &Self {
        self.state.lock().status_fallback = report;
        self
    }

    pub fn push_send(&self, result: RpcResult<Signature>) -> &Self {
        self.state.lock().sends.push_back(result);
        self
    }

    pub fn insert_account(&self, address: Pubkey, data: Vec<u8>) -> &Self {
        self.state.lock().accounts.insert(address, data);
        self
    }

    pub fn add_program_account(&self, address: Pubkey, data: Vec<u8>) -> &Self {
        self.state.lock().program_accounts.push((address, data));
        self
    }

    pub fn add_token_account(&self, owner: Pubkey, mint: Pubkey) -> &Self {
        self.state.lock().token_accounts.insert((owner, mint));
        self
    }

    pub fn sent_transactions(&self) -> Vec<Transaction> {
        self.state.lock().sent.clone()
    }

    pub fn blockhash_calls(&self) -> usize {
        self.state.lock().blockhash_calls
    }

    pub fn status_calls(&self) -> usize {
        self.state.lock().status_calls
    }

    pub fn into_dyn(self) -> Arc<dyn ChainRpc> {
        Arc::new(self)
    }
}

#[async_trait]
impl ChainRpc for MockRpc {
    fn endpoint(&self) -> &str {
        MOCK_ENDPOINT
    }

    async fn latest_blockhash(&self, _commitment: CommitmentConfig) -> RpcResult<Hash> {
        let mut state = self.state.lock();
        state.blockhash_calls += 1;
        state
            .blockhashes
            .pop_front()
            .unwrap_or_else(|| Ok(Hash::new_unique()))
    }

    async fn signature_status(
        &self,
        _signature: &Signature,
    ) -> RpcResult<Option<SignatureStatusReport>> {
        let mut state = self.state.lock();
        state.status_calls += 1;
        match state.statuses.pop_front() {
            Some(result) => result,
            None => Ok(state.status_fallback.clone()),
        }
    }

    async fn account_data(
        &self,
        address: &Pubkey,
        _commitment: CommitmentConfig,
    ) -> RpcResult<Option<Vec<u8>>> {
        Ok(self.state.lock().accounts.get(address).cloned())
    }

    async fn program_accounts(
        &self,
        _program_id: &Pubkey,
        discriminator: [u8; 8],
        _commitment: CommitmentConfig,
    ) -> RpcResult<Vec<(Pubkey, Vec<u8>)>> {
        Ok(self
            .state
            .lock()
            .program_accounts
            .iter()
            .filter(|(_, data)| data.starts_with(&discriminator))
            .cloned()
            .collect())
    }

    async fn token_account_exists(&self, owner: &Pubkey, mint: &Pubkey) -> RpcResult<bool> {
        Ok(self.state.lock().token_accounts.contains(&(*owner, *mint)))
    }

    async fn send_transaction(&self, transaction: &Transaction) -> RpcResult<Signature> {
        let mut state = self.state.lock();
        state.sent.push(transaction.clone());
        match state.sends.pop_front() {
            Some(result) => result,
            None => Ok(transaction.signatures.first().copied().unwrap_or_default()),
        }
    }
}

/// How a [`MockSigner`] treats the transactions it receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerBehavior {
    Sign,
    /// Return an error, as a user rejecting the prompt would
    Fail,
    /// Hand the transaction back untouched
    Skip,
    /// Never answer, as a wallet prompt left open
    Stall,
}

pub struct MockSigner {
    keypair: Keypair,
    behavior: SignerBehavior,
}

impl MockSigner {
    pub fn new() -> Self {
        Self::with_behavior(SignerBehavior::Sign)
    }

    pub fn failing() -> Self {
        Self::with_behavior(SignerBehavior::Fail)
    }

    pub fn with_behavior(behavior: SignerBehavior) -> Self {
        Self {
            keypair: Keypair::new(),
            behavior,
        }
    }

    /// Same key, different behavior; models one wallet that declines once
    pub fn with_same_key(&self, behavior: SignerBehavior) -> Self {
        Self {
            keypair: self.keypair.insecure_clone(),
            behavior,
        }
    }
}

impl Default for MockSigner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionSigner for MockSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction(&self, mut transaction: Transaction) -> Result<Transaction> {
        match self.behavior {
            SignerBehavior::Sign => {
                let blockhash = transaction.message.recent_blockhash;
                transaction.try_partial_sign(&[&self.keypair], blockhash)?;
                Ok(transaction)
            }
            SignerBehavior::Fail => Err(anyhow::anyhow!("User rejected the signature request")),
            SignerBehavior::Skip => Ok(transaction),
            SignerBehavior::Stall => std::future::pending().await,
        }
    }
}

/// Status report at `level` with a plausible confirmation count
pub fn status_at(level: ConfirmationLevel) -> SignatureStatusReport {
    SignatureStatusReport {
        confirmations: match level {
            ConfirmationLevel::Processed => Some(0),
            ConfirmationLevel::Confirmed => Some(1),
            ConfirmationLevel::Finalized => None,
        },
        ..SignatureStatusReport::at_level(level)
    }
}
