//! RPC Manager Module
//!
//! The `ChainRpc` seam the submitter, poller and program client talk to, plus
//! its `solana-client` implementation and the account-change watcher.

use async_trait::async_trait;
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};

use crate::types::SignatureStatusReport;

// Submodules
pub mod rpc_client;
pub mod rpc_errors;
pub mod subscription;

// Re-exports for convenience
pub use rpc_client::SolanaRpc;
pub use rpc_errors::RpcManagerError;
pub use subscription::{AccountUpdate, AccountWatcher, WatchError};

pub type RpcResult<T> = Result<T, RpcManagerError>;

/// Request/response RPC surface consumed by the client
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Endpoint label used in logs and errors
    fn endpoint(&self) -> &str;

    async fn latest_blockhash(&self, commitment: CommitmentConfig) -> RpcResult<Hash>;

    /// Status of one signature, searching transaction history
    ///
    /// `Ok(None)` means the node answered but has no status for it yet.
    async fn signature_status(&self, signature: &Signature)
        -> RpcResult<Option<SignatureStatusReport>>;

    /// Raw account data; `Ok(None)` if the account does not exist
    async fn account_data(
        &self,
        address: &Pubkey,
        commitment: CommitmentConfig,
    ) -> RpcResult<Option<Vec<u8>>>;

    /// Accounts owned by `program_id` whose first 8 bytes equal `discriminator`
    async fn program_accounts(
        &self,
        program_id: &Pubkey,
        discriminator: [u8; 8],
        commitment: CommitmentConfig,
    ) -> RpcResult<Vec<(Pubkey, Vec<u8>)>>;

    /// Whether `owner` holds any token account for `mint`
    async fn token_account_exists(&self, owner: &Pubkey, mint: &Pubkey) -> RpcResult<bool>;

    async fn send_transaction(&self, transaction: &Transaction) -> RpcResult<Signature>;
}
