//! Typed access to the adventure program's accounts and instructions

use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::accounts::{ChestVault, GameDataAccount, ProgramAccount};
use super::codec::AccountDecodeError;
use super::instructions::{
    self, InitializeAccounts, MoveRightAccounts, ResetLevelAndSpawnChestAccounts,
};
use crate::cancel::CancelSignal;
use crate::rpc_manager::{AccountWatcher, ChainRpc, RpcManagerError, WatchError};
use crate::rpc_manager::subscription::TypedUpdates;
use crate::tx_builder::{SubmitError, SubmitOutcome, TransactionSubmitter};
use crate::wallet::TransactionSigner;

#[derive(Error, Debug)]
pub enum ProgramClientError {
    #[error(transparent)]
    Rpc(#[from] RpcManagerError),

    #[error("Account {address} could not be decoded: {source}")]
    Decode {
        address: Pubkey,
        #[source]
        source: AccountDecodeError,
    },

    #[error(transparent)]
    Subscription(#[from] WatchError),
}

impl ProgramClientError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rpc(e) => e.is_retryable(),
            Self::Decode { .. } => false,
            Self::Subscription(_) => true,
        }
    }
}

pub struct AdventureClient {
    rpc: Arc<dyn ChainRpc>,
    watcher: AccountWatcher,
    program_id: Pubkey,
    commitment: CommitmentConfig,
}

impl AdventureClient {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        watcher: AccountWatcher,
        program_id: Pubkey,
        commitment: CommitmentConfig,
    ) -> Self {
        Self {
            rpc,
            watcher,
            program_id,
            commitment,
        }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub async fn get_game_data_accounts(
        &self,
    ) -> Result<Vec<(Pubkey, GameDataAccount)>, ProgramClientError> {
        self.scan::<GameDataAccount>().await
    }

    pub async fn get_chest_vaults(&self) -> Result<Vec<(Pubkey, ChestVault)>, ProgramClientError> {
        self.scan::<ChestVault>().await
    }

    pub async fn get_game_data_account(
        &self,
        address: &Pubkey,
    ) -> Result<Option<GameDataAccount>, ProgramClientError> {
        self.fetch::<GameDataAccount>(address).await
    }

    pub async fn get_chest_vault(
        &self,
        address: &Pubkey,
    ) -> Result<Option<ChestVault>, ProgramClientError> {
        self.fetch::<ChestVault>(address).await
    }

    pub async fn subscribe_game_data_account(
        &self,
        address: Pubkey,
        cancel: CancelSignal,
    ) -> Result<(TypedUpdates<GameDataAccount>, JoinHandle<()>), ProgramClientError> {
        self.subscribe::<GameDataAccount>(address, cancel).await
    }

    pub async fn subscribe_chest_vault(
        &self,
        address: Pubkey,
        cancel: CancelSignal,
    ) -> Result<(TypedUpdates<ChestVault>, JoinHandle<()>), ProgramClientError> {
        self.subscribe::<ChestVault>(address, cancel).await
    }

    pub async fn send_initialize(
        &self,
        submitter: &TransactionSubmitter,
        accounts: InitializeAccounts,
        signer: &dyn TransactionSigner,
        cancel: &CancelSignal,
    ) -> Result<SubmitOutcome, SubmitError> {
        let ix = instructions::initialize(&accounts, &self.program_id);
        submitter
            .submit("initialize", &[ix], &signer.pubkey(), signer, cancel)
            .await
    }

    pub async fn send_reset_level_and_spawn_chest(
        &self,
        submitter: &TransactionSubmitter,
        accounts: ResetLevelAndSpawnChestAccounts,
        signer: &dyn TransactionSigner,
        cancel: &CancelSignal,
    ) -> Result<SubmitOutcome, SubmitError> {
        let ix = instructions::reset_level_and_spawn_chest(&accounts, &self.program_id);
        submitter
            .submit("reset_level_and_spawn_chest", &[ix], &signer.pubkey(), signer, cancel)
            .await
    }

    pub async fn send_move_right(
        &self,
        submitter: &TransactionSubmitter,
        accounts: MoveRightAccounts,
        signer: &dyn TransactionSigner,
        cancel: &CancelSignal,
    ) -> Result<SubmitOutcome, SubmitError> {
        let ix = instructions::move_right(&accounts, &self.program_id);
        submitter
            .submit("move_right", &[ix], &signer.pubkey(), signer, cancel)
            .await
    }

    /// Every program account tagged as `T`; malformed ones are skipped
    async fn scan<T: ProgramAccount>(&self) -> Result<Vec<(Pubkey, T)>, ProgramClientError> {
        let raw = self
            .rpc
            .program_accounts(&self.program_id, T::discriminator_bytes(), self.commitment)
            .await?;

        let mut accounts = Vec::with_capacity(raw.len());
        for (address, data) in raw {
            match T::deserialize(&data) {
                Ok(Some(account)) => accounts.push((address, account)),
                Ok(None) => {
                    debug!(account = %address, record = T::NAME, "Discriminator mismatch, skipping")
                }
                Err(e) => warn!(
                    account = %address,
                    record = T::NAME,
                    error = %e,
                    "Malformed account, skipping"
                ),
            }
        }
        Ok(accounts)
    }

    async fn fetch<T: ProgramAccount>(
        &self,
        address: &Pubkey,
    ) -> Result<Option<T>, ProgramClientError> {
        let Some(data) = self.rpc.account_data(address, self.commitment).await? else {
            return Ok(None);
        };
        T::deserialize(&data).map_err(|source| ProgramClientError::Decode {
            address: *address,
            source,
        })
    }

    async fn subscribe<T: ProgramAccount>(
        &self,
        address: Pubkey,
        cancel: CancelSignal,
    ) -> Result<(TypedUpdates<T>, JoinHandle<()>), ProgramClientError> {
        let (tx, updates) = TypedUpdates::channel();
        let handle = self.watcher.watch::<T>(address, tx, cancel).await?;
        Ok((updates, handle))
    }
}

impl std::fmt::Debug for AdventureClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdventureClient")
            .field("endpoint", &self.rpc.endpoint())
            .field("ws", &self.watcher.ws_url())
            .field("program_id", &self.program_id)
            .finish()
    }
}
