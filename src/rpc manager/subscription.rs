//! Account-change subscriptions over the Solana WebSocket API
//!
//! Each watched account gets its own task holding the pubsub stream. Updates
//! are decoded with the record's discriminator and forwarded on an mpsc
//! channel; the task ends when the receiver is dropped or the cancel signal
//! fires.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::StreamExt;
use solana_account_decoder::{UiAccountData, UiAccountEncoding};
use solana_client::nonblocking::pubsub_client::PubsubClient;
use solana_rpc_client_api::config::RpcAccountInfoConfig;
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cancel::CancelSignal;
use crate::program::ProgramAccount;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("WebSocket connect to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    #[error("Subscription to account {address} failed: {reason}")]
    Subscribe { address: Pubkey, reason: String },

    /// The task exited without reporting whether it subscribed
    #[error("Watch task for account {0} ended before subscribing")]
    TaskEnded(Pubkey),
}

/// Decoded account notification
#[derive(Debug, Clone, PartialEq)]
pub struct AccountUpdate<T> {
    pub address: Pubkey,
    pub slot: u64,
    /// `None` when the data is empty or tagged for another record
    pub account: Option<T>,
}

/// WebSocket account watcher
#[derive(Debug, Clone)]
pub struct AccountWatcher {
    ws_url: String,
    commitment: CommitmentConfig,
}

impl AccountWatcher {
    pub fn new(ws_url: String, commitment: CommitmentConfig) -> Self {
        Self { ws_url, commitment }
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Connect to WebSocket endpoint and return client
    pub async fn connect(&self) -> Result<Arc<PubsubClient>, WatchError> {
        info!("Connecting to WebSocket: {}", self.ws_url);
        let client = PubsubClient::new(&self.ws_url)
            .await
            .map_err(|e| WatchError::Connect {
                url: self.ws_url.clone(),
                reason: e.to_string(),
            })?;
        info!("WebSocket connected successfully");
        Ok(Arc::new(client))
    }

    /// Subscribe to changes of one account decoded as `T`
    ///
    /// Returns once the node has accepted the subscription, so a refused
    /// subscription is an `Err` here rather than a silently closed channel.
    pub async fn watch<T: ProgramAccount>(
        &self,
        address: Pubkey,
        tx: mpsc::UnboundedSender<AccountUpdate<T>>,
        cancel: CancelSignal,
    ) -> Result<JoinHandle<()>, WatchError> {
        let client = self.connect().await?;
        let commitment = self.commitment;
        info!(account = %address, record = T::NAME, "Subscribing to account");

        spawn_subscribed(address, move |ready| async move {
            let config = RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                data_slice: None,
                commitment: Some(commitment),
                min_context_slot: None,
            };

            let subscribed = client.account_subscribe(&address, Some(config)).await;
            let Some((mut notifications, unsubscribe)) = report_subscription(subscribed, ready)
            else {
                return;
            };

            loop {
                let response = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!(account = %address, "Account watch cancelled");
                        break;
                    }
                    next = notifications.next() => match next {
                        Some(response) => response,
                        None => {
                            warn!(account = %address, "Account notification stream closed");
                            break;
                        }
                    },
                };

                let update = AccountUpdate {
                    address,
                    slot: response.context.slot,
                    account: decode_ui_data(&response.value.data)
                        .and_then(|data| decode_update::<T>(&address, &data)),
                };
                if tx.send(update).is_err() {
                    warn!("Receiver dropped, unsubscribing");
                    break;
                }
            }
            unsubscribe().await;
        })
        .await
    }
}

type Ready = oneshot::Sender<Result<(), String>>;

/// Spawn `task` and wait until it reports its subscription result on `Ready`
async fn spawn_subscribed<F, Fut>(address: Pubkey, task: F) -> Result<JoinHandle<()>, WatchError>
where
    F: FnOnce(Ready) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (ready_tx, ready_rx) = oneshot::channel();
    let handle = tokio::spawn(task(ready_tx));

    match ready_rx.await {
        Ok(Ok(())) => Ok(handle),
        Ok(Err(reason)) => {
            warn!(account = %address, %reason, "Account subscription refused");
            Err(WatchError::Subscribe { address, reason })
        }
        Err(_) => Err(WatchError::TaskEnded(address)),
    }
}

/// Forward the outcome of a subscribe call to the waiting caller
fn report_subscription<S, E: fmt::Display>(result: Result<S, E>, ready: Ready) -> Option<S> {
    match result {
        Ok(subscribed) => {
            let _ = ready.send(Ok(()));
            Some(subscribed)
        }
        Err(e) => {
            let _ = ready.send(Err(e.to_string()));
            None
        }
    }
}

fn decode_update<T: ProgramAccount>(address: &Pubkey, data: &[u8]) -> Option<T> {
    if data.is_empty() {
        return None;
    }
    match T::deserialize(data) {
        Ok(account) => account,
        Err(e) => {
            warn!(account = %address, record = T::NAME, error = %e, "Undecodable account update");
            None
        }
    }
}

/// Raw bytes from a UI-encoded account payload
pub(crate) fn decode_ui_data(data: &UiAccountData) -> Option<Vec<u8>> {
    match data {
        UiAccountData::Binary(encoded, UiAccountEncoding::Base64) => BASE64.decode(encoded).ok(),
        UiAccountData::Binary(encoded, UiAccountEncoding::Base58) => {
            bs58::decode(encoded).into_vec().ok()
        }
        UiAccountData::LegacyBinary(encoded) => bs58::decode(encoded).into_vec().ok(),
        _ => None,
    }
}

/// Receiving end of a watch, yielding only decoded accounts
#[derive(Debug)]
pub struct TypedUpdates<T> {
    rx: mpsc::UnboundedReceiver<AccountUpdate<T>>,
}

impl<T> TypedUpdates<T> {
    pub fn channel() -> (mpsc::UnboundedSender<AccountUpdate<T>>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Next successfully decoded account, skipping empty/foreign updates
    pub async fn next_account(&mut self) -> Option<(u64, T)> {
        while let Some(update) = self.rx.recv().await {
            if let Some(account) = update.account {
                return Some((update.slot, account));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::GameDataAccount;

    #[test]
    fn test_decode_ui_data_base64() {
        let raw = GameDataAccount { player_position: 4 }.to_bytes();
        let ui = UiAccountData::Binary(BASE64.encode(&raw), UiAccountEncoding::Base64);
        assert_eq!(decode_ui_data(&ui), Some(raw));
    }

    #[test]
    fn test_decode_ui_data_base58() {
        let raw = vec![1u8, 2, 3, 4];
        let ui = UiAccountData::Binary(bs58::encode(&raw).into_string(), UiAccountEncoding::Base58);
        assert_eq!(decode_ui_data(&ui), Some(raw));
    }

    #[test]
    fn test_decode_update_skips_foreign_and_empty() {
        let address = Pubkey::new_unique();
        assert_eq!(decode_update::<GameDataAccount>(&address, &[]), None);

        let foreign = crate::program::ChestVault.to_bytes();
        assert_eq!(decode_update::<GameDataAccount>(&address, &foreign), None);

        let own = GameDataAccount { player_position: 9 }.to_bytes();
        assert_eq!(
            decode_update::<GameDataAccount>(&address, &own),
            Some(GameDataAccount { player_position: 9 })
        );
    }

    #[tokio::test]
    async fn test_typed_updates_skip_empty() {
        let (tx, mut updates) = TypedUpdates::<GameDataAccount>::channel();
        let address = Pubkey::new_unique();
        tx.send(AccountUpdate { address, slot: 1, account: None }).unwrap();
        tx.send(AccountUpdate {
            address,
            slot: 2,
            account: Some(GameDataAccount { player_position: 1 }),
        })
        .unwrap();
        drop(tx);

        assert_eq!(
            updates.next_account().await,
            Some((2, GameDataAccount { player_position: 1 }))
        );
        assert_eq!(updates.next_account().await, None);
    }

    #[tokio::test]
    async fn test_refused_subscription_is_returned_to_caller() {
        let address = Pubkey::new_unique();
        let result = spawn_subscribed(address, |ready| async move {
            let refused: Result<(), &str> = Err("Invalid param: could not find account");
            let Some(()) = report_subscription(refused, ready) else {
                return;
            };
        })
        .await;

        match result {
            Err(WatchError::Subscribe { address: failed, reason }) => {
                assert_eq!(failed, address);
                assert_eq!(reason, "Invalid param: could not find account");
            }
            other => panic!("expected subscribe error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_accepted_subscription_hands_back_running_task() {
        let (tx, mut updates) = TypedUpdates::<GameDataAccount>::channel();
        let address = Pubkey::new_unique();

        let handle = spawn_subscribed(address, move |ready| async move {
            let Some(slot) = report_subscription(Ok::<u64, String>(7), ready) else {
                return;
            };
            let account = Some(GameDataAccount { player_position: 2 });
            let _ = tx.send(AccountUpdate { address, slot, account });
        })
        .await
        .unwrap();

        assert_eq!(
            updates.next_account().await,
            Some((7, GameDataAccount { player_position: 2 }))
        );
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_task_exiting_silently_is_an_error() {
        let address = Pubkey::new_unique();
        let result = spawn_subscribed(address, |ready| async move { drop(ready) }).await;
        assert!(matches!(result, Err(WatchError::TaskEnded(a)) if a == address));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_websocket_connection() {
        let watcher = AccountWatcher::new(
            "wss://api.devnet.solana.com".to_string(),
            CommitmentConfig::confirmed(),
        );
        assert!(watcher.connect().await.is_ok());
    }
}
