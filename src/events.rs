//! Event bus between the transaction pipeline and UI subscribers
//!
//! Widgets subscribe for balance refreshes, toast-style log messages and
//! per-transaction progress. Publishing never blocks and never fails; events
//! sent with no live subscriber are dropped.

use chrono::{DateTime, Utc};
use serde::Serialize;
use solana_sdk::signature::Signature;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::observability::CorrelationId;

/// Severity attached to log messages shown to the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// Progress of one named transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TransactionInfoStatus {
    /// Waiting for a blockhash / signature
    Pending,
    /// Submitted; signature known
    SignatureReady(String),
    /// Reached the requested confirmation level
    Confirmed,
    /// Terminal failure with reason
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ClientEvent {
    /// On-chain state changed; balances and accounts should be refreshed
    ValueChanged,
    LogMessage {
        message: String,
        level: LogLevel,
        at: DateTime<Utc>,
    },
    TransactionInfo {
        name: String,
        correlation_id: CorrelationId,
        status: TransactionInfoStatus,
    },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: ClientEvent) {
        // Err only means no subscriber is listening
        let _ = self.tx.send(event);
    }

    pub fn value_changed(&self) {
        self.publish(ClientEvent::ValueChanged);
    }

    /// Player-visible message, mirrored into tracing
    pub fn log(&self, message: impl Into<String>, level: LogLevel) {
        let message = message.into();
        match level {
            LogLevel::Info => info!(target: "adventure_client::ui", "{}", message),
            LogLevel::Warning | LogLevel::Error => {
                warn!(target: "adventure_client::ui", "{}", message)
            }
        }
        self.publish(ClientEvent::LogMessage {
            message,
            level,
            at: Utc::now(),
        });
    }

    pub fn transaction_info(
        &self,
        name: &str,
        correlation_id: &CorrelationId,
        status: TransactionInfoStatus,
    ) {
        self.publish(ClientEvent::TransactionInfo {
            name: name.to_string(),
            correlation_id: *correlation_id,
            status,
        });
    }

    pub fn signature_ready(
        &self,
        name: &str,
        correlation_id: &CorrelationId,
        signature: &Signature,
    ) {
        self.transaction_info(
            name,
            correlation_id,
            TransactionInfoStatus::SignatureReady(signature.to_string()),
        );
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Drain everything currently buffered on a receiver (tests and CLI)
pub fn drain(rx: &mut broadcast::Receiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.value_changed();
        bus.log("nobody listening", LogLevel::Info);
    }

    #[test]
    fn test_subscribers_receive_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let id = CorrelationId::new();

        bus.transaction_info("move_right", &id, TransactionInfoStatus::Pending);
        bus.log("Rate limit reached!", LogLevel::Warning);
        bus.value_changed();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[0],
            ClientEvent::TransactionInfo { name, status: TransactionInfoStatus::Pending, .. }
                if name == "move_right"
        ));
        assert!(matches!(
            &events[1],
            ClientEvent::LogMessage { message, level: LogLevel::Warning, .. }
                if message == "Rate limit reached!"
        ));
        assert_eq!(events[2], ClientEvent::ValueChanged);
    }
}
