//! Common types used throughout the client

use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_transaction_status::TransactionConfirmationStatus;
use std::fmt;
use std::str::FromStr;

/// Durability level of a transaction, ordered `Processed < Confirmed < Finalized`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationLevel {
    Processed,
    Confirmed,
    Finalized,
}

impl ConfirmationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationLevel::Processed => "processed",
            ConfirmationLevel::Confirmed => "confirmed",
            ConfirmationLevel::Finalized => "finalized",
        }
    }

    /// Whether a reported level satisfies `target`
    ///
    /// Finalized satisfies every target.
    pub fn satisfies(&self, target: ConfirmationLevel) -> bool {
        *self >= target
    }

    pub fn commitment(&self) -> CommitmentConfig {
        match self {
            ConfirmationLevel::Processed => CommitmentConfig::processed(),
            ConfirmationLevel::Confirmed => CommitmentConfig::confirmed(),
            ConfirmationLevel::Finalized => CommitmentConfig::finalized(),
        }
    }
}

impl Default for ConfirmationLevel {
    fn default() -> Self {
        ConfirmationLevel::Confirmed
    }
}

impl fmt::Display for ConfirmationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfirmationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "processed" => Ok(ConfirmationLevel::Processed),
            "confirmed" => Ok(ConfirmationLevel::Confirmed),
            "finalized" => Ok(ConfirmationLevel::Finalized),
            other => Err(format!("unknown confirmation level '{}'", other)),
        }
    }
}

impl From<TransactionConfirmationStatus> for ConfirmationLevel {
    fn from(status: TransactionConfirmationStatus) -> Self {
        match status {
            TransactionConfirmationStatus::Processed => ConfirmationLevel::Processed,
            TransactionConfirmationStatus::Confirmed => ConfirmationLevel::Confirmed,
            TransactionConfirmationStatus::Finalized => ConfirmationLevel::Finalized,
        }
    }
}

/// One signature's status as reported by `getSignatureStatuses`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatusReport {
    pub slot: u64,
    /// `None` once the block is rooted
    pub confirmations: Option<usize>,
    pub level: ConfirmationLevel,
    /// On-chain execution error, if the transaction failed
    pub err: Option<String>,
}

impl SignatureStatusReport {
    pub fn at_level(level: ConfirmationLevel) -> Self {
        Self {
            slot: 0,
            confirmations: match level {
                ConfirmationLevel::Finalized => None,
                _ => Some(0),
            },
            level,
            err: None,
        }
    }
}
