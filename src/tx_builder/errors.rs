//! Failures on the way from instructions to a signature
//!
//! A send the node refuses is not an error here: it comes back as an
//! unsuccessful `SubmitOutcome` carrying the node's reason.

use thiserror::Error;

use crate::rpc_manager::RpcManagerError;

#[derive(Error, Debug)]
pub enum SubmitError {
    /// No fresh blockhash after the retry budget
    #[error("Blockhash error: {0}")]
    Blockhash(String),

    /// A helper (spl-token, ata) could not produce its instruction
    #[error("Could not build {program} instruction: {reason}")]
    Instruction { program: &'static str, reason: String },

    /// Wallet declined, or left a required signature empty
    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Transaction too large: {size} bytes (limit {limit})")]
    TransactionTooLarge { size: usize, limit: usize },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcManagerError),

    /// Cancelled before the transaction reached the node
    #[error("Cancelled during {0}")]
    Cancelled(&'static str),

    #[error("Could not serialize transaction: {0}")]
    Serialize(String),
}

impl SubmitError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Blockhash(_) => true,
            Self::Rpc(e) => e.is_retryable(),
            Self::Instruction { .. }
            | Self::Signing(_)
            | Self::TransactionTooLarge { .. }
            | Self::InvalidRequest(_)
            | Self::Cancelled(_)
            | Self::Serialize(_) => false,
        }
    }

    /// Label used for the submit failure counter
    pub fn category(&self) -> &'static str {
        match self {
            Self::Blockhash(_) => "blockhash",
            Self::Instruction { .. } => "instruction",
            Self::Signing(_) => "signing",
            Self::TransactionTooLarge { .. } => "size",
            Self::InvalidRequest(_) => "config",
            Self::Rpc(_) => "rpc",
            Self::Cancelled(_) => "cancelled",
            Self::Serialize(_) => "serialize",
        }
    }

    pub fn instruction(program: &'static str, reason: impl Into<String>) -> Self {
        Self::Instruction {
            program,
            reason: reason.into(),
        }
    }

    pub fn blockhash(reason: impl Into<String>) -> Self {
        Self::Blockhash(reason.into())
    }

    pub fn signing(reason: impl Into<String>) -> Self {
        Self::Signing(reason.into())
    }
}
