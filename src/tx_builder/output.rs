//! Result of one submission attempt

use solana_sdk::{hash::Hash, signature::Signature};

use crate::observability::CorrelationId;

/// What the submitter knows after handing a transaction to the node
///
/// `success == false` with a `reason` means the node refused the send;
/// nothing is retried automatically. The signature is still filled in when
/// the transaction was signed, so callers can look it up later.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub signature: Option<Signature>,
    pub blockhash: Hash,
    pub success: bool,
    pub reason: Option<String>,
    pub correlation_id: CorrelationId,
    /// Bincode size of the signed transaction
    pub serialized_size: usize,
}

impl SubmitOutcome {
    /// Signature to poll, only when the send went through
    pub fn confirmed_signature(&self) -> Option<&Signature> {
        if self.success {
            self.signature.as_ref()
        } else {
            None
        }
    }
}
