//! Recent-blockhash bookkeeping for the submitter
//!
//! Two consecutive transactions from the same fee payer carrying identical
//! instructions would hash to the same signature if they also shared a
//! blockhash, and the node would drop the second as a duplicate. The guard
//! remembers the last hash each fee payer used and refuses to hand it out
//! again.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use solana_sdk::{hash::Hash, pubkey::Pubkey};
use std::time::Duration;

use crate::config::BlockhashConfig;

/// Last blockhash used per fee payer
#[derive(Debug, Default)]
pub struct BlockhashGuard {
    last_used: DashMap<Pubkey, Hash>,
}

impl BlockhashGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `hash` for `fee_payer` unless it was the payer's previous hash
    ///
    /// Check and store happen under the same shard lock, so two concurrent
    /// submissions for one payer cannot both claim the same hash.
    pub fn try_claim(&self, fee_payer: &Pubkey, hash: Hash) -> bool {
        match self.last_used.entry(*fee_payer) {
            Entry::Occupied(mut entry) => {
                if *entry.get() == hash {
                    false
                } else {
                    entry.insert(hash);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(hash);
                true
            }
        }
    }

    /// Whether `hash` differs from the payer's previous hash; claims nothing
    pub fn is_fresh(&self, fee_payer: &Pubkey, hash: &Hash) -> bool {
        self.last_used
            .get(fee_payer)
            .map_or(true, |last| *last != *hash)
    }

    pub fn last_used(&self, fee_payer: &Pubkey) -> Option<Hash> {
        self.last_used.get(fee_payer).map(|entry| *entry)
    }
}

/// Linear backoff for blockhash fetches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockhashRetryPolicy {
    pub backoff_step: Duration,
    /// `None` retries until cancelled
    pub max_attempts: Option<u32>,
}

impl Default for BlockhashRetryPolicy {
    fn default() -> Self {
        Self {
            backoff_step: Duration::from_millis(200),
            max_attempts: Some(30),
        }
    }
}

impl BlockhashRetryPolicy {
    pub fn from_config(config: &BlockhashConfig) -> Self {
        Self {
            backoff_step: config.backoff_step(),
            max_attempts: config.attempt_limit(),
        }
    }

    /// Delay before retry number `retry` (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        self.backoff_step.saturating_mul(retry)
    }

    /// Whether fetch number `attempt` (1-based) may run
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt <= max)
    }
}
