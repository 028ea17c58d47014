//! Configuration module for the adventure client
//!
//! This module handles all configuration loading from TOML files,
//! environment variables, and provides structured configuration types.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::str::FromStr;
use std::time::Duration;

use crate::types::ConfirmationLevel;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// RPC endpoints configuration
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Wallet configuration
    #[serde(default)]
    pub wallet: WalletConfig,

    /// On-chain program
    #[serde(default)]
    pub program: ProgramConfig,

    /// Signature polling
    #[serde(default)]
    pub confirmation: ConfirmationConfig,

    /// Blockhash fetch retry
    #[serde(default)]
    pub blockhash: BlockhashConfig,

    /// Monitoring and metrics
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC endpoint
    #[serde(default = "default_http_url")]
    pub http_url: String,

    /// WebSocket endpoint for account subscriptions
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// Commitment used for reads and blockhash fetches
    #[serde(default)]
    pub commitment: ConfirmationLevel,

    #[serde(default)]
    pub skip_preflight: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to keypair file
    #[serde(default = "default_keypair_path")]
    pub keypair_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramConfig {
    /// Adventure program id (base58); required by game commands
    #[serde(default)]
    pub program_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    /// Poll attempts before giving up
    #[serde(default = "default_poll_attempts")]
    pub max_attempts: u32,

    /// Wait after a poll with no result or a failed RPC call
    #[serde(default = "default_no_result_wait_ms")]
    pub no_result_wait_ms: u64,

    /// Wait after a successful round-trip, before classifying
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Wait before the next poll when the level is still below target
    #[serde(default = "default_settle_ms")]
    pub retry_ms: u64,

    /// Default target level
    #[serde(default)]
    pub target: ConfirmationLevel,

    /// Forward per-attempt progress to the event bus
    #[serde(default)]
    pub show_progress_messages: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockhashConfig {
    /// Linear backoff step; retry `n` waits `n * backoff_step_ms`
    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,

    /// Fetch attempts per submission; 0 means unbounded
    #[serde(default = "default_blockhash_attempts")]
    pub max_attempts: u32,
}

impl BlockhashConfig {
    pub fn attempt_limit(&self) -> Option<u32> {
        (self.max_attempts > 0).then_some(self.max_attempts)
    }

    pub fn backoff_step(&self) -> Duration {
        Duration::from_millis(self.backoff_step_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Enable Prometheus metrics
    #[serde(default)]
    pub enable_metrics: bool,

    /// Metrics port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

// Default value functions
fn default_http_url() -> String { "https://api.devnet.solana.com".to_string() }
fn default_ws_url() -> String { "wss://api.devnet.solana.com".to_string() }
fn default_rpc_timeout() -> u64 { 30 }
fn default_keypair_path() -> String { "~/.config/solana/id.json".to_string() }
fn default_poll_attempts() -> u32 { 30 }
fn default_no_result_wait_ms() -> u64 { 1500 }
fn default_settle_ms() -> u64 { 500 }
fn default_backoff_step_ms() -> u64 { 200 }
fn default_blockhash_attempts() -> u32 { 30 }
fn default_metrics_port() -> u16 { 9090 }

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            http_url: default_http_url(),
            ws_url: default_ws_url(),
            timeout_secs: default_rpc_timeout(),
            commitment: ConfirmationLevel::default(),
            skip_preflight: false,
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keypair_path: default_keypair_path(),
        }
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_poll_attempts(),
            no_result_wait_ms: default_no_result_wait_ms(),
            settle_ms: default_settle_ms(),
            retry_ms: default_settle_ms(),
            target: ConfirmationLevel::default(),
            show_progress_messages: false,
        }
    }
}

impl ConfirmationConfig {
    pub fn no_result_wait(&self) -> Duration {
        Duration::from_millis(self.no_result_wait_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn retry(&self) -> Duration {
        Duration::from_millis(self.retry_ms)
    }
}

impl Default for BlockhashConfig {
    fn default() -> Self {
        Self {
            backoff_step_ms: default_backoff_step_ms(),
            max_attempts: default_blockhash_attempts(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: false,
            metrics_port: default_metrics_port(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` and `ADVENTURE_*` overrides
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for when no file exists
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("ADVENTURE_RPC_URL") {
            self.rpc.http_url = url;
        }
        if let Some(url) = lookup("ADVENTURE_WS_URL") {
            self.rpc.ws_url = url;
        }
        if let Some(path) = lookup("ADVENTURE_KEYPAIR") {
            self.wallet.keypair_path = path;
        }
        if let Some(id) = lookup("ADVENTURE_PROGRAM_ID") {
            self.program.program_id = id;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc.http_url.is_empty() {
            bail!("rpc.http_url must not be empty");
        }
        if self.confirmation.max_attempts == 0 {
            bail!("confirmation.max_attempts must be at least 1");
        }
        if !self.program.program_id.is_empty() {
            Pubkey::from_str(&self.program.program_id).with_context(|| {
                format!("program.program_id is not a valid pubkey: {}", self.program.program_id)
            })?;
        }
        Ok(())
    }

    /// Parsed program id; errors when unset
    pub fn program_id(&self) -> anyhow::Result<Pubkey> {
        if self.program.program_id.is_empty() {
            bail!("program.program_id is not configured (set it or ADVENTURE_PROGRAM_ID)");
        }
        Pubkey::from_str(&self.program.program_id)
            .with_context(|| format!("Invalid program id: {}", self.program.program_id))
    }

    pub fn commitment(&self) -> CommitmentConfig {
        self.rpc.commitment.commitment()
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc.timeout_secs)
    }

    /// Keypair path with a leading `~` expanded from `$HOME`
    pub fn keypair_path(&self) -> String {
        match (self.wallet.keypair_path.strip_prefix("~/"), std::env::var("HOME")) {
            (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
            _ => self.wallet.keypair_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.confirmation.max_attempts, 30);
        assert_eq!(config.confirmation.no_result_wait(), Duration::from_millis(1500));
        assert_eq!(config.confirmation.settle(), Duration::from_millis(500));
        assert_eq!(config.blockhash.backoff_step_ms, 200);
        assert_eq!(config.blockhash.attempt_limit(), Some(30));
        assert_eq!(config.confirmation.target, ConfirmationLevel::Confirmed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = Config::from_toml(
            r#"
            [rpc]
            http_url = "http://localhost:8899"
            commitment = "finalized"

            [confirmation]
            max_attempts = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.rpc.http_url, "http://localhost:8899");
        assert_eq!(config.rpc.commitment, ConfirmationLevel::Finalized);
        assert_eq!(config.confirmation.max_attempts, 5);
        assert_eq!(config.confirmation.settle_ms, 500);
        assert_eq!(config.wallet.keypair_path, "~/.config/solana/id.json");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(Config::from_toml("[confirmation]\nmax_attempts = 0").is_err());
        assert!(Config::from_toml("[program]\nprogram_id = \"not-a-key\"").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let program = Pubkey::new_unique().to_string();
        let mut config = Config::default();
        config.apply_env_overrides(|key| match key {
            "ADVENTURE_RPC_URL" => Some("http://127.0.0.1:8899".to_string()),
            "ADVENTURE_PROGRAM_ID" => Some(program.clone()),
            _ => None,
        });

        assert_eq!(config.rpc.http_url, "http://127.0.0.1:8899");
        assert_eq!(config.rpc.ws_url, "wss://api.devnet.solana.com");
        assert_eq!(config.program_id().unwrap().to_string(), program);
    }

    #[test]
    fn test_zero_blockhash_attempts_is_unbounded() {
        let config = Config::from_toml("[blockhash]\nmax_attempts = 0").unwrap();
        assert_eq!(config.blockhash.attempt_limit(), None);
    }

    #[test]
    fn test_program_id_required() {
        assert!(Config::default().program_id().is_err());
    }
}
