//! Adventure program bindings
//!
//! - **codec**: fixed-width little-endian reader/writer
//! - **accounts**: discriminator-tagged account records
//! - **instructions**: instruction encoders and account roles
//! - **client**: typed fetch, scan, subscribe and send helpers

pub mod accounts;
pub mod client;
pub mod codec;
pub mod instructions;

pub use accounts::{ChestVault, GameDataAccount, ProgramAccount};
pub use client::{AdventureClient, ProgramClientError};
pub use codec::AccountDecodeError;
pub use instructions::{InitializeAccounts, MoveRightAccounts, ResetLevelAndSpawnChestAccounts};
