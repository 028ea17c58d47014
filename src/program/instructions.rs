//! Instruction encoders for the adventure program
//!
//! Each instruction is an 8-byte opcode discriminator followed by its
//! arguments. None of the game's instructions take arguments today, so every
//! payload trims to exactly 8 bytes.

use super::codec::ByteWriter;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};

pub const INITIALIZE_DISCRIMINATOR: u64 = 17121445590508351407;
pub const RESET_LEVEL_AND_SPAWN_CHEST_DISCRIMINATOR: u64 = 3341080949523873196;
pub const MOVE_RIGHT_DISCRIMINATOR: u64 = 10990983061962034633;

/// Accounts for `initialize`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializeAccounts {
    pub new_game_data_account: Pubkey,
    pub chest_vault: Pubkey,
    pub signer: Pubkey,
    pub system_program: Pubkey,
}

impl InitializeAccounts {
    pub fn new(new_game_data_account: Pubkey, chest_vault: Pubkey, signer: Pubkey) -> Self {
        Self {
            new_game_data_account,
            chest_vault,
            signer,
            system_program: system_program::id(),
        }
    }

    fn to_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.new_game_data_account, false),
            AccountMeta::new(self.chest_vault, false),
            AccountMeta::new(self.signer, true),
            AccountMeta::new_readonly(self.system_program, false),
        ]
    }
}

/// Accounts for `reset_level_and_spawn_chest`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetLevelAndSpawnChestAccounts {
    pub chest_vault: Pubkey,
    pub game_data_account: Pubkey,
    pub signer: Pubkey,
    pub system_program: Pubkey,
}

impl ResetLevelAndSpawnChestAccounts {
    pub fn new(chest_vault: Pubkey, game_data_account: Pubkey, signer: Pubkey) -> Self {
        Self {
            chest_vault,
            game_data_account,
            signer,
            system_program: system_program::id(),
        }
    }

    fn to_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.chest_vault, false),
            AccountMeta::new(self.game_data_account, false),
            AccountMeta::new(self.signer, true),
            AccountMeta::new_readonly(self.system_program, false),
        ]
    }
}

/// Accounts for `move_right`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRightAccounts {
    pub game_data_account: Pubkey,
    pub chest_vault: Pubkey,
    pub signer: Pubkey,
    pub system_program: Pubkey,
}

impl MoveRightAccounts {
    pub fn new(game_data_account: Pubkey, chest_vault: Pubkey, signer: Pubkey) -> Self {
        Self {
            game_data_account,
            chest_vault,
            signer,
            system_program: system_program::id(),
        }
    }

    fn to_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.game_data_account, false),
            AccountMeta::new(self.chest_vault, false),
            AccountMeta::new(self.signer, true),
            AccountMeta::new_readonly(self.system_program, false),
        ]
    }
}

fn opcode_only(discriminator: u64) -> Vec<u8> {
    let mut writer = ByteWriter::instruction_buffer();
    writer.write_u64(discriminator);
    writer.into_bytes()
}

pub fn initialize(accounts: &InitializeAccounts, program_id: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: accounts.to_metas(),
        data: opcode_only(INITIALIZE_DISCRIMINATOR),
    }
}

pub fn reset_level_and_spawn_chest(
    accounts: &ResetLevelAndSpawnChestAccounts,
    program_id: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: accounts.to_metas(),
        data: opcode_only(RESET_LEVEL_AND_SPAWN_CHEST_DISCRIMINATOR),
    }
}

pub fn move_right(accounts: &MoveRightAccounts, program_id: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: accounts.to_metas(),
        data: opcode_only(MOVE_RIGHT_DISCRIMINATOR),
    }
}
