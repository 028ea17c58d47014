//! Instruction planning for SOL, SPL token and NFT transfers
//!
//! Planning is stateless: callers look up whether the destination already
//! holds a token account for the mint and pass the answer in. The
//! associated-token-account create instruction goes first when it does not.

use solana_sdk::{instruction::Instruction, pubkey::Pubkey, system_instruction};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account,
};

use crate::tx_builder::errors::SubmitError;

/// Ordered instructions for one transfer transaction
#[derive(Debug, Clone)]
pub struct TransferPlan {
    pub instructions: Vec<Instruction>,
    /// Whether an ATA create was prepended for the destination
    pub creates_destination_account: bool,
    /// Token account that receives the transfer (the destination itself for SOL)
    pub destination_account: Pubkey,
}

pub fn plan_sol_transfer(from: &Pubkey, to: &Pubkey, lamports: u64) -> TransferPlan {
    TransferPlan {
        instructions: vec![system_instruction::transfer(from, to, lamports)],
        creates_destination_account: false,
        destination_account: *to,
    }
}

/// Plan an SPL token transfer from `source` into `destination_owner`'s ATA
///
/// `payer` funds the ATA creation and authorizes the transfer.
pub fn plan_token_transfer(
    payer: &Pubkey,
    destination_owner: &Pubkey,
    mint: &Pubkey,
    source: &Pubkey,
    amount: u64,
    destination_has_account: bool,
) -> Result<TransferPlan, SubmitError> {
    let destination_account = get_associated_token_address(destination_owner, mint);
    let mut instructions = Vec::with_capacity(2);

    if !destination_has_account {
        instructions.push(create_associated_token_account(
            payer,
            destination_owner,
            mint,
            &spl_token::id(),
        ));
    }

    let transfer = spl_token::instruction::transfer(
        &spl_token::id(),
        source,
        &destination_account,
        payer,
        &[],
        amount,
    )
    .map_err(|e| SubmitError::instruction("spl-token", e.to_string()))?;
    instructions.push(transfer);

    Ok(TransferPlan {
        instructions,
        creates_destination_account: !destination_has_account,
        destination_account,
    })
}

/// Transfer from the payer's own associated token account
pub fn plan_token_transfer_from_ata(
    payer: &Pubkey,
    destination_owner: &Pubkey,
    mint: &Pubkey,
    amount: u64,
    destination_has_account: bool,
) -> Result<TransferPlan, SubmitError> {
    let source = get_associated_token_address(payer, mint);
    plan_token_transfer(payer, destination_owner, mint, &source, amount, destination_has_account)
}

/// NFTs are single-unit token transfers out of the holding token account
pub fn plan_nft_transfer(
    payer: &Pubkey,
    destination_owner: &Pubkey,
    mint: &Pubkey,
    source_token_account: &Pubkey,
    destination_has_account: bool,
) -> Result<TransferPlan, SubmitError> {
    plan_token_transfer(
        payer,
        destination_owner,
        mint,
        source_token_account,
        1,
        destination_has_account,
    )
}
