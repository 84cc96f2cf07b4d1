//! CLI command handler for transfers between accounts

use clap::Args;

use super::{acting_user, parse_amount};
use crate::config::settings::Settings;
use crate::error::{BankError, BankResult};
use crate::models::AccountNumber;
use crate::services::{AccountService, TransferService};
use crate::storage::Storage;

#[derive(Args)]
pub struct TransferArgs {
    /// Your source account (number, ID or name)
    pub from: String,
    /// Destination account number (16 digits)
    pub to: String,
    /// Amount (e.g., "100.00" or "100")
    pub amount: String,
    /// Description for the ledger entry
    #[arg(short, long)]
    pub description: Option<String>,
}

/// Handle the transfer command
pub fn handle_transfer_command(
    storage: &Storage,
    settings: &Settings,
    username: Option<&str>,
    args: TransferArgs,
) -> BankResult<()> {
    let user = acting_user(storage, settings, username)?;
    let from_account = AccountService::new(storage).require(user.id, &args.from)?;
    let to_number = AccountNumber::parse(&args.to).map_err(BankError::Validation)?;
    let amount = parse_amount(&args.amount)?;

    let result = TransferService::new(storage).transfer(
        user.id,
        from_account.id,
        &to_number,
        amount,
        args.description.as_deref(),
    )?;

    println!("Transferred {}", result.transaction.amount);
    println!(
        "  From: {} ({}), balance {}",
        result.from_account.name,
        result.from_account.account_number.masked(),
        result.from_account.balance
    );
    println!("  To:   {}", result.to_account.account_number.masked());
    println!("  Reference: {}", result.transaction.reference);

    Ok(())
}
