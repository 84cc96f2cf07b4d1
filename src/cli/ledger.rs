//! Deposit, withdrawal and ledger query commands

use clap::Args;

use super::{acting_user, parse_amount};
use crate::config::settings::Settings;
use crate::display::{
    format_reconciliation, format_transaction_details, format_transaction_list,
    format_transaction_page,
};
use crate::error::{BankError, BankResult};
use crate::services::{AccountService, LedgerService};
use crate::storage::Storage;

/// Arguments shared by `deposit` and `withdraw`
#[derive(Args)]
pub struct MovementArgs {
    /// Account number, ID or name
    pub account: String,
    /// Amount (e.g., "100.00" or "100")
    pub amount: String,
    /// Description for the ledger entry
    #[arg(short, long)]
    pub description: Option<String>,
}

#[derive(Args)]
pub struct HistoryArgs {
    /// Page number, starting at 1
    #[arg(short, long, default_value = "1")]
    pub page: usize,
    /// Show only the most recent entries
    #[arg(short, long, conflicts_with = "page")]
    pub recent: bool,
    /// Show one entry by its reference
    #[arg(long, conflicts_with_all = ["page", "recent"])]
    pub reference: Option<String>,
}

pub fn handle_deposit_command(
    storage: &Storage,
    settings: &Settings,
    username: Option<&str>,
    args: MovementArgs,
) -> BankResult<()> {
    let user = acting_user(storage, settings, username)?;
    let account = AccountService::new(storage).require(user.id, &args.account)?;
    let amount = parse_amount(&args.amount)?;

    let txn = LedgerService::new(storage).deposit(
        user.id,
        account.id,
        amount,
        args.description.as_deref(),
    )?;

    println!("Deposited {} to {}", txn.amount, account.name);
    println!("  Reference: {}", txn.reference);
    Ok(())
}

pub fn handle_withdraw_command(
    storage: &Storage,
    settings: &Settings,
    username: Option<&str>,
    args: MovementArgs,
) -> BankResult<()> {
    let user = acting_user(storage, settings, username)?;
    let account = AccountService::new(storage).require(user.id, &args.account)?;
    let amount = parse_amount(&args.amount)?;

    let txn = LedgerService::new(storage).withdraw(
        user.id,
        account.id,
        amount,
        args.description.as_deref(),
    )?;

    println!("Withdrew {} from {}", txn.amount, account.name);
    println!("  Reference: {}", txn.reference);
    Ok(())
}

/// Show the acting user's ledger entries
pub fn handle_history_command(
    storage: &Storage,
    settings: &Settings,
    username: Option<&str>,
    args: HistoryArgs,
) -> BankResult<()> {
    let user = acting_user(storage, settings, username)?;
    let service = LedgerService::new(storage);

    if let Some(reference) = args.reference {
        let txn = service.find_by_reference(&reference)?;
        if txn.user_id != user.id {
            return Err(BankError::transaction_not_found(reference));
        }
        print!("{}", format_transaction_details(&txn));
    } else if args.recent {
        let entries = service.recent(user.id, settings.recent_limit)?;
        print!("{}", format_transaction_list(&entries));
        println!();
    } else {
        let page = service.history(user.id, args.page, settings.page_size)?;
        print!("{}", format_transaction_page(&page));
    }

    Ok(())
}

/// Replay the ledger and compare it with stored balances
pub fn handle_verify_command(storage: &Storage) -> BankResult<()> {
    let report = LedgerService::new(storage).verify()?;
    print!("{}", format_reconciliation(&report));

    if report.is_balanced() {
        Ok(())
    } else {
        Err(BankError::Storage(format!(
            "{} account balance(s) disagree with the ledger",
            report.mismatches.len()
        )))
    }
}

/// Print the newest audit log entries
pub fn handle_audit_command(storage: &Storage, limit: usize) -> BankResult<()> {
    let entries = storage.audit().read_recent(limit)?;
    if entries.is_empty() {
        println!("No audit entries found.");
    }
    for entry in entries {
        println!("{}", entry.format_human_readable());
    }
    Ok(())
}
