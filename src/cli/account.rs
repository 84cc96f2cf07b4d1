//! Account CLI commands
//!
//! Implements CLI commands for account management.

use chrono::Utc;
use clap::Subcommand;

use super::{acting_user, parse_amount};
use crate::config::settings::Settings;
use crate::display::{
    format_account_details, format_account_list, format_owner_summary, format_transaction_list,
};
use crate::error::{BankError, BankResult};
use crate::models::{AccountType, Currency};
use crate::services::AccountService;
use crate::storage::Storage;

/// Account subcommands
#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a new account
    Open {
        /// Account name
        name: String,
        /// Account type (savings, checking, investment)
        #[arg(short = 't', long, default_value = "checking")]
        account_type: String,
        /// Initial deposit (e.g., "1000.00" or "1000")
        #[arg(short, long, default_value = "0")]
        deposit: String,
        /// Currency code; defaults to the configured currency
        #[arg(short, long)]
        currency: Option<String>,
    },
    /// List your accounts
    List,
    /// Show account details and recent activity
    Show {
        /// Account number, ID or name
        account: String,
    },
    /// Freeze an account
    Freeze { account: String },
    /// Close an account
    Deactivate { account: String },
    /// Reopen a frozen or closed account
    Activate { account: String },
    /// Balances and 30-day activity across your accounts
    Summary,
}

/// Handle an account command
pub fn handle_account_command(
    storage: &Storage,
    settings: &Settings,
    username: Option<&str>,
    cmd: AccountCommands,
) -> BankResult<()> {
    let user = acting_user(storage, settings, username)?;
    let service = AccountService::new(storage);

    match cmd {
        AccountCommands::Open {
            name,
            account_type,
            deposit,
            currency,
        } => {
            let account_type = AccountType::parse(&account_type).ok_or_else(|| {
                BankError::Validation(format!(
                    "Invalid account type: '{}'. Valid types: savings, checking, investment",
                    account_type
                ))
            })?;
            let currency = match currency {
                Some(code) => Currency::parse(&code).map_err(BankError::Validation)?,
                None => settings.currency.clone(),
            };
            let initial_deposit = parse_amount(&deposit)?;

            let account = service.open(user.id, &name, account_type, initial_deposit, currency)?;

            println!("Opened account: {}", account.name);
            println!("  Number:  {}", account.account_number);
            println!("  Type:    {}", account.account_type);
            println!("  Balance: {} {}", account.balance, account.currency);
        }

        AccountCommands::List => {
            print!("{}", format_account_list(&service.list_for_owner(user.id)?));
            println!();
        }

        AccountCommands::Show { account } => {
            let found = service.require(user.id, &account)?;
            let mut entries = service.statement(user.id, found.id)?;
            entries.truncate(settings.recent_limit);

            print!("{}", format_account_details(&found));
            println!();
            println!("Recent activity:");
            print!("{}", format_transaction_list(&entries));
            println!();
        }

        AccountCommands::Freeze { account } => {
            let found = service.require(user.id, &account)?;
            let updated = service.freeze(user.id, found.id)?;
            println!("Account {} is now {}", updated.name, updated.status);
        }

        AccountCommands::Deactivate { account } => {
            let found = service.require(user.id, &account)?;
            let updated = service.deactivate(user.id, found.id)?;
            println!("Account {} is now {}", updated.name, updated.status);
        }

        AccountCommands::Activate { account } => {
            let found = service.require(user.id, &account)?;
            let updated = service.activate(user.id, found.id)?;
            println!("Account {} is now {}", updated.name, updated.status);
        }

        AccountCommands::Summary => {
            let summary = service.summary(user.id, Utc::now())?;
            print!("{}", format_owner_summary(&summary));
        }
    }

    Ok(())
}
