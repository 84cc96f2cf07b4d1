//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.
//! Commands that act on someone's money name the acting user with the
//! global `--user` option; resolving it goes through the login guard.

pub mod account;
pub mod ledger;
pub mod transfer;
pub mod user;

pub use account::{handle_account_command, AccountCommands};
pub use ledger::{
    handle_audit_command, handle_deposit_command, handle_history_command,
    handle_verify_command, handle_withdraw_command, HistoryArgs, MovementArgs,
};
pub use transfer::{handle_transfer_command, TransferArgs};
pub use user::{handle_user_command, UserCommands};

use chrono::Utc;

use crate::config::settings::Settings;
use crate::error::{BankError, BankResult};
use crate::models::{Money, User};
use crate::services::LoginGuard;
use crate::storage::Storage;

/// Resolve the acting user named by `--user`
///
/// An unknown or deactivated username counts as a failed sign-in, and a
/// locked-out username is refused before it is looked up.
pub fn acting_user(
    storage: &Storage,
    settings: &Settings,
    username: Option<&str>,
) -> BankResult<User> {
    let username = username
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| {
            BankError::Validation(
                "This command needs an acting user: pass --user <username> or set BANKFLOW_USER"
                    .into(),
            )
        })?;

    let guard = LoginGuard::new(storage, settings.lockout.clone());
    let now = Utc::now();
    guard.check(username, now)?;

    match storage.users.get_by_username(username)? {
        Some(user) if user.is_active => {
            guard.clear(username)?;
            Ok(user)
        }
        _ => {
            let remaining = guard.record_failure(username, now)?;
            Err(BankError::Unauthorized(format!(
                "unknown user '{}' ({} attempts left)",
                username, remaining
            )))
        }
    }
}

/// Parse a user-entered amount such as "100" or "25.50"
pub(crate) fn parse_amount(amount: &str) -> BankResult<Money> {
    Money::parse(amount).map_err(|e| {
        BankError::InvalidAmount(format!(
            "'{}' is not an amount. Use format like '100.00' or '100'. Error: {}",
            amount, e
        ))
    })
}
