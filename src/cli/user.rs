//! User CLI commands

use clap::Subcommand;
use tracing::info;

use crate::config::settings::Settings;
use crate::display::{format_registration, format_user_details, format_user_list};
use crate::error::BankResult;
use crate::services::{AccountService, LoginGuard, NewUser, UserService};
use crate::storage::Storage;

/// User subcommands
#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a user and open their default savings and checking accounts
    Register {
        username: String,
        #[arg(short, long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },
    /// List all users
    List,
    /// Show a user and their accounts
    Show { username: String },
    /// Delete a user and their (empty) accounts
    Delete { username: String },
    /// Clear failed sign-in attempts for a username
    Unlock { username: String },
}

/// Handle a user command
pub fn handle_user_command(
    storage: &Storage,
    settings: &Settings,
    cmd: UserCommands,
) -> BankResult<()> {
    let service = UserService::new(storage, settings);

    match cmd {
        UserCommands::Register {
            username,
            email,
            first_name,
            last_name,
        } => {
            let registration = service.register(NewUser {
                username,
                email,
                first_name,
                last_name,
            })?;
            print!("{}", format_registration(&registration));
        }

        UserCommands::List => {
            print!("{}", format_user_list(&service.list()?));
            println!();
        }

        UserCommands::Show { username } => {
            let user = service.require(&username)?;
            let accounts = AccountService::new(storage).list_for_owner(user.id)?;
            print!("{}", format_user_details(&user, &accounts));
        }

        UserCommands::Delete { username } => {
            let user = service.require(&username)?;
            let deleted = service.delete(user.id)?;
            println!("Deleted user: {}", deleted);
        }

        UserCommands::Unlock { username } => {
            LoginGuard::new(storage, settings.lockout.clone()).clear(&username)?;
            info!("failed sign-in attempts cleared");
            println!("Cleared failed sign-in attempts for '{}'", username.trim());
        }
    }

    Ok(())
}
