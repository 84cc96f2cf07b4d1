use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bankflow::cli::{
    handle_account_command, handle_audit_command, handle_deposit_command, handle_history_command,
    handle_transfer_command, handle_user_command, handle_verify_command, handle_withdraw_command,
    AccountCommands, HistoryArgs, MovementArgs, TransferArgs, UserCommands,
};
use bankflow::config::{paths::BankPaths, settings::Settings};
use bankflow::storage::{initialize_storage, Storage};

#[derive(Parser)]
#[command(
    name = "bankflow",
    version,
    about = "Command-line retail banking ledger",
    long_about = "BankFlow keeps customer accounts and an append-only transaction \
                  ledger in local JSON files. Deposits, withdrawals and transfers \
                  are atomic and every balance can be reconciled against the ledger."
)]
struct Cli {
    /// Acting user for commands that touch accounts
    #[arg(short, long, global = true, env = "BANKFLOW_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory, settings and empty data files
    Init,

    /// Show current configuration and paths
    Config,

    /// User management commands
    #[command(subcommand)]
    User(UserCommands),

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Deposit money into one of your accounts
    Deposit(MovementArgs),

    /// Withdraw money from one of your accounts
    Withdraw(MovementArgs),

    /// Transfer money to another account
    Transfer(TransferArgs),

    /// Show your transaction history
    #[command(alias = "txn")]
    History(HistoryArgs),

    /// Check every balance against the ledger
    Verify,

    /// Show recent audit log entries
    Audit {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = BankPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;
    init_tracing(&settings.log_level);

    let storage = Storage::new(paths.clone())?
        .with_lock_timeout(Duration::from_millis(settings.lock_timeout_ms));
    storage.load_all()?;

    let user = cli.user.as_deref();

    match cli.command {
        Some(Commands::Init) => {
            println!("Initializing BankFlow at: {}", paths.base_dir().display());
            initialize_storage(&paths, &settings)?;
            println!("Initialization complete!");
            println!();
            println!("Run 'bankflow user register <username> --email ... --first-name ... --last-name ...'");
            println!("to create your first customer.");
        }
        Some(Commands::Config) => {
            println!("BankFlow Configuration");
            println!("======================");
            println!("Base directory: {}", paths.base_dir().display());
            println!("Data directory: {}", paths.data_dir().display());
            println!("Audit log:      {}", paths.audit_log().display());
            println!();
            println!("Settings:");
            println!("  Currency:          {}", settings.currency);
            println!(
                "  Opening balances:  savings {}, checking {}",
                settings.opening_balances.savings, settings.opening_balances.checking
            );
            println!(
                "  Login lockout:     {} attempts, {} minutes",
                settings.lockout.max_attempts, settings.lockout.lockout_minutes
            );
            println!("  Lock timeout:      {} ms", settings.lock_timeout_ms);
            println!("  Page size:         {}", settings.page_size);
            println!("  Log level:         {}", settings.log_level);
        }
        Some(Commands::User(cmd)) => handle_user_command(&storage, &settings, cmd)?,
        Some(Commands::Account(cmd)) => handle_account_command(&storage, &settings, user, cmd)?,
        Some(Commands::Deposit(args)) => handle_deposit_command(&storage, &settings, user, args)?,
        Some(Commands::Withdraw(args)) => {
            handle_withdraw_command(&storage, &settings, user, args)?
        }
        Some(Commands::Transfer(args)) => {
            handle_transfer_command(&storage, &settings, user, args)?
        }
        Some(Commands::History(args)) => handle_history_command(&storage, &settings, user, args)?,
        Some(Commands::Verify) => handle_verify_command(&storage)?,
        Some(Commands::Audit { limit }) => handle_audit_command(&storage, limit)?,
        None => {
            println!("BankFlow - command-line banking ledger");
            println!();
            println!("Run 'bankflow --help' for usage information.");
        }
    }

    Ok(())
}
