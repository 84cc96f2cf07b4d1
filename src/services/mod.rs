//! Service layer for BankFlow
//!
//! The service layer provides business logic on top of the storage layer:
//! validation, ownership and status checks, and the units of work that
//! mutate balances together with their ledger entries.

pub mod account;
pub mod ledger;
pub mod login_guard;
pub mod transfer;
pub mod user;

pub use account::{AccountService, FinancialHealth, OwnerSummary};
pub use ledger::{BalanceMismatch, LedgerService, ReconciliationReport};
pub use login_guard::LoginGuard;
pub use transfer::{TransferResult, TransferService};
pub use user::{NewUser, Registration, UserService};
