//! Core data models for BankFlow
//!
//! This module contains the data structures of the ledger domain: users,
//! accounts, ledger entries, money and identifiers.

pub mod account;
pub mod ids;
pub mod money;
pub mod transaction;
pub mod user;

pub use account::{Account, AccountBalanceError, AccountStatus, AccountType};
pub use ids::{AccountId, AccountNumber, TransactionId, UserId};
pub use money::{Currency, Money};
pub use transaction::{Transaction, TransactionStatus, TransactionType};
pub use user::User;
