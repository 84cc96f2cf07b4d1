//! Custom error types for BankFlow
//!
//! This module defines the error hierarchy for the ledger using thiserror.
//! The ledger variants (`InsufficientFunds`, `AccountFrozen`, ...) are the
//! rejections a caller shows to the user; the string-carrying variants wrap
//! infrastructure failures.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::Money;

/// The main error type for BankFlow operations
#[derive(Error, Debug)]
pub enum BankError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Validation errors for data models
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Duplicate entity errors
    #[error("{entity_type} already exists: {identifier}")]
    Duplicate {
        entity_type: &'static str,
        identifier: String,
    },

    /// Amount is zero, negative, or overflows a balance
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Withdrawal or transfer-out larger than the balance
    #[error("Insufficient funds in account {account}: need {needed}, have {available}")]
    InsufficientFunds {
        account: String,
        needed: Money,
        available: Money,
    },

    /// Account is not ACTIVE
    #[error("Account {account} is {status} and cannot be used")]
    AccountFrozen { account: String, status: String },

    /// Source and destination of a transfer are the same account
    #[error("Cannot transfer from account {0} to itself")]
    SelfTransferRejected(String),

    /// Transfer between accounts holding different currencies
    #[error("Currency mismatch: {from} account cannot send to {to} account")]
    CurrencyMismatch { from: String, to: String },

    /// The acting user does not own the account
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// An account changed underneath a unit of work
    #[error("Concurrent modification of account {0}, retry the operation")]
    Conflict(String),

    /// A per-account lock could not be acquired in time
    #[error("Timed out waiting for lock on account {0}")]
    LockTimeout(String),

    /// Too many failed login attempts
    #[error("Too many failed login attempts for '{username}', retry after {retry_after}")]
    LockedOut {
        username: String,
        retry_after: DateTime<Utc>,
    },

    /// Attempt to change a finalized ledger entry
    #[error("Transaction {0} is finalized and cannot be modified")]
    ImmutableTransaction(String),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),
}

impl BankError {
    /// Create a "not found" error for accounts
    pub fn account_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Account",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for transactions
    pub fn transaction_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Transaction",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for users
    pub fn user_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "User",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a rejection the caller should show to the user
    /// rather than an infrastructure failure
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::NotFound { .. }
                | Self::Duplicate { .. }
                | Self::InvalidAmount(_)
                | Self::InsufficientFunds { .. }
                | Self::AccountFrozen { .. }
                | Self::SelfTransferRejected(_)
                | Self::CurrencyMismatch { .. }
                | Self::Unauthorized(_)
                | Self::LockedOut { .. }
                | Self::ImmutableTransaction(_)
        )
    }
}

impl From<std::io::Error> for BankError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BankError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for BankFlow operations
pub type BankResult<T> = Result<T, BankError>;
