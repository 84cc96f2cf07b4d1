//! Account model
//!
//! Represents a customer's bank account (savings, checking, investment) with
//! its running balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{AccountId, AccountNumber, UserId};
use super::money::{Currency, Money};

/// Type of bank account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    #[default]
    Savings,
    Checking,
    Investment,
}

impl AccountType {
    /// Parse account type from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "savings" => Some(Self::Savings),
            "checking" => Some(Self::Checking),
            "investment" => Some(Self::Investment),
            _ => None,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Savings => write!(f, "Savings"),
            Self::Checking => write!(f, "Checking"),
            Self::Investment => write!(f, "Investment"),
        }
    }
}

/// Lifecycle status of an account
///
/// Accounts are never hard-deleted on their own; closing one moves it to
/// `Inactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountStatus {
    #[default]
    Active,
    Inactive,
    Frozen,
}

impl AccountStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "frozen" => Some(Self::Frozen),
            _ => None,
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Inactive => write!(f, "INACTIVE"),
            Self::Frozen => write!(f, "FROZEN"),
        }
    }
}

/// A bank account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    pub id: AccountId,

    /// Owning user
    pub owner_id: UserId,

    /// Display name (e.g., "My Savings Account")
    pub name: String,

    /// Customer-facing account number
    pub account_number: AccountNumber,

    #[serde(rename = "type")]
    pub account_type: AccountType,

    #[serde(default)]
    pub status: AccountStatus,

    /// Current balance, never negative
    pub balance: Money,

    #[serde(default)]
    pub currency: Currency,

    /// Bumped on every committed change; used for the optimistic check at commit
    #[serde(default)]
    pub version: u64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new active account with a zero balance
    pub fn new(
        owner_id: UserId,
        name: impl Into<String>,
        account_type: AccountType,
        account_number: AccountNumber,
        currency: Currency,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AccountId::new(),
            owner_id,
            name: name.into(),
            account_number,
            account_type,
            status: AccountStatus::Active,
            balance: Money::zero(),
            currency,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Whether a debit of `amount` keeps the balance non-negative
    pub fn can_debit(&self, amount: Money) -> bool {
        amount <= self.balance
    }

    /// Credit the balance
    pub fn credit(&mut self, amount: Money) -> Result<(), AccountBalanceError> {
        if !amount.is_positive() {
            return Err(AccountBalanceError::NonPositiveAmount(amount));
        }
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(AccountBalanceError::Overflow)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Debit the balance, refusing to go below zero
    pub fn debit(&mut self, amount: Money) -> Result<(), AccountBalanceError> {
        if !amount.is_positive() {
            return Err(AccountBalanceError::NonPositiveAmount(amount));
        }
        if !self.can_debit(amount) {
            return Err(AccountBalanceError::Insufficient {
                needed: amount,
                available: self.balance,
            });
        }
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(AccountBalanceError::Overflow)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn set_status(&mut self, status: AccountStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Validate the account
    pub fn validate(&self) -> Result<(), AccountValidationError> {
        let name_len = self.name.trim().chars().count();
        if name_len < 2 {
            return Err(AccountValidationError::NameTooShort);
        }

        if name_len > 100 {
            return Err(AccountValidationError::NameTooLong(name_len));
        }

        if self.balance.is_negative() {
            return Err(AccountValidationError::NegativeBalance(self.balance));
        }

        Ok(())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} {})",
            self.name,
            self.account_type,
            self.account_number.masked()
        )
    }
}

/// Validation errors for accounts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountValidationError {
    NameTooShort,
    NameTooLong(usize),
    NegativeBalance(Money),
}

impl fmt::Display for AccountValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameTooShort => write!(f, "Account name must be at least 2 characters"),
            Self::NameTooLong(len) => {
                write!(f, "Account name too long ({} chars, max 100)", len)
            }
            Self::NegativeBalance(balance) => {
                write!(f, "Account balance cannot be negative ({})", balance)
            }
        }
    }
}

impl std::error::Error for AccountValidationError {}

/// Errors from mutating an account balance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountBalanceError {
    NonPositiveAmount(Money),
    Insufficient { needed: Money, available: Money },
    Overflow,
}

impl fmt::Display for AccountBalanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveAmount(amount) => {
                write!(f, "Amount must be greater than zero, got {}", amount)
            }
            Self::Insufficient { needed, available } => {
                write!(f, "Insufficient funds: need {}, have {}", needed, available)
            }
            Self::Overflow => write!(f, "Balance overflow"),
        }
    }
}

impl std::error::Error for AccountBalanceError {}
