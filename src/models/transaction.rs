//! Transaction model
//!
//! A ledger entry recording one money movement. Entries are created pending,
//! finalized exactly once (completed or failed), and never changed after
//! that.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::ids::{AccountNumber, TransactionId, UserId};
use super::money::Money;

/// Kind of money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
    Payment,
}

impl TransactionType {
    /// Whether this movement takes money out of the initiating user's account
    pub fn is_outflow(&self) -> bool {
        matches!(self, Self::Withdrawal | Self::Transfer | Self::Payment)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deposit => write!(f, "DEPOSIT"),
            Self::Withdrawal => write!(f, "WITHDRAWAL"),
            Self::Transfer => write!(f, "TRANSFER"),
            Self::Payment => write!(f, "PAYMENT"),
        }
    }
}

/// Status of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    /// Completed and failed entries are final
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// A ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier
    pub id: TransactionId,

    /// Short customer-facing reference (12 hex chars)
    pub reference: String,

    /// The user who initiated the movement
    pub user_id: UserId,

    /// Always positive; direction comes from the type and account fields
    pub amount: Money,

    #[serde(rename = "type")]
    pub transaction_type: TransactionType,

    #[serde(default)]
    pub status: TransactionStatus,

    #[serde(default)]
    pub description: String,

    pub from_account: Option<AccountNumber>,

    pub to_account: Option<AccountNumber>,

    pub created_at: DateTime<Utc>,

    /// When the entry was completed or failed
    pub finalized_at: Option<DateTime<Utc>>,
}

impl Transaction {
    fn new(
        user_id: UserId,
        transaction_type: TransactionType,
        amount: Money,
        from_account: Option<AccountNumber>,
        to_account: Option<AccountNumber>,
        description: impl Into<String>,
    ) -> Self {
        let id = TransactionId::new();
        Self {
            reference: short_reference(id.as_uuid()),
            id,
            user_id,
            amount,
            transaction_type,
            status: TransactionStatus::Pending,
            description: description.into(),
            from_account,
            to_account,
            created_at: Utc::now(),
            finalized_at: None,
        }
    }

    /// Money coming into an account from outside the ledger
    pub fn deposit(
        user_id: UserId,
        to: AccountNumber,
        amount: Money,
        description: impl Into<String>,
    ) -> Self {
        Self::new(
            user_id,
            TransactionType::Deposit,
            amount,
            None,
            Some(to),
            description,
        )
    }

    /// Money leaving an account to outside the ledger
    pub fn withdrawal(
        user_id: UserId,
        from: AccountNumber,
        amount: Money,
        description: impl Into<String>,
    ) -> Self {
        Self::new(
            user_id,
            TransactionType::Withdrawal,
            amount,
            Some(from),
            None,
            description,
        )
    }

    /// Money moving between two accounts in the ledger
    pub fn transfer(
        user_id: UserId,
        from: AccountNumber,
        to: AccountNumber,
        amount: Money,
        description: impl Into<String>,
    ) -> Self {
        Self::new(
            user_id,
            TransactionType::Transfer,
            amount,
            Some(from),
            Some(to),
            description,
        )
    }

    /// Money paid out of an account to an external payee
    pub fn payment(
        user_id: UserId,
        from: AccountNumber,
        amount: Money,
        description: impl Into<String>,
    ) -> Self {
        Self::new(
            user_id,
            TransactionType::Payment,
            amount,
            Some(from),
            None,
            description,
        )
    }

    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }

    /// Whether the entry touches the given account as source or destination
    pub fn involves(&self, number: &AccountNumber) -> bool {
        self.from_account.as_ref() == Some(number) || self.to_account.as_ref() == Some(number)
    }

    /// Signed effect of this entry on the given account's balance
    pub fn effect_on(&self, number: &AccountNumber) -> Money {
        let mut effect = Money::zero();
        if self.to_account.as_ref() == Some(number) {
            effect += self.amount;
        }
        if self.from_account.as_ref() == Some(number) {
            effect -= self.amount;
        }
        effect
    }

    /// Mark the entry completed; only pending entries can be finalized
    pub fn complete(&mut self) -> Result<(), TransactionValidationError> {
        self.finalize(TransactionStatus::Completed)
    }

    /// Mark the entry failed; only pending entries can be finalized
    pub fn fail(&mut self) -> Result<(), TransactionValidationError> {
        self.finalize(TransactionStatus::Failed)
    }

    fn finalize(&mut self, status: TransactionStatus) -> Result<(), TransactionValidationError> {
        if self.status.is_final() {
            return Err(TransactionValidationError::AlreadyFinal(self.status));
        }
        self.status = status;
        self.finalized_at = Some(Utc::now());
        Ok(())
    }

    /// Validate the transaction
    pub fn validate(&self) -> Result<(), TransactionValidationError> {
        if !self.amount.is_positive() {
            return Err(TransactionValidationError::NonPositiveAmount(self.amount));
        }

        let shape_ok = match self.transaction_type {
            TransactionType::Deposit => self.from_account.is_none() && self.to_account.is_some(),
            TransactionType::Withdrawal | TransactionType::Payment => {
                self.from_account.is_some() && self.to_account.is_none()
            }
            TransactionType::Transfer => match (&self.from_account, &self.to_account) {
                (Some(from), Some(to)) => from != to,
                _ => false,
            },
        };
        if !shape_ok {
            return Err(TransactionValidationError::InvalidShape(
                self.transaction_type,
            ));
        }

        Ok(())
    }
}

fn short_reference(uuid: &Uuid) -> String {
    uuid.simple().to_string()[..12].to_string()
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.created_at.format("%Y-%m-%d"),
            self.transaction_type,
            self.amount,
            self.status
        )
    }
}

/// Validation errors for transactions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionValidationError {
    NonPositiveAmount(Money),
    InvalidShape(TransactionType),
    AlreadyFinal(TransactionStatus),
}

impl fmt::Display for TransactionValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveAmount(amount) => {
                write!(f, "Transaction amount must be positive, got {}", amount)
            }
            Self::InvalidShape(kind) => {
                write!(f, "{} has invalid source/destination accounts", kind)
            }
            Self::AlreadyFinal(status) => {
                write!(f, "Transaction is already {}", status)
            }
        }
    }
}

impl std::error::Error for TransactionValidationError {}
