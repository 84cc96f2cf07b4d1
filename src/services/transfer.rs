//! Transfer service
//!
//! Moves money between two accounts of the ledger. The debit, the credit and
//! the single TRANSFER entry that records them commit as one unit of work;
//! if any step is rejected none of the three is visible.

use tracing::{info, warn};

use crate::error::{BankError, BankResult};
use crate::models::{Account, AccountId, AccountNumber, Money, Transaction, UserId};
use crate::storage::Storage;

use super::ledger::{balance_error, description_or, ensure_active, ensure_positive, ensure_usable};

/// Service for transfers between accounts
pub struct TransferService<'a> {
    storage: &'a Storage,
}

/// Result of a committed transfer
#[derive(Debug, Clone)]
pub struct TransferResult {
    pub transaction: Transaction,
    /// Source account after the debit
    pub from_account: Account,
    /// Destination account after the credit
    pub to_account: Account,
}

impl<'a> TransferService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Transfer `amount` from one of the user's accounts to any active account
    ///
    /// Both accounts are locked together before either is read, and the
    /// commit re-checks their versions.
    pub fn transfer(
        &self,
        user_id: UserId,
        from_account_id: AccountId,
        to_account_number: &AccountNumber,
        amount: Money,
        description: Option<&str>,
    ) -> BankResult<TransferResult> {
        let result = self.try_transfer(
            user_id,
            from_account_id,
            to_account_number,
            amount,
            description,
        );

        if let Err(e) = &result {
            if e.is_rejection() {
                warn!(from = %from_account_id, error = %e, "transfer rejected");
            }
        }

        result
    }

    fn try_transfer(
        &self,
        user_id: UserId,
        from_account_id: AccountId,
        to_account_number: &AccountNumber,
        amount: Money,
        description: Option<&str>,
    ) -> BankResult<TransferResult> {
        ensure_positive(amount)?;

        let to_account_id = self
            .storage
            .accounts
            .get_by_number(to_account_number)?
            .ok_or_else(|| BankError::account_not_found(to_account_number.as_str()))?
            .id;

        if to_account_id == from_account_id {
            return Err(BankError::SelfTransferRejected(
                to_account_number.to_string(),
            ));
        }

        let mut uow = self.storage.begin();
        uow.lock_accounts(&[from_account_id, to_account_id])?;

        // Re-read under the locks
        let mut from = uow.account(from_account_id)?;
        let mut to = uow.account(to_account_id)?;

        ensure_usable(&from, user_id)?;
        ensure_active(&to)?;

        if from.currency != to.currency {
            return Err(BankError::CurrencyMismatch {
                from: from.currency.to_string(),
                to: to.currency.to_string(),
            });
        }

        from.debit(amount).map_err(|e| balance_error(&from, e))?;
        to.credit(amount).map_err(|e| balance_error(&to, e))?;

        let default_description = format!("Transfer to {}", to.name);
        let mut txn = Transaction::transfer(
            user_id,
            from.account_number.clone(),
            to.account_number.clone(),
            amount,
            description_or(description, &default_description),
        );
        txn.complete()
            .map_err(|e| BankError::Validation(e.to_string()))?;

        uow.stage_account(from.clone())?;
        uow.stage_account(to.clone())?;
        uow.append_transaction(txn.clone())?;
        let changeset = uow.commit()?;

        for committed in changeset.accounts {
            if committed.id == from.id {
                from = committed;
            } else if committed.id == to.id {
                to = committed;
            }
        }

        info!(
            from = %from.id,
            to = %to.id,
            transaction = %txn.reference,
            "transfer committed"
        );

        Ok(TransferResult {
            transaction: txn,
            from_account: from,
            to_account: to,
        })
    }
}
