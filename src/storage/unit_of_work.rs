//! Unit of work
//!
//! Every balance-affecting operation runs inside one `UnitOfWork`: it locks
//! the accounts it touches, reads them through its own staged state, stages
//! the new account states and ledger entries, and commits them together.
//! Nothing staged is visible to anyone else before `commit`; dropping the
//! unit of work without committing discards it and releases its locks.

use std::collections::BTreeMap;
use std::mem;

use crate::error::{BankError, BankResult};
use crate::models::{Account, AccountId, AccountNumber, Transaction, User, UserId};

use super::journal::Changeset;
use super::Storage;

/// Everything a unit of work wants to commit
#[derive(Debug, Default)]
pub(crate) struct StagedChanges {
    pub users: Vec<User>,
    pub removed_users: Vec<User>,
    pub accounts: Vec<Account>,
    pub removed_accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
}

pub struct UnitOfWork<'a> {
    storage: &'a Storage,
    held: Vec<AccountId>,
    users: BTreeMap<UserId, User>,
    removed_users: BTreeMap<UserId, User>,
    accounts: BTreeMap<AccountId, Account>,
    removed_accounts: BTreeMap<AccountId, Account>,
    transactions: Vec<Transaction>,
}

impl<'a> UnitOfWork<'a> {
    pub(super) fn new(storage: &'a Storage) -> Self {
        Self {
            storage,
            held: Vec::new(),
            users: BTreeMap::new(),
            removed_users: BTreeMap::new(),
            accounts: BTreeMap::new(),
            removed_accounts: BTreeMap::new(),
            transactions: Vec::new(),
        }
    }

    /// Lock accounts for the rest of this unit of work
    ///
    /// Locks this unit of work already holds are skipped. Lock every account
    /// in one call: the request is granted atomically.
    pub fn lock_accounts(&mut self, ids: &[AccountId]) -> BankResult<()> {
        let mut needed: Vec<AccountId> = ids
            .iter()
            .filter(|id| !self.held.contains(id))
            .copied()
            .collect();
        needed.sort();
        needed.dedup();
        if needed.is_empty() {
            return Ok(());
        }

        self.storage
            .locks
            .acquire(&needed, self.storage.lock_timeout)?;
        self.held.extend(needed);
        Ok(())
    }

    pub fn holds_lock(&self, id: &AccountId) -> bool {
        self.held.contains(id)
    }

    /// Read an account as this unit of work currently sees it
    pub fn account(&self, id: AccountId) -> BankResult<Account> {
        if self.removed_accounts.contains_key(&id) {
            return Err(BankError::account_not_found(id.to_string()));
        }
        if let Some(staged) = self.accounts.get(&id) {
            return Ok(staged.clone());
        }
        self.storage
            .accounts
            .get(id)?
            .ok_or_else(|| BankError::account_not_found(id.to_string()))
    }

    pub fn account_by_number(&self, number: &AccountNumber) -> BankResult<Account> {
        if let Some(staged) = self.accounts.values().find(|a| &a.account_number == number) {
            return Ok(staged.clone());
        }
        match self.storage.accounts.get_by_number(number)? {
            Some(account) if !self.removed_accounts.contains_key(&account.id) => Ok(account),
            _ => Err(BankError::account_not_found(number.as_str())),
        }
    }

    pub fn user(&self, id: UserId) -> BankResult<User> {
        if self.removed_users.contains_key(&id) {
            return Err(BankError::user_not_found(id.to_string()));
        }
        if let Some(staged) = self.users.get(&id) {
            return Ok(staged.clone());
        }
        self.storage
            .users
            .get(id)?
            .ok_or_else(|| BankError::user_not_found(id.to_string()))
    }

    /// Whether a freshly generated account number is free
    pub fn number_available(&self, number: &AccountNumber) -> BankResult<bool> {
        if self.accounts.values().any(|a| &a.account_number == number) {
            return Ok(false);
        }
        Ok(!self.storage.accounts.number_exists(number)?)
    }

    /// Stage the new state of an account
    ///
    /// An existing account (version > 0) must be locked first; a new account
    /// carries version 0.
    pub fn stage_account(&mut self, account: Account) -> BankResult<()> {
        account
            .validate()
            .map_err(|e| BankError::Validation(e.to_string()))?;
        self.ensure_locked(&account)?;
        self.removed_accounts.remove(&account.id);
        self.accounts.insert(account.id, account);
        Ok(())
    }

    pub fn remove_account(&mut self, account: Account) -> BankResult<()> {
        self.ensure_locked(&account)?;
        if self.accounts.remove(&account.id).is_some() && account.version == 0 {
            // created and removed inside this unit of work
            return Ok(());
        }
        self.removed_accounts.insert(account.id, account);
        Ok(())
    }

    pub fn stage_user(&mut self, user: User) -> BankResult<()> {
        user.validate()
            .map_err(|e| BankError::Validation(e.to_string()))?;
        self.removed_users.remove(&user.id);
        self.users.insert(user.id, user);
        Ok(())
    }

    pub fn remove_user(&mut self, user: User) {
        self.users.remove(&user.id);
        self.removed_users.insert(user.id, user);
    }

    /// Stage a ledger entry
    pub fn append_transaction(&mut self, txn: Transaction) -> BankResult<()> {
        txn.validate()
            .map_err(|e| BankError::Validation(e.to_string()))?;
        if self.transactions.iter().any(|t| t.id == txn.id) {
            return Err(BankError::ImmutableTransaction(txn.id.to_string()));
        }
        self.transactions.push(txn);
        Ok(())
    }

    pub fn staged_transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
            && self.removed_users.is_empty()
            && self.accounts.is_empty()
            && self.removed_accounts.is_empty()
            && self.transactions.is_empty()
    }

    /// Commit all staged changes as one unit
    ///
    /// Returns the committed changeset, whose accounts carry their new
    /// versions. On error nothing has been applied.
    pub fn commit(mut self) -> BankResult<Changeset> {
        let staged = StagedChanges {
            users: mem::take(&mut self.users).into_values().collect(),
            removed_users: mem::take(&mut self.removed_users).into_values().collect(),
            accounts: mem::take(&mut self.accounts).into_values().collect(),
            removed_accounts: mem::take(&mut self.removed_accounts)
                .into_values()
                .collect(),
            transactions: mem::take(&mut self.transactions),
        };
        self.storage.commit(staged)
    }

    fn ensure_locked(&self, account: &Account) -> BankResult<()> {
        if account.version > 0 && !self.holds_lock(&account.id) {
            return Err(BankError::Storage(format!(
                "Account {} modified without holding its lock",
                account.id
            )));
        }
        Ok(())
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        self.storage.locks.release(&self.held);
    }
}
