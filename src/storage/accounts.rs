//! Account repository for JSON storage
//!
//! Manages loading and saving accounts to accounts.json. Accounts are kept
//! in an id-keyed table with a secondary index on the account number.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::BankResult;
use crate::models::{Account, AccountId, AccountNumber, UserId};

use super::file_io::{read_json, write_json_atomic};
use super::{read_lock, write_lock};

/// Serializable account data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct AccountData {
    accounts: Vec<Account>,
}

/// In-memory account table with the account-number index
#[derive(Debug, Default)]
pub struct AccountTable {
    by_id: HashMap<AccountId, Account>,
    by_number: HashMap<AccountNumber, AccountId>,
}

impl AccountTable {
    pub fn get(&self, id: &AccountId) -> Option<&Account> {
        self.by_id.get(id)
    }

    pub fn get_by_number(&self, number: &AccountNumber) -> Option<&Account> {
        self.by_number.get(number).and_then(|id| self.by_id.get(id))
    }

    /// Insert or replace an account, keeping the number index current
    pub fn insert(&mut self, account: Account) {
        if let Some(previous) = self.by_id.get(&account.id) {
            if previous.account_number != account.account_number {
                self.by_number.remove(&previous.account_number);
            }
        }
        self.by_number
            .insert(account.account_number.clone(), account.id);
        self.by_id.insert(account.id, account);
    }

    pub fn remove(&mut self, id: &AccountId) -> Option<Account> {
        let account = self.by_id.remove(id)?;
        self.by_number.remove(&account.account_number);
        Some(account)
    }

    pub fn values(&self) -> impl Iterator<Item = &Account> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    fn to_data(&self) -> AccountData {
        let mut accounts: Vec<Account> = self.by_id.values().cloned().collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        AccountData { accounts }
    }
}

/// Repository for account persistence
pub struct AccountRepository {
    path: PathBuf,
    data: RwLock<AccountTable>,
}

impl AccountRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(AccountTable::default()),
        }
    }

    /// Load accounts from disk
    pub fn load(&self) -> BankResult<()> {
        let file_data: AccountData = read_json(&self.path)?;

        let mut table = write_lock(&self.data)?;
        *table = AccountTable::default();
        for account in file_data.accounts {
            table.insert(account);
        }

        Ok(())
    }

    /// Save accounts to disk
    pub fn save(&self) -> BankResult<()> {
        let table = read_lock(&self.data)?;
        self.persist(&table)
    }

    /// Write an already-locked table to disk
    pub(crate) fn persist(&self, table: &AccountTable) -> BankResult<()> {
        write_json_atomic(&self.path, &table.to_data())
    }

    pub(crate) fn table(&self) -> &RwLock<AccountTable> {
        &self.data
    }

    pub fn get(&self, id: AccountId) -> BankResult<Option<Account>> {
        Ok(read_lock(&self.data)?.get(&id).cloned())
    }

    pub fn get_by_number(&self, number: &AccountNumber) -> BankResult<Option<Account>> {
        Ok(read_lock(&self.data)?.get_by_number(number).cloned())
    }

    /// Whether an account number is already taken
    pub fn number_exists(&self, number: &AccountNumber) -> BankResult<bool> {
        Ok(read_lock(&self.data)?.by_number.contains_key(number))
    }

    /// All accounts owned by a user, oldest first
    pub fn get_by_owner(&self, owner_id: UserId) -> BankResult<Vec<Account>> {
        let table = read_lock(&self.data)?;
        let mut accounts: Vec<Account> = table
            .values()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        Ok(accounts)
    }

    /// Find an owner's account by name (case-insensitive)
    pub fn get_by_name(&self, owner_id: UserId, name: &str) -> BankResult<Option<Account>> {
        let name_lower = name.trim().to_lowercase();
        Ok(read_lock(&self.data)?
            .values()
            .find(|a| a.owner_id == owner_id && a.name.to_lowercase() == name_lower)
            .cloned())
    }

    pub fn get_all(&self) -> BankResult<Vec<Account>> {
        Ok(read_lock(&self.data)?.to_data().accounts)
    }

    pub fn count(&self) -> BankResult<usize> {
        Ok(read_lock(&self.data)?.len())
    }
}
