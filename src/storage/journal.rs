//! Write-ahead journal
//!
//! A committed unit of work is written here in full before any data file is
//! touched. The journal is removed once users.json, accounts.json and
//! transactions.json have all been rewritten; if it is still present at load
//! time a checkpoint was interrupted and its changesets are replayed in order.
//! A failed checkpoint leaves its changeset in place, so later commits append
//! behind it rather than replacing it.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BankResult;
use crate::models::{Account, AccountId, Transaction, User, UserId};

use super::file_io::{read_json, remove_if_exists, write_json_atomic};

/// Final state of everything one unit of work changed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Changeset {
    pub id: Uuid,
    pub committed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub removed_users: Vec<UserId>,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub removed_accounts: Vec<AccountId>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Changeset {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
            && self.removed_users.is_empty()
            && self.accounts.is_empty()
            && self.removed_accounts.is_empty()
            && self.transactions.is_empty()
    }
}

pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Durably add a changeset behind any still-pending ones
    pub fn append(&self, changeset: &Changeset) -> BankResult<()> {
        let mut pending = self.pending()?;
        pending.push(changeset.clone());
        write_json_atomic(&self.path, &pending)
    }

    /// Changesets whose checkpoint has not completed, oldest first
    pub fn pending(&self) -> BankResult<Vec<Changeset>> {
        read_json(&self.path)
    }

    pub fn clear(&self) -> BankResult<()> {
        remove_if_exists(&self.path)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountNumber, Money};
    use tempfile::TempDir;

    #[test]
    fn test_append_pending_clear() {
        let temp_dir = TempDir::new().unwrap();
        let journal = Journal::new(temp_dir.path().join("journal.json"));
        assert!(journal.pending().unwrap().is_empty());

        let mut changeset = Changeset::new();
        changeset.transactions.push(Transaction::deposit(
            UserId::new(),
            AccountNumber::generate(),
            Money::from_cents(500),
            "Deposit",
        ));
        journal.append(&changeset).unwrap();
        assert!(journal.exists());

        let second = Changeset::new();
        journal.append(&second).unwrap();

        let pending = journal.pending().unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, changeset.id);
        assert_eq!(pending[0].transactions.len(), 1);
        assert!(!pending[0].is_empty());
        assert!(pending[1].is_empty());

        journal.clear().unwrap();
        assert!(!journal.exists());
    }
}
