//! Transaction ledger repository for JSON storage
//!
//! The ledger is append-only: entries are inserted once and never replaced.
//! Insertion order is kept, along with indexes by account number, user and
//! short reference.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::error::{BankError, BankResult};
use crate::models::{AccountNumber, Transaction, TransactionId, UserId};

use super::file_io::{read_json, write_json_atomic};
use super::{read_lock, write_lock};

/// Serializable transaction data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct TransactionData {
    transactions: Vec<Transaction>,
}

/// One page of a newest-first listing
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> usize {
        if self.per_page == 0 {
            0
        } else {
            self.total.div_ceil(self.per_page)
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}

/// Outcome of appending an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    Inserted,
    /// An identical entry with the same id was already present
    AlreadyPresent,
}

/// In-memory ledger with its indexes
#[derive(Debug, Default)]
pub struct TransactionTable {
    by_id: HashMap<TransactionId, Transaction>,
    order: Vec<TransactionId>,
    by_account: HashMap<AccountNumber, Vec<TransactionId>>,
    by_user: HashMap<UserId, Vec<TransactionId>>,
    by_reference: HashMap<String, TransactionId>,
}

impl TransactionTable {
    pub fn get(&self, id: &TransactionId) -> Option<&Transaction> {
        self.by_id.get(id)
    }

    pub fn contains(&self, id: &TransactionId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn reference_exists(&self, reference: &str) -> bool {
        self.by_reference.contains_key(reference)
    }

    /// Append an entry; an existing id is never overwritten
    pub fn append(&mut self, txn: Transaction) -> BankResult<Appended> {
        if let Some(existing) = self.by_id.get(&txn.id) {
            if *existing == txn {
                return Ok(Appended::AlreadyPresent);
            }
            return Err(BankError::ImmutableTransaction(txn.id.to_string()));
        }
        if self.by_reference.contains_key(&txn.reference) {
            return Err(BankError::Duplicate {
                entity_type: "Transaction",
                identifier: txn.reference.clone(),
            });
        }

        let id = txn.id;
        for number in [&txn.from_account, &txn.to_account].into_iter().flatten() {
            let ids = self.by_account.entry(number.clone()).or_default();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        self.by_user.entry(txn.user_id).or_default().push(id);
        self.by_reference.insert(txn.reference.clone(), id);
        self.order.push(id);
        self.by_id.insert(id, txn);
        Ok(Appended::Inserted)
    }

    /// All entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn newest_first<'a>(&'a self, ids: Option<&'a Vec<TransactionId>>) -> Vec<&'a Transaction> {
        let mut entries: Vec<&Transaction> = ids
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default();
        // Stable sort keeps insertion order for equal timestamps; reverse after
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        entries.reverse();
        entries
    }

    fn to_data(&self) -> TransactionData {
        TransactionData {
            transactions: self.iter().cloned().collect(),
        }
    }
}

/// Repository for the transaction ledger
pub struct TransactionRepository {
    path: PathBuf,
    data: RwLock<TransactionTable>,
}

impl TransactionRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(TransactionTable::default()),
        }
    }

    /// Load the ledger from disk
    pub fn load(&self) -> BankResult<()> {
        let file_data: TransactionData = read_json(&self.path)?;

        let mut table = TransactionTable::default();
        for txn in file_data.transactions {
            table.append(txn)?;
        }

        *write_lock(&self.data)? = table;
        Ok(())
    }

    /// Save the ledger to disk
    pub fn save(&self) -> BankResult<()> {
        let table = read_lock(&self.data)?;
        self.persist(&table)
    }

    pub(crate) fn persist(&self, table: &TransactionTable) -> BankResult<()> {
        write_json_atomic(&self.path, &table.to_data())
    }

    pub(crate) fn table(&self) -> &RwLock<TransactionTable> {
        &self.data
    }

    pub fn get(&self, id: TransactionId) -> BankResult<Option<Transaction>> {
        Ok(read_lock(&self.data)?.get(&id).cloned())
    }

    pub fn get_by_reference(&self, reference: &str) -> BankResult<Option<Transaction>> {
        let table = read_lock(&self.data)?;
        Ok(table
            .by_reference
            .get(reference)
            .and_then(|id| table.get(id))
            .cloned())
    }

    /// Entries touching an account number, newest first
    pub fn get_by_account(&self, number: &AccountNumber) -> BankResult<Vec<Transaction>> {
        let table = read_lock(&self.data)?;
        Ok(table
            .newest_first(table.by_account.get(number))
            .into_iter()
            .cloned()
            .collect())
    }

    /// Entries initiated by a user since `since`, newest first
    pub fn get_by_user_since(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> BankResult<Vec<Transaction>> {
        let table = read_lock(&self.data)?;
        Ok(table
            .newest_first(table.by_user.get(&user_id))
            .into_iter()
            .filter(|t| t.created_at >= since)
            .cloned()
            .collect())
    }

    /// One page of a user's entries, newest first; `page` is 1-based
    pub fn get_by_user_paged(
        &self,
        user_id: UserId,
        page: usize,
        per_page: usize,
    ) -> BankResult<Page<Transaction>> {
        let table = read_lock(&self.data)?;
        let entries = table.newest_first(table.by_user.get(&user_id));
        let page = page.max(1);
        let items = entries
            .iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .map(|t| (*t).clone())
            .collect();

        Ok(Page {
            items,
            page,
            per_page,
            total: entries.len(),
        })
    }

    /// A user's most recent entries
    pub fn get_recent_by_user(&self, user_id: UserId, limit: usize) -> BankResult<Vec<Transaction>> {
        Ok(self.get_by_user_paged(user_id, 1, limit)?.items)
    }

    pub fn get_all(&self) -> BankResult<Vec<Transaction>> {
        Ok(read_lock(&self.data)?.iter().cloned().collect())
    }

    pub fn count(&self) -> BankResult<usize> {
        Ok(read_lock(&self.data)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Money, TransactionStatus};
    use chrono::Duration;
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, TransactionRepository) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("transactions.json");
        let repo = TransactionRepository::new(path);
        (temp_dir, repo)
    }

    fn completed_deposit(user: UserId, to: &AccountNumber, cents: i64) -> Transaction {
        let mut txn = Transaction::deposit(user, to.clone(), Money::from_cents(cents), "Deposit");
        txn.complete().unwrap();
        txn
    }

    #[test]
    fn test_append_is_append_only() {
        let mut table = TransactionTable::default();
        let user = UserId::new();
        let number = AccountNumber::generate();
        let txn = completed_deposit(user, &number, 1000);

        assert_eq!(table.append(txn.clone()).unwrap(), Appended::Inserted);
        assert_eq!(table.append(txn.clone()).unwrap(), Appended::AlreadyPresent);

        let mut tampered = txn.clone();
        tampered.amount = Money::from_cents(999_999);
        assert!(matches!(
            table.append(tampered),
            Err(BankError::ImmutableTransaction(_))
        ));

        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&txn.id).unwrap().amount.cents(), 1000);
    }

    #[test]
    fn test_save_and_reload_keeps_order() {
        let (_temp_dir, repo) = create_test_repo();
        let user = UserId::new();
        let number = AccountNumber::generate();

        {
            let mut table = write_lock(repo.table()).unwrap();
            for cents in [100, 200, 300] {
                table.append(completed_deposit(user, &number, cents)).unwrap();
            }
        }
        repo.save().unwrap();

        let repo2 = TransactionRepository::new(repo.path.clone());
        repo2.load().unwrap();
        let amounts: Vec<i64> = repo2
            .get_all()
            .unwrap()
            .iter()
            .map(|t| t.amount.cents())
            .collect();
        assert_eq!(amounts, vec![100, 200, 300]);
        assert!(repo2
            .get_all()
            .unwrap()
            .iter()
            .all(|t| t.status == TransactionStatus::Completed));
    }

    #[test]
    fn test_account_index_newest_first() {
        let (_temp_dir, repo) = create_test_repo();
        let user = UserId::new();
        let a = AccountNumber::generate();
        let b = AccountNumber::generate();

        let mut first = completed_deposit(user, &a, 100);
        first.created_at = Utc::now() - Duration::minutes(5);
        let mut transfer = Transaction::transfer(user, a.clone(), b.clone(), Money::from_cents(50), "t");
        transfer.complete().unwrap();

        {
            let mut table = write_lock(repo.table()).unwrap();
            table.append(first.clone()).unwrap();
            table.append(transfer.clone()).unwrap();
        }

        let for_a = repo.get_by_account(&a).unwrap();
        assert_eq!(for_a.len(), 2);
        assert_eq!(for_a[0].id, transfer.id);
        assert_eq!(for_a[1].id, first.id);

        let for_b = repo.get_by_account(&b).unwrap();
        assert_eq!(for_b.len(), 1);

        let found = repo.get_by_reference(&transfer.reference).unwrap().unwrap();
        assert_eq!(found.id, transfer.id);
    }

    #[test]
    fn test_user_pagination() {
        let (_temp_dir, repo) = create_test_repo();
        let user = UserId::new();
        let number = AccountNumber::generate();

        {
            let mut table = write_lock(repo.table()).unwrap();
            for i in 0..25 {
                let mut txn = completed_deposit(user, &number, 100 + i);
                txn.created_at = Utc::now() - Duration::minutes(100 - i);
                table.append(txn).unwrap();
            }
        }

        let page1 = repo.get_by_user_paged(user, 1, 20).unwrap();
        assert_eq!(page1.items.len(), 20);
        assert_eq!(page1.total, 25);
        assert_eq!(page1.total_pages(), 2);
        assert!(page1.has_next());
        assert_eq!(page1.items[0].amount.cents(), 124);

        let page2 = repo.get_by_user_paged(user, 2, 20).unwrap();
        assert_eq!(page2.items.len(), 5);
        assert!(!page2.has_next());

        let recent = repo.get_recent_by_user(user, 10).unwrap();
        assert_eq!(recent.len(), 10);

        let empty = repo.get_by_user_paged(UserId::new(), 1, 20).unwrap();
        assert_eq!(empty.total, 0);
        assert_eq!(empty.total_pages(), 0);
    }
}
