//! Storage layer for BankFlow
//!
//! JSON file storage with atomic writes, per-account locks, and a
//! write-ahead journal that makes each unit of work all-or-nothing across
//! users.json, accounts.json and transactions.json.
//!
//! Table guards are always taken in the order users, accounts, transactions.

pub mod accounts;
pub mod file_io;
pub mod init;
pub mod journal;
pub mod locks;
pub mod login_attempts;
pub mod transactions;
pub mod unit_of_work;
pub mod users;

pub use accounts::AccountRepository;
pub use file_io::{read_json, write_json_atomic};
pub use init::initialize_storage;
pub use journal::Changeset;
pub use login_attempts::{LoginAttempt, LoginAttemptRepository};
pub use transactions::{Page, TransactionRepository};
pub use unit_of_work::UnitOfWork;
pub use users::UserRepository;

use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::audit::{AuditEntry, AuditLogger, EntityType};
use crate::config::paths::BankPaths;
use crate::error::{BankError, BankResult};
use crate::models::{Account, AccountId, Transaction, UserId};

use accounts::AccountTable;
use journal::Journal;
use locks::AccountLocks;
use transactions::TransactionTable;
use unit_of_work::StagedChanges;
use users::UserTable;

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> BankResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|e| BankError::Storage(format!("Failed to acquire read lock: {}", e)))
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> BankResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|e| BankError::Storage(format!("Failed to acquire write lock: {}", e)))
}

/// Consistent view of accounts and ledger taken under one set of read guards
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
}

/// Main storage coordinator that provides access to all repositories
pub struct Storage {
    paths: BankPaths,
    pub users: UserRepository,
    pub accounts: AccountRepository,
    pub transactions: TransactionRepository,
    pub login_attempts: LoginAttemptRepository,
    locks: AccountLocks,
    lock_timeout: Duration,
    journal: Journal,
    audit: AuditLogger,
    commit_lock: Mutex<()>,
}

impl Storage {
    /// Create a new Storage instance
    pub fn new(paths: BankPaths) -> BankResult<Self> {
        paths.ensure_directories()?;

        Ok(Self {
            users: UserRepository::new(paths.users_file()),
            accounts: AccountRepository::new(paths.accounts_file()),
            transactions: TransactionRepository::new(paths.transactions_file()),
            login_attempts: LoginAttemptRepository::new(paths.login_attempts_file()),
            locks: AccountLocks::new(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            journal: Journal::new(paths.journal_file()),
            audit: AuditLogger::new(paths.audit_log()),
            commit_lock: Mutex::new(()),
            paths,
        })
    }

    /// How long a unit of work waits for an account lock
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn paths(&self) -> &BankPaths {
        &self.paths
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Load all data from disk, replaying an interrupted checkpoint
    pub fn load_all(&self) -> BankResult<()> {
        self.users.load()?;
        self.accounts.load()?;
        self.transactions.load()?;
        self.login_attempts.load()?;
        self.recover()
    }

    /// Start a unit of work
    pub fn begin(&self) -> UnitOfWork<'_> {
        UnitOfWork::new(self)
    }

    /// Read accounts and ledger at one consistent point
    pub fn snapshot(&self) -> BankResult<LedgerSnapshot> {
        let accounts = read_lock(self.accounts.table())?;
        let transactions = read_lock(self.transactions.table())?;
        Ok(LedgerSnapshot {
            accounts: accounts.values().cloned().collect(),
            transactions: transactions.iter().cloned().collect(),
        })
    }

    /// Check if storage has been initialized
    pub fn is_initialized(&self) -> bool {
        self.paths.is_initialized()
    }

    fn recover(&self) -> BankResult<()> {
        let pending = self.journal.pending()?;
        if pending.is_empty() {
            return Ok(());
        }

        let mut users = write_lock(self.users.table())?;
        let mut accounts = write_lock(self.accounts.table())?;
        let mut transactions = write_lock(self.transactions.table())?;

        for changeset in &pending {
            warn!(changeset = %changeset.id, "replaying interrupted commit from journal");
            apply(changeset, &mut users, &mut accounts, &mut transactions)?;
        }

        self.checkpoint(&users, &accounts, &transactions)?;
        self.journal.clear()
    }

    /// Commit a unit of work's staged changes
    ///
    /// Verification failures leave everything untouched. The journal write
    /// is the commit point: once it succeeds the changes are applied in
    /// memory and survive a crash even if the checkpoint that follows fails.
    pub(crate) fn commit(&self, staged: StagedChanges) -> BankResult<Changeset> {
        let _serial = self
            .commit_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut users = write_lock(self.users.table())?;
        let mut accounts = write_lock(self.accounts.table())?;
        let mut transactions = write_lock(self.transactions.table())?;

        verify(&staged, &users, &accounts, &transactions)?;

        let audit_entries = audit_entries(&staged, &users, &accounts);

        let StagedChanges {
            users: staged_users,
            removed_users,
            accounts: mut staged_accounts,
            removed_accounts,
            transactions: staged_transactions,
        } = staged;

        for account in &mut staged_accounts {
            account.version += 1;
        }

        let changeset = Changeset {
            committed_at: Some(Utc::now()),
            users: staged_users,
            removed_users: removed_users.iter().map(|u| u.id).collect(),
            accounts: staged_accounts,
            removed_accounts: removed_accounts.iter().map(|a| a.id).collect(),
            transactions: staged_transactions,
            ..Changeset::new()
        };

        if changeset.is_empty() {
            return Ok(changeset);
        }

        self.journal.append(&changeset)?;

        apply(&changeset, &mut users, &mut accounts, &mut transactions)?;

        match self.checkpoint(&users, &accounts, &transactions) {
            Ok(()) => {
                if let Err(e) = self.journal.clear() {
                    warn!(error = %e, "failed to remove journal after checkpoint");
                }
            }
            Err(e) => {
                warn!(
                    changeset = %changeset.id,
                    error = %e,
                    "checkpoint failed, journal kept for recovery"
                );
            }
        }

        drop(transactions);
        drop(accounts);
        drop(users);

        if let Err(e) = self.audit.log_batch(&audit_entries) {
            warn!(error = %e, "failed to write audit entries");
        }

        debug!(
            changeset = %changeset.id,
            accounts = changeset.accounts.len(),
            transactions = changeset.transactions.len(),
            "committed unit of work"
        );

        Ok(changeset)
    }

    fn checkpoint(
        &self,
        users: &UserTable,
        accounts: &AccountTable,
        transactions: &TransactionTable,
    ) -> BankResult<()> {
        self.users.persist(users)?;
        self.accounts.persist(accounts)?;
        self.transactions.persist(transactions)
    }
}

/// Reject a changeset that would violate uniqueness, versions or the
/// append-only ledger
fn verify(
    staged: &StagedChanges,
    users: &UserTable,
    accounts: &AccountTable,
    transactions: &TransactionTable,
) -> BankResult<()> {
    for user in &staged.users {
        if users.username_taken(&user.username, user.id) {
            return Err(BankError::Duplicate {
                entity_type: "User",
                identifier: user.username.clone(),
            });
        }
        if users.email_taken(&user.email, user.id) {
            return Err(BankError::Duplicate {
                entity_type: "User",
                identifier: user.email.clone(),
            });
        }
    }

    for user in &staged.removed_users {
        if users.get(&user.id).is_none() {
            return Err(BankError::user_not_found(user.id.to_string()));
        }
    }

    for account in staged.accounts.iter().chain(&staged.removed_accounts) {
        let current_version = accounts.get(&account.id).map(|a| a.version);
        match (current_version, account.version) {
            (None, 0) => {}
            (Some(current), staged_version) if staged_version > 0 && current == staged_version => {}
            _ => return Err(BankError::Conflict(account.id.to_string())),
        }
    }

    let removed_account = |id: &AccountId| staged.removed_accounts.iter().any(|a| a.id == *id);
    let removed_user = |id: &UserId| staged.removed_users.iter().any(|u| u.id == *id);

    for account in &staged.accounts {
        if let Some(holder) = accounts.get_by_number(&account.account_number) {
            if holder.id != account.id {
                return Err(BankError::Duplicate {
                    entity_type: "Account",
                    identifier: account.account_number.to_string(),
                });
            }
        }

        let owner = account.owner_id;
        let owner_known = users.get(&owner).is_some() || staged.users.iter().any(|u| u.id == owner);
        if !owner_known || removed_user(&owner) {
            return Err(BankError::user_not_found(owner.to_string()));
        }

        // Names are unique per owner, ignoring case
        let name = account.name.trim().to_lowercase();
        let same_name = |other: &Account| {
            other.id != account.id
                && other.owner_id == owner
                && other.name.trim().to_lowercase() == name
        };
        let committed_clash = accounts
            .values()
            .any(|other| same_name(other) && !removed_account(&other.id));
        if committed_clash || staged.accounts.iter().any(same_name) {
            return Err(BankError::Duplicate {
                entity_type: "Account",
                identifier: account.name.clone(),
            });
        }
    }

    // A removed user takes every one of their accounts along
    for user in &staged.removed_users {
        if let Some(left) = accounts
            .values()
            .find(|a| a.owner_id == user.id && !removed_account(&a.id))
        {
            return Err(BankError::Conflict(left.id.to_string()));
        }
    }

    for txn in &staged.transactions {
        if transactions.contains(&txn.id) {
            return Err(BankError::ImmutableTransaction(txn.id.to_string()));
        }
        if transactions.reference_exists(&txn.reference) {
            return Err(BankError::Duplicate {
                entity_type: "Transaction",
                identifier: txn.reference.clone(),
            });
        }
    }

    Ok(())
}

fn audit_entries(staged: &StagedChanges, users: &UserTable, accounts: &AccountTable) -> Vec<AuditEntry> {
    let mut entries = Vec::new();

    for user in &staged.users {
        let name = Some(user.username.clone());
        entries.push(match users.get(&user.id) {
            Some(before) => AuditEntry::update(EntityType::User, user.id.to_string(), name, before, user),
            None => AuditEntry::create(EntityType::User, user.id.to_string(), name, user),
        });
    }
    for account in &staged.accounts {
        let name = Some(account.name.clone());
        entries.push(match accounts.get(&account.id) {
            Some(before) => {
                AuditEntry::update(EntityType::Account, account.id.to_string(), name, before, account)
            }
            None => AuditEntry::create(EntityType::Account, account.id.to_string(), name, account),
        });
    }
    for txn in &staged.transactions {
        entries.push(AuditEntry::create(
            EntityType::Transaction,
            txn.id.to_string(),
            Some(txn.reference.clone()),
            txn,
        ));
    }
    for account in &staged.removed_accounts {
        entries.push(AuditEntry::delete(
            EntityType::Account,
            account.id.to_string(),
            Some(account.name.clone()),
            account,
        ));
    }
    for user in &staged.removed_users {
        entries.push(AuditEntry::delete(
            EntityType::User,
            user.id.to_string(),
            Some(user.username.clone()),
            user,
        ));
    }

    entries
}

/// Apply a changeset to the in-memory tables; safe to repeat
fn apply(
    changeset: &Changeset,
    users: &mut UserTable,
    accounts: &mut AccountTable,
    transactions: &mut TransactionTable,
) -> BankResult<()> {
    for txn in &changeset.transactions {
        transactions.append(txn.clone())?;
    }
    for user in &changeset.users {
        users.insert(user.clone());
    }
    for account in &changeset.accounts {
        accounts.insert(account.clone());
    }
    for id in &changeset.removed_accounts {
        accounts.remove(id);
    }
    for id in &changeset.removed_users {
        users.remove(id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountNumber, AccountType, Currency, Money, User};
    use tempfile::TempDir;

    fn create_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = BankPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        (temp_dir, storage)
    }

    fn new_account(owner: UserId, cents: i64) -> Account {
        let mut account = Account::new(
            owner,
            "Everyday",
            AccountType::Checking,
            AccountNumber::generate(),
            Currency::usd(),
        );
        account.balance = Money::from_cents(cents);
        account
    }

    fn create_owner(storage: &Storage, username: &str) -> User {
        let user = User::new(username, &format!("{}@example.com", username), "Test", "Owner");
        let mut uow = storage.begin();
        uow.stage_user(user.clone()).unwrap();
        uow.commit().unwrap();
        user
    }

    #[test]
    fn test_storage_creation() {
        let (temp_dir, storage) = create_storage();
        assert!(temp_dir.path().join("data").exists());
        assert!(!storage.is_initialized());
    }

    #[test]
    fn test_commit_persists_and_reloads() {
        let (temp_dir, storage) = create_storage();
        let user = User::new("jane_doe", "jane@example.com", "Jane", "Doe");
        let account = new_account(user.id, 0);

        let mut uow = storage.begin();
        uow.stage_user(user.clone()).unwrap();
        let mut funded = account.clone();
        funded.credit(Money::from_cents(5000)).unwrap();
        uow.stage_account(funded.clone()).unwrap();
        let mut deposit = Transaction::deposit(
            user.id,
            account.account_number.clone(),
            Money::from_cents(5000),
            "Deposit",
        );
        deposit.complete().unwrap();
        uow.append_transaction(deposit.clone()).unwrap();
        let changeset = uow.commit().unwrap();
        assert_eq!(changeset.accounts[0].version, 1);

        assert!(!storage.paths().journal_file().exists());

        let reopened = Storage::new(BankPaths::with_base_dir(temp_dir.path().to_path_buf())).unwrap();
        reopened.load_all().unwrap();
        assert_eq!(reopened.users.count().unwrap(), 1);
        let stored = reopened.accounts.get(account.id).unwrap().unwrap();
        assert_eq!(stored.balance.cents(), 5000);
        assert_eq!(stored.version, 1);
        assert!(reopened.transactions.get(deposit.id).unwrap().is_some());

        let audit = reopened.audit().read_all().unwrap();
        assert_eq!(audit.len(), 3);
    }

    #[test]
    fn test_stale_version_is_conflict() {
        let (_temp, storage) = create_storage();
        let owner = create_owner(&storage, "jane_doe");
        let account = new_account(owner.id, 1000);

        let mut uow = storage.begin();
        uow.stage_account(account.clone()).unwrap();
        let committed = uow.commit().unwrap().accounts[0].clone();

        // Two writers both read version 1; the second commit must fail
        let mut first = committed.clone();
        first.debit(Money::from_cents(600)).unwrap();
        let mut second = committed.clone();
        second.debit(Money::from_cents(600)).unwrap();

        let staged = StagedChanges {
            accounts: vec![first],
            ..StagedChanges::default()
        };
        storage.commit(staged).unwrap();

        let staged = StagedChanges {
            accounts: vec![second],
            ..StagedChanges::default()
        };
        let err = storage.commit(staged).unwrap_err();
        assert!(matches!(err, BankError::Conflict(_)));

        let stored = storage.accounts.get(committed.id).unwrap().unwrap();
        assert_eq!(stored.balance.cents(), 400);
        assert_eq!(stored.version, 2);
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let (_temp, storage) = create_storage();

        let mut uow = storage.begin();
        uow.stage_user(User::new("jane_doe", "jane@example.com", "Jane", "Doe"))
            .unwrap();
        uow.commit().unwrap();

        let mut uow = storage.begin();
        uow.stage_user(User::new("Jane_Doe", "other@example.com", "Jane", "Doe"))
            .unwrap();
        let err = uow.commit().unwrap_err();
        assert!(matches!(err, BankError::Duplicate { entity_type: "User", .. }));
        assert_eq!(storage.users.count().unwrap(), 1);
    }

    #[test]
    fn test_journal_replayed_on_load() {
        let (temp_dir, storage) = create_storage();
        let account = new_account(UserId::new(), 0);

        // A changeset that reached the journal but never the data files
        let mut committed = account.clone();
        committed.balance = Money::from_cents(2500);
        committed.version = 1;
        let mut deposit = Transaction::deposit(
            committed.owner_id,
            committed.account_number.clone(),
            Money::from_cents(2500),
            "Deposit",
        );
        deposit.complete().unwrap();
        let changeset = Changeset {
            accounts: vec![committed.clone()],
            transactions: vec![deposit.clone()],
            ..Changeset::new()
        };
        storage.journal.append(&changeset).unwrap();
        drop(storage);

        let reopened = Storage::new(BankPaths::with_base_dir(temp_dir.path().to_path_buf())).unwrap();
        reopened.load_all().unwrap();

        let stored = reopened.accounts.get(account.id).unwrap().unwrap();
        assert_eq!(stored.balance.cents(), 2500);
        assert_eq!(reopened.transactions.count().unwrap(), 1);
        assert!(!reopened.paths().journal_file().exists());

        // Replaying again (journal restored by hand) changes nothing
        reopened.journal.append(&changeset).unwrap();
        reopened.load_all().unwrap();
        assert_eq!(reopened.transactions.count().unwrap(), 1);
        assert_eq!(
            reopened.accounts.get(account.id).unwrap().unwrap().balance.cents(),
            2500
        );
    }

    #[test]
    fn test_snapshot_is_consistent() {
        let (_temp, storage) = create_storage();
        let mut uow = storage.begin();
        let owner = User::new("jane_doe", "jane@example.com", "Jane", "Doe");
        uow.stage_account(new_account(owner.id, 100)).unwrap();
        uow.stage_user(owner).unwrap();
        uow.commit().unwrap();

        let snapshot = storage.snapshot().unwrap();
        assert_eq!(snapshot.accounts.len(), 1);
        assert!(snapshot.transactions.is_empty());
    }

    #[test]
    fn test_account_needs_existing_owner() {
        let (_temp, storage) = create_storage();

        let mut uow = storage.begin();
        uow.stage_account(new_account(UserId::new(), 0)).unwrap();
        let err = uow.commit().unwrap_err();
        assert!(matches!(err, BankError::NotFound { entity_type: "User", .. }));

        // An owner removed in the same changeset does not count either
        let owner = create_owner(&storage, "jane_doe");
        let staged = StagedChanges {
            accounts: vec![new_account(owner.id, 0)],
            removed_users: vec![owner.clone()],
            ..StagedChanges::default()
        };
        let err = storage.commit(staged).unwrap_err();
        assert!(matches!(err, BankError::NotFound { entity_type: "User", .. }));
        assert_eq!(storage.accounts.count().unwrap(), 0);
        assert!(storage.users.get(owner.id).unwrap().is_some());
    }

    #[test]
    fn test_account_name_unique_per_owner() {
        let (_temp, storage) = create_storage();
        let owner = create_owner(&storage, "jane_doe");
        let other = create_owner(&storage, "john_doe");

        let mut uow = storage.begin();
        uow.stage_account(new_account(owner.id, 0)).unwrap();
        uow.stage_account(new_account(other.id, 0)).unwrap();
        uow.commit().unwrap();

        let mut twin = new_account(owner.id, 0);
        twin.name = "EVERYDAY".to_string();
        let mut uow = storage.begin();
        uow.stage_account(twin).unwrap();
        let err = uow.commit().unwrap_err();
        assert!(matches!(err, BankError::Duplicate { entity_type: "Account", .. }));

        // Two new accounts with one name in the same changeset
        let third = create_owner(&storage, "jim_doe");
        let mut uow = storage.begin();
        uow.stage_account(new_account(third.id, 0)).unwrap();
        uow.stage_account(new_account(third.id, 0)).unwrap();
        let err = uow.commit().unwrap_err();
        assert!(matches!(err, BankError::Duplicate { entity_type: "Account", .. }));
        assert_eq!(storage.accounts.count().unwrap(), 2);
    }

    #[test]
    fn test_stale_user_delete_after_open_is_conflict() {
        let (_temp, storage) = create_storage();
        let owner = create_owner(&storage, "jane_doe");

        let mut uow = storage.begin();
        uow.stage_account(new_account(owner.id, 0)).unwrap();
        let everyday = uow.commit().unwrap().accounts[0].clone();

        // The delete was planned against the account list before the open
        let stale_delete = StagedChanges {
            removed_users: vec![owner.clone()],
            removed_accounts: vec![everyday.clone()],
            ..StagedChanges::default()
        };

        let mut savings = new_account(owner.id, 2500);
        savings.name = "Savings".to_string();
        let mut uow = storage.begin();
        uow.stage_account(savings.clone()).unwrap();
        let savings = uow.commit().unwrap().accounts[0].clone();

        let err = storage.commit(stale_delete).unwrap_err();
        assert!(matches!(err, BankError::Conflict(ref id) if *id == savings.id.to_string()));
        assert!(storage.users.get(owner.id).unwrap().is_some());
        assert_eq!(storage.accounts.count().unwrap(), 2);

        // Removing every account alongside the user goes through
        let complete_delete = StagedChanges {
            removed_users: vec![owner.clone()],
            removed_accounts: vec![everyday, savings],
            ..StagedChanges::default()
        };
        storage.commit(complete_delete).unwrap();
        assert!(storage.users.get(owner.id).unwrap().is_none());
        assert_eq!(storage.accounts.count().unwrap(), 0);
    }
}
