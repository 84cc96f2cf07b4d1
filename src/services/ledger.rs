//! Ledger service
//!
//! Deposits and withdrawals, the ledger history views, and the
//! reconciliation check that replays the ledger against stored balances.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::error::{BankError, BankResult};
use crate::models::{
    Account, AccountBalanceError, AccountId, AccountNumber, Money, Transaction, UserId,
};
use crate::storage::{Page, Storage};

/// Service for single-account balance operations and ledger queries
pub struct LedgerService<'a> {
    storage: &'a Storage,
}

/// An account whose stored balance disagrees with its ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceMismatch {
    pub account_id: AccountId,
    pub account_number: AccountNumber,
    pub stored: Money,
    pub replayed: Money,
}

/// Result of replaying the ledger
#[derive(Debug, Clone, Default)]
pub struct ReconciliationReport {
    pub accounts_checked: usize,
    pub transactions_replayed: usize,
    pub mismatches: Vec<BalanceMismatch>,
    /// Completed entries naming an account number that no longer exists
    pub unknown_accounts: Vec<AccountNumber>,
}

impl ReconciliationReport {
    pub fn is_balanced(&self) -> bool {
        self.mismatches.is_empty()
    }
}

impl<'a> LedgerService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Add money to an account
    ///
    /// Records one completed DEPOSIT entry in the same unit of work as the
    /// balance change.
    pub fn deposit(
        &self,
        user_id: UserId,
        account_id: AccountId,
        amount: Money,
        description: Option<&str>,
    ) -> BankResult<Transaction> {
        ensure_positive(amount)?;

        let mut uow = self.storage.begin();
        uow.lock_accounts(&[account_id])?;

        let mut account = uow.account(account_id)?;
        ensure_usable(&account, user_id)?;

        account
            .credit(amount)
            .map_err(|e| balance_error(&account, e))?;

        let mut txn = Transaction::deposit(
            user_id,
            account.account_number.clone(),
            amount,
            description_or(description, "Deposit"),
        );
        txn.complete()
            .map_err(|e| BankError::Validation(e.to_string()))?;

        uow.stage_account(account.clone())?;
        uow.append_transaction(txn.clone())?;
        uow.commit()?;

        info!(
            account = %account.id,
            transaction = %txn.reference,
            "deposit committed"
        );
        Ok(txn)
    }

    /// Take money out of an account
    ///
    /// A withdrawal larger than the balance is rejected with
    /// `InsufficientFunds`; the balance is untouched and no entry is recorded.
    pub fn withdraw(
        &self,
        user_id: UserId,
        account_id: AccountId,
        amount: Money,
        description: Option<&str>,
    ) -> BankResult<Transaction> {
        ensure_positive(amount)?;

        let mut uow = self.storage.begin();
        uow.lock_accounts(&[account_id])?;

        let mut account = uow.account(account_id)?;
        ensure_usable(&account, user_id)?;

        if let Err(e) = account.debit(amount) {
            warn!(account = %account.id, error = %e, "withdrawal rejected");
            return Err(balance_error(&account, e));
        }

        let mut txn = Transaction::withdrawal(
            user_id,
            account.account_number.clone(),
            amount,
            description_or(description, "Withdrawal"),
        );
        txn.complete()
            .map_err(|e| BankError::Validation(e.to_string()))?;

        uow.stage_account(account.clone())?;
        uow.append_transaction(txn.clone())?;
        uow.commit()?;

        info!(
            account = %account.id,
            transaction = %txn.reference,
            "withdrawal committed"
        );
        Ok(txn)
    }

    /// One page of a user's ledger, newest first
    pub fn history(&self, user_id: UserId, page: usize, per_page: usize) -> BankResult<Page<Transaction>> {
        self.storage
            .transactions
            .get_by_user_paged(user_id, page, per_page.max(1))
    }

    /// A user's most recent entries
    pub fn recent(&self, user_id: UserId, limit: usize) -> BankResult<Vec<Transaction>> {
        self.storage.transactions.get_recent_by_user(user_id, limit)
    }

    /// Look up an entry by its short reference
    pub fn find_by_reference(&self, reference: &str) -> BankResult<Transaction> {
        self.storage
            .transactions
            .get_by_reference(reference.trim())?
            .ok_or_else(|| BankError::transaction_not_found(reference.trim()))
    }

    /// Replay every completed entry from zero and compare with stored balances
    ///
    /// Every account starts at zero and only changes through ledger entries,
    /// so the replayed sum must equal the stored balance.
    pub fn verify(&self) -> BankResult<ReconciliationReport> {
        let snapshot = self.storage.snapshot()?;

        let mut replayed: HashMap<&AccountNumber, Money> = snapshot
            .accounts
            .iter()
            .map(|a| (&a.account_number, Money::zero()))
            .collect();

        let mut report = ReconciliationReport {
            accounts_checked: snapshot.accounts.len(),
            ..ReconciliationReport::default()
        };

        for txn in snapshot.transactions.iter().filter(|t| t.is_completed()) {
            report.transactions_replayed += 1;
            for number in [&txn.from_account, &txn.to_account].into_iter().flatten() {
                match replayed.get_mut(number) {
                    Some(balance) => *balance += txn.effect_on(number),
                    None => {
                        if !report.unknown_accounts.contains(number) {
                            report.unknown_accounts.push(number.clone());
                        }
                    }
                }
            }
        }

        for account in &snapshot.accounts {
            let expected = replayed
                .get(&account.account_number)
                .copied()
                .unwrap_or_default();
            if expected != account.balance {
                report.mismatches.push(BalanceMismatch {
                    account_id: account.id,
                    account_number: account.account_number.clone(),
                    stored: account.balance,
                    replayed: expected,
                });
            }
        }

        if !report.is_balanced() {
            warn!(
                mismatches = report.mismatches.len(),
                "ledger does not reconcile with stored balances"
            );
        }

        Ok(report)
    }
}

pub(crate) fn description_or(description: Option<&str>, default: &str) -> String {
    match description.map(str::trim) {
        Some(d) if !d.is_empty() => d.to_string(),
        _ => default.to_string(),
    }
}

pub(crate) fn ensure_positive(amount: Money) -> BankResult<()> {
    if !amount.is_positive() {
        return Err(BankError::InvalidAmount(format!(
            "{} must be greater than zero",
            amount
        )));
    }
    Ok(())
}

/// The acting user must own the account and the account must be ACTIVE
pub(crate) fn ensure_usable(account: &Account, user_id: UserId) -> BankResult<()> {
    ensure_owner(account, user_id)?;
    ensure_active(account)
}

pub(crate) fn ensure_owner(account: &Account, user_id: UserId) -> BankResult<()> {
    if account.owner_id != user_id {
        return Err(BankError::Unauthorized(format!(
            "account {} does not belong to this user",
            account.account_number.masked()
        )));
    }
    Ok(())
}

pub(crate) fn ensure_active(account: &Account) -> BankResult<()> {
    if !account.is_active() {
        return Err(BankError::AccountFrozen {
            account: account.account_number.to_string(),
            status: account.status.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn balance_error(account: &Account, err: AccountBalanceError) -> BankError {
    match err {
        AccountBalanceError::NonPositiveAmount(amount) => {
            BankError::InvalidAmount(format!("{} must be greater than zero", amount))
        }
        AccountBalanceError::Insufficient { needed, available } => BankError::InsufficientFunds {
            account: account.account_number.to_string(),
            needed,
            available,
        },
        AccountBalanceError::Overflow => {
            BankError::InvalidAmount(format!("balance of {} would overflow", account.account_number))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BankPaths;
    use crate::models::{AccountStatus, AccountType, Currency, TransactionType, User};
    use crate::services::AccountService;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = BankPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    fn create_owner(storage: &Storage) -> UserId {
        let user = User::new("ledger_owner", "owner@example.com", "Lena", "Owner");
        let mut uow = storage.begin();
        uow.stage_user(user.clone()).unwrap();
        uow.commit().unwrap();
        user.id
    }

    fn open_account(storage: &Storage, owner: UserId, cents: i64) -> Account {
        AccountService::new(storage)
            .open(
                owner,
                "Everyday Checking",
                AccountType::Checking,
                Money::from_cents(cents),
                Currency::usd(),
            )
            .unwrap()
    }

    #[test]
    fn test_deposit() {
        let (_temp, storage) = create_test_storage();
        let owner = create_owner(&storage);
        let account = open_account(&storage, owner, 0);
        let service = LedgerService::new(&storage);

        let txn = service
            .deposit(owner, account.id, Money::from_cents(2500), None)
            .unwrap();

        assert_eq!(txn.transaction_type, TransactionType::Deposit);
        assert!(txn.is_completed());
        assert_eq!(txn.description, "Deposit");
        assert_eq!(txn.to_account.as_ref(), Some(&account.account_number));

        let stored = storage.accounts.get(account.id).unwrap().unwrap();
        assert_eq!(stored.balance.cents(), 2500);
    }

    #[test]
    fn test_withdraw_more_than_balance_changes_nothing() {
        let (_temp, storage) = create_test_storage();
        let owner = create_owner(&storage);
        let account = open_account(&storage, owner, 10_000);
        let before = storage.transactions.count().unwrap();
        let service = LedgerService::new(&storage);

        let err = service
            .withdraw(owner, account.id, Money::from_cents(50_000), None)
            .unwrap_err();

        match err {
            BankError::InsufficientFunds {
                needed, available, ..
            } => {
                assert_eq!(needed.cents(), 50_000);
                assert_eq!(available.cents(), 10_000);
            }
            other => panic!("unexpected error: {other}"),
        }

        let stored = storage.accounts.get(account.id).unwrap().unwrap();
        assert_eq!(stored.balance.cents(), 10_000);
        assert_eq!(storage.transactions.count().unwrap(), before);
    }

    #[test]
    fn test_withdraw_exact_balance() {
        let (_temp, storage) = create_test_storage();
        let owner = create_owner(&storage);
        let account = open_account(&storage, owner, 10_000);

        let txn = LedgerService::new(&storage)
            .withdraw(owner, account.id, Money::from_cents(10_000), Some("  Rent "))
            .unwrap();
        assert_eq!(txn.description, "Rent");
        assert_eq!(
            storage.accounts.get(account.id).unwrap().unwrap().balance,
            Money::zero()
        );
    }

    #[test]
    fn test_non_positive_amounts_rejected() {
        let (_temp, storage) = create_test_storage();
        let owner = create_owner(&storage);
        let account = open_account(&storage, owner, 1000);
        let service = LedgerService::new(&storage);

        for cents in [0, -500] {
            assert!(matches!(
                service.deposit(owner, account.id, Money::from_cents(cents), None),
                Err(BankError::InvalidAmount(_))
            ));
            assert!(matches!(
                service.withdraw(owner, account.id, Money::from_cents(cents), None),
                Err(BankError::InvalidAmount(_))
            ));
        }
    }

    #[test]
    fn test_frozen_and_foreign_accounts_rejected() {
        let (_temp, storage) = create_test_storage();
        let owner = create_owner(&storage);
        let account = open_account(&storage, owner, 1000);
        let service = LedgerService::new(&storage);

        assert!(matches!(
            service.deposit(UserId::new(), account.id, Money::from_cents(100), None),
            Err(BankError::Unauthorized(_))
        ));

        AccountService::new(&storage)
            .set_status(owner, account.id, AccountStatus::Frozen)
            .unwrap();
        assert!(matches!(
            service.withdraw(owner, account.id, Money::from_cents(100), None),
            Err(BankError::AccountFrozen { .. })
        ));
        assert_eq!(
            storage.accounts.get(account.id).unwrap().unwrap().balance.cents(),
            1000
        );
    }

    #[test]
    fn test_history_and_recent() {
        let (_temp, storage) = create_test_storage();
        let owner = create_owner(&storage);
        let account = open_account(&storage, owner, 0);
        let service = LedgerService::new(&storage);

        for cents in 1..=12 {
            service
                .deposit(owner, account.id, Money::from_cents(cents * 100), None)
                .unwrap();
        }

        let page = service.history(owner, 1, 5).unwrap();
        assert_eq!(page.total, 12);
        assert_eq!(page.total_pages(), 3);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.items[0].amount.cents(), 1200);

        let recent = service.recent(owner, 10).unwrap();
        assert_eq!(recent.len(), 10);

        let found = service.find_by_reference(&recent[0].reference).unwrap();
        assert_eq!(found.id, recent[0].id);
        assert!(service.find_by_reference("ffffffffffff").unwrap_err().is_not_found());
    }

    #[test]
    fn test_verify_detects_tampered_balance() {
        let (temp, storage) = create_test_storage();
        let owner = create_owner(&storage);
        let account = open_account(&storage, owner, 5000);
        let service = LedgerService::new(&storage);
        service
            .withdraw(owner, account.id, Money::from_cents(1500), None)
            .unwrap();

        let report = service.verify().unwrap();
        assert!(report.is_balanced());
        assert_eq!(report.transactions_replayed, 2);

        // Edit the balance on disk behind the ledger's back
        let mut stored = storage.accounts.get(account.id).unwrap().unwrap();
        stored.balance = Money::from_cents(9999);
        let tampered = serde_json::json!({ "accounts": [stored] });
        std::fs::write(
            temp.path().join("data").join("accounts.json"),
            serde_json::to_string(&tampered).unwrap(),
        )
        .unwrap();
        storage.load_all().unwrap();

        let report = LedgerService::new(&storage).verify().unwrap();
        assert!(!report.is_balanced());
        assert_eq!(report.mismatches[0].stored.cents(), 9999);
        assert_eq!(report.mismatches[0].replayed.cents(), 3500);
    }
}
