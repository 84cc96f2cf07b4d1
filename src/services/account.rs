//! Account service
//!
//! Opening accounts, lookups, status changes, statements and the per-owner
//! summary.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::error::{BankError, BankResult};
use crate::models::{
    Account, AccountId, AccountNumber, AccountStatus, AccountType, Currency, Money, Transaction,
    TransactionType, UserId,
};
use crate::storage::{Storage, UnitOfWork};

use super::ledger::{balance_error, ensure_owner};

/// Attempts at drawing an unused account number before giving up
const MAX_NUMBER_ATTEMPTS: usize = 100;

/// Window for the spending and income figures in the owner summary
const SUMMARY_WINDOW_DAYS: i64 = 30;

/// Service for account management
pub struct AccountService<'a> {
    storage: &'a Storage,
}

/// Coarse rating of an owner's total balance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinancialHealth {
    Excellent,
    VeryGood,
    Good,
    Fair,
    Poor,
}

impl FinancialHealth {
    pub fn from_total(total: Money) -> Self {
        match total.dollars() {
            d if d >= 50_000 => Self::Excellent,
            d if d >= 20_000 => Self::VeryGood,
            d if d >= 10_000 => Self::Good,
            d if d >= 5_000 => Self::Fair,
            _ => Self::Poor,
        }
    }
}

impl fmt::Display for FinancialHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Excellent => write!(f, "Excellent"),
            Self::VeryGood => write!(f, "Very Good"),
            Self::Good => write!(f, "Good"),
            Self::Fair => write!(f, "Fair"),
            Self::Poor => write!(f, "Poor"),
        }
    }
}

/// Owner-level figures over all of a user's accounts
#[derive(Debug, Clone)]
pub struct OwnerSummary {
    pub total_accounts: usize,
    pub active_accounts: usize,
    pub total_balance: Money,
    /// Completed withdrawals, transfers and payments in the last 30 days
    pub monthly_spending: Money,
    /// Completed deposits in the last 30 days
    pub monthly_income: Money,
    /// Percentage of income not spent, one decimal; 0 without income
    pub savings_rate: f64,
    pub health: FinancialHealth,
}

impl<'a> AccountService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Open an account for an existing user
    ///
    /// A positive initial deposit is credited and recorded as a DEPOSIT entry
    /// in the same unit of work.
    pub fn open(
        &self,
        owner_id: UserId,
        name: &str,
        account_type: AccountType,
        initial_deposit: Money,
        currency: Currency,
    ) -> BankResult<Account> {
        self.storage
            .users
            .get(owner_id)?
            .ok_or_else(|| BankError::user_not_found(owner_id.to_string()))?;

        if let Some(existing) = self.storage.accounts.get_by_name(owner_id, name)? {
            return Err(BankError::Duplicate {
                entity_type: "Account",
                identifier: existing.name,
            });
        }

        let mut uow = self.storage.begin();
        let staged = stage_new_account(
            &mut uow,
            owner_id,
            name,
            account_type,
            currency,
            initial_deposit,
        )?;
        let changeset = uow.commit()?;

        let account = changeset
            .accounts
            .into_iter()
            .find(|a| a.id == staged.id)
            .unwrap_or(staged);

        info!(account = %account.id, account_type = %account.account_type, "account opened");
        Ok(account)
    }

    pub fn get(&self, id: AccountId) -> BankResult<Option<Account>> {
        self.storage.accounts.get(id)
    }

    pub fn get_by_number(&self, number: &str) -> BankResult<Option<Account>> {
        match AccountNumber::parse(number) {
            Ok(number) => self.storage.accounts.get_by_number(&number),
            Err(_) => Ok(None),
        }
    }

    /// Find one of an owner's accounts by number, ID or name
    pub fn find(&self, owner_id: UserId, identifier: &str) -> BankResult<Option<Account>> {
        let identifier = identifier.trim();

        if let Some(account) = self.get_by_number(identifier)? {
            return Ok(Some(account).filter(|a| a.owner_id == owner_id));
        }

        if let Ok(id) = identifier.parse::<AccountId>() {
            if let Some(account) = self.storage.accounts.get(id)? {
                return Ok(Some(account).filter(|a| a.owner_id == owner_id));
            }
        }

        self.storage.accounts.get_by_name(owner_id, identifier)
    }

    /// Like `find`, but a missing account is an error
    pub fn require(&self, owner_id: UserId, identifier: &str) -> BankResult<Account> {
        self.find(owner_id, identifier)?
            .ok_or_else(|| BankError::account_not_found(identifier.trim()))
    }

    pub fn list_for_owner(&self, owner_id: UserId) -> BankResult<Vec<Account>> {
        self.storage.accounts.get_by_owner(owner_id)
    }

    /// Change an account's status; only the owner may do so
    pub fn set_status(
        &self,
        user_id: UserId,
        account_id: AccountId,
        status: AccountStatus,
    ) -> BankResult<Account> {
        let mut uow = self.storage.begin();
        uow.lock_accounts(&[account_id])?;

        let mut account = uow.account(account_id)?;
        ensure_owner(&account, user_id)?;

        if account.status == status {
            return Ok(account);
        }

        let previous = account.status;
        account.set_status(status);
        uow.stage_account(account.clone())?;
        let changeset = uow.commit()?;

        info!(account = %account.id, from = %previous, to = %status, "account status changed");
        Ok(changeset.accounts.into_iter().next().unwrap_or(account))
    }

    pub fn freeze(&self, user_id: UserId, account_id: AccountId) -> BankResult<Account> {
        self.set_status(user_id, account_id, AccountStatus::Frozen)
    }

    /// Close an account; closing is a status change, never a deletion
    pub fn deactivate(&self, user_id: UserId, account_id: AccountId) -> BankResult<Account> {
        self.set_status(user_id, account_id, AccountStatus::Inactive)
    }

    /// Return an account to ACTIVE; unfreezing is an owner action, so the
    /// owner may lift a freeze or reopen a closed account
    pub fn activate(&self, user_id: UserId, account_id: AccountId) -> BankResult<Account> {
        self.set_status(user_id, account_id, AccountStatus::Active)
    }

    /// Ledger entries touching an account, newest first
    pub fn statement(&self, user_id: UserId, account_id: AccountId) -> BankResult<Vec<Transaction>> {
        let account = self
            .get(account_id)?
            .ok_or_else(|| BankError::account_not_found(account_id.to_string()))?;
        ensure_owner(&account, user_id)?;
        self.storage.transactions.get_by_account(&account.account_number)
    }

    pub fn total_balance(&self, owner_id: UserId) -> BankResult<Money> {
        Ok(self
            .list_for_owner(owner_id)?
            .iter()
            .map(|a| a.balance)
            .sum())
    }

    /// Summary figures for an owner as of `now`
    pub fn summary(&self, owner_id: UserId, now: DateTime<Utc>) -> BankResult<OwnerSummary> {
        let accounts = self.list_for_owner(owner_id)?;
        let total_balance: Money = accounts.iter().map(|a| a.balance).sum();

        let since = now - Duration::days(SUMMARY_WINDOW_DAYS);
        let recent = self.storage.transactions.get_by_user_since(owner_id, since)?;

        let completed = recent.iter().filter(|t| t.is_completed());
        let monthly_spending: Money = completed
            .clone()
            .filter(|t| t.transaction_type.is_outflow())
            .map(|t| t.amount)
            .sum();
        let monthly_income: Money = completed
            .filter(|t| t.transaction_type == TransactionType::Deposit)
            .map(|t| t.amount)
            .sum();

        Ok(OwnerSummary {
            total_accounts: accounts.len(),
            active_accounts: accounts.iter().filter(|a| a.is_active()).count(),
            total_balance,
            monthly_spending,
            monthly_income,
            savings_rate: savings_rate(monthly_income, monthly_spending),
            health: FinancialHealth::from_total(total_balance),
        })
    }
}

fn savings_rate(income: Money, spending: Money) -> f64 {
    if !income.is_positive() {
        return 0.0;
    }
    let rate = (income.cents() - spending.cents()) as f64 / income.cents() as f64 * 100.0;
    (rate * 10.0).round() / 10.0
}

/// Stage a new account, with its opening deposit, inside a unit of work
pub(crate) fn stage_new_account(
    uow: &mut UnitOfWork<'_>,
    owner_id: UserId,
    name: &str,
    account_type: AccountType,
    currency: Currency,
    initial_deposit: Money,
) -> BankResult<Account> {
    if initial_deposit.is_negative() {
        return Err(BankError::InvalidAmount(format!(
            "initial deposit {} cannot be negative",
            initial_deposit
        )));
    }

    let number = unused_account_number(uow)?;
    let name = name.trim();
    let mut account = Account::new(owner_id, name, account_type, number, currency);

    if initial_deposit.is_positive() {
        account
            .credit(initial_deposit)
            .map_err(|e| balance_error(&account, e))?;

        let mut txn = Transaction::deposit(
            owner_id,
            account.account_number.clone(),
            initial_deposit,
            format!("Initial deposit to {}", name),
        );
        txn.complete()
            .map_err(|e| BankError::Validation(e.to_string()))?;
        uow.stage_account(account.clone())?;
        uow.append_transaction(txn)?;
    } else {
        uow.stage_account(account.clone())?;
    }

    Ok(account)
}

fn unused_account_number(uow: &UnitOfWork<'_>) -> BankResult<AccountNumber> {
    for _ in 0..MAX_NUMBER_ATTEMPTS {
        let candidate = AccountNumber::generate();
        if uow.number_available(&candidate)? {
            return Ok(candidate);
        }
    }
    Err(BankError::Storage(
        "Could not generate a unique account number".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BankPaths;
    use crate::models::{TransactionStatus, User};
    use crate::services::LedgerService;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = BankPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    fn create_owner(storage: &Storage, username: &str) -> UserId {
        let user = User::new(
            username,
            format!("{}@example.com", username),
            "Test",
            "Owner",
        );
        let mut uow = storage.begin();
        uow.stage_user(user.clone()).unwrap();
        uow.commit().unwrap();
        user.id
    }

    #[test]
    fn test_open_with_initial_deposit() {
        let (_temp, storage) = create_test_storage();
        let owner = create_owner(&storage, "alice");
        let service = AccountService::new(&storage);

        let account = service
            .open(
                owner,
                "Rainy Day",
                AccountType::Savings,
                Money::from_cents(25_000),
                Currency::usd(),
            )
            .unwrap();

        assert_eq!(account.balance.cents(), 25_000);
        assert_eq!(account.version, 1);
        assert_eq!(account.account_number.as_str().len(), 16);

        let entries = storage
            .transactions
            .get_by_account(&account.account_number)
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].description, "Initial deposit to Rainy Day");
        assert_eq!(entries[0].status, TransactionStatus::Completed);
    }

    #[test]
    fn test_open_without_deposit_records_nothing() {
        let (_temp, storage) = create_test_storage();
        let owner = create_owner(&storage, "alice");

        AccountService::new(&storage)
            .open(owner, "Empty", AccountType::Checking, Money::zero(), Currency::usd())
            .unwrap();
        assert_eq!(storage.transactions.count().unwrap(), 0);
    }

    #[test]
    fn test_open_rejections() {
        let (_temp, storage) = create_test_storage();
        let owner = create_owner(&storage, "alice");
        let service = AccountService::new(&storage);

        assert!(matches!(
            service.open(owner, "Bad", AccountType::Checking, Money::from_cents(-1), Currency::usd()),
            Err(BankError::InvalidAmount(_))
        ));
        assert!(service
            .open(UserId::new(), "Orphan", AccountType::Checking, Money::zero(), Currency::usd())
            .unwrap_err()
            .is_not_found());
        assert!(matches!(
            service.open(owner, "X", AccountType::Checking, Money::zero(), Currency::usd()),
            Err(BankError::Validation(_))
        ));

        service
            .open(owner, "Bills", AccountType::Checking, Money::zero(), Currency::usd())
            .unwrap();
        assert!(matches!(
            service.open(owner, "bills", AccountType::Savings, Money::zero(), Currency::usd()),
            Err(BankError::Duplicate { .. })
        ));
        assert_eq!(storage.accounts.count().unwrap(), 1);
    }

    #[test]
    fn test_find_by_number_id_and_name() {
        let (_temp, storage) = create_test_storage();
        let owner = create_owner(&storage, "alice");
        let stranger = create_owner(&storage, "bob");
        let service = AccountService::new(&storage);
        let account = service
            .open(owner, "Bills", AccountType::Checking, Money::zero(), Currency::usd())
            .unwrap();

        let by_number = service.find(owner, account.account_number.as_str()).unwrap();
        assert_eq!(by_number.unwrap().id, account.id);

        let by_id = service.find(owner, &account.id.as_uuid().to_string()).unwrap();
        assert_eq!(by_id.unwrap().id, account.id);

        assert!(service.find(owner, "BILLS").unwrap().is_some());
        assert!(service
            .find(stranger, account.account_number.as_str())
            .unwrap()
            .is_none());
        assert!(service.require(owner, "Nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_status_changes() {
        let (_temp, storage) = create_test_storage();
        let owner = create_owner(&storage, "alice");
        let service = AccountService::new(&storage);
        let account = service
            .open(owner, "Bills", AccountType::Checking, Money::zero(), Currency::usd())
            .unwrap();

        let frozen = service.freeze(owner, account.id).unwrap();
        assert_eq!(frozen.status, AccountStatus::Frozen);
        assert_eq!(frozen.version, 2);

        // same status again is a no-op
        let again = service.freeze(owner, account.id).unwrap();
        assert_eq!(again.version, 2);

        assert!(matches!(
            service.deactivate(UserId::new(), account.id),
            Err(BankError::Unauthorized(_))
        ));

        let closed = service.deactivate(owner, account.id).unwrap();
        assert_eq!(closed.status, AccountStatus::Inactive);
        let reopened = service.activate(owner, account.id).unwrap();
        assert!(reopened.is_active());
    }

    #[test]
    fn test_statement_and_summary() {
        let (_temp, storage) = create_test_storage();
        let owner = create_owner(&storage, "alice");
        let service = AccountService::new(&storage);
        let account = service
            .open(
                owner,
                "Main",
                AccountType::Checking,
                Money::from_dollars_cents(6_000, 0),
                Currency::usd(),
            )
            .unwrap();
        LedgerService::new(&storage)
            .withdraw(owner, account.id, Money::from_dollars_cents(1_500, 0), None)
            .unwrap();

        let statement = service.statement(owner, account.id).unwrap();
        assert_eq!(statement.len(), 2);
        assert_eq!(statement[0].transaction_type, TransactionType::Withdrawal);

        let summary = service.summary(owner, Utc::now()).unwrap();
        assert_eq!(summary.total_accounts, 1);
        assert_eq!(summary.active_accounts, 1);
        assert_eq!(summary.total_balance, Money::from_dollars_cents(4_500, 0));
        assert_eq!(summary.monthly_income, Money::from_dollars_cents(6_000, 0));
        assert_eq!(summary.monthly_spending, Money::from_dollars_cents(1_500, 0));
        assert_eq!(summary.savings_rate, 75.0);
        assert_eq!(summary.health, FinancialHealth::Poor);

        // entries older than the window drop out
        let later = service.summary(owner, Utc::now() + Duration::days(31)).unwrap();
        assert_eq!(later.monthly_income, Money::zero());
        assert_eq!(later.savings_rate, 0.0);
    }

    #[test]
    fn test_health_tiers() {
        let tier = |dollars| FinancialHealth::from_total(Money::from_dollars_cents(dollars, 0));
        assert_eq!(tier(50_000), FinancialHealth::Excellent);
        assert_eq!(tier(49_999), FinancialHealth::VeryGood);
        assert_eq!(tier(20_000), FinancialHealth::VeryGood);
        assert_eq!(tier(10_000), FinancialHealth::Good);
        assert_eq!(tier(5_000), FinancialHealth::Fair);
        assert_eq!(tier(4_999), FinancialHealth::Poor);
        assert_eq!(FinancialHealth::VeryGood.to_string(), "Very Good");
    }
}
