//! User service
//!
//! Registration (with the default savings and checking accounts), lookups,
//! and guarded deletion.

use tracing::info;

use crate::config::settings::Settings;
use crate::error::{BankError, BankResult};
use crate::models::{Account, AccountType, User, UserId};
use crate::storage::Storage;

use super::account::stage_new_account;

pub const DEFAULT_SAVINGS_NAME: &str = "My Savings Account";
pub const DEFAULT_CHECKING_NAME: &str = "My Checking Account";

/// Input for registering a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// A freshly registered user and the accounts opened for them
#[derive(Debug, Clone)]
pub struct Registration {
    pub user: User,
    pub accounts: Vec<Account>,
}

/// Service for user management
pub struct UserService<'a> {
    storage: &'a Storage,
    settings: &'a Settings,
}

impl<'a> UserService<'a> {
    pub fn new(storage: &'a Storage, settings: &'a Settings) -> Self {
        Self { storage, settings }
    }

    /// Register a user and open their default accounts
    ///
    /// The user, both accounts and their opening deposits commit together.
    pub fn register(&self, new_user: NewUser) -> BankResult<Registration> {
        let user = User::new(
            new_user.username,
            new_user.email,
            new_user.first_name,
            new_user.last_name,
        );
        user.validate()
            .map_err(|e| BankError::Validation(e.to_string()))?;

        if self.storage.users.username_exists(&user.username)? {
            return Err(BankError::Duplicate {
                entity_type: "User",
                identifier: user.username.clone(),
            });
        }
        if self.storage.users.email_exists(&user.email)? {
            return Err(BankError::Duplicate {
                entity_type: "User",
                identifier: user.email.clone(),
            });
        }

        let opening = &self.settings.opening_balances;
        let currency = &self.settings.currency;

        let mut uow = self.storage.begin();
        uow.stage_user(user.clone())?;
        let savings = stage_new_account(
            &mut uow,
            user.id,
            DEFAULT_SAVINGS_NAME,
            AccountType::Savings,
            currency.clone(),
            opening.savings,
        )?;
        let checking = stage_new_account(
            &mut uow,
            user.id,
            DEFAULT_CHECKING_NAME,
            AccountType::Checking,
            currency.clone(),
            opening.checking,
        )?;
        let changeset = uow.commit()?;

        let accounts = [savings.id, checking.id]
            .iter()
            .filter_map(|id| changeset.accounts.iter().find(|a| a.id == *id).cloned())
            .collect();

        info!(user = %user.id, "user registered");
        Ok(Registration { user, accounts })
    }

    pub fn get(&self, id: UserId) -> BankResult<Option<User>> {
        self.storage.users.get(id)
    }

    pub fn get_by_username(&self, username: &str) -> BankResult<Option<User>> {
        self.storage.users.get_by_username(username)
    }

    /// Like `get_by_username`, but a missing user is an error
    pub fn require(&self, username: &str) -> BankResult<User> {
        self.get_by_username(username)?
            .ok_or_else(|| BankError::user_not_found(username.trim()))
    }

    pub fn list(&self) -> BankResult<Vec<User>> {
        self.storage.users.get_all()
    }

    /// Delete a user together with their accounts
    ///
    /// Refused while any of the user's accounts still holds money. Ledger
    /// entries are kept.
    pub fn delete(&self, id: UserId) -> BankResult<User> {
        let user = self
            .get(id)?
            .ok_or_else(|| BankError::user_not_found(id.to_string()))?;

        let owned: Vec<_> = self
            .storage
            .accounts
            .get_by_owner(id)?
            .into_iter()
            .map(|a| a.id)
            .collect();

        let mut uow = self.storage.begin();
        uow.lock_accounts(&owned)?;

        for account_id in &owned {
            let account = uow.account(*account_id)?;
            if !account.balance.is_zero() {
                return Err(BankError::Validation(format!(
                    "Cannot delete user '{}': account {} still holds {}",
                    user.username,
                    account.account_number.masked(),
                    account.balance
                )));
            }
            uow.remove_account(account)?;
        }
        uow.remove_user(user.clone());
        uow.commit()?;

        info!(user = %user.id, accounts = owned.len(), "user deleted");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BankPaths;
    use crate::models::{Money, TransactionType};
    use crate::services::LedgerService;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = BankPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    fn jane() -> NewUser {
        NewUser {
            username: "jane_doe".into(),
            email: "Jane@Example.com".into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
        }
    }

    #[test]
    fn test_register_opens_default_accounts() {
        let (_temp, storage) = create_test_storage();
        let settings = Settings::default();
        let service = UserService::new(&storage, &settings);

        let registration = service.register(jane()).unwrap();
        assert_eq!(registration.user.email, "jane@example.com");
        assert_eq!(registration.accounts.len(), 2);

        let savings = &registration.accounts[0];
        assert_eq!(savings.name, DEFAULT_SAVINGS_NAME);
        assert_eq!(savings.account_type, AccountType::Savings);
        assert_eq!(savings.balance, Money::from_dollars_cents(5000, 0));
        let checking = &registration.accounts[1];
        assert_eq!(checking.account_type, AccountType::Checking);
        assert_eq!(checking.balance, Money::from_dollars_cents(2000, 0));

        let entries = storage.transactions.get_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries
            .iter()
            .all(|t| t.transaction_type == TransactionType::Deposit && t.is_completed()));
        assert!(LedgerService::new(&storage).verify().unwrap().is_balanced());
    }

    #[test]
    fn test_register_rejections() {
        let (_temp, storage) = create_test_storage();
        let settings = Settings::default();
        let service = UserService::new(&storage, &settings);
        service.register(jane()).unwrap();

        let mut same_name = jane();
        same_name.email = "other@example.com".into();
        assert!(matches!(
            service.register(same_name),
            Err(BankError::Duplicate { .. })
        ));

        let mut same_email = jane();
        same_email.username = "janet".into();
        assert!(matches!(
            service.register(same_email),
            Err(BankError::Duplicate { .. })
        ));

        let mut bad = jane();
        bad.username = "no spaces allowed".into();
        assert!(service.register(bad).unwrap_err().is_validation());

        assert_eq!(service.list().unwrap().len(), 1);
        assert_eq!(storage.accounts.count().unwrap(), 2);
    }

    #[test]
    fn test_delete_refused_while_funded() {
        let (_temp, storage) = create_test_storage();
        let settings = Settings::default();
        let service = UserService::new(&storage, &settings);
        let registration = service.register(jane()).unwrap();

        let err = service.delete(registration.user.id).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(storage.users.count().unwrap(), 1);
        assert_eq!(storage.accounts.count().unwrap(), 2);
    }

    #[test]
    fn test_delete_cascades_to_empty_accounts() {
        let (_temp, storage) = create_test_storage();
        let settings = Settings::default();
        let service = UserService::new(&storage, &settings);
        let registration = service.register(jane()).unwrap();
        let user_id = registration.user.id;

        let ledger = LedgerService::new(&storage);
        for account in &registration.accounts {
            ledger
                .withdraw(user_id, account.id, account.balance, None)
                .unwrap();
        }

        service.delete(user_id).unwrap();
        assert!(service.get(user_id).unwrap().is_none());
        assert_eq!(storage.accounts.count().unwrap(), 0);
        // ledger history survives
        assert_eq!(storage.transactions.count().unwrap(), 4);
        assert!(service.require("jane_doe").unwrap_err().is_not_found());
    }
}
