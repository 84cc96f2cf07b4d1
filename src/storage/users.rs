//! User repository for JSON storage
//!
//! Manages loading and saving users to users.json. Usernames are matched
//! case-insensitively; emails are stored lower-cased.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::BankResult;
use crate::models::{User, UserId};

use super::file_io::{read_json, write_json_atomic};
use super::{read_lock, write_lock};

/// Serializable user data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct UserData {
    users: Vec<User>,
}

#[derive(Debug, Default)]
pub struct UserTable {
    by_id: HashMap<UserId, User>,
}

impl UserTable {
    pub fn get(&self, id: &UserId) -> Option<&User> {
        self.by_id.get(id)
    }

    pub fn insert(&mut self, user: User) {
        self.by_id.insert(user.id, user);
    }

    pub fn remove(&mut self, id: &UserId) -> Option<User> {
        self.by_id.remove(id)
    }

    /// Another user (not `except`) already holding this username
    pub fn username_taken(&self, username: &str, except: UserId) -> bool {
        let wanted = username.to_lowercase();
        self.by_id
            .values()
            .any(|u| u.id != except && u.username.to_lowercase() == wanted)
    }

    /// Another user (not `except`) already holding this email
    pub fn email_taken(&self, email: &str, except: UserId) -> bool {
        let wanted = email.to_lowercase();
        self.by_id.values().any(|u| u.id != except && u.email == wanted)
    }

    fn to_data(&self) -> UserData {
        let mut users: Vec<User> = self.by_id.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        UserData { users }
    }
}

/// Repository for user persistence
pub struct UserRepository {
    path: PathBuf,
    data: RwLock<UserTable>,
}

impl UserRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(UserTable::default()),
        }
    }

    pub fn load(&self) -> BankResult<()> {
        let file_data: UserData = read_json(&self.path)?;

        let mut table = write_lock(&self.data)?;
        *table = UserTable::default();
        for user in file_data.users {
            table.insert(user);
        }

        Ok(())
    }

    pub fn save(&self) -> BankResult<()> {
        let table = read_lock(&self.data)?;
        self.persist(&table)
    }

    pub(crate) fn persist(&self, table: &UserTable) -> BankResult<()> {
        write_json_atomic(&self.path, &table.to_data())
    }

    pub(crate) fn table(&self) -> &RwLock<UserTable> {
        &self.data
    }

    pub fn get(&self, id: UserId) -> BankResult<Option<User>> {
        Ok(read_lock(&self.data)?.get(&id).cloned())
    }

    /// Get a user by username (case-insensitive)
    pub fn get_by_username(&self, username: &str) -> BankResult<Option<User>> {
        let wanted = username.trim().to_lowercase();
        Ok(read_lock(&self.data)?
            .by_id
            .values()
            .find(|u| u.username.to_lowercase() == wanted)
            .cloned())
    }

    pub fn username_exists(&self, username: &str) -> BankResult<bool> {
        Ok(read_lock(&self.data)?.username_taken(username, UserId::new()))
    }

    pub fn email_exists(&self, email: &str) -> BankResult<bool> {
        Ok(read_lock(&self.data)?.email_taken(email, UserId::new()))
    }

    /// All users, oldest first
    pub fn get_all(&self) -> BankResult<Vec<User>> {
        Ok(read_lock(&self.data)?.to_data().users)
    }

    pub fn count(&self) -> BankResult<usize> {
        Ok(read_lock(&self.data)?.by_id.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, UserRepository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = UserRepository::new(temp_dir.path().join("users.json"));
        (temp_dir, repo)
    }

    #[test]
    fn test_save_and_reload() {
        let (_temp_dir, repo) = create_test_repo();
        let user = User::new("jane_doe", "Jane@Example.com", "Jane", "Doe");
        write_lock(repo.table()).unwrap().insert(user.clone());
        repo.save().unwrap();

        let repo2 = UserRepository::new(repo.path.clone());
        repo2.load().unwrap();
        let loaded = repo2.get(user.id).unwrap().unwrap();
        assert_eq!(loaded.email, "jane@example.com");
        assert_eq!(repo2.count().unwrap(), 1);
    }

    #[test]
    fn test_uniqueness_lookups() {
        let (_temp_dir, repo) = create_test_repo();
        let user = User::new("jane_doe", "jane@example.com", "Jane", "Doe");
        let id = user.id;
        write_lock(repo.table()).unwrap().insert(user);

        assert!(repo.username_exists("JANE_DOE").unwrap());
        assert!(repo.email_exists("JANE@example.com").unwrap());
        assert!(repo.get_by_username("Jane_Doe").unwrap().is_some());

        let table = read_lock(repo.table()).unwrap();
        assert!(!table.username_taken("jane_doe", id));
    }
}
