//! Failed-login attempt store
//!
//! Counters are keyed by lower-cased username and persisted to
//! login_attempts.json after every change, so a lockout survives restarts.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BankResult;

use super::file_io::{read_json, write_json_atomic};
use super::{read_lock, write_lock};

/// Failure counter for one username
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAttempt {
    pub count: u32,
    pub last_attempt: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoginAttemptData {
    attempts: HashMap<String, LoginAttempt>,
}

/// Repository for failed-login counters
pub struct LoginAttemptRepository {
    path: PathBuf,
    data: RwLock<HashMap<String, LoginAttempt>>,
}

fn key(username: &str) -> String {
    username.trim().to_lowercase()
}

impl LoginAttemptRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self) -> BankResult<()> {
        let file_data: LoginAttemptData = read_json(&self.path)?;
        *write_lock(&self.data)? = file_data.attempts;
        Ok(())
    }

    fn persist(&self, attempts: &HashMap<String, LoginAttempt>) -> BankResult<()> {
        write_json_atomic(
            &self.path,
            &LoginAttemptData {
                attempts: attempts.clone(),
            },
        )
    }

    pub fn get(&self, username: &str) -> BankResult<Option<LoginAttempt>> {
        Ok(read_lock(&self.data)?.get(&key(username)).cloned())
    }

    /// Count one more failure at `now` and return the updated counter
    pub fn record_failure(&self, username: &str, now: DateTime<Utc>) -> BankResult<LoginAttempt> {
        let mut attempts = write_lock(&self.data)?;
        let entry = attempts.entry(key(username)).or_insert(LoginAttempt {
            count: 0,
            last_attempt: now,
        });
        entry.count += 1;
        entry.last_attempt = now;
        let updated = entry.clone();

        self.persist(&attempts)?;
        Ok(updated)
    }

    /// Forget a username's failures; returns whether a record existed
    pub fn clear(&self, username: &str) -> BankResult<bool> {
        let mut attempts = write_lock(&self.data)?;
        let existed = attempts.remove(&key(username)).is_some();
        if existed {
            self.persist(&attempts)?;
        }
        Ok(existed)
    }
}
