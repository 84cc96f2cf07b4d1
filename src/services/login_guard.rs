//! Failed-login lockout
//!
//! Tracks failed sign-in attempts per username. After `max_attempts`
//! failures the username is locked out until `lockout_minutes` have passed
//! since the last failure; an expired record is discarded.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::config::settings::LockoutPolicy;
use crate::error::{BankError, BankResult};
use crate::storage::Storage;

pub struct LoginGuard<'a> {
    storage: &'a Storage,
    policy: LockoutPolicy,
}

impl<'a> LoginGuard<'a> {
    pub fn new(storage: &'a Storage, policy: LockoutPolicy) -> Self {
        Self { storage, policy }
    }

    fn window(&self) -> Duration {
        Duration::minutes(self.policy.lockout_minutes)
    }

    /// Fail with `LockedOut` while the username is locked out at `now`
    pub fn check(&self, username: &str, now: DateTime<Utc>) -> BankResult<()> {
        let Some(attempt) = self.storage.login_attempts.get(username)? else {
            return Ok(());
        };

        let retry_after = attempt.last_attempt + self.window();
        if now >= retry_after {
            self.storage.login_attempts.clear(username)?;
            return Ok(());
        }

        if attempt.count >= self.policy.max_attempts {
            return Err(BankError::LockedOut {
                username: username.trim().to_string(),
                retry_after,
            });
        }

        Ok(())
    }

    /// Count a failed attempt; returns the attempts left before lockout
    pub fn record_failure(&self, username: &str, now: DateTime<Utc>) -> BankResult<u32> {
        let attempt = self.storage.login_attempts.record_failure(username, now)?;
        let remaining = self.policy.max_attempts.saturating_sub(attempt.count);
        if remaining == 0 {
            warn!(attempts = attempt.count, "username locked out after failed logins");
        }
        Ok(remaining)
    }

    /// Forget failures after a successful sign-in
    pub fn clear(&self, username: &str) -> BankResult<()> {
        self.storage.login_attempts.clear(username)?;
        Ok(())
    }
}
