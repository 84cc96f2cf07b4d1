//! User settings for BankFlow
//!
//! Ledger defaults (currency, opening balances for new customers), the
//! failed-login lockout policy, lock timeouts and display preferences.

use serde::{Deserialize, Serialize};

use super::paths::BankPaths;
use crate::error::BankError;
use crate::models::{Currency, Money};

/// Opening deposits for the accounts created at registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpeningBalances {
    pub savings: Money,
    pub checking: Money,
}

impl Default for OpeningBalances {
    fn default() -> Self {
        Self {
            savings: Money::from_dollars_cents(5000, 0),
            checking: Money::from_dollars_cents(2000, 0),
        }
    }
}

/// Failed-login lockout policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockoutPolicy {
    /// Failures allowed before the username is locked out
    pub max_attempts: u32,
    /// How long a lockout lasts after the last failure
    pub lockout_minutes: i64,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_minutes: 15,
        }
    }
}

/// User settings for BankFlow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Currency for newly opened accounts
    #[serde(default)]
    pub currency: Currency,

    #[serde(default)]
    pub opening_balances: OpeningBalances,

    #[serde(default)]
    pub lockout: LockoutPolicy,

    /// How long an operation waits for an account lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Ledger history page size
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Number of entries in the "recent" view
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,

    /// Default log filter when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_schema_version() -> u32 {
    1
}

fn default_lock_timeout_ms() -> u64 {
    5000
}

fn default_page_size() -> usize {
    20
}

fn default_recent_limit() -> usize {
    10
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            currency: Currency::default(),
            opening_balances: OpeningBalances::default(),
            lockout: LockoutPolicy::default(),
            lock_timeout_ms: default_lock_timeout_ms(),
            page_size: default_page_size(),
            recent_limit: default_recent_limit(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &BankPaths) -> Result<Self, BankError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| BankError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents)
                .map_err(|e| BankError::Config(format!("Failed to parse settings file: {}", e)))?;

            settings.validate()?;
            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &BankPaths) -> Result<(), BankError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| BankError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| BankError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }

    fn validate(&self) -> Result<(), BankError> {
        if self.opening_balances.savings.is_negative()
            || self.opening_balances.checking.is_negative()
        {
            return Err(BankError::Config(
                "Opening balances cannot be negative".into(),
            ));
        }
        if self.lockout.max_attempts == 0 {
            return Err(BankError::Config(
                "lockout.max_attempts must be at least 1".into(),
            ));
        }
        if self.page_size == 0 {
            return Err(BankError::Config("page_size must be at least 1".into()));
        }
        Ok(())
    }
}
