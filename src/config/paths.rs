//! Path management for BankFlow
//!
//! ## Path Resolution Order
//!
//! 1. `BANKFLOW_DATA_DIR` environment variable (if set)
//! 2. The platform data directory for `bankflow` (via the `directories` crate),
//!    e.g. `~/.local/share/bankflow` on Linux

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::BankError;

/// Environment variable that overrides the base directory
pub const DATA_DIR_ENV: &str = "BANKFLOW_DATA_DIR";

/// Manages all paths used by BankFlow
#[derive(Debug, Clone)]
pub struct BankPaths {
    base_dir: PathBuf,
}

impl BankPaths {
    /// Resolve the base directory from the environment or the platform default
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> Result<Self, BankError> {
        let base_dir = match std::env::var(DATA_DIR_ENV) {
            Ok(custom) if !custom.trim().is_empty() => PathBuf::from(custom),
            _ => ProjectDirs::from("", "", "bankflow")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .ok_or_else(|| {
                    BankError::Config("Could not determine a home directory".into())
                })?,
        };

        Ok(Self { base_dir })
    }

    /// Create BankPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    pub fn audit_log(&self) -> PathBuf {
        self.base_dir.join("audit.log")
    }

    pub fn users_file(&self) -> PathBuf {
        self.data_dir().join("users.json")
    }

    pub fn accounts_file(&self) -> PathBuf {
        self.data_dir().join("accounts.json")
    }

    pub fn transactions_file(&self) -> PathBuf {
        self.data_dir().join("transactions.json")
    }

    pub fn login_attempts_file(&self) -> PathBuf {
        self.data_dir().join("login_attempts.json")
    }

    /// Write-ahead journal of the unit of work being checkpointed
    pub fn journal_file(&self) -> PathBuf {
        self.data_dir().join("journal.json")
    }

    /// Ensure the base and data directories exist
    pub fn ensure_directories(&self) -> Result<(), BankError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| BankError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| BankError::Io(format!("Failed to create data directory: {}", e)))?;

        Ok(())
    }

    /// Check if BankFlow has been initialized (config file exists)
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}
