//! Configuration module for BankFlow
//!
//! - Path resolution for the data directory
//! - Settings persistence (ledger defaults, lockout policy, preferences)

pub mod paths;
pub mod settings;

pub use paths::BankPaths;
pub use settings::Settings;
