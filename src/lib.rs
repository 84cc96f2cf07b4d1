//! BankFlow - a command-line retail banking ledger
//!
//! This library provides customer accounts, an append-only transaction
//! ledger and the money movements between them. Every deposit, withdrawal
//! and transfer runs as a unit of work: the affected accounts are locked,
//! balances and ledger entries are staged, and the whole change commits
//! through a write-ahead journal or not at all.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Core data models (users, accounts, transactions, money)
//! - `storage`: JSON file storage, account locks, journal and unit of work
//! - `services`: Business logic layer
//! - `audit`: Audit logging system
//! - `display`: Terminal table formatting
//! - `cli`: Command handlers for the `bankflow` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use bankflow::config::{paths::BankPaths, settings::Settings};
//! use bankflow::storage::Storage;
//!
//! let paths = BankPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let storage = Storage::new(paths)?;
//! storage.load_all()?;
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{BankError, BankResult};
