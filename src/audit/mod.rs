//! Audit logging for BankFlow
//!
//! Every committed change to a user, account or ledger entry is appended to
//! `audit.log` as one JSON line. Entries are written after the unit of work
//! that produced them has committed, so the log never mentions a change that
//! was rolled back.
//!
//! # Example
//!
//! ```rust,ignore
//! use bankflow::audit::{AuditEntry, AuditLogger, EntityType};
//!
//! let logger = AuditLogger::new(paths.audit_log());
//! let entry = AuditEntry::update(
//!     EntityType::Account,
//!     account.id.to_string(),
//!     Some(account.name.clone()),
//!     &before,
//!     &after,
//! );
//! logger.log(&entry)?;
//! ```

mod entry;
mod logger;

pub use entry::{diff_summary, AuditEntry, EntityType, Operation};
pub use logger::AuditLogger;
