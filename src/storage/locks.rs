//! Per-account locks
//!
//! A unit of work locks every account it is about to modify before reading
//! it. A request for several accounts is granted all at once or not at all,
//! so two transfers over the same pair of accounts cannot deadlock.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{BankError, BankResult};
use crate::models::AccountId;

#[derive(Debug, Default)]
pub struct AccountLocks {
    held: Mutex<HashSet<AccountId>>,
    released: Condvar,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until none of `ids` is held, then take them all
    ///
    /// Fails with `LockTimeout` naming a busy account once `timeout` elapses.
    pub fn acquire(&self, ids: &[AccountId], timeout: Duration) -> BankResult<()> {
        let mut wanted: Vec<AccountId> = ids.to_vec();
        wanted.sort();
        wanted.dedup();

        let deadline = Instant::now() + timeout;
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);

        loop {
            let Some(busy) = wanted.iter().find(|id| held.contains(id)).copied() else {
                held.extend(wanted.iter().copied());
                return Ok(());
            };

            let now = Instant::now();
            if now >= deadline {
                debug!(account = %busy, "lock wait timed out");
                return Err(BankError::LockTimeout(busy.to_string()));
            }

            let (guard, _) = self
                .released
                .wait_timeout(held, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            held = guard;
        }
    }

    pub fn release(&self, ids: &[AccountId]) {
        if ids.is_empty() {
            return;
        }
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        for id in ids {
            held.remove(id);
        }
        drop(held);
        self.released.notify_all();
    }

    pub fn is_held(&self, id: &AccountId) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }
}
