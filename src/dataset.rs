//! Read-only snapshot of accounts and transactions.
//!
//! The snapshot is fetched once and shared through [`DatasetHandle`].
//! A refresh builds a complete new [`Dataset`] and swaps it in whole, so
//! a caller holding an older `Arc<Dataset>` keeps a consistent view.

use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{LevelMoneyError, Result};
use crate::models::{Account, AccountId, Transaction};

/// Accounts and transactions as fetched from the API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    /// Every linked account.
    accounts: Vec<Account>,
    /// Every validated transaction of every account.
    transactions: Vec<Transaction>,
}

impl Dataset {
    /// Creates a dataset from already validated records.
    #[inline]
    #[must_use]
    pub const fn new(accounts: Vec<Account>, transactions: Vec<Transaction>) -> Self {
        Self {
            accounts,
            transactions,
        }
    }

    /// All accounts.
    #[inline]
    #[must_use]
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// All transactions.
    #[inline]
    #[must_use]
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Transactions belonging to `account_id`, in fetch order.
    #[inline]
    pub fn transactions_for<'data>(
        &'data self,
        account_id: &'data AccountId,
    ) -> impl Iterator<Item = &'data Transaction> + 'data {
        self.transactions
            .iter()
            .filter(move |tx| tx.account_id == *account_id)
    }
}

/// Shared, swappable holder of the current [`Dataset`].
#[derive(Debug, Default)]
pub struct DatasetHandle {
    /// Current snapshot.
    current: RwLock<Arc<Dataset>>,
}

impl DatasetHandle {
    /// Wraps an initial dataset.
    #[inline]
    #[must_use]
    pub fn new(dataset: Dataset) -> Self {
        Self {
            current: RwLock::new(Arc::new(dataset)),
        }
    }

    /// Returns the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`LevelMoneyError::Dataset`] if the lock is poisoned.
    #[inline]
    pub fn snapshot(&self) -> Result<Arc<Dataset>> {
        let guard = self.current.read().map_err(|err| lock_error(&err))?;
        Ok(Arc::clone(&guard))
    }

    /// Replaces the snapshot, returning the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`LevelMoneyError::Dataset`] if the lock is poisoned.
    #[inline]
    pub fn replace(&self, dataset: Dataset) -> Result<Arc<Dataset>> {
        let next = Arc::new(dataset);
        let mut guard = self.current.write().map_err(|err| lock_error(&err))?;
        tracing::debug!(
            accounts = next.accounts.len(),
            transactions = next.transactions.len(),
            "dataset replaced"
        );
        Ok(core::mem::replace(&mut *guard, next))
    }
}

/// Converts a poisoned lock into a dataset error.
fn lock_error<T>(err: &PoisonError<T>) -> LevelMoneyError {
    LevelMoneyError::Dataset(format!("dataset lock poisoned: {err}"))
}
