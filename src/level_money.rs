//! High-level Level Money client with an in-memory dataset.
//!
//! Combines the low-level HTTP client with a [`DatasetHandle`] so that
//! accounts and transactions are fetched once, then queried locally.
//! [`LevelMoney::refresh`] (or [`LevelMoneyBlocking::refresh`]) fetches a
//! complete new dataset and swaps it in; call it before the first query.

use crate::error::Result;
use crate::models::{AccountId, RawTransaction, Transaction, validate_all};

/// Keeps projected records that belong to `account`.
///
/// Records without an `account-id` are assumed to belong to it.
fn projected_for(account: &AccountId, raw: Vec<RawTransaction>) -> Result<Vec<Transaction>> {
    let mine: Vec<RawTransaction> = raw
        .into_iter()
        .map(|record| record.or_account(account))
        .filter(|record| record.account_id.as_ref() == Some(account))
        .collect();
    validate_all(mine)
}

/// Generates a high-level Level Money client (async or blocking).
macro_rules! define_level_money {
    (
        client_name: $client:ident,
        builder_name: $builder:ident,
        http_client: $http_client:ty,
        client_doc: $client_doc:expr,
        builder_doc: $builder_doc:expr,
        $(async_kw: $async_kw:tt,)?
        $(await_kw: $await_ext:tt,)?
    ) => {
        #[doc = $builder_doc]
        #[derive(Debug)]
        pub struct $builder {
            /// Credentials for every request.
            credentials: Option<Credentials>,
            /// Base URL override (for testing).
            base_url: Option<String>,
            /// Retry schedule override.
            retry: Option<RetryPolicy>,
            /// Timeout override.
            timeout: Option<Duration>,
            /// Whether to ask the API for strict JSON validation.
            strict_mode: bool,
            /// Whether to ask the API for verbose responses.
            verbose_response: bool,
        }

        impl $builder {
            /// Sets the credentials used for authentication.
            #[inline]
            #[must_use]
            pub fn credentials(mut self, credentials: Credentials) -> Self {
                self.credentials = Some(credentials);
                self
            }

            /// Overrides the base URL (useful for testing with a mock server).
            #[inline]
            #[must_use]
            pub fn base_url<T: Into<String>>(mut self, url: T) -> Self {
                self.base_url = Some(url.into());
                self
            }

            /// Overrides the retry schedule for read requests.
            #[inline]
            #[must_use]
            pub const fn retry_policy(mut self, policy: RetryPolicy) -> Self {
                self.retry = Some(policy);
                self
            }

            /// Overrides the per-request timeout.
            #[inline]
            #[must_use]
            pub const fn timeout(mut self, timeout: Duration) -> Self {
                self.timeout = Some(timeout);
                self
            }

            /// Sets the `json-strict-mode` flag sent with every request.
            #[inline]
            #[must_use]
            pub const fn strict_mode(mut self, enabled: bool) -> Self {
                self.strict_mode = enabled;
                self
            }

            /// Sets the `json-verbose-response` flag sent with every request.
            #[inline]
            #[must_use]
            pub const fn verbose_response(mut self, enabled: bool) -> Self {
                self.verbose_response = enabled;
                self
            }

            /// Builds the high-level client with an empty dataset.
            ///
            /// # Errors
            ///
            /// Returns [`LevelMoneyError::MissingCredentials`] if no
            /// credentials were provided.
            /// Returns [`LevelMoneyError::Http`] if the HTTP client fails to build.
            #[inline]
            pub fn build(self) -> Result<$client> {
                let mut http_builder = <$http_client>::builder()
                    .credentials(self.credentials.ok_or(LevelMoneyError::MissingCredentials)?)
                    .strict_mode(self.strict_mode)
                    .verbose_response(self.verbose_response);
                if let Some(url) = self.base_url {
                    http_builder = http_builder.base_url(url);
                }
                if let Some(policy) = self.retry {
                    http_builder = http_builder.retry_policy(policy);
                }
                if let Some(timeout) = self.timeout {
                    http_builder = http_builder.timeout(timeout);
                }
                let client = http_builder.build()?;

                Ok($client {
                    client,
                    dataset: DatasetHandle::default(),
                })
            }
        }

        #[doc = $client_doc]
        #[derive(Debug)]
        pub struct $client {
            /// Low-level HTTP client.
            client: $http_client,
            /// Current accounts and transactions.
            dataset: DatasetHandle,
        }

        impl $client {
            /// Creates a new builder for configuring the client.
            #[inline]
            #[must_use]
            pub const fn builder() -> $builder {
                $builder {
                    credentials: None,
                    base_url: None,
                    retry: None,
                    timeout: None,
                    strict_mode: false,
                    verbose_response: false,
                }
            }

            /// Returns the underlying HTTP client.
            #[inline]
            #[must_use]
            pub const fn client(&self) -> &$http_client {
                &self.client
            }

            /// Fetches accounts and all transactions and replaces the
            /// current dataset with them.
            ///
            /// Returns the new snapshot. On failure the previous dataset is
            /// left in place.
            ///
            /// # Errors
            ///
            /// Returns an error if either request fails or a transaction
            /// record is malformed.
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn refresh(&self) -> Result<Arc<Dataset>> {
                let accounts = self.client.get_accounts() $( .$await_ext )? ?.accounts;
                let raw = self.client.get_all_transactions() $( .$await_ext )? ?.transactions;
                let transactions = validate_all(raw)?;
                tracing::info!(
                    accounts = accounts.len(),
                    transactions = transactions.len(),
                    "dataset loaded"
                );
                let _previous = self.dataset.replace(Dataset::new(accounts, transactions))?;
                self.dataset.snapshot()
            }

            /// Returns the current dataset snapshot.
            ///
            /// # Errors
            ///
            /// Returns [`LevelMoneyError::Dataset`] if the lock is poisoned.
            #[inline]
            pub fn dataset(&self) -> Result<Arc<Dataset>> {
                self.dataset.snapshot()
            }

            /// Returns all accounts in the current dataset.
            ///
            /// # Errors
            ///
            /// Returns [`LevelMoneyError::Dataset`] if the lock is poisoned.
            #[inline]
            pub fn accounts(&self) -> Result<Vec<Account>> {
                Ok(self.dataset.snapshot()?.accounts().to_vec())
            }

            /// Resolves an institution id against the current dataset.
            ///
            /// # Errors
            ///
            /// Returns [`LevelMoneyError::AccountNotFound`] if nothing matches.
            #[inline]
            pub fn resolve(&self, identifier: &str) -> Result<AccountRef> {
                let dataset = self.dataset.snapshot()?;
                resolve_account(&dataset, identifier)
            }

            /// Fetches this month's projected transactions for `account`.
            ///
            /// # Errors
            ///
            /// Returns an error if the request fails or a record is malformed.
            #[tracing::instrument(skip_all, fields(account = %account))]
            pub $($async_kw)? fn projected_transactions(
                &self,
                account: &AccountId,
            ) -> Result<Vec<Transaction>> {
                let month = MonthKey::current();
                let raw = self
                    .client
                    .projected_transactions_for_month(month.year(), month.month())
                    $( .$await_ext )? ?
                    .transactions;
                let projected = projected_for(account, raw)?;
                tracing::debug!(count = projected.len(), "projected transactions kept");
                Ok(projected)
            }

            /// Builds the monthly log for the account with institution id
            /// `identifier`.
            ///
            /// # Errors
            ///
            /// Returns [`LevelMoneyError::AccountNotFound`] if the account is
            /// unknown, [`LevelMoneyError::EmptyLog`] if it has nothing to
            /// summarize, [`LevelMoneyError::InvalidPattern`] for a bad ignore
            /// pattern, or a request error while fetching projections.
            #[tracing::instrument(skip(self, options))]
            pub $($async_kw)? fn build_log(
                &self,
                identifier: &str,
                options: &LogOptions,
            ) -> Result<TransactionLog> {
                let dataset = self.dataset.snapshot()?;
                let account = resolve_account(&dataset, identifier)?;
                let projected = if options.include_projected {
                    self.projected_transactions(&account.account_id) $( .$await_ext )? ?
                } else {
                    Vec::new()
                };
                transaction_log::build_log(
                    &account.account_id,
                    dataset.transactions_for(&account.account_id).chain(&projected),
                    options,
                )
            }
        }
    };
}

// ── Async variant ───────────────────────────────────────────────────────

#[cfg(feature = "async")]
mod async_level_money {
    //! Async high-level client.

    use core::time::Duration;
    use std::sync::Arc;

    use super::projected_for;
    use crate::client::{LevelMoneyClient, RetryPolicy};
    use crate::credentials::Credentials;
    use crate::dataset::{Dataset, DatasetHandle};
    use crate::error::{LevelMoneyError, Result};
    use crate::models::{Account, AccountId, MonthKey, Transaction, validate_all};
    use crate::resolver::{AccountRef, resolve_account};
    use crate::transaction_log::{self, LogOptions, TransactionLog};

    define_level_money! {
        client_name: LevelMoney,
        builder_name: LevelMoneyBuilder,
        http_client: LevelMoneyClient,
        client_doc: "High-level async Level Money client with an in-memory dataset.\n\nUse [`LevelMoney::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`LevelMoney`] client.",
        async_kw: async,
        await_kw: await,
    }
}

// ── Blocking variant ────────────────────────────────────────────────────

#[cfg(feature = "blocking")]
mod blocking_level_money {
    //! Blocking high-level client.

    use core::time::Duration;
    use std::sync::Arc;

    use super::projected_for;
    use crate::client::{LevelMoneyBlockingClient, RetryPolicy};
    use crate::credentials::Credentials;
    use crate::dataset::{Dataset, DatasetHandle};
    use crate::error::{LevelMoneyError, Result};
    use crate::models::{Account, AccountId, MonthKey, Transaction, validate_all};
    use crate::resolver::{AccountRef, resolve_account};
    use crate::transaction_log::{self, LogOptions, TransactionLog};

    define_level_money! {
        client_name: LevelMoneyBlocking,
        builder_name: LevelMoneyBlockingBuilder,
        http_client: LevelMoneyBlockingClient,
        client_doc: "High-level blocking Level Money client with an in-memory dataset.\n\nUse [`LevelMoneyBlocking::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`LevelMoneyBlocking`] client.",
    }
}

#[cfg(feature = "async")]
pub use async_level_money::{LevelMoney, LevelMoneyBuilder};
#[cfg(feature = "blocking")]
pub use blocking_level_money::{LevelMoneyBlocking, LevelMoneyBlockingBuilder};
