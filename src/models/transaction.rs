//! Transaction models.
//!
//! [`RawTransaction`] mirrors the wire record. [`Transaction`] is the
//! validated form the rest of the crate works with: timestamp parsed and
//! amount converted from centocents to currency units.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::from_centocents;
use super::{AccountId, MonthKey, TransactionId};
use crate::error::{LevelMoneyError, Result};

/// Timestamp layout used by the API (`2015-03-01T00:00:00.000Z`).
const TRANSACTION_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// A transaction record as returned by `get-all-transactions` and
/// `projected-transactions-for-month`.
///
/// `transaction-time` and `amount` are kept untyped so that malformed
/// records surface as [`LevelMoneyError::DataIntegrity`] on conversion
/// rather than failing the whole response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawTransaction {
    /// Owning account. Projected records may omit it.
    #[serde(default)]
    pub account_id: Option<AccountId>,
    /// Unique identifier.
    #[serde(default)]
    pub transaction_id: Option<TransactionId>,
    /// When the transaction happened (ISO-8601, UTC).
    pub transaction_time: String,
    /// Signed amount in centocents; negative is a debit.
    pub amount: serde_json::Value,
    /// Normalized merchant name.
    #[serde(default)]
    pub merchant: String,
    /// Merchant text as reported by the institution.
    #[serde(default)]
    pub raw_merchant: Option<String>,
    /// Whether the transaction has not yet cleared.
    #[serde(default)]
    pub is_pending: Option<bool>,
    /// API-assigned category.
    #[serde(default)]
    pub categorization: Option<String>,
}

impl RawTransaction {
    /// Fills in `account_id` if the record does not carry one.
    #[inline]
    #[must_use]
    pub fn or_account(mut self, account_id: &AccountId) -> Self {
        if self.account_id.is_none() {
            self.account_id = Some(account_id.clone());
        }
        self
    }
}

/// A validated transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Owning account.
    pub account_id: AccountId,
    /// Unique identifier, if the API supplied one.
    pub transaction_id: Option<TransactionId>,
    /// When the transaction happened.
    pub timestamp: DateTime<Utc>,
    /// Signed amount in currency units; negative is a debit.
    pub amount: Decimal,
    /// Merchant name, matched by ignore patterns.
    pub merchant: String,
    /// Whether the transaction has not yet cleared.
    pub pending: bool,
}

impl Transaction {
    /// Month this transaction is grouped under.
    #[inline]
    #[must_use]
    pub fn month(&self) -> MonthKey {
        MonthKey::of(&self.timestamp)
    }
}

impl TryFrom<RawTransaction> for Transaction {
    type Error = LevelMoneyError;

    #[inline]
    fn try_from(raw: RawTransaction) -> Result<Self> {
        let timestamp = parse_transaction_time(&raw.transaction_time)?;
        let centocents = raw.amount.as_i64().ok_or_else(|| {
            LevelMoneyError::DataIntegrity(format!(
                "amount {} of transaction at {} is not an integer",
                raw.amount, raw.transaction_time
            ))
        })?;
        let account_id = raw.account_id.ok_or_else(|| {
            LevelMoneyError::DataIntegrity(format!(
                "transaction at {} has no account-id",
                raw.transaction_time
            ))
        })?;

        Ok(Self {
            account_id,
            transaction_id: raw.transaction_id,
            timestamp,
            amount: from_centocents(centocents),
            merchant: raw.merchant,
            pending: raw.is_pending.unwrap_or(false),
        })
    }
}

/// Parses a `transaction-time` value.
///
/// The API's usual layout is tried first, then general RFC 3339 (which
/// also covers explicit offsets).
fn parse_transaction_time(text: &str) -> Result<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, TRANSACTION_TIME_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| {
            LevelMoneyError::DataIntegrity(format!("malformed transaction-time {text:?}: {err}"))
        })
}

/// Converts a batch of wire records, failing on the first malformed one.
///
/// # Errors
///
/// Returns [`LevelMoneyError::DataIntegrity`] if any record has a
/// malformed timestamp, a non-integer amount, or no account.
#[inline]
pub fn validate_all(raw: Vec<RawTransaction>) -> Result<Vec<Transaction>> {
    raw.into_iter().map(Transaction::try_from).collect()
}
