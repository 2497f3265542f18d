//! Monthly spending log.
//!
//! Groups an account's transactions by calendar month, sums debits into
//! `spent` and credits into `income`, and adds one `average` row over all
//! months present. Merchants matching an ignore pattern are dropped before
//! anything is summed.

use std::collections::BTreeMap;

use regex::Regex;
use rust_decimal::Decimal;
use serde::ser::SerializeMap as _;
use serde::{Serialize, Serializer};

use crate::error::{LevelMoneyError, Result};
use crate::models::{AccountId, Money, MonthKey, Transaction};

/// Key of the average row in the serialized log.
pub const AVERAGE_KEY: &str = "average";

/// Options controlling how a log is built.
///
/// # Examples
///
/// ```
/// use levelmoney_rs::transaction_log::LogOptions;
///
/// let options = LogOptions::new()
///     .ignore("Krispy Kreme Donuts|Dunkin")
///     .crystal_ball(true);
/// assert!(options.include_projected);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Merchants matching this regular expression are excluded.
    pub ignore_pattern: Option<String>,
    /// Also include this month's projected transactions.
    pub include_projected: bool,
}

impl LogOptions {
    /// Options that include every fetched transaction and no projections.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Excludes transactions whose merchant matches `pattern`.
    #[inline]
    #[must_use]
    pub fn ignore<T: Into<String>>(mut self, pattern: T) -> Self {
        self.ignore_pattern = Some(pattern.into());
        self
    }

    /// Merges projected transactions into the log.
    #[inline]
    #[must_use]
    pub const fn crystal_ball(mut self, enabled: bool) -> Self {
        self.include_projected = enabled;
        self
    }
}

/// Compiled merchant exclusion pattern.
///
/// Matching is a search, not a full match: `Donut` excludes
/// `Krispy Kreme Donuts`.
#[derive(Debug, Clone, Default)]
pub struct MerchantFilter {
    /// Compiled pattern, `None` when nothing is excluded.
    pattern: Option<Regex>,
}

impl MerchantFilter {
    /// Compiles `pattern` once.
    ///
    /// # Errors
    ///
    /// Returns [`LevelMoneyError::InvalidPattern`] if `pattern` is not a
    /// valid regular expression.
    #[inline]
    pub fn new(pattern: Option<&str>) -> Result<Self> {
        let compiled = pattern.map(Regex::new).transpose()?;
        Ok(Self { pattern: compiled })
    }

    /// Returns `true` if `tx` survives the filter.
    #[inline]
    #[must_use]
    pub fn keeps(&self, tx: &Transaction) -> bool {
        self.pattern
            .as_ref()
            .is_none_or(|pattern| !pattern.is_match(&tx.merchant))
    }
}

/// Spending and income for one month, or the average over all months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MonthSummary {
    /// Total debits as a non-negative amount.
    pub spent: Money,
    /// Total credits.
    pub income: Money,
}

impl MonthSummary {
    /// Builds a summary from raw debit and credit totals.
    fn from_totals(totals: Totals) -> Self {
        Self {
            spent: Money::new(totals.debit.abs()),
            income: Money::new(totals.credit.abs()),
        }
    }
}

/// Unrounded per-month sums.
#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    /// Sum of negative amounts.
    debit: Decimal,
    /// Sum of positive amounts.
    credit: Decimal,
}

impl Totals {
    /// Adds one amount to the matching side.
    fn add(&mut self, amount: Decimal) {
        if amount.is_sign_negative() {
            self.debit += amount;
        } else {
            self.credit += amount;
        }
    }
}

/// Per-month summaries ordered chronologically, plus the average row.
///
/// Serializes as a JSON object with one `"{year}-{month}"` key per month
/// followed by `"average"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionLog {
    /// One entry per distinct month.
    months: BTreeMap<MonthKey, MonthSummary>,
    /// Average over all months in `months`.
    average: MonthSummary,
}

impl TransactionLog {
    /// Month entries in chronological order.
    #[inline]
    pub fn months(&self) -> impl Iterator<Item = (MonthKey, MonthSummary)> + '_ {
        self.months.iter().map(|(key, summary)| (*key, *summary))
    }

    /// Summary for one month, if present.
    #[inline]
    #[must_use]
    pub fn month(&self, key: MonthKey) -> Option<MonthSummary> {
        self.months.get(&key).copied()
    }

    /// Average row.
    #[inline]
    #[must_use]
    pub const fn average(&self) -> MonthSummary {
        self.average
    }

    /// Number of months in the log.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.months.len()
    }

    /// Returns `true` if the log has no months. [`build_log`] never
    /// returns such a log.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }
}

impl Serialize for TransactionLog {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.months.len().saturating_add(1)))?;
        for (key, summary) in &self.months {
            map.serialize_entry(key, summary)?;
        }
        map.serialize_entry(AVERAGE_KEY, &self.average)?;
        map.end()
    }
}

/// Builds the monthly log for `account` from its transactions.
///
/// The ignore pattern in `options` is applied before grouping;
/// `include_projected` is handled by whoever supplies `transactions`.
/// Zero amounts create their month without adding to either side.
///
/// # Errors
///
/// Returns [`LevelMoneyError::InvalidPattern`] if the ignore pattern does
/// not compile, or [`LevelMoneyError::EmptyLog`] if no transaction is left
/// after filtering.
#[inline]
#[tracing::instrument(skip(transactions, options), fields(account = %account))]
pub fn build_log<'tx, I>(
    account: &AccountId,
    transactions: I,
    options: &LogOptions,
) -> Result<TransactionLog>
where
    I: IntoIterator<Item = &'tx Transaction>,
{
    let filter = MerchantFilter::new(options.ignore_pattern.as_deref())?;

    let mut totals: BTreeMap<MonthKey, Totals> = BTreeMap::new();
    let mut ignored = 0_usize;
    for tx in transactions {
        if filter.keeps(tx) {
            totals.entry(tx.month()).or_default().add(tx.amount);
        } else {
            ignored = ignored.saturating_add(1);
        }
    }
    tracing::debug!(months = totals.len(), ignored, "grouped transactions");

    if totals.is_empty() {
        return Err(LevelMoneyError::EmptyLog {
            account: account.clone(),
        });
    }

    let average = average_of(&totals)?;
    let months = totals
        .into_iter()
        .map(|(key, month)| (key, MonthSummary::from_totals(month)))
        .collect();
    Ok(TransactionLog { months, average })
}

/// Averages raw month totals, rounding only the final result.
fn average_of(totals: &BTreeMap<MonthKey, Totals>) -> Result<MonthSummary> {
    let count = Decimal::from(totals.len());
    let sum = totals.values().fold(Totals::default(), |mut acc, month| {
        acc.debit += month.debit;
        acc.credit += month.credit;
        acc
    });
    let divide = |value: Decimal| {
        value.checked_div(count).ok_or_else(|| {
            LevelMoneyError::DataIntegrity(format!("cannot average {value} over {count} months"))
        })
    };
    Ok(MonthSummary::from_totals(Totals {
        debit: divide(sum.debit)?,
        credit: divide(sum.credit)?,
    }))
}
