//! Calendar month keys used to group transactions.

use chrono::{DateTime, Datelike as _, Utc};
use serde::{Serialize, Serializer};

/// A calendar month, displayed `"{year}-{month}"` without zero padding
/// (`2015-3`, not `2015-03`).
///
/// Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    /// Calendar year.
    year: i32,
    /// Month of the year, 1-12.
    month: u32,
}

impl MonthKey {
    /// Creates a key, returning `None` if `month` is outside 1-12.
    #[inline]
    #[must_use]
    pub const fn new(year: i32, month: u32) -> Option<Self> {
        if month >= 1 && month <= 12 {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// Returns the month containing `timestamp` (UTC).
    #[inline]
    #[must_use]
    pub fn of(timestamp: &DateTime<Utc>) -> Self {
        Self {
            year: timestamp.year(),
            month: timestamp.month(),
        }
    }

    /// Returns the current UTC month.
    #[inline]
    #[must_use]
    pub fn current() -> Self {
        Self::of(&Utc::now())
    }

    /// Calendar year.
    #[inline]
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Month of the year, 1-12.
    #[inline]
    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }
}

impl core::fmt::Display for MonthKey {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}-{}", self.year, self.month)
    }
}

impl Serialize for MonthKey {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
