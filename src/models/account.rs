//! Linked financial account model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::from_centocents;
use super::{AccountId, InstitutionId, InstitutionLoginId};

/// A linked financial account as returned by `get-accounts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Account {
    /// Internal key, `"<login>/<name>"`.
    pub account_id: AccountId,
    /// External key used to address the account.
    pub institution_id: InstitutionId,
    /// Institution login the account was linked through.
    pub institution_login_id: InstitutionLoginId,
    /// Name the institution gives the account.
    #[serde(default)]
    pub account_name: Option<String>,
    /// Name of the institution.
    #[serde(default)]
    pub institution_name: Option<String>,
    /// Account type reported by the API (e.g. "credit card").
    #[serde(default)]
    pub account_type: Option<String>,
    /// Last digits of the account number.
    #[serde(default)]
    pub last_digits: Option<String>,
    /// Current balance in centocents.
    #[serde(default)]
    pub balance: Option<i64>,
}

impl Account {
    /// Human-readable name for the account.
    ///
    /// This is the second `/`-separated component of `account-id`. Ids without
    /// a `/` fall back to `account-name`, then to the id itself.
    #[inline]
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.account_id
            .as_inner()
            .split('/')
            .nth(1)
            .filter(|name| !name.is_empty())
            .or(self.account_name.as_deref())
            .unwrap_or_else(|| self.account_id.as_inner())
    }

    /// Current balance in currency units.
    #[inline]
    #[must_use]
    pub fn balance_amount(&self) -> Option<Decimal> {
        self.balance.map(from_centocents)
    }
}
