//! Maps an external institution identifier to the internal account key.

use serde::Serialize;

use crate::dataset::Dataset;
use crate::error::{LevelMoneyError, Result};
use crate::models::{Account, AccountId, InstitutionId};

/// A resolved account: internal key plus display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountRef {
    /// Internal `account-id` that transactions refer to.
    pub account_id: AccountId,
    /// Human-readable account name.
    pub display_name: String,
}

impl From<&Account> for AccountRef {
    #[inline]
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.account_id.clone(),
            display_name: account.display_name().to_owned(),
        }
    }
}

/// Finds the account whose `institution-id` equals `identifier`.
///
/// The first match in dataset order wins.
///
/// # Errors
///
/// Returns [`LevelMoneyError::AccountNotFound`] if no account matches.
#[inline]
#[tracing::instrument(skip(dataset))]
pub fn resolve_account(dataset: &Dataset, identifier: &str) -> Result<AccountRef> {
    let wanted = InstitutionId::from(identifier.trim());
    dataset
        .accounts()
        .iter()
        .find(|account| account.institution_id == wanted)
        .map(AccountRef::from)
        .ok_or_else(|| {
            tracing::debug!("no account with this institution id");
            LevelMoneyError::AccountNotFound(identifier.to_owned())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InstitutionLoginId;

    fn account(account_id: &str, institution_id: &str, name: Option<&str>) -> Account {
        Account {
            account_id: AccountId::from(account_id),
            institution_id: InstitutionId::from(institution_id),
            institution_login_id: InstitutionLoginId::from("3041"),
            account_name: name.map(str::to_owned),
            institution_name: None,
            account_type: None,
            last_digits: None,
            balance: None,
        }
    }

    fn dataset() -> Dataset {
        Dataset::new(
            vec![
                account("nonce:comfy-cc/hdhehe", "52", Some("Credit Card")),
                account("nonce:comfy-checking/hdhehe2", "53", None),
                account("bare-id", "54", Some("Savings")),
            ],
            Vec::new(),
        )
    }

    #[test]
    fn resolves_by_institution_id() {
        let found = resolve_account(&dataset(), "52").unwrap();
        assert_eq!(found.account_id, AccountId::from("nonce:comfy-cc/hdhehe"));
        assert_eq!(found.display_name, "hdhehe");
    }

    #[test]
    fn display_name_falls_back_to_account_name() {
        let found = resolve_account(&dataset(), "54").unwrap();
        assert_eq!(found.display_name, "Savings");
    }

    #[test]
    fn account_id_is_not_a_lookup_key() {
        let err = resolve_account(&dataset(), "nonce:comfy-cc/hdhehe").unwrap_err();
        assert!(matches!(err, LevelMoneyError::AccountNotFound(_)));
    }

    #[test]
    fn unknown_identifier_is_not_found() {
        let err = resolve_account(&dataset(), "999").unwrap_err();
        assert_eq!(err.user_message(), "Sorry, the account 999 was not found.");
    }

    #[test]
    fn empty_dataset_is_not_found() {
        let err = resolve_account(&Dataset::default(), "52").unwrap_err();
        assert!(matches!(err, LevelMoneyError::AccountNotFound(id) if id == "52"));
    }
}
