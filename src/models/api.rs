//! Request and response bodies for the Level Money core endpoints.

use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{Account, RawTransaction, UserId};

/// Value of the `error` field on a successful response.
pub const NO_ERROR: &str = "no-error";

/// Common envelope check for API responses.
///
/// Every endpoint may answer `200 OK` with an `error` field describing a
/// failure; anything other than absent or `"no-error"` is an error.
pub trait ApiResponse {
    /// Returns the API-reported error, if any.
    fn api_error(&self) -> Option<&str>;
}

/// Maps the raw `error` field to an error message.
fn envelope_error(error: Option<&String>) -> Option<&str> {
    error.map(String::as_str).filter(|text| *text != NO_ERROR)
}

/// Response of `get-all-transactions` and `projected-transactions-for-month`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionsResponse {
    /// Error text, `"no-error"` on success.
    #[serde(default)]
    pub error: Option<String>,
    /// Transaction records.
    #[serde(default)]
    pub transactions: Vec<RawTransaction>,
}

impl ApiResponse for TransactionsResponse {
    #[inline]
    fn api_error(&self) -> Option<&str> {
        envelope_error(self.error.as_ref())
    }
}

/// Response of `get-accounts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountsResponse {
    /// Error text, `"no-error"` on success.
    #[serde(default)]
    pub error: Option<String>,
    /// Linked accounts.
    #[serde(default)]
    pub accounts: Vec<Account>,
}

impl ApiResponse for AccountsResponse {
    #[inline]
    fn api_error(&self) -> Option<&str> {
        envelope_error(self.error.as_ref())
    }
}

/// Response of `login`.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    /// Error text, `"no-error"` on success.
    #[serde(default)]
    pub error: Option<String>,
    /// User the session belongs to.
    #[serde(default)]
    pub uid: Option<UserId>,
    /// Session auth token.
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub token: Option<SecretString>,
}

impl ApiResponse for LoginResponse {
    #[inline]
    fn api_error(&self) -> Option<&str> {
        envelope_error(self.error.as_ref())
    }
}

/// Extra fields for `projected-transactions-for-month`.
///
/// The API is known to ignore these and always answer with the
/// current month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProjectionQuery {
    /// Calendar year.
    pub year: i32,
    /// Month of the year, 1-12.
    pub month: u32,
}

/// Extra fields for `login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Account password.
    #[serde(serialize_with = "serialize_secret")]
    pub password: SecretString,
}

/// Deserializes an optional string straight into a secret.
fn deserialize_secret<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<SecretString>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

/// Serializes a secret's exposed value.
fn serialize_secret<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
