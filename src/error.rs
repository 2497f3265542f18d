//! Error types for the Level Money client library.

use core::time::Duration;
use std::path::PathBuf;

use crate::models::AccountId;

/// All errors that can occur when using the Level Money client.
#[derive(Debug, thiserror::Error)]
pub enum LevelMoneyError {
    /// HTTP transport failed (connection, timeout, body read).
    #[cfg(any(feature = "async", feature = "blocking"))]
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with something other than `200 OK`, or with an
    /// error envelope.
    #[error("remote API error ({status}): {reason}")]
    RemoteApi {
        /// HTTP status code (200 when the error came from the envelope).
        status: u16,
        /// Reason phrase or API error text.
        reason: String,
        /// Wait requested by the server's `Retry-After` header on a `429`.
        retry_after: Option<Duration>,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The client was built without credentials.
    #[error("credentials are required to build a client")]
    MissingCredentials,

    /// A credential file could not be read.
    #[error("failed to read credential file {}: {source}", path.display())]
    Credentials {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A credential file was read but its contents are unusable.
    #[error("invalid credential file {}: {message}", path.display())]
    CredentialFormat {
        /// File that failed.
        path: PathBuf,
        /// What was wrong with it.
        message: String,
    },

    /// No account matches the given institution identifier.
    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// The account resolved but has no transactions to summarize.
    #[error("no transactions to summarize for account {account}")]
    EmptyLog {
        /// Internal account key that resolved.
        account: AccountId,
    },

    /// Upstream data is malformed (bad timestamp, non-numeric amount).
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    /// The merchant exclusion pattern does not compile.
    #[error("invalid ignore pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// An extra request field collides with the reserved `args` block.
    #[error("request field `{0}` is reserved")]
    ReservedField(String),

    /// The in-memory dataset lock was poisoned.
    #[error("dataset error: {0}")]
    Dataset(String),
}

impl LevelMoneyError {
    /// Returns the message shown to an end user for this failure.
    ///
    /// Unknown accounts and empty logs are expected outcomes and get a
    /// friendly sentence; everything else is reported as a failure to
    /// talk to the API without exposing raw response data.
    #[inline]
    #[must_use]
    #[allow(
        clippy::ref_patterns,
        reason = "variant fields are borrowed out of `*self` without implicit binding modes"
    )]
    pub fn user_message(&self) -> String {
        match *self {
            Self::AccountNotFound(ref id) => format!("Sorry, the account {id} was not found."),
            Self::EmptyLog { ref account } => {
                format!("There are no transactions to show for account {account}.")
            }
            Self::InvalidPattern(_) => "The ignore pattern is not a valid expression.".to_owned(),
            Self::RemoteApi { ref reason, .. } => {
                format!("Sorry, the finance service could not be reached: {reason}")
            }
            #[cfg(any(feature = "async", feature = "blocking"))]
            Self::Http(_) => "Sorry, the finance service could not be reached.".to_owned(),
            Self::Serialization(_)
            | Self::MissingCredentials
            | Self::Credentials { .. }
            | Self::CredentialFormat { .. }
            | Self::DataIntegrity(_)
            | Self::ReservedField(_)
            | Self::Dataset(_) => format!("Sorry, something went wrong: {self}"),
        }
    }
}

/// Convenience alias for results with [`LevelMoneyError`].
pub type Result<T> = core::result::Result<T, LevelMoneyError>;
