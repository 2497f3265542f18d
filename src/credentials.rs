//! API credentials loaded once at startup.
//!
//! Three single-line files live in a credentials directory:
//!
//! ```text
//! <dir>/
//!   .api_token    application token issued by Level Money
//!   .auth_token   session token for the user
//!   .userid       numeric user id
//! ```

use std::fs;
use std::path::Path;

use secrecy::SecretString;

use crate::error::{LevelMoneyError, Result};
use crate::models::UserId;

/// File holding the application API token.
pub const API_TOKEN_FILE: &str = ".api_token";
/// File holding the user's auth token.
pub const AUTH_TOKEN_FILE: &str = ".auth_token";
/// File holding the numeric user id.
pub const USER_ID_FILE: &str = ".userid";

/// The three values sent in every request's `args` block.
///
/// Tokens are kept as [`SecretString`] so they never show up in `Debug`
/// output or logs.
#[derive(Debug)]
pub struct Credentials {
    /// Application token (`api-token`).
    api_token: SecretString,
    /// User session token (`token`).
    auth_token: SecretString,
    /// User id (`uid`).
    user_id: UserId,
}

impl Credentials {
    /// Creates credentials from in-memory values.
    #[inline]
    #[must_use]
    pub fn new<A: Into<String>, T: Into<String>>(api_token: A, auth_token: T, user_id: UserId) -> Self {
        Self {
            api_token: SecretString::from(api_token.into()),
            auth_token: SecretString::from(auth_token.into()),
            user_id,
        }
    }

    /// Reads credentials from the three files in `dir`.
    ///
    /// Only the first line of each file is used.
    ///
    /// # Errors
    ///
    /// Returns [`LevelMoneyError::Credentials`] if a file cannot be read,
    /// or [`LevelMoneyError::CredentialFormat`] if it is empty or the user
    /// id is not an integer.
    #[inline]
    #[tracing::instrument(skip_all, fields(dir = %dir.display()))]
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let api_token = read_first_line(&dir.join(API_TOKEN_FILE))?;
        let auth_token = read_first_line(&dir.join(AUTH_TOKEN_FILE))?;
        let user_id_path = dir.join(USER_ID_FILE);
        let user_id = read_first_line(&user_id_path)?
            .trim()
            .parse::<i64>()
            .map_err(|err| LevelMoneyError::CredentialFormat {
                path: user_id_path,
                message: format!("user id is not an integer: {err}"),
            })?;
        tracing::debug!("loaded credentials");
        Ok(Self::new(api_token, auth_token, UserId::new(user_id)))
    }

    /// Application token.
    #[inline]
    #[must_use]
    pub const fn api_token(&self) -> &SecretString {
        &self.api_token
    }

    /// User session token.
    #[inline]
    #[must_use]
    pub const fn auth_token(&self) -> &SecretString {
        &self.auth_token
    }

    /// User id.
    #[inline]
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }
}

/// Returns the first line of `path` with its line terminator removed.
fn read_first_line(path: &Path) -> Result<String> {
    let contents = fs::read_to_string(path).map_err(|source| LevelMoneyError::Credentials {
        path: path.to_path_buf(),
        source,
    })?;
    let line = contents
        .lines()
        .next()
        .map(|first| first.trim_end_matches('\r'))
        .unwrap_or_default();
    if line.is_empty() {
        return Err(LevelMoneyError::CredentialFormat {
            path: path.to_path_buf(),
            message: "first line is empty".to_owned(),
        });
    }
    Ok(line.to_owned())
}
