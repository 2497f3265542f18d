//! HTTP client for the Level Money API.
//!
//! Provides both async and blocking client variants behind feature flags.
//! Every request is a JSON `POST` whose body carries an `args` block with
//! the stored credentials; endpoint-specific fields sit next to it.

use core::time::Duration;

use serde::Serialize;

#[cfg(any(feature = "async", feature = "blocking"))]
use crate::error::LevelMoneyError;
use crate::models::UserId;

/// Base URL for the Level Money core API.
const DEFAULT_BASE_URL: &str = "https://prod-api.level-labs.com/api/v2/core/";

/// All-transactions endpoint path.
const GET_ALL_TRANSACTIONS_PATH: &str = "get-all-transactions";

/// Accounts endpoint path.
const GET_ACCOUNTS_PATH: &str = "get-accounts";

/// Projected ("crystal ball") transactions endpoint path.
const PROJECTED_TRANSACTIONS_PATH: &str = "projected-transactions-for-month";

/// Login endpoint path.
const LOGIN_PATH: &str = "login";

/// Request body key reserved for the authentication block.
const ARGS_KEY: &str = "args";

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest wait between two attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Retry schedule for idempotent requests.
///
/// Transport failures, `429 Too Many Requests`, and `5xx` responses are
/// retried up to `max_retries` times, sleeping `initial_backoff` before
/// the first retry and doubling after each, capped at `max_backoff`. A
/// `Retry-After` header on a `429` replaces the computed wait. `login` is
/// never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Wait before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for any single wait.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Three retries starting at one second, waits capped at 30 seconds.
    pub const DEFAULT: Self = Self {
        max_retries: 3,
        initial_backoff: Duration::from_secs(1),
        max_backoff: MAX_BACKOFF,
    };

    /// Single attempt, no retries.
    pub const NONE: Self = Self {
        max_retries: 0,
        initial_backoff: Duration::ZERO,
        max_backoff: Duration::ZERO,
    };

    /// Wait before retry number `attempt` (0-based), at most `max_backoff`.
    #[inline]
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2_u32.saturating_pow(attempt))
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    #[inline]
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The authentication block sent as `args` in every request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct AuthArgs<'req> {
    /// User id.
    uid: UserId,
    /// User session token.
    token: &'req str,
    /// Application token.
    api_token: &'req str,
    /// Ask the API to reject unknown fields.
    json_strict_mode: bool,
    /// Ask the API for verbose responses.
    json_verbose_response: bool,
}

/// Full request body: auth block plus flattened endpoint fields.
#[derive(Debug, Serialize)]
struct RequestBody<'req, E: Serialize> {
    /// Authentication block.
    args: AuthArgs<'req>,
    /// Endpoint-specific fields, merged at the top level.
    #[serde(flatten)]
    extra: Option<&'req E>,
}

/// Resolves `path` against `base_url`; absolute URLs pass through.
fn endpoint_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_owned()
    } else {
        format!("{base_url}{}", path.trim_start_matches('/'))
    }
}

/// Ensures the base URL ends with `/` so paths can be appended.
fn normalize_base_url(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

/// Returns `true` for failures worth retrying on an idempotent request.
#[cfg(any(feature = "async", feature = "blocking"))]
fn is_transient(err: &LevelMoneyError) -> bool {
    matches!(*err, LevelMoneyError::Http(_))
        || matches!(*err, LevelMoneyError::RemoteApi { status, .. } if status == 429 || status >= 500)
}

/// Wait before retry number `attempt` after `err`.
///
/// A server-supplied `Retry-After` wins over the computed backoff; both
/// are capped at `max_backoff`.
#[cfg(any(feature = "async", feature = "blocking"))]
fn retry_delay(policy: &RetryPolicy, err: &LevelMoneyError, attempt: u32) -> Duration {
    if let LevelMoneyError::RemoteApi {
        retry_after: Some(wait),
        ..
    } = *err
    {
        wait.min(policy.max_backoff)
    } else {
        policy.backoff(attempt)
    }
}

/// Reads a `Retry-After` header given in delta-seconds.
///
/// HTTP-date values are ignored and fall back to the computed backoff.
#[cfg(any(feature = "async", feature = "blocking"))]
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Turns an error envelope on a `200 OK` response into an error.
#[cfg(any(feature = "async", feature = "blocking"))]
fn check_envelope<R: crate::models::ApiResponse>(response: R) -> crate::error::Result<R> {
    if let Some(reason) = response.api_error().map(str::to_owned) {
        tracing::debug!(reason = %reason, "API reported an error");
        return Err(LevelMoneyError::RemoteApi {
            status: 200,
            reason,
            retry_after: None,
        });
    }
    Ok(response)
}

/// Generates a Level Money client (async or blocking) with builder, methods, and tests.
macro_rules! define_client {
    (
        client_name: $client:ident,
        builder_name: $builder:ident,
        http_type: $http_type:ty,
        response_type: $resp_type:ty,
        sleep: $sleep:path,
        client_doc: $client_doc:expr,
        builder_doc: $builder_doc:expr,
        $(async_kw: $async_kw:tt,)?
        $(await_kw: $await_ext:tt,)?
        $(send_bound: $send_bound:tt,)?
    ) => {
        #[doc = $builder_doc]
        #[derive(Debug)]
        pub struct $builder {
            /// Credentials sent with every request.
            credentials: Option<Credentials>,
            /// Base URL override (for testing).
            base_url: Option<String>,
            /// Value of `json-strict-mode`.
            strict_mode: bool,
            /// Value of `json-verbose-response`.
            verbose_response: bool,
            /// Per-request timeout.
            timeout: Duration,
            /// Retry schedule for idempotent calls.
            retry: RetryPolicy,
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

            /// Sets `json-strict-mode` on every request (default `false`).
            #[inline]
            #[must_use]
            pub const fn strict_mode(mut self, enabled: bool) -> Self {
                self.strict_mode = enabled;
                self
            }

            /// Sets `json-verbose-response` on every request (default `false`).
            #[inline]
            #[must_use]
            pub const fn verbose_response(mut self, enabled: bool) -> Self {
                self.verbose_response = enabled;
                self
            }

            /// Sets the per-request timeout (default 30 seconds).
            #[inline]
            #[must_use]
            pub const fn timeout(mut self, timeout: Duration) -> Self {
                self.timeout = timeout;
                self
            }

            /// Sets the retry schedule for idempotent calls.
            #[inline]
            #[must_use]
            pub const fn retry_policy(mut self, policy: RetryPolicy) -> Self {
                self.retry = policy;
                self
            }

            /// Builds the client.
            ///
            /// # Errors
            ///
            /// Returns [`LevelMoneyError::MissingCredentials`] if no
            /// credentials were provided.
            /// Returns [`LevelMoneyError::Http`] if the HTTP client fails to build.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub fn build(self) -> Result<$client> {
                let credentials = self.credentials.ok_or(LevelMoneyError::MissingCredentials)?;
                let base_url = normalize_base_url(
                    self.base_url
                        .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
                );
                tracing::debug!(base_url = %base_url, "building client");
                let http = <$http_type>::builder().timeout(self.timeout).build()?;

                Ok($client {
                    http,
                    credentials,
                    base_url,
                    strict_mode: self.strict_mode,
                    verbose_response: self.verbose_response,
                    retry: self.retry,
                })
            }
        }

        #[doc = $client_doc]
        #[derive(Debug)]
        pub struct $client {
            /// Underlying HTTP client.
            http: $http_type,
            /// Stored credentials.
            credentials: Credentials,
            /// API base URL, always ending in `/`.
            base_url: String,
            /// Value of `json-strict-mode`.
            strict_mode: bool,
            /// Value of `json-verbose-response`.
            verbose_response: bool,
            /// Retry schedule for idempotent calls.
            retry: RetryPolicy,
        }

        impl $client {
            /// Creates a new builder for configuring the client.
            #[inline]
            #[must_use]
            pub const fn builder() -> $builder {
                $builder {
                    credentials: None,
                    base_url: None,
                    strict_mode: false,
                    verbose_response: false,
                    timeout: DEFAULT_TIMEOUT,
                    retry: RetryPolicy::DEFAULT,
                }
            }

            /// Returns the API base URL.
            #[inline]
            #[must_use]
            pub fn base_url(&self) -> &str {
                &self.base_url
            }

            /// Fetches every transaction of every linked account via
            /// `get-all-transactions`.
            ///
            /// # Errors
            ///
            /// Returns an error if the HTTP request fails, the server returns a
            /// non-200 status or an error envelope, or the response cannot be
            /// deserialized.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn get_all_transactions(&self) -> Result<TransactionsResponse> {
                tracing::debug!("calling get-all-transactions endpoint");
                let response: TransactionsResponse = self
                    .post_json::<(), _>(GET_ALL_TRANSACTIONS_PATH, None, true)
                    $( .$await_ext )? ?;
                tracing::debug!(count = response.transactions.len(), "received transactions");
                check_envelope(response)
            }

            /// Fetches all linked accounts via `get-accounts`.
            ///
            /// # Errors
            ///
            /// Returns an error if the HTTP request fails, the server returns a
            /// non-200 status or an error envelope, or the response cannot be
            /// deserialized.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn get_accounts(&self) -> Result<AccountsResponse> {
                tracing::debug!("calling get-accounts endpoint");
                let response: AccountsResponse = self
                    .post_json::<(), _>(GET_ACCOUNTS_PATH, None, true)
                    $( .$await_ext )? ?;
                tracing::debug!(count = response.accounts.len(), "received accounts");
                check_envelope(response)
            }

            /// Fetches projected transactions via
            /// `projected-transactions-for-month`.
            ///
            /// The API is known to ignore `year` and `month` and answer with
            /// the current month; they are passed through unchanged.
            ///
            /// # Errors
            ///
            /// Returns an error if the HTTP request fails, the server returns a
            /// non-200 status or an error envelope, or the response cannot be
            /// deserialized.
            #[inline]
            #[tracing::instrument(skip(self))]
            pub $($async_kw)? fn projected_transactions_for_month(
                &self,
                year: i32,
                month: u32,
            ) -> Result<TransactionsResponse> {
                tracing::debug!("calling projected-transactions-for-month endpoint");
                let query = ProjectionQuery { year, month };
                let response: TransactionsResponse = self
                    .post_json(PROJECTED_TRANSACTIONS_PATH, Some(&query), true)
                    $( .$await_ext )? ?;
                tracing::debug!(count = response.transactions.len(), "received projections");
                check_envelope(response)
            }

            /// Logs in with an email and password via `login`.
            ///
            /// Never retried.
            ///
            /// # Errors
            ///
            /// Returns an error if the HTTP request fails, the server returns a
            /// non-200 status or an error envelope, or the response cannot be
            /// deserialized.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn login(
                &self,
                email: &str,
                password: SecretString,
            ) -> Result<LoginResponse> {
                tracing::debug!("calling login endpoint");
                let request = LoginRequest {
                    email: email.to_owned(),
                    password,
                };
                let response: LoginResponse = self
                    .post_json(LOGIN_PATH, Some(&request), false)
                    $( .$await_ext )? ?;
                check_envelope(response)
            }

            /// Posts an authenticated request and returns the raw JSON body.
            ///
            /// `path` is resolved against the base URL unless it is an
            /// absolute URL. `extra` fields are merged next to the `args`
            /// block. Not retried.
            ///
            /// # Errors
            ///
            /// Returns [`LevelMoneyError::ReservedField`] if `extra` contains
            /// an `args` key, or an error if the HTTP request fails, the server
            /// returns a non-200 status, or the body is not JSON.
            #[inline]
            #[tracing::instrument(skip_all, fields(path = %path))]
            pub $($async_kw)? fn post_authenticated(
                &self,
                path: &str,
                extra: Option<&serde_json::Map<String, serde_json::Value>>,
            ) -> Result<serde_json::Value> {
                if let Some(fields) = extra {
                    if fields.contains_key(ARGS_KEY) {
                        return Err(LevelMoneyError::ReservedField(ARGS_KEY.to_owned()));
                    }
                }
                self.post_json(path, extra, false) $( .$await_ext )?
            }

            /// Builds the `args` block from the stored credentials.
            fn auth_args(&self) -> AuthArgs<'_> {
                AuthArgs {
                    uid: self.credentials.user_id(),
                    token: self.credentials.auth_token().expose_secret(),
                    api_token: self.credentials.api_token().expose_secret(),
                    json_strict_mode: self.strict_mode,
                    json_verbose_response: self.verbose_response,
                }
            }

            /// Sends an authenticated JSON POST, retrying transient failures
            /// when `idempotent` is set.
            #[tracing::instrument(skip_all, fields(path = %path))]
            $($async_kw)? fn post_json<
                Req: Serialize $(+ $send_bound)?,
                Resp: serde::de::DeserializeOwned,
            >(
                &self,
                path: &str,
                extra: Option<&Req>,
                idempotent: bool,
            ) -> Result<Resp> {
                let url = endpoint_url(&self.base_url, path);
                let body = RequestBody {
                    args: self.auth_args(),
                    extra,
                };
                let max_retries = if idempotent { self.retry.max_retries } else { 0 };
                let mut attempt = 0_u32;
                loop {
                    match self.send_once(&url, &body) $( .$await_ext )? {
                        Err(err) if attempt < max_retries && is_transient(&err) => {
                            let wait = retry_delay(&self.retry, &err, attempt);
                            attempt += 1;
                            tracing::warn!(
                                attempt,
                                max_retries,
                                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                                error = %err,
                                "retrying request"
                            );
                            $sleep(wait) $( .$await_ext )?;
                        }
                        outcome => return outcome,
                    }
                }
            }

            /// Sends one POST and maps the response.
            $($async_kw)? fn send_once<
                Req: Serialize $(+ $send_bound)?,
                Resp: serde::de::DeserializeOwned,
            >(
                &self,
                url: &str,
                body: &Req,
            ) -> Result<Resp> {
                tracing::trace!(url = %url, "sending POST request");
                let response: $resp_type = self
                    .http
                    .post(url)
                    .header(ACCEPT, "application/json")
                    .header(CONTENT_TYPE, "application/json")
                    .json(body)
                    .send()
                    $( .$await_ext )?
                    ?;

                let status = response.status();
                tracing::debug!(status = %status, "received response");
                if status == StatusCode::OK {
                    let text = response.text() $( .$await_ext )? ?;
                    tracing::trace!(body_len = text.len(), "parsing response body");
                    serde_json::from_str(&text).map_err(LevelMoneyError::from)
                } else {
                    let reason = status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_owned();
                    let retry_after = if status == StatusCode::TOO_MANY_REQUESTS {
                        parse_retry_after(response.headers())
                    } else {
                        None
                    };
                    tracing::debug!(status = status.as_u16(), reason = %reason, "API error");
                    Err(LevelMoneyError::RemoteApi {
                        status: status.as_u16(),
                        reason,
                        retry_after,
                    })
                }
            }
        }

    };
}

#[cfg(feature = "async")]
mod async_client {
    //! Async HTTP client for the Level Money API.

    use core::time::Duration;

    use reqwest::StatusCode;
    use reqwest::header::{ACCEPT, CONTENT_TYPE};
    use secrecy::{ExposeSecret as _, SecretString};
    use serde::Serialize;

    use super::{
        ARGS_KEY, AuthArgs, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, GET_ACCOUNTS_PATH,
        GET_ALL_TRANSACTIONS_PATH, LOGIN_PATH, PROJECTED_TRANSACTIONS_PATH, RequestBody,
        RetryPolicy, check_envelope, endpoint_url, is_transient, normalize_base_url,
        parse_retry_after, retry_delay,
    };
    use crate::credentials::Credentials;
    use crate::error::{LevelMoneyError, Result};
    use crate::models::{
        AccountsResponse, LoginRequest, LoginResponse, ProjectionQuery, TransactionsResponse,
    };

    define_client! {
        client_name: LevelMoneyClient,
        builder_name: LevelMoneyClientBuilder,
        http_type: reqwest::Client,
        response_type: reqwest::Response,
        sleep: tokio::time::sleep,
        client_doc: "Async client for the Level Money API.\n\nUse [`LevelMoneyClient::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`LevelMoneyClient`].",
        async_kw: async,
        await_kw: await,
        send_bound: Sync,
    }
}

#[cfg(feature = "blocking")]
mod blocking_client {
    //! Blocking (synchronous) HTTP client for the Level Money API.

    use core::time::Duration;

    use reqwest::StatusCode;
    use reqwest::header::{ACCEPT, CONTENT_TYPE};
    use secrecy::{ExposeSecret as _, SecretString};
    use serde::Serialize;

    use super::{
        ARGS_KEY, AuthArgs, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, GET_ACCOUNTS_PATH,
        GET_ALL_TRANSACTIONS_PATH, LOGIN_PATH, PROJECTED_TRANSACTIONS_PATH, RequestBody,
        RetryPolicy, check_envelope, endpoint_url, is_transient, normalize_base_url,
        parse_retry_after, retry_delay,
    };
    use crate::credentials::Credentials;
    use crate::error::{LevelMoneyError, Result};
    use crate::models::{
        AccountsResponse, LoginRequest, LoginResponse, ProjectionQuery, TransactionsResponse,
    };

    define_client! {
        client_name: LevelMoneyBlockingClient,
        builder_name: LevelMoneyBlockingClientBuilder,
        http_type: reqwest::blocking::Client,
        response_type: reqwest::blocking::Response,
        sleep: std::thread::sleep,
        client_doc: "Blocking (synchronous) client for the Level Money API.\n\nUse [`LevelMoneyBlockingClient::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`LevelMoneyBlockingClient`].",
    }
}

#[cfg(feature = "async")]
pub use async_client::{LevelMoneyClient, LevelMoneyClientBuilder};
#[cfg(feature = "blocking")]
pub use blocking_client::{LevelMoneyBlockingClient, LevelMoneyBlockingClientBuilder};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
    }

    #[test]
    fn backoff_is_capped() {
        assert_eq!(RetryPolicy::DEFAULT.backoff(5), Duration::from_secs(30));
        assert_eq!(RetryPolicy::DEFAULT.backoff(200), Duration::from_secs(30));
        assert_eq!(RetryPolicy::DEFAULT.backoff(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn backoff_respects_custom_cap() {
        let policy = RetryPolicy {
            max_retries: 10,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(250),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(250));
        assert_eq!(RetryPolicy::NONE.backoff(3), Duration::ZERO);
    }

    #[test]
    fn retry_after_replaces_backoff() {
        let err = LevelMoneyError::RemoteApi {
            status: 429,
            reason: "Too Many Requests".to_owned(),
            retry_after: Some(Duration::from_secs(2)),
        };
        assert_eq!(retry_delay(&RetryPolicy::DEFAULT, &err, 0), Duration::from_secs(2));
        assert_eq!(retry_delay(&RetryPolicy::DEFAULT, &err, 4), Duration::from_secs(2));
    }

    #[test]
    fn retry_after_is_capped() {
        let err = LevelMoneyError::RemoteApi {
            status: 429,
            reason: "Too Many Requests".to_owned(),
            retry_after: Some(Duration::from_secs(3600)),
        };
        assert_eq!(retry_delay(&RetryPolicy::DEFAULT, &err, 0), Duration::from_secs(30));
    }

    #[test]
    fn missing_retry_after_uses_backoff() {
        let err = LevelMoneyError::RemoteApi {
            status: 503,
            reason: "Service Unavailable".to_owned(),
            retry_after: None,
        };
        assert_eq!(retry_delay(&RetryPolicy::DEFAULT, &err, 1), Duration::from_secs(2));
    }

    #[test]
    fn retry_after_header_parses_delta_seconds() {
        use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        let _old = headers.insert(RETRY_AFTER, HeaderValue::from_static(" 7 "));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(7)));
        let _old = headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn endpoint_url_joins_paths() {
        let base = "https://example.test/api/v2/core/";
        assert_eq!(
            endpoint_url(base, "get-accounts"),
            "https://example.test/api/v2/core/get-accounts"
        );
        assert_eq!(
            endpoint_url(base, "/get-accounts"),
            "https://example.test/api/v2/core/get-accounts"
        );
        assert_eq!(
            endpoint_url(base, "https://other.test/x"),
            "https://other.test/x"
        );
    }

    #[test]
    fn request_body_flattens_extra_fields() {
        let args = AuthArgs {
            uid: UserId::new(5),
            token: "t",
            api_token: "a",
            json_strict_mode: false,
            json_verbose_response: false,
        };
        let query = crate::models::ProjectionQuery { year: 2015, month: 3 };
        let body = RequestBody {
            args,
            extra: Some(&query),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["year"], 2015);
        assert_eq!(json["month"], 3);
        assert_eq!(json["args"]["uid"], 5);
        assert_eq!(json["args"]["api-token"], "a");
    }

    #[test]
    fn request_body_without_extra_has_only_args() {
        let body: RequestBody<'_, ()> = RequestBody {
            args: AuthArgs {
                uid: UserId::new(5),
                token: "t",
                api_token: "a",
                json_strict_mode: false,
                json_verbose_response: false,
            },
            extra: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["args"]);
    }
}

#[cfg(all(test, feature = "async"))]
mod http_tests {
    use secrecy::{ExposeSecret as _, SecretString};
    use serde_json::json;
    use wiremock::matchers::{body_json, body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::credentials::Credentials;
    use crate::error::LevelMoneyError;

    fn client(server: &MockServer) -> LevelMoneyClient {
        LevelMoneyClient::builder()
            .credentials(Credentials::new(
                "AppTokenForInterview",
                "0E0BDCAF",
                UserId::new(1_110_590_645),
            ))
            .base_url(server.uri())
            .retry_policy(fast_retries(2))
            .build()
            .unwrap()
    }

    fn fast_retries(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn sends_auth_block_and_parses_transactions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get-all-transactions"))
            .and(header("accept", "application/json"))
            .and(body_json(json!({
                "args": {
                    "uid": 1_110_590_645,
                    "token": "0E0BDCAF",
                    "api-token": "AppTokenForInterview",
                    "json-strict-mode": false,
                    "json-verbose-response": false
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": "no-error",
                "transactions": [{
                    "account-id": "nonce:comfy-cc/hdhehe",
                    "transaction-time": "2015-03-01T00:00:00.000Z",
                    "amount": -20000,
                    "merchant": "Coffee"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server).get_all_transactions().await.unwrap();
        assert_eq!(response.transactions.len(), 1);
    }

    #[tokio::test]
    async fn projected_request_merges_year_and_month() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/projected-transactions-for-month"))
            .and(body_partial_json(json!({
                "year": 2015,
                "month": 3,
                "args": {"uid": 1_110_590_645}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"transactions": []})))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server)
            .projected_transactions_for_month(2015, 3)
            .await
            .unwrap();
        assert!(response.transactions.is_empty());
    }

    #[tokio::test]
    async fn non_ok_status_maps_to_remote_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get-accounts"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).get_accounts().await.unwrap_err();
        assert!(matches!(
            err,
            LevelMoneyError::RemoteApi { status: 404, reason, .. } if reason == "Not Found"
        ));
    }

    #[tokio::test]
    async fn other_success_codes_are_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let err = client(&server).get_accounts().await.unwrap_err();
        assert!(matches!(err, LevelMoneyError::RemoteApi { status: 204, .. }));
    }

    #[tokio::test]
    async fn server_errors_are_retried_then_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get-accounts"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server).get_accounts().await.unwrap_err();
        assert!(matches!(err, LevelMoneyError::RemoteApi { status: 503, .. }));
    }

    #[tokio::test]
    async fn retry_recovers_after_transient_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get-accounts"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/get-accounts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accounts": []})))
            .mount(&server)
            .await;

        let response = client(&server).get_accounts().await.unwrap();
        assert!(response.accounts.is_empty());
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).get_accounts().await.unwrap_err();
        assert!(matches!(err, LevelMoneyError::RemoteApi { status: 401, .. }));
    }

    #[tokio::test]
    async fn login_is_never_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_partial_json(json!({"email": "user@example.com", "password": "hunter2"})))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .login("user@example.com", SecretString::from("hunter2".to_owned()))
            .await
            .unwrap_err();
        assert!(matches!(err, LevelMoneyError::RemoteApi { status: 500, .. }));
    }

    #[tokio::test]
    async fn login_returns_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": "no-error",
                "uid": 42,
                "token": "SESSION"
            })))
            .mount(&server)
            .await;

        let session = client(&server)
            .login("user@example.com", SecretString::from("pw".to_owned()))
            .await
            .unwrap();
        assert_eq!(session.uid, Some(UserId::new(42)));
        assert_eq!(session.token.as_ref().map(|t| t.expose_secret()), Some("SESSION"));
    }

    #[tokio::test]
    async fn error_envelope_on_ok_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"error": "invalid-token"})),
            )
            .mount(&server)
            .await;

        let err = client(&server).get_accounts().await.unwrap_err();
        assert!(matches!(
            err,
            LevelMoneyError::RemoteApi { status: 200, reason, .. } if reason == "invalid-token"
        ));
    }

    #[tokio::test]
    async fn malformed_body_is_serialization_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server).get_accounts().await.unwrap_err();
        assert!(matches!(err, LevelMoneyError::Serialization(_)));
    }

    #[tokio::test]
    async fn post_authenticated_merges_extra_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/custom-endpoint"))
            .and(body_partial_json(json!({"flag": true, "args": {"token": "0E0BDCAF"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let mut extra = serde_json::Map::new();
        let _old = extra.insert("flag".to_owned(), json!(true));
        let value = client(&server)
            .post_authenticated("custom-endpoint", Some(&extra))
            .await
            .unwrap();
        assert_eq!(value, json!({"ok": 1}));
    }

    #[tokio::test]
    async fn post_authenticated_rejects_args_key() {
        let server = MockServer::start().await;
        let mut extra = serde_json::Map::new();
        let _old = extra.insert("args".to_owned(), json!({}));
        let err = client(&server)
            .post_authenticated("custom-endpoint", Some(&extra))
            .await
            .unwrap_err();
        assert!(matches!(err, LevelMoneyError::ReservedField(key) if key == "args"));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn request_timeout_is_retried_then_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get-accounts"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"accounts": []}))
                    .set_delay(Duration::from_millis(800)),
            )
            .mount(&server)
            .await;

        let err = LevelMoneyClient::builder()
            .credentials(Credentials::new("api", "auth", UserId::new(1)))
            .base_url(server.uri())
            .timeout(Duration::from_millis(100))
            .retry_policy(fast_retries(1))
            .build()
            .unwrap()
            .get_accounts()
            .await
            .unwrap_err();
        assert!(matches!(err, LevelMoneyError::Http(_)));
        assert_eq!(server.received_requests().await.unwrap_or_default().len(), 2);
    }

    #[tokio::test]
    async fn connection_refused_is_retried_then_reported() {
        let err = LevelMoneyClient::builder()
            .credentials(Credentials::new("api", "auth", UserId::new(1)))
            .base_url("http://127.0.0.1:9")
            .timeout(Duration::from_secs(5))
            .retry_policy(fast_retries(2))
            .build()
            .unwrap()
            .get_accounts()
            .await
            .unwrap_err();
        assert!(matches!(err, LevelMoneyError::Http(_)));
        assert_eq!(
            err.user_message(),
            "Sorry, the finance service could not be reached."
        );
    }

    #[tokio::test]
    async fn rate_limit_honors_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get-accounts"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/get-accounts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accounts": []})))
            .expect(1)
            .mount(&server)
            .await;

        let slow_backoff = RetryPolicy {
            max_retries: 1,
            initial_backoff: Duration::from_secs(20),
            max_backoff: Duration::from_secs(30),
        };
        let client = LevelMoneyClient::builder()
            .credentials(Credentials::new("api", "auth", UserId::new(1)))
            .base_url(server.uri())
            .retry_policy(slow_backoff)
            .build()
            .unwrap();
        let response = tokio::time::timeout(Duration::from_secs(5), client.get_accounts())
            .await
            .unwrap()
            .unwrap();
        assert!(response.accounts.is_empty());
    }

    #[tokio::test]
    async fn rate_limit_error_carries_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "12"))
            .mount(&server)
            .await;

        let err = LevelMoneyClient::builder()
            .credentials(Credentials::new("api", "auth", UserId::new(1)))
            .base_url(server.uri())
            .retry_policy(RetryPolicy::NONE)
            .build()
            .unwrap()
            .get_accounts()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LevelMoneyError::RemoteApi { status: 429, retry_after: Some(wait), .. }
                if wait == Duration::from_secs(12)
        ));
    }

    #[cfg(feature = "blocking")]
    #[tokio::test(flavor = "multi_thread")]
    async fn blocking_client_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get-accounts"))
            .and(body_partial_json(json!({"args": {"uid": 1, "token": "auth"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": "no-error",
                "accounts": [{
                    "account-id": "nonce:comfy-cc/hdhehe",
                    "institution-id": 52,
                    "institution-login-id": 3041
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/get-all-transactions"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let uri = server.uri();
        let (accounts, err) = tokio::task::spawn_blocking(move || {
            let client = LevelMoneyBlockingClient::builder()
                .credentials(Credentials::new("api", "auth", UserId::new(1)))
                .base_url(uri)
                .retry_policy(fast_retries(1))
                .build()
                .unwrap();
            let accounts = client.get_accounts().unwrap().accounts;
            let err = client.get_all_transactions().unwrap_err();
            (accounts, err)
        })
        .await
        .unwrap();
        assert_eq!(accounts.len(), 1);
        assert!(matches!(err, LevelMoneyError::RemoteApi { status: 503, .. }));
    }
}
