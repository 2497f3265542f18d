//! Data models for Level Money API entities.
//!
//! Wire records ([`RawTransaction`], [`Account`], the response envelopes),
//! their validated domain forms, newtype ID wrappers, and the money and
//! month types the transaction log is built from.

mod account;
mod api;
mod ids;
mod money;
mod month;
mod transaction;

pub use account::Account;
pub use api::{
    AccountsResponse, ApiResponse, LoginRequest, LoginResponse, NO_ERROR, ProjectionQuery,
    TransactionsResponse,
};
pub use ids::{AccountId, InstitutionId, InstitutionLoginId, TransactionId, UserId};
pub use money::{Money, from_centocents};
pub use month::MonthKey;
pub use transaction::{RawTransaction, Transaction, validate_all};
