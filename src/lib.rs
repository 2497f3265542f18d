//! Rust client library for the Level Money API.
//!
//! This crate provides a typed client for the
//! [Level Money](https://www.levelmoney.com/) personal finance API and a
//! monthly spending log built from an account's transactions.
//!
//! ```no_run
//! # #[cfg(feature = "blocking")]
//! # fn main() -> levelmoney_rs::error::Result<()> {
//! use std::path::Path;
//!
//! use levelmoney_rs::credentials::Credentials;
//! use levelmoney_rs::level_money::LevelMoneyBlocking;
//! use levelmoney_rs::transaction_log::LogOptions;
//!
//! let lm = LevelMoneyBlocking::builder()
//!     .credentials(Credentials::from_dir(Path::new("data"))?)
//!     .build()?;
//! let _dataset = lm.refresh()?;
//! let log = lm.build_log("52", &LogOptions::new().ignore("Krispy Kreme Donuts"))?;
//! for (month, summary) in log.months() {
//!     tracing::info!(%month, spent = %summary.spent, income = %summary.income);
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "blocking"))]
//! # fn main() {}
//! ```

#[cfg(any(feature = "async", feature = "blocking"))]
pub mod client;
pub mod credentials;
pub mod dataset;
pub mod error;
#[cfg(any(feature = "async", feature = "blocking"))]
pub mod level_money;
pub mod models;
pub mod resolver;
pub mod transaction_log;
