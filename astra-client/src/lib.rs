//! Rust client for the Astra DB Data API and DevOps API.
//!
//! The crate is organized around two facades, each wrapping an
//! [`ApiCommander`] that owns one composed URL and the headers to send to
//! it:
//!
//! - [`Database`] talks the keyspace-scoped JSON command protocol of the
//!   Data API (collections, commands).
//! - [`AstraDbAdmin`] talks the control-plane DevOps API (database and
//!   keyspace lifecycle), available only against the managed environments.
//!
//! # Example
//!
//! ```no_run
//! use astra_client::{Database, TimeoutOverride};
//! use serde_json::json;
//!
//! # async fn run() -> astra_core::Result<()> {
//! let database = Database::builder("https://012e345f-aaaa-bbbb-cccc-0123456789ab-us-east-2.apps.astra.datastax.com")
//!     .token("AstraCS:...")
//!     .build()?;
//!
//! let collections = database.list_collection_names(TimeoutOverride::none()).await?;
//! println!("collections: {collections:?}");
//!
//! let response = database
//!     .command(&json!({"findOne": {"filter": {"name": "shoes"}}}), TimeoutOverride::none())
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Timeouts
//!
//! Every method takes a [`TimeoutOverride`]; pass
//! [`TimeoutOverride::none()`] to use the configured defaults. Multi-step
//! operations (creating a database and polling it until active) run all
//! their HTTP requests under one shared budget, and a timeout error always
//! names the parameter whose value was exceeded. An explicit timeout of
//! zero means "no deadline".
//!
//! # Decimal-safe payloads
//!
//! Commanders can run in decimal-aware mode (see
//! [`DatabaseBuilder::handle_decimals`]), in which arbitrary-precision
//! numbers built with [`astra_core::codec::decimal_to_value`] travel as
//! exact JSON number literals in both directions.

#![warn(missing_docs)]

pub mod admin;
pub mod auth;
pub mod caller;
pub mod commander;
pub mod config;
pub mod database;
pub mod timeouts;

pub use admin::{AstraDbAdmin, AstraDbDatabaseAdmin, CreateDatabaseOptions};
pub use auth::{StaticTokenProvider, TokenProvider};
pub use caller::Caller;
pub use commander::{ApiCommander, ApiRequest, HttpMethod, HttpPool, RawApiResponse};
pub use config::{Environment, FullTimeoutOptions, TimeoutOptions};
pub use database::{Database, DatabaseBuilder};
pub use timeouts::{MultiCallTimeoutManager, TimeoutOverride};

pub use astra_core::{ApiFamily, Error, ErrorDescriptor, Result, TimeoutContext};
