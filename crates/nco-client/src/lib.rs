//! # nco-client
//!
//! Async query execution against a Netcool/OMNIbus ObjectServer over a
//! single TDS channel.
//!
//! The contract is deliberately small: connect, execute one query at a time,
//! close. There is no pooling and no retry; every failure surfaces at once as
//! one of a few [`Error`] conditions and the caller decides what to do next.
//!
//! ## Features
//!
//! - **Lazy reconnect**: a connection torn down by cancellation is reopened
//!   on the next call
//! - **Fail-fast exclusivity**: a second concurrent call gets
//!   [`Error::ConnectionInUse`] instead of waiting
//! - **Per-call deadlines**: every call takes a [`Context`]
//! - **Transport independent**: any [`tds_channel::Transport`] can back a
//!   connection
//!
//! ## Example
//!
//! ```rust,ignore
//! use nco_client::{Config, Context, TdsConnector};
//! use std::time::Duration;
//!
//! let config = Config::from_connection_string(
//!     "Server=omnihost;Port=4100;User Id=root;Password=secret;"
//! )?;
//! let connector = TdsConnector::from_config(transport, &config);
//! let conn = connector.connect_config(&Context::background(), &config).await?;
//!
//! let ctx = Context::with_timeout(Duration::from_secs(5));
//! let result = conn.execute(&ctx, &"select Node, Severity from alerts.status".into()).await?;
//! for row in result.rows.iter() {
//!     println!("{row:?}");
//! }
//!
//! conn.close().await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod collector;
pub mod config;
pub mod connection;
pub mod connector;
pub mod context;
pub mod credentials;
pub mod error;
mod parser;
pub mod query;
pub mod row;

pub use config::Config;
pub use connection::{Connection, ExecutorCloser};
pub use connector::{DbConnector, TdsConnector};
pub use context::{Context, ContextError};
pub use credentials::{Addr, Credentials};
pub use error::{Error, Result, Segment};
pub use query::Query;
pub use row::{ExecResult, RowSet};

// Re-export the value type rows are made of
pub use tds_channel::Value;
