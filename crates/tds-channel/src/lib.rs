//! # tds-channel
//!
//! Package model and transport traits for TDS 5.0 sessions that run over a
//! single logical channel.
//!
//! Servers speaking this dialect (Netcool/OMNIbus ObjectServer among them) do
//! not support multiplexing: one physical connection carries exactly one
//! channel, and that channel carries one request/response exchange at a time.
//! This crate captures that contract without committing to a wire codec:
//!
//! - [`Transport`] dials a physical connection ([`Conn`]).
//! - [`Conn`] opens the single [`Channel`] and closes the connection.
//! - [`Channel`] logs in, sends one [`Package`] and yields inbound packages
//!   one at a time until the stream ends.
//!
//! ## Package stream
//!
//! A response is a heterogeneous sequence of packages:
//!
//! ```text
//! RowFormat -> Row* -> Done(MORE) -> ... -> Done(FINAL, TRAN_COMPLETED)
//! ```
//!
//! Extended error detail ([`ExtendedError`]) packages may appear anywhere
//! before the terminal [`Done`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use tds_channel::{Channel, Conn, DialInfo, LoginConfig, Package, Transport};
//! use tokio_util::sync::CancellationToken;
//!
//! let lifetime = CancellationToken::new();
//! let mut conn = transport.dial(&DialInfo::new("omnihost:4100"), lifetime.clone()).await?;
//! let mut channel = conn.new_channel().await?;
//! channel.login(&LoginConfig::new("root", "")).await?;
//! channel.send_package(Package::language("select * from alerts.status")).await?;
//! while let Ok(pkg) = channel.next_package().await {
//!     println!("{pkg:?}");
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod package;
pub mod transport;
pub mod value;

pub use error::{EedError, TransportError};
pub use package::{
    ColumnFormat, Done, DoneKind, DoneStatus, ExtendedError, Language, Package, Row, RowFormat,
    TranState,
};
pub use transport::{Channel, Conn, DialInfo, LoginConfig, Transport};
pub use value::Value;
