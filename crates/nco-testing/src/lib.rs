//! # nco-testing
//!
//! Test infrastructure for nco-client development.
//!
//! Provides an in-memory [`MockTransport`] implementing the `tds-channel`
//! traits, so connection behavior can be tested without an ObjectServer.
//!
//! ## Example
//!
//! ```rust,ignore
//! use nco_testing::{MockResponse, MockTransport};
//! use tds_channel::Value;
//!
//! let transport = MockTransport::builder()
//!     .with_response(
//!         "select Node from alerts.status",
//!         MockResponse::rows(["Node"], vec![vec![Value::from("host1\0")]]),
//!     )
//!     .build();
//!
//! // Hand `transport.clone()` to a connector and inspect `transport.stats()`.
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod mock_transport;

pub use mock_transport::{
    MockChannel, MockConn, MockResponse, MockTransport, MockTransportBuilder, MockTransportStats,
};
