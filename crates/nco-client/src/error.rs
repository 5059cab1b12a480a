//! Client error types.
//!
//! Every transport or protocol failure is folded into one of a small set of
//! conditions, with the original message(s) kept as ordered [`Segment`]s for
//! diagnostics. Context cancellation is never folded: it surfaces as
//! [`Error::Context`] so callers can tell "I gave up" from "the server failed".

use std::fmt;

use tds_channel::{ExtendedError, TransportError};
use thiserror::Error;

use crate::context::ContextError;

/// One diagnostic message attached to an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Server error detail.
    Server {
        /// Message number.
        code: i32,
        /// Message text.
        message: String,
    },
    /// Transport or protocol text.
    Text(String),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server { code, message } => write!(f, "{code} - {message}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<ExtendedError> for Segment {
    fn from(eed: ExtendedError) -> Self {
        Self::Server {
            code: eed.number,
            message: eed.message,
        }
    }
}

fn chain(segments: &[Segment]) -> String {
    segments.iter().map(|s| format!(": {s}")).collect()
}

/// Errors that can occur during connector and connection operations.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Dial or login did not succeed, or the connection could not be closed.
    #[error("connection failed{}", chain(.0))]
    ConnectionFailed(Vec<Segment>),

    /// Another call is already running on this connection.
    ///
    /// The server handles one query at a time per connection.
    #[error("connection in use")]
    ConnectionInUse,

    /// Sending the query or reading the response failed.
    #[error("query failed{}", chain(.0))]
    QueryFailed(Vec<Segment>),

    /// No transaction-completed marker was found in the response.
    #[error("transaction completed message not found")]
    TranNotCompleted,

    /// The server reported the transaction as failed.
    #[error("transaction failed{}", chain(.details))]
    TranFailed {
        /// Affected row count reported with the failure.
        affected_rows: u64,
        /// Server error details seen in the response.
        details: Vec<Segment>,
    },

    /// The caller's context was canceled or its deadline passed.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if the caller's context ended the call.
    #[must_use]
    pub fn is_context(&self) -> bool {
        matches!(self, Self::Context(_))
    }

    /// Check if this is a connection failure.
    #[must_use]
    pub fn is_connection_failed(&self) -> bool {
        matches!(self, Self::ConnectionFailed(_))
    }

    /// Check if the connection was busy.
    #[must_use]
    pub fn is_connection_in_use(&self) -> bool {
        matches!(self, Self::ConnectionInUse)
    }

    /// Check if the query failed at the transport or protocol level.
    #[must_use]
    pub fn is_query_failed(&self) -> bool {
        matches!(self, Self::QueryFailed(_))
    }

    /// Check if the server reported the transaction as failed.
    #[must_use]
    pub fn is_tran_failed(&self) -> bool {
        matches!(self, Self::TranFailed { .. })
    }

    /// Affected row count carried by a transaction failure.
    #[must_use]
    pub fn affected_rows(&self) -> Option<u64> {
        match self {
            Self::TranFailed { affected_rows, .. } => Some(*affected_rows),
            _ => None,
        }
    }

    /// Diagnostic segments in arrival order.
    #[must_use]
    pub fn details(&self) -> &[Segment] {
        match self {
            Self::ConnectionFailed(details)
            | Self::QueryFailed(details)
            | Self::TranFailed { details, .. } => details,
            _ => &[],
        }
    }

    /// Server message numbers in arrival order.
    #[must_use]
    pub fn server_codes(&self) -> Vec<i32> {
        self.details()
            .iter()
            .filter_map(|s| match s {
                Segment::Server { code, .. } => Some(*code),
                Segment::Text(_) => None,
            })
            .collect()
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure surface a transport error is reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Failure {
    /// Opening: dial, channel creation, login, close.
    Connection,
    /// Sending the query and draining the response.
    Query,
}

impl Failure {
    fn with(self, details: Vec<Segment>) -> Error {
        match self {
            Self::Connection => Error::ConnectionFailed(details),
            Self::Query => Error::QueryFailed(details),
        }
    }
}

/// Map a transport error onto the caller-facing taxonomy.
///
/// A canceled transport is reported as a context cancellation, server
/// error detail becomes one segment per message, anything else contributes
/// its text.
pub(crate) fn classify(base: Failure, reason: Option<TransportError>) -> Error {
    let Some(reason) = reason else {
        return base.with(Vec::new());
    };
    match reason {
        TransportError::Canceled => Error::Context(ContextError::Canceled),
        TransportError::Server(eed) => {
            base.with(eed.messages.into_iter().map(Segment::from).collect())
        }
        other => base.with(vec![Segment::Text(other.to_string())]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tds_channel::EedError;

    #[test]
    fn test_classify_without_reason_returns_base() {
        let err = classify(Failure::Query, None);
        assert!(err.is_query_failed());
        assert_eq!(err.to_string(), "query failed");
    }

    #[test]
    fn test_classify_canceled_passes_through() {
        let err = classify(Failure::Connection, Some(TransportError::Canceled));
        assert!(matches!(err, Error::Context(ContextError::Canceled)));
        assert_eq!(err.to_string(), "context canceled");
    }

    #[test]
    fn test_classify_server_details_in_order() {
        let eed = EedError::new(vec![
            ExtendedError::new(20000, "Permission denied"),
            ExtendedError::new(102, "Incorrect syntax"),
        ]);
        let err = classify(Failure::Query, Some(TransportError::Server(eed)));
        assert_eq!(
            err.to_string(),
            "query failed: 20000 - Permission denied: 102 - Incorrect syntax"
        );
        assert_eq!(err.server_codes(), vec![20000, 102]);
    }

    #[test]
    fn test_classify_other_appends_text() {
        let err = classify(
            Failure::Connection,
            Some(TransportError::Login("bad password".into())),
        );
        assert!(err.is_connection_failed());
        assert_eq!(err.to_string(), "connection failed: login failed: bad password");
    }

    #[test]
    fn test_tran_failed_display_and_count() {
        let err = Error::TranFailed {
            affected_rows: 3,
            details: vec![Segment::Server {
                code: 1205,
                message: "deadlock".into(),
            }],
        };
        assert_eq!(err.to_string(), "transaction failed: 1205 - deadlock");
        assert_eq!(err.affected_rows(), Some(3));
    }

    #[test]
    fn test_sentinel_display() {
        assert_eq!(Error::ConnectionInUse.to_string(), "connection in use");
        assert_eq!(
            Error::TranNotCompleted.to_string(),
            "transaction completed message not found"
        );
        assert!(Error::TranNotCompleted.details().is_empty());
    }
}
