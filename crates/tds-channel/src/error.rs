//! Transport error types.

use std::sync::Arc;

use thiserror::Error;

use crate::package::ExtendedError;

/// Errors raised by a transport, connection or channel.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The server has sent everything and closed the stream.
    #[error("end of stream")]
    Eof,

    /// IO error.
    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    /// Malformed or unexpected package.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Login was rejected.
    #[error("login failed: {0}")]
    Login(String),

    /// The server reported one or more errors.
    #[error(transparent)]
    Server(#[from] EedError),

    /// The connection lifetime was canceled.
    #[error("transport canceled")]
    Canceled,

    /// The connection is already closed.
    #[error("connection closed")]
    Closed,
}

impl TransportError {
    /// Check if this is a clean end of stream.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            return Self::Eof;
        }
        Self::Io(Arc::new(e))
    }
}

/// Server error made of one or more extended error detail packages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", render(.messages))]
pub struct EedError {
    /// Error details in arrival order.
    pub messages: Vec<ExtendedError>,
}

impl EedError {
    /// Create from error details.
    #[must_use]
    pub fn new(messages: Vec<ExtendedError>) -> Self {
        Self { messages }
    }
}

fn render(messages: &[ExtendedError]) -> String {
    messages
        .iter()
        .map(|m| format!("{} - {}", m.number, m.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eed_display() {
        let err = EedError::new(vec![
            ExtendedError::new(102, "Incorrect syntax"),
            ExtendedError::new(2714, "Object exists"),
        ]);
        assert_eq!(err.to_string(), "102 - Incorrect syntax; 2714 - Object exists");
    }

    #[test]
    fn test_unexpected_eof_maps_to_eof() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        assert!(TransportError::from(io).is_eof());

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(matches!(TransportError::from(io), TransportError::Io(_)));
    }
}
