//! Transport, connection and channel traits.
//!
//! The traits use `impl Future + Send` returns so that a connection holding
//! these types can be shared across tokio tasks.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::package::Package;

/// Dial parameters for a physical connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialInfo {
    /// Server address, conventionally `host:port`.
    pub address: String,
    /// Time allowed to establish the connection.
    pub connect_timeout: Duration,
}

impl DialInfo {
    /// Create dial parameters with a 15 second connect timeout.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            connect_timeout: Duration::from_secs(15),
        }
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Login parameters for a channel.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginConfig {
    /// User name.
    pub user: String,
    /// Password.
    pub password: String,
    /// Application name reported to the server.
    pub app_name: String,
    /// Whether to request password encryption.
    pub encrypt: bool,
}

impl LoginConfig {
    /// Create login parameters with encryption disabled.
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            app_name: String::new(),
            encrypt: false,
        }
    }

    /// Set the application name.
    #[must_use]
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }
}

impl std::fmt::Debug for LoginConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginConfig")
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("app_name", &self.app_name)
            .field("encrypt", &self.encrypt)
            .finish()
    }
}

/// Dials physical connections.
pub trait Transport: Send + Sync {
    /// Connection type produced by this transport.
    type Conn: Conn;

    /// Establish a physical connection.
    ///
    /// `lifetime` bounds the connection itself, independent of any caller
    /// deadline. Once it is canceled the connection must stop all IO and
    /// report [`TransportError::Canceled`].
    fn dial(
        &self,
        info: &DialInfo,
        lifetime: CancellationToken,
    ) -> impl Future<Output = Result<Self::Conn, TransportError>> + Send;
}

/// A physical connection.
pub trait Conn: Send {
    /// Channel type carried by this connection.
    type Channel: Channel;

    /// Open a logical channel.
    ///
    /// The server does not multiplex, so callers open one channel per
    /// connection and reuse it.
    fn new_channel(&mut self) -> impl Future<Output = Result<Self::Channel, TransportError>> + Send;

    /// Close the connection and every channel on it.
    ///
    /// Returns [`TransportError::Canceled`] if the lifetime was already
    /// canceled.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// A logical request/response channel.
pub trait Channel: Send {
    /// Authenticate the channel.
    fn login(
        &mut self,
        config: &LoginConfig,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Send one package.
    fn send_package(
        &mut self,
        package: Package,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receive the next inbound package.
    ///
    /// Returns [`TransportError::Eof`] once the server has sent everything.
    fn next_package(&mut self) -> impl Future<Output = Result<Package, TransportError>> + Send;

    /// Discard any queued outbound data.
    fn reset(&mut self);
}
