//! Connection factory.

use std::sync::Arc;
use std::time::Duration;

use tds_channel::{DialInfo, LoginConfig, Transport};

use crate::config::{Config, DEFAULT_APPLICATION_NAME, DEFAULT_CONNECT_TIMEOUT};
use crate::connection::{Connection, ExecutorCloser};
use crate::context::Context;
use crate::credentials::{Addr, Credentials};
use crate::error::Result;

/// Object-safe connection factory.
#[async_trait::async_trait]
pub trait DbConnector: Send + Sync {
    /// Open a connection to `addr`.
    ///
    /// Returns [`Error::ConnectionFailed`](crate::Error::ConnectionFailed) if
    /// the server cannot be reached or refuses the login, and
    /// [`Error::Context`](crate::Error::Context) if `ctx` ends first.
    async fn connect(
        &self,
        ctx: &Context,
        addr: &Addr,
        credentials: &Credentials,
    ) -> Result<Box<dyn ExecutorCloser>>;
}

/// Opens [`Connection`]s over a transport.
///
/// Every connection shares the transport; each one dials its own physical
/// connection and logs in on a single channel.
pub struct TdsConnector<T> {
    transport: Arc<T>,
    application_name: String,
    connect_timeout: Duration,
}

impl<T: Transport> TdsConnector<T> {
    /// Create a connector with default application name and timeout.
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Create a connector using the application name and timeout from `config`.
    pub fn from_config(transport: T, config: &Config) -> Self {
        Self::new(transport)
            .with_application_name(config.application_name.clone())
            .with_timeout(config.connect_timeout)
    }

    /// Set the application name reported at login.
    #[must_use]
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    /// Set the time allowed to dial.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Open a connection and log in.
    ///
    /// The connection is opened before it is returned, so unreachable
    /// servers and bad credentials are reported here.
    pub async fn connect(
        &self,
        ctx: &Context,
        addr: &Addr,
        credentials: &Credentials,
    ) -> Result<Connection<T>> {
        let dial = DialInfo::new(addr.as_str()).connect_timeout(self.connect_timeout);
        let login = LoginConfig::new(credentials.user.as_str(), credentials.secret.as_str())
            .app_name(self.application_name.as_str());

        let conn = Connection::new(Arc::clone(&self.transport), dial, login);
        conn.open(ctx).await?;
        Ok(conn)
    }

    /// Open a connection to the address in `config` with its credentials.
    pub async fn connect_config(&self, ctx: &Context, config: &Config) -> Result<Connection<T>> {
        self.connect(ctx, &config.address, &config.credentials).await
    }
}

#[async_trait::async_trait]
impl<T: Transport + 'static> DbConnector for TdsConnector<T> {
    async fn connect(
        &self,
        ctx: &Context,
        addr: &Addr,
        credentials: &Credentials,
    ) -> Result<Box<dyn ExecutorCloser>> {
        let conn = TdsConnector::connect(self, ctx, addr, credentials).await?;
        Ok(Box::new(conn))
    }
}

impl<T> std::fmt::Debug for TdsConnector<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TdsConnector")
            .field("application_name", &self.application_name)
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}
