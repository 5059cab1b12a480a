//! Client configuration.

use std::time::Duration;

use crate::credentials::{Addr, Credentials};
use crate::error::Error;

/// Default ObjectServer host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default ObjectServer port.
pub const DEFAULT_PORT: u16 = 4100;

/// Default application name reported at login.
pub const DEFAULT_APPLICATION_NAME: &str = "nco-client";

/// Default time allowed to establish a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Connection configuration.
///
/// Use [`Config::new()`] with the builder setters, or
/// [`Config::from_connection_string()`].
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Server address, `host:port`.
    pub address: Addr,

    /// Login credentials.
    pub credentials: Credentials,

    /// Application name reported to the server.
    pub application_name: String,

    /// Time allowed to dial the server.
    pub connect_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: Addr::new(format!("{DEFAULT_HOST}:{DEFAULT_PORT}")),
            credentials: Credentials::default(),
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a connection string into configuration.
    ///
    /// Supports ADO.NET-style connection strings:
    /// ```text
    /// Server=omnihost;Port=4100;User Id=root;Password=secret;App=probe-sync;
    /// ```
    ///
    /// The server may carry its port as `host:port` or `host,port`.
    /// Unknown keys are ignored.
    pub fn from_connection_string(conn_str: &str) -> Result<Self, Error> {
        let mut config = Self::default();
        let mut host: Option<String> = None;
        let mut port: Option<u16> = None;

        for part in conn_str.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| Error::Config(format!("invalid key-value: {part}")))?;

            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "server" | "data source" | "host" | "address" => {
                    if let Some((h, p)) = value.rsplit_once([':', ',']) {
                        host = Some(h.trim().to_string());
                        port = Some(parse_port(p.trim())?);
                    } else {
                        host = Some(value.to_string());
                    }
                }
                "port" => {
                    port = Some(parse_port(value)?);
                }
                "user id" | "uid" | "user" => {
                    config.credentials.user = value.to_string();
                }
                "password" | "pwd" => {
                    config.credentials.secret = value.to_string();
                }
                "application name" | "app" => {
                    config.application_name = value.to_string();
                }
                "connect timeout" | "connection timeout" => {
                    let secs: u64 = value
                        .parse()
                        .map_err(|_| Error::Config(format!("invalid timeout: {value}")))?;
                    config.connect_timeout = Duration::from_secs(secs);
                }
                _ => {
                    tracing::debug!(key = %key, "ignoring unknown connection string key");
                }
            }
        }

        if host.is_some() || port.is_some() {
            let host = host.as_deref().unwrap_or(DEFAULT_HOST);
            let port = port.unwrap_or(DEFAULT_PORT);
            config.address = Addr::new(format!("{host}:{port}"));
        }

        Ok(config)
    }

    /// Set the server address.
    #[must_use]
    pub fn address(mut self, address: impl Into<Addr>) -> Self {
        self.address = address.into();
        self
    }

    /// Set the login credentials.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the application name.
    #[must_use]
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

fn parse_port(value: &str) -> Result<u16, Error> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("invalid port: {value}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.address.as_str(), "localhost:4100");
        assert_eq!(config.application_name, "nco-client");
        assert_eq!(config.connect_timeout, Duration::from_secs(15));
        assert!(config.credentials.user.is_empty());
    }

    #[test]
    fn test_connection_string_parsing() {
        let config = Config::from_connection_string(
            "Server=omnihost;Port=4101;User Id=root;Password=secret;App=probe-sync;",
        )
        .unwrap();

        assert_eq!(config.address.as_str(), "omnihost:4101");
        assert_eq!(config.credentials, Credentials::new("root", "secret"));
        assert_eq!(config.application_name, "probe-sync");
    }

    #[test]
    fn test_connection_string_with_inline_port() {
        let config = Config::from_connection_string("Host=omnihost:4200").unwrap();
        assert_eq!(config.address.as_str(), "omnihost:4200");

        let config = Config::from_connection_string("Data Source=omnihost,4300;").unwrap();
        assert_eq!(config.address.as_str(), "omnihost:4300");
    }

    #[test]
    fn test_connection_string_port_only() {
        let config = Config::from_connection_string("port=4999").unwrap();
        assert_eq!(config.address.as_str(), "localhost:4999");
    }

    #[test]
    fn test_connection_string_timeout() {
        let config = Config::from_connection_string("Connect Timeout=3").unwrap();
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_connection_string_unknown_key_ignored() {
        let config = Config::from_connection_string("Server=a;Encrypt=yes").unwrap();
        assert_eq!(config.address.as_str(), "a:4100");
    }

    #[test]
    fn test_connection_string_errors() {
        assert!(matches!(
            Config::from_connection_string("Server"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_connection_string("Port=http"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_connection_string("Connect Timeout=soon"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_builder() {
        let config = Config::new()
            .address("omnihost:4100")
            .credentials(Credentials::new("root", ""))
            .application_name("gateway")
            .connect_timeout(Duration::from_secs(2));
        assert_eq!(config.address, Addr::from("omnihost:4100"));
        assert_eq!(config.credentials.user, "root");
        assert_eq!(config.application_name, "gateway");
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
    }
}
