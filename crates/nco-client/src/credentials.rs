//! Server address and login credentials.

use std::fmt;

/// Server address, conventionally `host:port`.
///
/// The client passes it to the transport untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Addr(String);

impl Addr {
    /// Create an address.
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// The address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Addr {
    fn from(addr: &str) -> Self {
        Self::new(addr)
    }
}

impl From<String> for Addr {
    fn from(addr: String) -> Self {
        Self(addr)
    }
}

/// User name and password for the login step.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// User name.
    pub user: String,
    /// Password.
    pub secret: String,
}

impl Credentials {
    /// Create credentials.
    pub fn new(user: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never expose the secret in debug output
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
