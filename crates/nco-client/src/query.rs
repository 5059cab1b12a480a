//! Query type.

/// A single command sent as one language package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Command text.
    pub sql: String,
}

impl Query {
    /// Create a query.
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }
}

impl From<&str> for Query {
    fn from(sql: &str) -> Self {
        Self::new(sql)
    }
}

impl From<String> for Query {
    fn from(sql: String) -> Self {
        Self { sql }
    }
}
