//! Field values carried by row packages.

use bytes::Bytes;

/// A decoded field value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,
    /// Boolean value (BIT).
    Bool(bool),
    /// 8-bit unsigned integer (TINYINT).
    TinyInt(u8),
    /// 16-bit signed integer (SMALLINT).
    SmallInt(i16),
    /// 32-bit signed integer (INT).
    Int(i32),
    /// 64-bit signed integer (BIGINT).
    BigInt(i64),
    /// 32-bit floating point (REAL).
    Float(f32),
    /// 64-bit floating point (FLOAT).
    Double(f64),
    /// String value (CHAR, VARCHAR, TEXT).
    String(String),
    /// Binary value (BINARY, VARBINARY, IMAGE).
    Binary(Bytes),
    /// Decimal value (DECIMAL, NUMERIC, MONEY).
    #[cfg(feature = "decimal")]
    Decimal(rust_decimal::Decimal),
    /// Date value (DATE).
    #[cfg(feature = "chrono")]
    Date(chrono::NaiveDate),
    /// Time value (TIME).
    #[cfg(feature = "chrono")]
    Time(chrono::NaiveTime),
    /// DateTime value (DATETIME, SMALLDATETIME, BIGDATETIME).
    #[cfg(feature = "chrono")]
    DateTime(chrono::NaiveDateTime),
}

impl Value {
    /// Check if the value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the value as an i64, if it is an integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::BigInt(v) => Some(*v),
            Self::Int(v) => Some(i64::from(*v)),
            Self::SmallInt(v) => Some(i64::from(*v)),
            Self::TinyInt(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Get the value as a string slice, if it is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Drop a single trailing NUL from a string value.
    ///
    /// Fixed-width character fields arrive NUL-padded by one byte.
    #[must_use]
    pub fn trim_nul(self) -> Self {
        match self {
            Self::String(mut s) => {
                if s.ends_with('\0') {
                    s.pop();
                }
                Self::String(s)
            }
            other => other,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_nul_strips_one_byte() {
        assert_eq!(Value::from("abc\0").trim_nul(), Value::from("abc"));
        assert_eq!(Value::from("abc\0\0").trim_nul(), Value::from("abc\0"));
        assert_eq!(Value::from("abc").trim_nul(), Value::from("abc"));
    }

    #[test]
    fn test_trim_nul_ignores_non_strings() {
        let bin = Value::Binary(Bytes::from_static(b"ab\0"));
        assert_eq!(bin.clone().trim_nul(), bin);
        assert_eq!(Value::Int(7).trim_nul(), Value::Int(7));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::from(5).as_i64(), Some(5));
        assert_eq!(Value::SmallInt(3).as_i64(), Some(3));
        assert_eq!(Value::TinyInt(200).as_i64(), Some(200));
        assert_eq!(Value::from("x").as_i64(), None);
        assert_eq!(Value::from(String::from("x")).as_str(), Some("x"));
        assert_eq!(Value::Int(1).as_str(), None);
        assert!(Value::Null.is_null());
        assert!(!Value::Bool(false).is_null());
    }
}
