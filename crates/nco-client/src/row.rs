//! Result rows.

use tds_channel::Value;

/// Columns and rows produced by one query.
///
/// Every row holds exactly `columns.len()` values. A query that produced no
/// row format has no columns and no rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    /// Column names in server order.
    pub columns: Vec<String>,
    /// Rows in arrival order.
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value at `row` in the named column.
    #[must_use]
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    /// Iterate over rows.
    pub fn iter(&self) -> impl Iterator<Item = &[Value]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

/// Outcome of a successful query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecResult {
    /// Returned rows.
    pub rows: RowSet,
    /// Rows affected, as reported by the completion marker.
    pub affected_rows: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_by_column_name() {
        let rows = RowSet {
            columns: vec!["Node".into(), "Severity".into()],
            rows: vec![vec![Value::from("host1"), Value::Int(5)]],
        };
        assert_eq!(rows.get(0, "Severity"), Some(&Value::Int(5)));
        assert_eq!(rows.get(0, "Summary"), None);
        assert_eq!(rows.get(1, "Node"), None);
        assert_eq!(rows.len(), 1);
    }
}
