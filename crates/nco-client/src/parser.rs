//! Result parsing over collected packages.
//!
//! The authoritative outcome is the last done marker whose transaction state
//! is "completed", found by scanning from the end. Rows are then read
//! forward under the first row format.

use tds_channel::{DoneKind, Package, Value};

use crate::error::{Error, Result, Segment};
use crate::row::{ExecResult, RowSet};

/// Build the query result from a collected response.
///
/// `stopped_on_error` is set when collection ended on an error done marker;
/// such a response never succeeds. Without a completed marker to carry a
/// count it is reported as a query failure with the server detail attached.
pub(crate) fn parse_results(packages: Vec<Package>, stopped_on_error: bool) -> Result<ExecResult> {
    let affected_rows = match check_tran_completed(&packages) {
        Ok(count) if stopped_on_error => {
            return Err(Error::TranFailed {
                affected_rows: count,
                details: server_details(&packages),
            });
        }
        Ok(count) => count,
        Err(Error::TranNotCompleted) if stopped_on_error => {
            let mut details = vec![Segment::Text("transaction failed".to_string())];
            details.extend(server_details(&packages));
            return Err(Error::QueryFailed(details));
        }
        Err(e) => return Err(e),
    };

    let rows = make_row_set(packages);
    tracing::debug!(
        columns = rows.columns.len(),
        rows = rows.rows.len(),
        affected_rows,
        "query response parsed"
    );
    Ok(ExecResult {
        rows,
        affected_rows,
    })
}

/// Find the last completed-transaction marker and read its count.
fn check_tran_completed(packages: &[Package]) -> Result<u64> {
    let completed = packages
        .iter()
        .rev()
        .filter_map(Package::as_done)
        .find(|done| done.is_tran_completed())
        .ok_or(Error::TranNotCompleted)?;

    let affected_rows = u64::from(completed.count);
    if completed.kind() == DoneKind::Error {
        return Err(Error::TranFailed {
            affected_rows,
            details: server_details(packages),
        });
    }
    Ok(affected_rows)
}

fn server_details(packages: &[Package]) -> Vec<Segment> {
    packages
        .iter()
        .filter_map(|p| match p {
            Package::Eed(eed) => Some(Segment::from(eed.clone())),
            _ => None,
        })
        .collect()
}

fn make_row_set(packages: Vec<Package>) -> RowSet {
    let mut iter = packages.into_iter();
    let Some(columns) = iter.by_ref().find_map(|p| match p {
        Package::RowFormat(fmt) => Some(fmt.names().map(str::to_owned).collect::<Vec<_>>()),
        _ => None,
    }) else {
        return RowSet::default();
    };

    let width = columns.len();
    let rows = iter
        .filter_map(|p| match p {
            Package::Row(row) => Some(row.fields),
            _ => None,
        })
        .map(|fields| {
            let mut row: Vec<Value> = fields.into_iter().map(Value::trim_nul).collect();
            if row.len() != width {
                tracing::warn!(
                    expected = width,
                    actual = row.len(),
                    "row width does not match row format"
                );
                row.resize(width, Value::Null);
            }
            row
        })
        .collect();

    RowSet { columns, rows }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tds_channel::{Done, DoneStatus, ExtendedError, Row, RowFormat, TranState};

    fn done(status: DoneStatus, tran_state: TranState, count: u32) -> Package {
        Package::Done(Done::new(status, tran_state, count))
    }

    fn row(fields: Vec<Value>) -> Package {
        Package::Row(Row::new(fields))
    }

    #[test]
    fn test_completed_final_reports_count() {
        let result = parse_results(vec![done(DoneStatus::COUNT, TranState::Completed, 5)], false)
            .unwrap();
        assert_eq!(result.affected_rows, 5);
        assert!(result.rows.columns.is_empty());
        assert!(result.rows.is_empty());
    }

    #[test]
    fn test_completed_error_reports_count_and_details() {
        let err = parse_results(
            vec![
                Package::Eed(ExtendedError::new(20000, "Permission denied")),
                done(DoneStatus::ERROR, TranState::Completed, 3),
            ],
            false,
        )
        .unwrap_err();
        assert_eq!(err.affected_rows(), Some(3));
        assert_eq!(err.server_codes(), vec![20000]);
    }

    #[test]
    fn test_missing_completed_marker() {
        let err = parse_results(
            vec![
                done(DoneStatus::MORE, TranState::InProgress, 1),
                done(DoneStatus::MORE, TranState::InProgress, 2),
            ],
            false,
        )
        .unwrap_err();
        assert!(matches!(err, Error::TranNotCompleted));
        assert_eq!(err.affected_rows(), None);
    }

    #[test]
    fn test_last_completed_marker_wins() {
        let result = parse_results(
            vec![
                done(DoneStatus::ERROR, TranState::Completed, 1),
                done(DoneStatus::MORE, TranState::InProgress, 9),
                done(DoneStatus::COUNT, TranState::Completed, 2),
                done(DoneStatus::FINAL, TranState::InProgress, 7),
            ],
            false,
        )
        .unwrap();
        assert_eq!(result.affected_rows, 2);
    }

    #[test]
    fn test_stopped_on_error_fails_even_with_good_marker() {
        let err = parse_results(vec![done(DoneStatus::COUNT, TranState::Completed, 4)], true)
            .unwrap_err();
        assert_eq!(err.affected_rows(), Some(4));
    }

    #[test]
    fn test_error_stop_without_completed_marker_keeps_details() {
        let err = parse_results(
            vec![
                Package::Eed(ExtendedError::new(20000, "Permission denied")),
                done(DoneStatus::ERROR, TranState::Failed, 0),
            ],
            true,
        )
        .unwrap_err();

        assert!(err.is_query_failed());
        assert_eq!(err.server_codes(), vec![20000]);
        assert_eq!(
            err.to_string(),
            "query failed: transaction failed: 20000 - Permission denied"
        );
    }

    #[test]
    fn test_rows_follow_first_row_format() {
        let result = parse_results(
            vec![
                row(vec![Value::Int(0)]),
                Package::RowFormat(RowFormat::from_names(["Node", "Severity"])),
                row(vec![Value::from("abc\0"), Value::Int(5)]),
                row(vec![Value::from("def"), Value::Null]),
                done(DoneStatus::COUNT, TranState::Completed, 2),
            ],
            false,
        )
        .unwrap();

        assert_eq!(result.rows.columns, vec!["Node", "Severity"]);
        assert_eq!(
            result.rows.rows,
            vec![
                vec![Value::from("abc"), Value::Int(5)],
                vec![Value::from("def"), Value::Null],
            ]
        );
    }

    #[test]
    fn test_rows_without_format_are_dropped() {
        let result = parse_results(
            vec![
                row(vec![Value::Int(1)]),
                done(DoneStatus::COUNT, TranState::Completed, 1),
            ],
            false,
        )
        .unwrap();
        assert_eq!(result.rows, RowSet::default());
    }

    fn value_strategy() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<i32>().prop_map(Value::Int),
            "[a-z]{0,8}\0?".prop_map(Value::String),
        ]
    }

    proptest! {
        #[test]
        fn every_row_matches_column_count(
            width in 0usize..6,
            rows in prop::collection::vec(prop::collection::vec(value_strategy(), 0..8), 0..10),
        ) {
            let names: Vec<String> = (0..width).map(|i| format!("c{i}")).collect();
            let mut packages = vec![Package::RowFormat(RowFormat::from_names(names))];
            packages.extend(rows.into_iter().map(row));
            packages.push(done(DoneStatus::COUNT, TranState::Completed, 0));

            let result = parse_results(packages, false).unwrap();
            for r in &result.rows.rows {
                prop_assert_eq!(r.len(), result.rows.columns.len());
            }
        }
    }
}
