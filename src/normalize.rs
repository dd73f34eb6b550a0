//! Conversion of raw engine output into [`ResultSet`]s.

use crate::classify::StatementKind;
use crate::types::{Field, RawResult, ResultSet, Row};

/// Builds the uniform result of one statement.
///
/// `command` is `kind` when the classifier produced one. Otherwise a
/// statement that returned rows, or reported no changes, is taken to be a
/// `SELECT`; a row-less statement with a non-zero change count is `OTHER`.
pub fn normalize(
    rows: Vec<Row>,
    kind: Option<StatementKind>,
    affected_rows: Option<u64>,
) -> ResultSet {
    let command = kind.unwrap_or_else(|| {
        if !rows.is_empty() || affected_rows.unwrap_or(0) == 0 {
            StatementKind::Select
        } else {
            StatementKind::Other
        }
    });

    let fields = rows
        .first()
        .map(|row| {
            row.columns()
                .map(|name| Field {
                    name: name.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    ResultSet {
        command,
        row_count: rows.len(),
        rows,
        fields,
        affected_rows,
    }
}

/// Pairs each raw result with the kind at the same position.
///
/// Results past the end of `commands` get no kind and fall back to the
/// heuristic in [`normalize`].
pub fn normalize_all(results: Vec<RawResult>, commands: &[StatementKind]) -> Vec<ResultSet> {
    results
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| normalize(raw.rows, commands.get(idx).copied(), raw.affected_rows))
        .collect()
}
