//! Missing-value imputation: median for numeric columns, mode for the rest.

use std::collections::BTreeMap;

use tracing::{info, instrument, warn};

use crate::domain::{Column, ColumnFill, CompleteTable, RawTable};
use crate::error::DataError;
use crate::schema::FeatureSchema;

/// Median of `values`; the mean of the two middle values for even counts.
///
/// Returns `None` for an empty slice.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Most frequent value; ties go to the lexicographically smallest.
///
/// Returns `None` for an empty slice.
#[must_use]
pub fn mode<S: AsRef<str>>(values: &[S]) -> Option<&str> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v.as_ref()).or_default() += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

/// Fill every missing cell of `table`.
///
/// Each column is typed independently: numeric when all present cells parse
/// as finite numbers, categorical otherwise. The label column is filled with
/// its mode.
///
/// # Errors
///
/// Returns [`DataError::AllValuesMissing`] when a column has no present value.
#[instrument(skip_all, fields(n_rows = table.n_rows()))]
pub fn impute(table: &RawTable, schema: &FeatureSchema) -> Result<CompleteTable, DataError> {
    let mut fills = Vec::new();
    let mut columns = Vec::with_capacity(table.columns.len());

    for (cells, field) in table.columns.iter().zip(schema.fields()) {
        let (column, fill) = impute_column(&field.column, cells)?;
        fills.extend(fill);
        columns.push(column);
    }

    let (labels, label_fill) = fill_with_mode(schema.target(), &table.labels)?;
    fills.extend(label_fill);

    let n_filled: usize = fills.iter().map(|f| f.n_filled).sum();
    info!(n_filled, n_columns = fills.len(), "imputation complete");

    Ok(CompleteTable {
        columns,
        labels,
        fills,
    })
}

fn impute_column(
    name: &str,
    cells: &[Option<String>],
) -> Result<(Column, Option<ColumnFill>), DataError> {
    let parsed: Option<Vec<Option<f64>>> = cells
        .iter()
        .map(|cell| match cell {
            None => Some(None),
            Some(raw) => raw.parse::<f64>().ok().filter(|v| v.is_finite()).map(Some),
        })
        .collect();

    let Some(parsed) = parsed else {
        let (values, fill) = fill_with_mode(name, cells)?;
        return Ok((Column::Categorical(values), fill));
    };

    let present: Vec<f64> = parsed.iter().flatten().copied().collect();
    let fill_value = median(&present).ok_or_else(|| DataError::AllValuesMissing {
        column: name.to_string(),
    })?;
    let n_filled = parsed.len() - present.len();
    let values = parsed
        .into_iter()
        .map(|v| v.unwrap_or(fill_value))
        .collect();

    let fill = (n_filled > 0).then(|| {
        warn!(column = name, n_filled, median = fill_value, "filled missing numeric cells");
        ColumnFill {
            column: name.to_string(),
            n_filled,
            value: fill_value.to_string(),
        }
    });
    Ok((Column::Numeric(values), fill))
}

fn fill_with_mode(
    name: &str,
    cells: &[Option<String>],
) -> Result<(Vec<String>, Option<ColumnFill>), DataError> {
    let present: Vec<&str> = cells.iter().flatten().map(String::as_str).collect();
    let fill_value = mode(&present)
        .ok_or_else(|| DataError::AllValuesMissing {
            column: name.to_string(),
        })?
        .to_string();
    let n_filled = cells.len() - present.len();
    let values = cells
        .iter()
        .map(|c| c.clone().unwrap_or_else(|| fill_value.clone()))
        .collect();

    let fill = (n_filled > 0).then(|| {
        warn!(column = name, n_filled, mode = %fill_value, "filled missing cells with mode");
        ColumnFill {
            column: name.to_string(),
            n_filled,
            value: fill_value,
        }
    });
    Ok((values, fill))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::schema::FeatureSchema;

    fn cells(raw: &[Option<&str>]) -> Vec<Option<String>> {
        raw.iter().map(|c| c.map(str::to_string)).collect()
    }

    fn two_column_schema() -> FeatureSchema {
        let fields = FeatureSchema::churn().fields()[..2].to_vec();
        FeatureSchema::new(fields, "Churn").unwrap()
    }

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn mode_ties_go_to_smallest() {
        assert_eq!(mode(&["b", "a", "b", "a"]), Some("a"));
        assert_eq!(mode(&["z", "y", "z"]), Some("z"));
        assert_eq!(mode::<&str>(&[]), None);
    }

    #[test]
    fn numeric_gap_takes_median() {
        let (col, fill) = impute_column("x", &cells(&[Some("1"), None, Some("5"), Some("3")])).unwrap();
        assert_eq!(col, Column::Numeric(vec![1.0, 3.0, 5.0, 3.0]));
        let fill = fill.unwrap();
        assert_eq!(fill.n_filled, 1);
        assert_eq!(fill.value, "3");
    }

    #[test]
    fn text_column_is_categorical() {
        let (col, fill) =
            impute_column("plan", &cells(&[Some("gold"), None, Some("basic"), Some("gold")]))
                .unwrap();
        assert_eq!(
            col,
            Column::Categorical(vec!["gold".into(), "gold".into(), "basic".into(), "gold".into()])
        );
        assert_eq!(fill.unwrap().value, "gold");
    }

    #[test]
    fn complete_column_reports_no_fill() {
        let (col, fill) = impute_column("x", &cells(&[Some("1"), Some("2")])).unwrap();
        assert!(!col.is_categorical());
        assert!(fill.is_none());
    }

    #[test]
    fn all_missing_column_fails() {
        let err = impute_column("x", &cells(&[None, None])).unwrap_err();
        assert!(matches!(err, DataError::AllValuesMissing { column } if column == "x"));
    }

    #[test]
    fn table_labels_filled_with_mode() {
        let table = RawTable {
            path: PathBuf::from("t.csv"),
            columns: vec![
                cells(&[Some("1"), Some("2"), Some("3")]),
                cells(&[Some("0"), Some("1"), None]),
            ],
            labels: cells(&[Some("1"), None, Some("1")]),
        };
        let complete = impute(&table, &two_column_schema()).unwrap();
        assert_eq!(complete.labels, vec!["1", "1", "1"]);
        assert_eq!(complete.columns[1], Column::Numeric(vec![0.0, 1.0, 0.5]));
        let filled: Vec<&str> = complete.fills.iter().map(|f| f.column.as_str()).collect();
        assert_eq!(filled, ["Complains", "Churn"]);
    }
}
