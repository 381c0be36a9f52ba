//! Integer encoding of categorical columns and label parsing.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::{Column, CompleteTable, EncodedDataset};
use crate::error::{DataError, InputError};

/// Maps the categories of one column to integer codes.
///
/// Codes are positions in the sorted list of categories seen during
/// training, so the same training data always yields the same codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    categories: Vec<String>,
}

impl CategoryEncoder {
    /// Learn the distinct categories of a column.
    #[must_use]
    pub fn fit<S: AsRef<str>>(values: &[S]) -> Self {
        let mut categories: Vec<String> = values.iter().map(|v| v.as_ref().to_string()).collect();
        categories.sort();
        categories.dedup();
        Self { categories }
    }

    /// Return the code for `raw` (trimmed).
    ///
    /// # Errors
    ///
    /// Returns [`InputError::UnknownCategory`] for a category absent from training.
    pub fn code(&self, raw: &str) -> Result<f64, InputError> {
        let raw = raw.trim();
        self.categories
            .binary_search_by(|c| c.as_str().cmp(raw))
            .map(|i| i as f64)
            .map_err(|_| InputError::UnknownCategory {
                value: raw.to_string(),
            })
    }

    /// Return the category for a code, if it exists.
    #[must_use]
    pub fn category(&self, code: usize) -> Option<&str> {
        self.categories.get(code).map(String::as_str)
    }

    /// Return all known categories in code order.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Return the number of known categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Return `true` if no category is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Parse a label cell as class 0 or 1.
fn parse_label(row_index: usize, raw: &str) -> Result<usize, DataError> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v == 0.0 => Ok(0),
        Ok(v) if v == 1.0 => Ok(1),
        _ => Err(DataError::InvalidLabel {
            row_index,
            raw: raw.to_string(),
        }),
    }
}

/// Turn an imputed table into numeric rows plus one encoder slot per feature.
///
/// Numeric columns pass through and get `None`; categorical columns get a
/// fitted [`CategoryEncoder`].
///
/// # Errors
///
/// Returns [`DataError::InvalidLabel`] when a label is not 0 or 1.
#[instrument(skip_all, fields(n_rows = table.labels.len()))]
pub fn encode(
    table: &CompleteTable,
) -> Result<(EncodedDataset, Vec<Option<CategoryEncoder>>), DataError> {
    let n_rows = table.labels.len();
    let mut features = vec![Vec::with_capacity(table.columns.len()); n_rows];
    let mut encoders = Vec::with_capacity(table.columns.len());

    for column in &table.columns {
        match column {
            Column::Numeric(values) => {
                for (row, &v) in features.iter_mut().zip(values) {
                    row.push(v);
                }
                encoders.push(None);
            }
            Column::Categorical(values) => {
                let encoder = CategoryEncoder::fit(values);
                for (row, v) in features.iter_mut().zip(values) {
                    // Every value was seen by fit.
                    row.push(encoder.code(v).unwrap_or_default());
                }
                debug!(n_categories = encoder.len(), "encoded categorical column");
                encoders.push(Some(encoder));
            }
        }
    }

    let labels = table
        .labels
        .iter()
        .enumerate()
        .map(|(i, raw)| parse_label(i, raw))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((EncodedDataset { features, labels }, encoders))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_sorted_order() {
        let enc = CategoryEncoder::fit(&["gold", "basic", "silver", "gold"]);
        assert_eq!(enc.categories(), ["basic", "gold", "silver"]);
        assert_eq!(enc.code("basic").unwrap(), 0.0);
        assert_eq!(enc.code(" silver ").unwrap(), 2.0);
        assert_eq!(enc.category(1), Some("gold"));
        assert_eq!(enc.category(3), None);
    }

    #[test]
    fn unseen_category_rejected() {
        let enc = CategoryEncoder::fit(&["a", "b"]);
        assert_eq!(
            enc.code("c"),
            Err(InputError::UnknownCategory { value: "c".into() })
        );
    }

    #[test]
    fn fit_is_order_independent() {
        assert_eq!(
            CategoryEncoder::fit(&["x", "y", "z"]),
            CategoryEncoder::fit(&["z", "x", "y", "x"])
        );
    }

    #[test]
    fn encode_mixed_table() {
        let table = CompleteTable {
            columns: vec![
                Column::Numeric(vec![1.5, 2.5]),
                Column::Categorical(vec!["b".into(), "a".into()]),
            ],
            labels: vec!["1".into(), "0.0".into()],
            fills: Vec::new(),
        };
        let (ds, encoders) = encode(&table).unwrap();
        assert_eq!(ds.features, vec![vec![1.5, 1.0], vec![2.5, 0.0]]);
        assert_eq!(ds.labels, vec![1, 0]);
        assert!(encoders[0].is_none());
        assert_eq!(encoders[1].as_ref().unwrap().len(), 2);
    }

    #[test]
    fn non_binary_label_rejected() {
        let table = CompleteTable {
            columns: vec![Column::Numeric(vec![1.0, 2.0])],
            labels: vec!["0".into(), "yes".into()],
            fills: Vec::new(),
        };
        let err = encode(&table).unwrap_err();
        assert!(matches!(err, DataError::InvalidLabel { row_index: 1, .. }));
    }
}
