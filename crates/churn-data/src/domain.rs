//! Domain types for churn-data.

use std::path::PathBuf;

/// Cell tokens treated as missing, besides the empty string.
pub(crate) const MISSING_TOKENS: [&str; 6] = ["NA", "N/A", "NaN", "nan", "null", "NULL"];

/// Return `None` for an empty or missing-token cell, else the trimmed text.
pub(crate) fn present(cell: &str) -> Option<&str> {
    let trimmed = cell.trim();
    if trimmed.is_empty() || MISSING_TOKENS.contains(&trimmed) {
        None
    } else {
        Some(trimmed)
    }
}

/// The schema's columns as read from a CSV, before any imputation.
///
/// Stored column-major: `columns[feature][row]`. `None` marks a missing cell.
#[derive(Debug, Clone)]
pub struct RawTable {
    /// Source file.
    pub path: PathBuf,
    /// Feature columns in schema order.
    pub columns: Vec<Vec<Option<String>>>,
    /// Label column.
    pub labels: Vec<Option<String>>,
}

impl RawTable {
    /// Return the number of data rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.labels.len()
    }
}

/// A feature column after imputation, typed by its contents.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Every present cell parsed as a finite number.
    Numeric(Vec<f64>),
    /// At least one present cell was not a number.
    Categorical(Vec<String>),
}

impl Column {
    /// Return the number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Categorical(v) => v.len(),
        }
    }

    /// Return `true` if the column has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return `true` for a categorical column.
    #[must_use]
    pub fn is_categorical(&self) -> bool {
        matches!(self, Self::Categorical(_))
    }
}

/// One column's imputation summary.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ColumnFill {
    /// Column name.
    pub column: String,
    /// Number of cells that were missing and filled.
    pub n_filled: usize,
    /// The fill value, rendered as text.
    pub value: String,
}

/// A fully imputed table ready for encoding.
#[derive(Debug, Clone)]
pub struct CompleteTable {
    /// Feature columns in schema order.
    pub columns: Vec<Column>,
    /// Label column.
    pub labels: Vec<String>,
    /// Per-column fill summaries, only for columns that had gaps.
    pub fills: Vec<ColumnFill>,
}

/// Numeric, row-major training data.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedDataset {
    /// `features[row][feature]`.
    pub features: Vec<Vec<f64>>,
    /// Binary labels.
    pub labels: Vec<usize>,
}

impl EncodedDataset {
    /// Return the rows and labels at `indices`, in that order.
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> (Vec<Vec<f64>>, Vec<usize>) {
        indices
            .iter()
            .map(|&i| (self.features[i].clone(), self.labels[i]))
            .unzip()
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.labels.len()
    }
}
