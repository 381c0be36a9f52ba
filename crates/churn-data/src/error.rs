//! Error types for churn-data.

use std::path::PathBuf;

use churn_tree::TreeError;

/// Errors from dataset loading, preprocessing, training, and model persistence.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when required columns are absent from the CSV header.
    #[error("missing required columns in {path}: {}", .columns.join(", "))]
    MissingColumns {
        /// Path to the CSV file.
        path: PathBuf,
        /// Missing column names, in schema order (label last).
        columns: Vec<String>,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a column has no present value to impute from.
    #[error("column \"{column}\" has no values; cannot impute")]
    AllValuesMissing {
        /// The column name.
        column: String,
    },

    /// Returned when a label is not 0 or 1.
    #[error("invalid label at row {row_index}: \"{raw}\" (expected 0 or 1)")]
    InvalidLabel {
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// The raw cell value.
        raw: String,
    },

    /// Returned when the holdout fraction is not in (0.0, 1.0).
    #[error("test_fraction must be in (0.0, 1.0), got {fraction}")]
    InvalidTestFraction {
        /// The invalid fraction.
        fraction: f64,
    },

    /// Returned when there are too few rows to form a training and a holdout set.
    #[error("need at least 2 rows to split, got {n_rows}")]
    TooFewRows {
        /// Number of rows available.
        n_rows: usize,
    },

    /// Returned when a feature schema is malformed.
    #[error("invalid feature schema: {reason}")]
    InvalidSchema {
        /// Human-readable description of the problem.
        reason: String,
    },

    /// Returned when model parts disagree on the number of features.
    #[error("model parts disagree: {reason}")]
    SchemaMismatch {
        /// Human-readable description of the disagreement.
        reason: String,
    },

    /// Returned when tree fitting or prediction fails.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a decoded model file holds a structurally invalid tree.
    #[error("corrupt model file {path}")]
    CorruptModel {
        /// Path to the model file.
        path: PathBuf,
        /// The layout rule the tree breaks.
        source: TreeError,
    },

    /// Returned when loading a model with an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The model format version this build expects.
        expected: u32,
        /// The model format version found in the file.
        found: u32,
        /// Path to the model file with the incompatible version.
        path: PathBuf,
    },

    /// Returned when a report file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the training report cannot be encoded as JSON.
    #[error("failed to encode report")]
    SerializeReport {
        /// The underlying serde_json error.
        source: serde_json::Error,
    },
}

/// Why a single raw input value was rejected at prediction time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    /// No value was supplied.
    #[error("a value is required")]
    Missing,

    /// The value is not a number.
    #[error("\"{raw}\" is not a number")]
    NotANumber {
        /// The raw input.
        raw: String,
    },

    /// The value is below zero.
    #[error("must be at least 0, got {value}")]
    Negative {
        /// The parsed value.
        value: f64,
    },

    /// A count field received a fractional value.
    #[error("must be a whole number, got {value}")]
    NotInteger {
        /// The parsed value.
        value: f64,
    },

    /// A choice field received a value outside its option set.
    #[error("must be one of {}, got {value}", join_options(.allowed))]
    NotAnOption {
        /// The parsed value.
        value: f64,
        /// The permitted option values.
        allowed: Vec<i64>,
    },

    /// A categorical column received a category never seen in training.
    #[error("unknown category \"{value}\"")]
    UnknownCategory {
        /// The raw input.
        value: String,
    },
}

fn join_options(allowed: &[i64]) -> String {
    allowed
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A rejected input value, tagged with its position in the schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{column}: {error}")]
pub struct FieldError {
    /// Zero-based schema position.
    pub index: usize,
    /// Column name of the field.
    pub column: String,
    /// What was wrong with the value.
    pub error: InputError,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_error_names_its_column() {
        let e = FieldError {
            index: 11,
            column: "Age".to_string(),
            error: InputError::Negative { value: -4.0 },
        };
        assert_eq!(e.to_string(), "Age: must be at least 0, got -4");
        let boxed: Box<dyn std::error::Error> = Box::new(e);
        assert!(boxed.to_string().starts_with("Age: "));
    }

    #[test]
    fn option_list_in_message() {
        let e = InputError::NotAnOption {
            value: 3.0,
            allowed: vec![1, 2],
        };
        assert_eq!(e.to_string(), "must be one of 1, 2, got 3");
    }
}
