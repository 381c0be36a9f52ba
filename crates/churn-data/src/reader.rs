//! CSV reader for the churn dataset.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::domain::{RawTable, present};
use crate::error::DataError;
use crate::schema::FeatureSchema;

/// Reads the schema's columns out of a churn CSV.
///
/// Expected CSV format:
/// - comma-separated, UTF-8, header row required
/// - every schema feature column plus the label column, in any order
/// - extra columns are ignored
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DataError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`DataError::CsvParse`] | Malformed CSV record |
/// | [`DataError::MissingColumns`] | Header lacks schema or label columns |
/// | [`DataError::InconsistentRowLength`] | Row has different column count than header |
/// | [`DataError::EmptyDataset`] | Zero data rows after header |
pub struct ChurnReader {
    path: PathBuf,
}

impl ChurnReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read the CSV, returning the schema's columns with missing cells as `None`.
    #[instrument(skip(self, schema), fields(path = %self.path.display()))]
    pub fn read(&self, schema: &FeatureSchema) -> Result<RawTable, DataError> {
        let file = std::fs::File::open(&self.path).map_err(|e| DataError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so a short row surfaces as InconsistentRowLength
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?.clone();
        let expected_cols = header.len();
        debug!(expected_cols, "read CSV header");

        let position = |name: &str| header.iter().position(|h| h == name);
        let missing: Vec<String> = schema
            .required_columns()
            .filter(|name| position(name).is_none())
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(DataError::MissingColumns {
                path: self.path.clone(),
                columns: missing,
            });
        }
        let feature_positions: Vec<usize> = schema
            .fields()
            .iter()
            .filter_map(|f| position(&f.column))
            .collect();
        let label_position = position(schema.target()).unwrap_or_default();

        let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); schema.len()];
        let mut labels = Vec::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            if record.len() != expected_cols {
                return Err(DataError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }
            let cell = |pos: usize| record.get(pos).and_then(present).map(str::to_string);
            for (column, &pos) in columns.iter_mut().zip(&feature_positions) {
                column.push(cell(pos));
            }
            labels.push(cell(label_position));
        }

        if labels.is_empty() {
            return Err(DataError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let n_missing: usize = columns
            .iter()
            .chain(std::iter::once(&labels))
            .map(|c| c.iter().filter(|v| v.is_none()).count())
            .sum();
        info!(n_rows = labels.len(), n_missing, "dataset loaded");

        Ok(RawTable {
            path: self.path.clone(),
            columns,
            labels,
        })
    }

    fn csv_error(&self, e: csv::Error) -> DataError {
        DataError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    fn small_schema() -> FeatureSchema {
        let fields = FeatureSchema::churn().fields()[..2].to_vec();
        FeatureSchema::new(fields, "Churn").unwrap()
    }

    #[test]
    fn reads_columns_in_schema_order() {
        let csv = "Complains,extra,Call  Failure,Churn\n1,x,8,1\n0,y,0,0\n";
        let f = write_csv(csv);
        let table = ChurnReader::new(f.path()).read(&small_schema()).unwrap();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.columns[0], vec![Some("8".into()), Some("0".into())]);
        assert_eq!(table.columns[1], vec![Some("1".into()), Some("0".into())]);
        assert_eq!(table.labels, vec![Some("1".into()), Some("0".into())]);
    }

    #[test]
    fn missing_tokens_become_none() {
        let csv = "Call  Failure,Complains,Churn\nNA,,0\n3,1,NaN\n";
        let f = write_csv(csv);
        let table = ChurnReader::new(f.path()).read(&small_schema()).unwrap();
        assert_eq!(table.columns[0][0], None);
        assert_eq!(table.columns[1][0], None);
        assert_eq!(table.labels[1], None);
    }

    #[test]
    fn missing_columns_listed_in_order() {
        let csv = "Complains,Other\n1,2\n";
        let f = write_csv(csv);
        let err = ChurnReader::new(f.path()).read(&small_schema()).unwrap_err();
        match err {
            DataError::MissingColumns { columns, .. } => {
                assert_eq!(columns, vec!["Call  Failure", "Churn"]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn single_space_name_does_not_match() {
        let fields = vec![FeatureSchema::churn().fields()[0].clone()];
        let schema = FeatureSchema::new(fields, "Churn").unwrap();
        let f = write_csv("Call Failure,Churn\n1,0\n");
        let err = ChurnReader::new(f.path()).read(&schema).unwrap_err();
        assert!(matches!(err, DataError::MissingColumns { .. }));
    }

    #[test]
    fn header_only_is_empty() {
        let f = write_csv("Call  Failure,Complains,Churn\n");
        let err = ChurnReader::new(f.path()).read(&small_schema()).unwrap_err();
        assert!(matches!(err, DataError::EmptyDataset { .. }));
    }

    #[test]
    fn short_row_rejected() {
        let f = write_csv("Call  Failure,Complains,Churn\n1,0,0\n2,1\n");
        let err = ChurnReader::new(f.path()).read(&small_schema()).unwrap_err();
        assert!(matches!(
            err,
            DataError::InconsistentRowLength {
                row_index: 1,
                expected: 3,
                got: 2,
                ..
            }
        ));
    }

    #[test]
    fn nonexistent_file() {
        let err = ChurnReader::new(Path::new("/nonexistent/churn.csv"))
            .read(&small_schema())
            .unwrap_err();
        assert!(matches!(err, DataError::FileNotFound { .. }));
    }

    #[test]
    fn custom_schema_target() {
        let schema =
            FeatureSchema::new(vec![FeatureSchema::churn().fields()[11].clone()], "left").unwrap();
        let f = write_csv("Age,left\n30,1\n");
        let table = ChurnReader::new(f.path()).read(&schema).unwrap();
        assert_eq!(table.labels, vec![Some("1".into())]);
    }
}
