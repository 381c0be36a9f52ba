//! JSON writer for training reports.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::error::DataError;
use crate::trainer::TrainingReport;

/// Writes a [`TrainingReport`] as pretty-printed JSON.
pub struct ReportWriter {
    path: PathBuf,
}

impl ReportWriter {
    /// Create a writer targeting `path`. Nothing is touched until [`write`](Self::write).
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Write the report, creating parent directories and overwriting any existing file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::SerializeReport`] | JSON encoding failed |
    /// | [`DataError::WriteFile`] | directory or file could not be written |
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn write(&self, report: &TrainingReport) -> Result<(), DataError> {
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| DataError::SerializeReport { source: e })?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| DataError::WriteFile {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        fs::write(&self.path, json).map_err(|e| DataError::WriteFile {
            path: self.path.clone(),
            source: e,
        })?;
        info!("report written");
        Ok(())
    }
}
