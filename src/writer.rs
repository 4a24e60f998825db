//! Output writer for the final balneability table
//!
//! Writes the joined table as a semicolon-delimited file with a header row
//! and a leading unnamed row-index column. The file is first written to a
//! temporary sibling and then renamed over the target, so a failed run never
//! leaves a partial file behind.

use crate::constants::{OUTPUT_DATETIME_FORMAT, OUTPUT_SEPARATOR};
use crate::error::{BalneabilityError, Result};

use polars::prelude::{CsvWriter, DataFrame, PlSmallStr, SerWriter};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Delimited file writer
#[derive(Debug, Clone)]
pub struct CsvOutputWriter {
    output_path: PathBuf,
}

impl CsvOutputWriter {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn write_error(&self, source: std::io::Error) -> BalneabilityError {
        BalneabilityError::OutputWrite {
            path: self.output_path.clone(),
            source,
        }
    }

    /// Write the table, replacing any previous file; returns rows written
    pub fn write(&self, df: &DataFrame) -> Result<usize> {
        let directory = match self.output_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&directory).map_err(|e| self.write_error(e))?;

        let mut indexed = df.with_row_index(PlSmallStr::EMPTY, None)?;
        let mut temp = NamedTempFile::new_in(&directory).map_err(|e| self.write_error(e))?;

        CsvWriter::new(temp.as_file_mut())
            .include_header(true)
            .with_separator(OUTPUT_SEPARATOR)
            .with_datetime_format(Some(OUTPUT_DATETIME_FORMAT.to_string()))
            .finish(&mut indexed)
            .map_err(|e| BalneabilityError::OutputWrite {
                path: self.output_path.clone(),
                source: std::io::Error::other(e.to_string()),
            })?;

        temp.as_file().sync_all().map_err(|e| self.write_error(e))?;
        temp.persist(&self.output_path)
            .map_err(|e| self.write_error(e.error))?;

        debug!(
            "Wrote {} rows to {}",
            indexed.height(),
            self.output_path.display()
        );
        Ok(indexed.height())
    }
}
