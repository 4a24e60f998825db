//! Curated monitoring-point features.
//!
//! The features (coordinates, beach, drainage flags) are maintained by hand
//! outside the pipeline and are read-only here. The pipeline sees them
//! through `PointFeatureSource`, backed by the curated workbook itself, a
//! delimited export of it, or an in-memory list. Fully blank rows are skipped.

use crate::constants::columns;
use crate::error::{BalneabilityError, Result};
use crate::models::PointFeature;
use calamine::{Data, Range, Reader, open_workbook_auto};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read-only repository of point features
pub trait PointFeatureSource {
    fn load(&self) -> Result<Vec<PointFeature>>;
}

/// Features held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryFeatures {
    features: Vec<PointFeature>,
}

impl InMemoryFeatures {
    pub fn new(features: Vec<PointFeature>) -> Self {
        Self { features }
    }
}

impl PointFeatureSource for InMemoryFeatures {
    fn load(&self) -> Result<Vec<PointFeature>> {
        Ok(self.features.clone())
    }
}

/// Columns every feature file carries, in `PointFeature` field order
const FEATURE_COLUMNS: [&str; 9] = [
    columns::FEATURE_KEY,
    columns::LAT,
    columns::LONG,
    columns::BALNEARY,
    columns::REFERENCE,
    columns::LOCATION,
    columns::FRESH_WATER,
    columns::DRENAGE_BEACH,
    columns::DRENAGE_POINT,
];

const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Feature file on disk, read according to its extension
#[derive(Debug, Clone)]
pub enum FeatureFile {
    Spreadsheet(SpreadsheetFeatureFile),
    Csv(CsvFeatureFile),
}

impl FeatureFile {
    /// Workbook extensions select the spreadsheet reader, anything else is
    /// read as delimited text with `delimiter`
    pub fn open(path: impl Into<PathBuf>, delimiter: u8) -> Self {
        let path = path.into();
        if is_spreadsheet(&path) {
            Self::Spreadsheet(SpreadsheetFeatureFile::new(path))
        } else {
            Self::Csv(CsvFeatureFile::new(path, delimiter))
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Spreadsheet(file) => file.path(),
            Self::Csv(file) => file.path(),
        }
    }
}

impl PointFeatureSource for FeatureFile {
    fn load(&self) -> Result<Vec<PointFeature>> {
        match self {
            Self::Spreadsheet(file) => file.load(),
            Self::Csv(file) => file.load(),
        }
    }
}

fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// The curated feature workbook; only the first worksheet is read
///
/// The first row holds the column names, the same ones the delimited export
/// uses. Extra columns are ignored.
#[derive(Debug, Clone)]
pub struct SpreadsheetFeatureFile {
    path: PathBuf,
}

impl SpreadsheetFeatureFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Type the rows of an already opened worksheet
    pub fn read_range(&self, range: &Range<Data>) -> Result<Vec<PointFeature>> {
        let mut rows = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
        let header = rows
            .next()
            .ok_or_else(|| feature_error(&self.path, "worksheet is empty"))?;
        type_rows(&self.path, &header, rows)
    }
}

impl PointFeatureSource for SpreadsheetFeatureFile {
    fn load(&self) -> Result<Vec<PointFeature>> {
        if !self.path.exists() {
            return Err(feature_error(&self.path, "file not found"));
        }

        let mut workbook = open_workbook_auto(&self.path)
            .map_err(|e| feature_error(&self.path, e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| feature_error(&self.path, "workbook has no worksheets"))?
            .map_err(|e| feature_error(&self.path, e.to_string()))?;

        let features = self.read_range(&range)?;
        debug!(
            "Loaded {} point features from {}",
            features.len(),
            self.path.display()
        );
        Ok(features)
    }
}

/// Cells are typed per row like the delimited export, so go through text
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        _ => String::new(),
    }
}

/// Delimited export of the curated feature spreadsheet
///
/// Expected header: `point, lat, long, balneary, reference, location,
/// fresh_water, drenage_beach, drenage_point`. Extra columns are ignored.
#[derive(Debug, Clone)]
pub struct CsvFeatureFile {
    path: PathBuf,
    delimiter: u8,
}

impl CsvFeatureFile {
    pub fn new(path: impl Into<PathBuf>, delimiter: u8) -> Self {
        Self {
            path: path.into(),
            delimiter,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every column as text; typing happens per row with clear errors
    fn read_frame(&self) -> Result<DataFrame> {
        if !self.path.exists() {
            return Err(feature_error(&self.path, "file not found"));
        }

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .with_parse_options(CsvParseOptions::default().with_separator(self.delimiter))
            .try_into_reader_with_file_path(Some(self.path.clone()))?
            .finish()?;
        Ok(df)
    }
}

impl PointFeatureSource for CsvFeatureFile {
    fn load(&self) -> Result<Vec<PointFeature>> {
        let df = self.read_frame()?;

        let header: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();
        let values = df
            .get_columns()
            .iter()
            .map(|column| -> Result<Vec<Option<&str>>> {
                Ok(column.str()?.into_iter().collect())
            })
            .collect::<Result<Vec<_>>>()?;
        let rows = (0..df.height()).map(|row| {
            values
                .iter()
                .map(|column| column[row].unwrap_or("").to_string())
                .collect::<Vec<_>>()
        });

        let features = type_rows(&self.path, &header, rows)?;
        debug!(
            "Loaded {} point features from {}",
            features.len(),
            self.path.display()
        );
        Ok(features)
    }
}

fn feature_error(path: &Path, reason: impl Into<String>) -> BalneabilityError {
    BalneabilityError::FeatureFile {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Type every non-blank row; line numbers count the header as line 1
fn type_rows(
    path: &Path,
    header: &[String],
    rows: impl Iterator<Item = Vec<String>>,
) -> Result<Vec<PointFeature>> {
    let mut indices = [0; FEATURE_COLUMNS.len()];
    for (slot, name) in indices.iter_mut().zip(FEATURE_COLUMNS) {
        *slot = header
            .iter()
            .position(|column| column.trim() == name)
            .ok_or_else(|| feature_error(path, format!("missing column '{name}'")))?;
    }

    let mut features = Vec::new();
    for (row, cells) in rows.enumerate() {
        if cells.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        features.push(type_row(path, row + 2, &indices, &cells)?);
    }
    Ok(features)
}

fn type_row(
    path: &Path,
    line: usize,
    indices: &[usize; FEATURE_COLUMNS.len()],
    cells: &[String],
) -> Result<PointFeature> {
    let cell = |slot: usize| cells.get(indices[slot]).map_or("", |value| value.trim());
    let invalid = |slot: usize| {
        let (name, raw) = (FEATURE_COLUMNS[slot], cell(slot));
        feature_error(path, format!("line {line}: invalid {name} '{raw}'"))
    };
    let number = |slot: usize| {
        cell(slot)
            .replace(',', ".")
            .parse::<f64>()
            .map_err(|_| invalid(slot))
    };
    let flag = |slot: usize| parse_flag(cell(slot)).ok_or_else(|| invalid(slot));

    let point_id = cell(0)
        .parse::<f64>()
        .ok()
        .filter(|value| value.fract() == 0.0)
        .map(|value| value as i64)
        .ok_or_else(|| invalid(0))?;

    Ok(PointFeature {
        point_id,
        lat: number(1)?,
        long: number(2)?,
        balneary: cell(3).to_string(),
        reference: cell(4).to_string(),
        location: cell(5).to_string(),
        fresh_water: flag(6)?,
        drenage_beach: flag(7)?,
        drenage_point: flag(8)?,
    })
}

/// Spreadsheet booleans as exported by hand-maintained sheets
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "sim" | "verdadeiro" => Some(true),
        "false" | "0" | "no" | "não" | "nao" | "falso" => Some(false),
        _ => None,
    }
}
