use crate::field::RawValue;
use crate::import::ImportError;
use std::fs;
use std::path::Path;

/// Largest file accepted for import (10 MiB).
pub const MAX_IMPORT_BYTES: u64 = 10 * 1024 * 1024;

/// Lower-case extensions the importer accepts.
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "csv"];

/// A rectangular block of raw cells; the first row holds the headers.
pub type Grid = Vec<Vec<RawValue>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Xlsx,
    Xls,
}

impl SourceFormat {
    /// Detect the format from a file name's extension (case-insensitive).
    pub fn from_file_name(file_name: &str) -> Result<Self, ImportError> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(SourceFormat::Csv),
            Some("xlsx") => Ok(SourceFormat::Xlsx),
            Some("xls") => Ok(SourceFormat::Xls),
            Some(ext) => Err(ImportError::InvalidFileType(ext.to_string())),
            None => Err(ImportError::InvalidFileType(String::new())),
        }
    }
}

/// Check the extension allow-list and the size ceiling before any parsing.
pub fn validate_upload(file_name: &str, size: u64) -> Result<SourceFormat, ImportError> {
    let format = SourceFormat::from_file_name(file_name)?;
    if size > MAX_IMPORT_BYTES {
        return Err(ImportError::FileTooLarge {
            size,
            limit: MAX_IMPORT_BYTES,
        });
    }
    Ok(format)
}

/// Validate and parse uploaded bytes into a grid.
pub fn read_grid(file_name: &str, bytes: &[u8]) -> Result<Grid, ImportError> {
    let format = validate_upload(file_name, bytes.len() as u64)?;
    let grid = match format {
        SourceFormat::Csv => from_csv(bytes)?,
        SourceFormat::Xlsx | SourceFormat::Xls => from_excel(bytes, format)?,
    };
    Ok(rectangular(grid))
}

/// Read a file from disk and parse it into a grid.
///
/// The extension and size are checked against the file metadata before the
/// contents are read.
pub fn load_file(path: impl AsRef<Path>) -> Result<(String, Grid), ImportError> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();

    let metadata = fs::metadata(path)?;
    validate_upload(&file_name, metadata.len())?;

    let bytes = fs::read(path)?;
    let grid = read_grid(&file_name, &bytes)?;
    Ok((file_name, grid))
}

fn from_csv(bytes: &[u8]) -> Result<Grid, ImportError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        // Accept rows with varying column counts; the grid is padded later.
        .flexible(true)
        .from_reader(bytes);

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ImportError::ParseFailure(e.to_string()))?;
        let row = record
            .iter()
            .map(|cell| {
                if cell.is_empty() {
                    RawValue::Empty
                } else {
                    RawValue::Text(cell.to_string())
                }
            })
            .collect();
        grid.push(row);
    }
    Ok(grid)
}

#[cfg(feature = "xlsx")]
fn from_excel(bytes: &[u8], _format: SourceFormat) -> Result<Grid, ImportError> {
    use calamine::{Reader, open_workbook_auto_from_rs};
    use std::io::Cursor;

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ImportError::ParseFailure(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::ParseFailure("workbook has no sheets".to_string()))?
        .map_err(|e| ImportError::ParseFailure(e.to_string()))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(convert_cell).collect())
        .collect())
}

#[cfg(not(feature = "xlsx"))]
fn from_excel(_bytes: &[u8], format: SourceFormat) -> Result<Grid, ImportError> {
    let ext = match format {
        SourceFormat::Xls => "xls",
        _ => "xlsx",
    };
    Err(ImportError::LibraryLoadFailure(ext.to_string()))
}

#[cfg(feature = "xlsx")]
fn convert_cell(cell: &calamine::Data) -> RawValue {
    use calamine::Data;

    match cell {
        Data::Empty | Data::Error(_) => RawValue::Empty,
        Data::Bool(b) => RawValue::Bool(*b),
        Data::Int(i) => RawValue::Number(*i as f64),
        Data::Float(f) => RawValue::Number(*f),
        Data::String(s) => RawValue::Text(s.clone()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => RawValue::Text(datetime.format("%Y-%m-%d").to_string()),
            None => RawValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawValue::Text(s.clone()),
    }
}

/// Pad every row with empty cells up to the widest row.
fn rectangular(mut grid: Grid) -> Grid {
    let width = grid.iter().map(Vec::len).max().unwrap_or(0);
    for row in grid.iter_mut() {
        row.resize(width, RawValue::Empty);
    }
    grid
}
