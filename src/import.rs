use crate::field::{Field, ROW_ID_KEY, RawValue, Row};
use crate::inference::infer_column;
use crate::loader::{self, Grid};
use crate::normalize::normalize;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// Number of non-empty values collected per column before inference.
pub const SAMPLE_LIMIT: usize = 5;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unsupported file type `{0}`: upload an .xlsx, .xls or .csv file")]
    InvalidFileType(String),

    #[error("file is {size} bytes, the limit is {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("the sheet needs a header row and at least one data row")]
    InsufficientRows,

    #[error("failed to read file: {0}")]
    ReadFailure(#[from] std::io::Error),

    #[error("failed to parse spreadsheet: {0}")]
    ParseFailure(String),

    #[error("spreadsheet support for .{0} files is not available in this build")]
    LibraryLoadFailure(String),
}

/// Proposed schema and rows, shown to the user before they replace the
/// live dataset.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ImportPreview {
    pub source: String,
    pub fields: Vec<Field>,
    pub rows: Vec<Row>,
    /// Data rows dropped because every cell was empty.
    pub skipped_rows: usize,
}

/// Import a spreadsheet file from disk.
pub fn import_file(path: impl AsRef<Path>) -> Result<ImportPreview, ImportError> {
    let (file_name, grid) = loader::load_file(path)?;
    import_grid(&file_name, grid)
}

/// Import uploaded bytes; `file_name` decides the format.
pub fn import_bytes(file_name: &str, bytes: &[u8]) -> Result<ImportPreview, ImportError> {
    let grid = loader::read_grid(file_name, bytes)?;
    import_grid(file_name, grid)
}

/// Turn a parsed grid (first row = headers) into a preview.
pub fn import_grid(source: &str, grid: Grid) -> Result<ImportPreview, ImportError> {
    if grid.len() < 2 {
        return Err(ImportError::InsufficientRows);
    }

    info!(
        "Importing {}: {} data rows x {} columns",
        source,
        grid.len() - 1,
        grid[0].len()
    );

    let headers = &grid[0];
    let data = &grid[1..];

    let mut taken = HashSet::new();
    let fields: Vec<Field> = headers
        .iter()
        .enumerate()
        .map(|(col, header)| {
            let samples = column_samples(data, col);
            let field_type = infer_column(&samples);
            let name = unique_name(header_name(header, col), &mut taken);
            debug!("Column {} `{}` inferred as {}", col + 1, name, field_type);
            Field::create(&name, field_type, false)
        })
        .collect();

    let mut rows = Vec::with_capacity(data.len());
    let mut skipped_rows = 0;
    for cells in data {
        if cells.iter().all(RawValue::is_empty) {
            skipped_rows += 1;
            continue;
        }

        let values: BTreeMap<_, _> = fields
            .iter()
            .enumerate()
            .map(|(col, field)| {
                let raw = cells.get(col).unwrap_or(&RawValue::Empty);
                (field.name.clone(), normalize(raw, field.field_type))
            })
            .collect();
        rows.push(Row::create(values));
    }

    info!(
        "Import of {} produced {} fields and {} rows ({} blank rows dropped)",
        source,
        fields.len(),
        rows.len(),
        skipped_rows
    );

    Ok(ImportPreview {
        source: source.to_string(),
        fields,
        rows,
        skipped_rows,
    })
}

/// Up to [`SAMPLE_LIMIT`] non-empty values from column `col`, top to bottom.
pub fn column_samples(data: &[Vec<RawValue>], col: usize) -> Vec<RawValue> {
    data.iter()
        .filter_map(|row| row.get(col))
        .filter(|cell| !cell.is_empty())
        .take(SAMPLE_LIMIT)
        .cloned()
        .collect()
}

/// Trimmed header text, or `Column N` when the header is blank or would
/// clash with the row id key.
fn header_name(header: &RawValue, col: usize) -> String {
    let name = header.to_string().trim().to_string();
    if name.is_empty() || name == ROW_ID_KEY {
        format!("Column {}", col + 1)
    } else {
        name
    }
}

/// Suffix ` (2)`, ` (3)`, ... onto a name already used by an earlier column.
fn unique_name(name: String, taken: &mut HashSet<String>) -> String {
    let mut candidate = name.clone();
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = format!("{} ({})", name, n);
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}
