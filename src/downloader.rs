use crate::dataset::Dataset;
use crate::field::{FieldValue, RawValue};
use crate::loader::Grid;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::error::Error;

/// File name offered for the downloadable template, without extension.
pub const TEMPLATE_NAME: &str = "import_template";

/// Column headers of the sample template.
pub const TEMPLATE_HEADERS: [&str; 5] = ["Name", "Age", "Email", "Salary", "Active"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DownloadFormat {
    Csv,
    Xlsx,
}

impl DownloadFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DownloadFormat::Csv => "csv",
            DownloadFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            DownloadFormat::Csv => "text/csv",
            DownloadFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

/// The fixed sample dataset, header row first.
pub fn template_grid() -> Grid {
    let sample = [
        ("John Doe", 30.0, "john@example.com", 55000.0, true),
        ("Jane Smith", 25.0, "jane@example.com", 62000.0, false),
        ("Bob Johnson", 35.0, "bob@example.com", 48000.0, true),
    ];

    let mut grid: Grid = vec![TEMPLATE_HEADERS.iter().map(|h| RawValue::from(*h)).collect()];
    for (name, age, email, salary, active) in sample {
        grid.push(vec![
            RawValue::from(name),
            RawValue::Number(age),
            RawValue::from(email),
            RawValue::Number(salary),
            RawValue::Bool(active),
        ]);
    }
    grid
}

/// Render the template in the requested format.
pub fn template(format: DownloadFormat) -> Result<Vec<u8>, Box<dyn Error>> {
    let grid = template_grid();
    match format {
        DownloadFormat::Csv => grid_to_csv(&grid).map(String::into_bytes),
        DownloadFormat::Xlsx => grid_to_xlsx(&grid),
    }
}

/// Convert the dataset to CSV with field names as the header row.
pub fn dataset_to_csv(dataset: &Dataset) -> Result<String, Box<dyn Error>> {
    grid_to_csv(&dataset_grid(dataset))
}

/// Convert the dataset to an XLSX workbook with a single sheet.
pub fn dataset_to_xlsx(dataset: &Dataset) -> Result<Vec<u8>, Box<dyn Error>> {
    grid_to_xlsx(&dataset_grid(dataset))
}

fn dataset_grid(dataset: &Dataset) -> Grid {
    let mut grid: Grid = vec![
        dataset
            .fields
            .iter()
            .map(|f| RawValue::from(f.name.as_str()))
            .collect(),
    ];

    for row in &dataset.rows {
        grid.push(
            dataset
                .fields
                .iter()
                .map(|field| match row.value_for(field) {
                    FieldValue::Number(n) => RawValue::Number(n),
                    FieldValue::Boolean(b) => RawValue::Bool(b),
                    other => RawValue::Text(other.to_string()),
                })
                .collect(),
        );
    }
    grid
}

fn grid_to_csv(grid: &Grid) -> Result<String, Box<dyn Error>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in grid {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn grid_to_xlsx(grid: &Grid) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    let header_format = Format::new().set_bold();

    for (r, row) in grid.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let (r, c) = (r as u32, c as u16);
            if r == 0 {
                worksheet.write_string_with_format(r, c, &cell.to_string(), &header_format)?;
                continue;
            }
            match cell {
                RawValue::Empty => {}
                RawValue::Number(n) => {
                    worksheet.write_number(r, c, *n)?;
                }
                RawValue::Bool(b) => {
                    worksheet.write_boolean(r, c, *b)?;
                }
                RawValue::Text(s) => {
                    worksheet.write_string(r, c, s.as_str())?;
                }
            }
        }
    }

    workbook.push_worksheet(worksheet);
    let buffer = workbook.save_to_buffer()?;
    Ok(buffer)
}
