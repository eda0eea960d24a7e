use sheetviz::downloader::{self, DownloadFormat};
use sheetviz::field::{FieldType, FieldValue};
use sheetviz::import::{self, ImportError};
use sheetviz::loader::MAX_IMPORT_BYTES;
use std::fs;

#[test]
fn csv_import_infers_and_normalizes() {
    let csv = "Name,Age,Active\nAlice,30,true\n";
    let preview = import::import_bytes("people.csv", csv.as_bytes()).unwrap();

    let types: Vec<FieldType> = preview.fields.iter().map(|f| f.field_type).collect();
    assert_eq!(
        types,
        vec![FieldType::Text, FieldType::Number, FieldType::Boolean]
    );
    assert_eq!(preview.rows.len(), 1);

    let row = &preview.rows[0];
    assert_eq!(row.get("Name"), Some(&FieldValue::Text("Alice".to_string())));
    assert_eq!(row.get("Age"), Some(&FieldValue::Number(30.0)));
    assert_eq!(row.get("Active"), Some(&FieldValue::Boolean(true)));
}

#[test]
fn blank_data_row_is_dropped() {
    let csv = "Name,Age,Active\nAnn,30,Yes\n,,\n";
    let preview = import::import_bytes("people.csv", csv.as_bytes()).unwrap();

    assert_eq!(preview.rows.len(), 1);
    assert_eq!(preview.skipped_rows, 1);
    assert_eq!(preview.fields[1].field_type, FieldType::Number);
    assert_eq!(preview.fields[2].field_type, FieldType::Boolean);
    assert_eq!(preview.rows[0].get("Age"), Some(&FieldValue::Number(30.0)));
    assert_eq!(preview.rows[0].get("Active"), Some(&FieldValue::Boolean(true)));
}

#[test]
fn header_only_file_is_rejected() {
    let result = import::import_bytes("empty.csv", b"Name,Age\n");
    assert!(matches!(result, Err(ImportError::InsufficientRows)));
}

#[test]
fn unsupported_extension_is_rejected() {
    let result = import::import_bytes("notes.txt", b"Name\nAlice\n");
    assert!(matches!(result, Err(ImportError::InvalidFileType(ext)) if ext == "txt"));
}

#[test]
fn oversized_upload_is_rejected_before_parsing() {
    let bytes = vec![b'a'; MAX_IMPORT_BYTES as usize + 1];
    let result = import::import_bytes("big.csv", &bytes);
    assert!(matches!(result, Err(ImportError::FileTooLarge { .. })));
}

#[test]
fn blank_rows_are_skipped_and_short_rows_padded() {
    let csv = "Name,Score\nAlice,10\n,\nBob\n";
    let preview = import::import_bytes("scores.csv", csv.as_bytes()).unwrap();

    assert_eq!(preview.rows.len(), 2);
    assert_eq!(preview.skipped_rows, 1);
    assert_eq!(preview.rows[1].get("Score"), Some(&FieldValue::Number(0.0)));
}

#[test]
fn later_values_are_coerced_to_the_first_sample_type() {
    let csv = "Amount\n12\nn/a\n7.5\n";
    let preview = import::import_bytes("amounts.csv", csv.as_bytes()).unwrap();

    assert_eq!(preview.fields[0].field_type, FieldType::Number);
    let values: Vec<f64> = preview
        .rows
        .iter()
        .map(|row| row.get("Amount").map(|v| v.as_number()).unwrap_or(-1.0))
        .collect();
    assert_eq!(values, vec![12.0, 0.0, 7.5]);
}

#[test]
fn blank_headers_get_column_names() {
    let csv = ",id\n1,2\n";
    let preview = import::import_bytes("unnamed.csv", csv.as_bytes()).unwrap();
    let names: Vec<&str> = preview.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Column 1", "Column 2"]);
}

#[test]
fn repeated_headers_keep_every_column() {
    let preview = import::import_bytes("scores.csv", b"Score,Score\n1,2\n").unwrap();

    let names: Vec<&str> = preview.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Score", "Score (2)"]);
    assert_eq!(preview.rows[0].get("Score"), Some(&FieldValue::Number(1.0)));
    assert_eq!(preview.rows[0].get("Score (2)"), Some(&FieldValue::Number(2.0)));
}

#[test]
fn csv_template_imports_cleanly() {
    let bytes = downloader::template(DownloadFormat::Csv).unwrap();
    let preview = import::import_bytes("import_template.csv", &bytes).unwrap();

    let types: Vec<FieldType> = preview.fields.iter().map(|f| f.field_type).collect();
    assert_eq!(
        types,
        vec![
            FieldType::Text,
            FieldType::Number,
            FieldType::Email,
            FieldType::Number,
            FieldType::Boolean
        ]
    );
    assert_eq!(preview.rows.len(), 3);
}

#[test]
fn import_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dates.csv");
    fs::write(&path, "When,Label\n2024-01-15,launch\n").unwrap();

    let preview = import::import_file(&path).unwrap();
    assert_eq!(preview.source, "dates.csv");
    assert_eq!(preview.fields[0].field_type, FieldType::Date);
    assert_eq!(
        preview.rows[0].get("When").map(|v| v.to_string()),
        Some("2024-01-15".to_string())
    );
}

#[cfg(feature = "xlsx")]
#[test]
fn xlsx_template_imports_cleanly() {
    let bytes = downloader::template(DownloadFormat::Xlsx).unwrap();
    let preview = import::import_bytes("import_template.xlsx", &bytes).unwrap();

    assert_eq!(preview.fields.len(), 5);
    assert_eq!(preview.fields[1].field_type, FieldType::Number);
    assert_eq!(preview.fields[4].field_type, FieldType::Boolean);
    assert_eq!(preview.rows[0].get("Age"), Some(&FieldValue::Number(30.0)));
    assert_eq!(preview.rows[1].get("Active"), Some(&FieldValue::Boolean(false)));
}

#[cfg(feature = "xlsx")]
#[test]
fn corrupt_workbook_is_a_parse_failure() {
    let result = import::import_bytes("broken.xlsx", b"definitely not a zip archive");
    assert!(matches!(result, Err(ImportError::ParseFailure(_))));
}
