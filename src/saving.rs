use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};

use crate::dataset::Dataset;
use crate::field::{Field, Row};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotOut<'a> {
    version: u32,
    saved_at: String,
    fields: &'a [Field],
    rows: &'a [Row],
}

#[derive(Deserialize)]
struct SnapshotIn {
    version: u32,
    fields: Vec<Field>,
    rows: Vec<Row>,
}

/// Write a gzip-compressed JSON snapshot of the dataset.
pub fn write_snapshot<W: Write>(dataset: &Dataset, writer: W) -> std::io::Result<()> {
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut writer = BufWriter::new(encoder);

    let snapshot = SnapshotOut {
        version: SNAPSHOT_VERSION,
        saved_at: chrono::Utc::now().to_rfc3339(),
        fields: &dataset.fields,
        rows: &dataset.rows,
    };
    serde_json::to_writer(&mut writer, &snapshot)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    let encoder = writer.into_inner().map_err(|e| e.into_error())?;
    encoder.finish()?;
    Ok(())
}

/// Read a snapshot written by [`write_snapshot`].
pub fn read_snapshot<R: Read>(reader: R) -> std::io::Result<Dataset> {
    let decoder = GzDecoder::new(reader);
    let reader = BufReader::new(decoder);

    let snapshot: SnapshotIn = serde_json::from_reader(reader)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    if snapshot.version > SNAPSHOT_VERSION {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("unsupported snapshot version {}", snapshot.version),
        ));
    }

    Ok(Dataset::from_parts(snapshot.fields, snapshot.rows))
}

pub fn save_snapshot(dataset: &Dataset, filename: &str) -> std::io::Result<()> {
    let file = File::create(filename)?;
    write_snapshot(dataset, file)
}

pub fn load_snapshot(filename: &str) -> std::io::Result<Dataset> {
    let file = File::open(filename)?;
    read_snapshot(file)
}

pub fn snapshot_to_bytes(dataset: &Dataset) -> std::io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_snapshot(dataset, &mut buffer)?;
    Ok(buffer)
}

pub fn snapshot_from_bytes(bytes: &[u8]) -> std::io::Result<Dataset> {
    read_snapshot(bytes)
}
