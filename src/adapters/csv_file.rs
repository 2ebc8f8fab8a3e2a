use crate::domain::model::{RawRecord, RawRecordSet};
use crate::utils::error::{EtlError, Result};
use serde_json::{Map, Number, Value};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Reads a delimited file whose first row names the fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvFileSource;

impl CsvFileSource {
    pub fn new() -> Self {
        Self
    }

    pub fn read(&self, path: &Path, delimiter: u8) -> Result<RawRecordSet> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EtlError::SourceNotFound {
                path: path.display().to_string(),
            },
            _ => EtlError::IoError(e),
        })?;

        tracing::debug!("Reading CSV file: {}", path.display());
        parse_csv_records(&path.display().to_string(), file, delimiter)
    }
}

pub fn parse_csv_records<R: Read>(origin: &str, input: R, delimiter: u8) -> Result<RawRecordSet> {
    let malformed = |reason: String| EtlError::SourceMalformed {
        origin: origin.to_string(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| malformed(format!("invalid header row: {}", e)))?
        .clone();

    if headers.is_empty() {
        return Err(malformed("missing header row".to_string()));
    }

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(|e| malformed(e.to_string()))?;
        let mut data = Map::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            data.insert(header.to_string(), parse_cell(cell));
        }
        records.push(RawRecord::new(data));
    }

    Ok(records)
}

/// Types a raw cell the way a dataframe reader would.
fn parse_cell(cell: &str) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }

    if trimmed.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }

    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::from(int);
    }

    // NaN / inf 不當成數字
    if let Some(number) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(number);
    }

    Value::String(cell.to_string())
}
