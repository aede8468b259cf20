//! Readers for the labeled input table and the cleaned artifact.
//!
//! Raw input is either CSV with a header row or JSON Lines. Rows whose text
//! field is missing or not a string are kept with `text = None`; rows whose
//! label cannot be parsed make the whole load fail.
//!
//! The cleaned artifact is a CSV file with exactly the columns
//! `label,cleaned_text`.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use log::{debug, info};
use serde_json::Value;

use crate::config::DatasetConfig;
use crate::dataset::record::{CleanedRecord, Label, RawRecord};
use crate::error::{Result, SpamSieveError};

/// Load raw records, picking the format from the file extension
/// (`.jsonl` → JSON Lines, anything else → CSV). Plain JSON arrays are not
/// supported.
pub fn load_raw(path: &Path, config: &DatasetConfig) -> Result<Vec<RawRecord>> {
    ensure_exists(path)?;

    let records = match path.extension().and_then(|e| e.to_str()) {
        Some("jsonl") => load_raw_jsonl(path, config)?,
        _ => load_raw_csv(path, config)?,
    };

    info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Load raw records from a CSV file with a header row.
pub fn load_raw_csv(path: &Path, config: &DatasetConfig) -> Result<Vec<RawRecord>> {
    ensure_exists(path)?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);

    let text_idx = column(&config.text_column).ok_or_else(|| {
        SpamSieveError::dataset(format!(
            "missing text column {:?} in {}",
            config.text_column,
            path.display()
        ))
    })?;
    let (label_name, label_idx) = config
        .label_columns()
        .find_map(|name| column(name).map(|idx| (name.to_string(), idx)))
        .ok_or_else(|| {
            SpamSieveError::dataset(format!(
                "missing label column {:?} in {}",
                config.label_column,
                path.display()
            ))
        })?;
    debug!("Reading text from {:?}, labels from {label_name:?}", config.text_column);

    let mut records = Vec::new();
    for (row, result) in reader.byte_records().enumerate() {
        let record = result?;
        let label = record
            .get(label_idx)
            .ok_or_else(|| SpamSieveError::dataset(format!("row {}: missing label", row + 1)))
            .and_then(|cell| {
                std::str::from_utf8(cell).map_err(|_| {
                    SpamSieveError::dataset(format!("row {}: label is not valid UTF-8", row + 1))
                })
            })?
            .parse::<Label>()
            .map_err(|e| SpamSieveError::dataset(format!("row {}: {e}", row + 1)))?;

        let text = match record.get(text_idx) {
            Some(cell) => match std::str::from_utf8(cell) {
                Ok(text) => Some(text.to_string()),
                Err(_) => {
                    debug!("Row {} has non-UTF-8 text, treating it as empty", row + 1);
                    None
                }
            },
            None => {
                debug!("Row {} has no text field, treating it as empty", row + 1);
                None
            }
        };

        records.push(RawRecord { text, label });
    }

    Ok(records)
}

/// Load raw records from a JSON Lines file.
pub fn load_raw_jsonl(path: &Path, config: &DatasetConfig) -> Result<Vec<RawRecord>> {
    ensure_exists(path)?;

    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(&line)?;
        let label_value = config
            .label_columns()
            .find_map(|name| value.get(name))
            .ok_or_else(|| {
                SpamSieveError::dataset(format!("line {}: missing label", line_num + 1))
            })?;
        let label = label_from_json(label_value)
            .map_err(|e| SpamSieveError::dataset(format!("line {}: {e}", line_num + 1)))?;

        let text = match value.get(&config.text_column) {
            Some(Value::String(s)) => Some(s.clone()),
            other => {
                debug!(
                    "Line {} has non-textual text field {:?}, treating it as empty",
                    line_num + 1,
                    other
                );
                None
            }
        };

        records.push(RawRecord { text, label });
    }

    Ok(records)
}

fn label_from_json(value: &Value) -> Result<Label> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(|v| v.to_string())
            .ok_or_else(|| SpamSieveError::dataset("label is not a finite number"))?
            .parse(),
        Value::String(s) => s.parse(),
        Value::Bool(b) => Ok(if *b { Label::Spam } else { Label::Ham }),
        other => Err(SpamSieveError::dataset(format!(
            "unsupported label value {other}"
        ))),
    }
}

/// Write the cleaned table (`label,cleaned_text`), creating parent directories.
pub fn write_cleaned(path: &Path, records: &[CleanedRecord]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let mut writer = WriterBuilder::new().has_headers(true).from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!("Wrote {} cleaned records to {}", records.len(), path.display());
    Ok(())
}

/// Read the cleaned table written by [`write_cleaned`].
pub fn read_cleaned(path: &Path) -> Result<Vec<CleanedRecord>> {
    ensure_exists(path)?;

    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let records = reader
        .deserialize()
        .collect::<std::result::Result<Vec<CleanedRecord>, csv::Error>>()?;

    info!("Read {} cleaned records from {}", records.len(), path.display());
    Ok(records)
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(SpamSieveError::missing_input(format!(
            "{} not found",
            path.display()
        )))
    }
}
