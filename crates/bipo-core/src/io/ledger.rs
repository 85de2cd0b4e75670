//! Append-only bookkeeping for batch runs: a CSV ledger of processed files and
//! a free-text error log.

use crate::domain::{BipoError, BipoResult};
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRow {
    pub filename: String,
    pub file_timestamp: String,
    pub concentration: f64,
    pub uncertainty: f64,
}

/// File names in the first column of the ledger. A missing ledger is empty.
pub fn load_processed(path: &Path) -> BipoResult<BTreeSet<String>> {
    if !path.exists() {
        return Ok(BTreeSet::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|error| ledger_read_error(path, error))?;

    let mut processed = BTreeSet::new();
    for record in reader.records() {
        let record = record.map_err(|error| ledger_read_error(path, error))?;
        if let Some(filename) = record.get(0).filter(|name| !name.is_empty()) {
            processed.insert(filename.to_string());
        }
    }
    Ok(processed)
}

pub fn append_summary(path: &Path, row: &LedgerRow) -> BipoResult<()> {
    let file = open_for_append(path, "IO.LEDGER_APPEND")?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    let concentration = row.concentration.to_string();
    let uncertainty = row.uncertainty.to_string();
    writer
        .write_record([
            row.filename.as_str(),
            row.file_timestamp.as_str(),
            concentration.as_str(),
            uncertainty.as_str(),
        ])
        .and_then(|()| writer.flush().map_err(csv::Error::from))
        .map_err(|error| {
            BipoError::io_system(
                "IO.LEDGER_APPEND",
                format!("failed to append to ledger '{}': {}", path.display(), error),
            )
        })
}

pub fn append_error(path: &Path, filename: &str, message: &str) -> BipoResult<()> {
    let mut file = open_for_append(path, "IO.ERROR_LOG_APPEND")?;
    write!(
        file,
        "Error processing file: {}\nError message: {}\n\n",
        filename, message
    )
    .map_err(|error| {
        BipoError::io_system(
            "IO.ERROR_LOG_APPEND",
            format!("failed to append to error log '{}': {}", path.display(), error),
        )
    })
}

fn open_for_append(path: &Path, placeholder: &'static str) -> BipoResult<fs::File> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|error| {
            BipoError::io_system(
                placeholder,
                format!("failed to create directory '{}': {}", parent.display(), error),
            )
        })?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|error| {
            BipoError::io_system(
                placeholder,
                format!("failed to open '{}' for append: {}", path.display(), error),
            )
        })
}

fn ledger_read_error(path: &Path, error: csv::Error) -> BipoError {
    BipoError::io_system(
        "IO.LEDGER_READ",
        format!("failed to read ledger '{}': {}", path.display(), error),
    )
}
