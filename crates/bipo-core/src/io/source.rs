//! Record retrieval interface for reconstructed-event files.
//!
//! The detector's own columnar format is read elsewhere; this crate consumes
//! the same named columns through [`RecordColumns`], with a JSON document of
//! named arrays as the concrete on-disk form.

use crate::domain::{BipoError, BipoResult, Event, EventBatch, Position};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const ENERGY_COLUMN: &str = "Evis";
pub const X_COLUMN: &str = "recX";
pub const Y_COLUMN: &str = "recY";
pub const Z_COLUMN: &str = "recZ";
pub const TIME_COLUMN: &str = "rec_time";
pub const LIVE_TIME_COLUMN: &str = "File_time";

/// Named-column access to one data file.
pub trait RecordColumns {
    fn f64_column(&self, name: &str) -> BipoResult<Vec<f64>>;
    fn i64_column(&self, name: &str) -> BipoResult<Vec<i64>>;
}

/// Produces the event batch stored at `path`.
pub trait EventSource {
    fn read_batch(&self, path: &Path) -> BipoResult<EventBatch>;
}

/// Assembles events from the standard columns. The live time is the largest
/// `File_time` entry; a file without events has zero live time.
pub fn batch_from_columns(columns: &impl RecordColumns) -> BipoResult<EventBatch> {
    let energy = columns.f64_column(ENERGY_COLUMN)?;
    let x = columns.f64_column(X_COLUMN)?;
    let y = columns.f64_column(Y_COLUMN)?;
    let z = columns.f64_column(Z_COLUMN)?;
    let time = columns.i64_column(TIME_COLUMN)?;
    let live_time = columns.f64_column(LIVE_TIME_COLUMN)?;

    let expected = energy.len();
    for (name, len) in [
        (X_COLUMN, x.len()),
        (Y_COLUMN, y.len()),
        (Z_COLUMN, z.len()),
        (TIME_COLUMN, time.len()),
        (LIVE_TIME_COLUMN, live_time.len()),
    ] {
        if len != expected {
            return Err(BipoError::input_validation(
                "INPUT.EVENT_COLUMNS",
                format!(
                    "column '{}' has {} entries but '{}' has {}",
                    name, len, ENERGY_COLUMN, expected
                ),
            ));
        }
    }

    let events = (0..expected)
        .map(|index| {
            Event::new(
                energy[index],
                Position::new(x[index], y[index], z[index]),
                time[index],
            )
        })
        .collect();
    let live_time_seconds = live_time.iter().copied().fold(0.0_f64, f64::max);

    Ok(EventBatch::new(events, live_time_seconds))
}

/// One JSON document of the form `{"Evis": [...], "recX": [...], ...}`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JsonColumns {
    origin: String,
    columns: Map<String, Value>,
}

impl JsonColumns {
    pub fn from_json_str(origin: impl Into<String>, source: &str) -> BipoResult<Self> {
        let origin = origin.into();
        let value: Value = serde_json::from_str(source).map_err(|error| {
            BipoError::input_validation(
                "INPUT.EVENT_FILE_PARSE",
                format!("failed to parse '{}': {}", origin, error),
            )
        })?;
        match value {
            Value::Object(columns) => Ok(Self { origin, columns }),
            _ => Err(BipoError::input_validation(
                "INPUT.EVENT_FILE_PARSE",
                format!("'{}' must hold a JSON object of named columns", origin),
            )),
        }
    }

    pub fn read(path: &Path) -> BipoResult<Self> {
        let source = fs::read_to_string(path).map_err(|error| {
            BipoError::io_system(
                "IO.EVENT_SOURCE",
                format!("failed to read event file '{}': {}", path.display(), error),
            )
        })?;
        Self::from_json_str(path.display().to_string(), &source)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    fn array(&self, name: &str) -> BipoResult<&Vec<Value>> {
        match self.columns.get(name) {
            Some(Value::Array(values)) => Ok(values),
            Some(_) => Err(self.column_error(name, "is not an array")),
            None => Err(self.column_error(name, "is missing")),
        }
    }

    fn column_error(&self, name: &str, detail: impl AsRef<str>) -> BipoError {
        BipoError::input_validation(
            "INPUT.EVENT_COLUMNS",
            format!("column '{}' in '{}' {}", name, self.origin, detail.as_ref()),
        )
    }
}

impl RecordColumns for JsonColumns {
    fn f64_column(&self, name: &str) -> BipoResult<Vec<f64>> {
        self.array(name)?
            .iter()
            .enumerate()
            .map(|(row, value)| {
                value.as_f64().ok_or_else(|| {
                    self.column_error(name, format!("has a non-numeric entry at row {}", row))
                })
            })
            .collect()
    }

    fn i64_column(&self, name: &str) -> BipoResult<Vec<i64>> {
        self.array(name)?
            .iter()
            .enumerate()
            .map(|(row, value)| {
                integral_value(value).ok_or_else(|| {
                    self.column_error(name, format!("has a non-integer entry at row {}", row))
                })
            })
            .collect()
    }
}

/// Integer columns written by float-only tools arrive as integral floats.
fn integral_value(value: &Value) -> Option<i64> {
    if let Some(integer) = value.as_i64() {
        return Some(integer);
    }
    let float = value.as_f64()?;
    let in_range = float >= i64::MIN as f64 && float < i64::MAX as f64;
    (float.is_finite() && float.fract() == 0.0 && in_range).then_some(float as i64)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonColumnSource;

impl EventSource for JsonColumnSource {
    fn read_batch(&self, path: &Path) -> BipoResult<EventBatch> {
        batch_from_columns(&JsonColumns::read(path)?)
    }
}

/// The standard columns of `batch`, repeating the live time on every row the
/// way processed detector files do.
pub fn event_columns(batch: &EventBatch) -> BTreeMap<&'static str, Value> {
    let events = &batch.events;
    BTreeMap::from([
        (
            ENERGY_COLUMN,
            events.iter().map(|event| Value::from(event.energy)).collect(),
        ),
        (
            X_COLUMN,
            events.iter().map(|event| Value::from(event.position.x)).collect(),
        ),
        (
            Y_COLUMN,
            events.iter().map(|event| Value::from(event.position.y)).collect(),
        ),
        (
            Z_COLUMN,
            events.iter().map(|event| Value::from(event.position.z)).collect(),
        ),
        (
            TIME_COLUMN,
            events.iter().map(|event| Value::from(event.timestamp_ns)).collect(),
        ),
        (
            LIVE_TIME_COLUMN,
            events
                .iter()
                .map(|_| Value::from(batch.live_time_seconds))
                .collect(),
        ),
    ])
}

/// Writes a batch in the layout [`JsonColumnSource`] reads back.
pub fn write_json_columns(path: &Path, batch: &EventBatch) -> BipoResult<()> {
    write_columns(path, &event_columns(batch))
}

/// Writes named columns as one JSON object, creating parent directories.
pub fn write_columns(path: &Path, columns: &BTreeMap<&'static str, Value>) -> BipoResult<()> {
    let rendered = serde_json::to_string(columns).map_err(|error| {
        BipoError::internal(
            "SYS.EVENT_FILE_SERIALIZE",
            format!("failed to serialize event columns: {}", error),
        )
    })?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| {
            BipoError::io_system(
                "IO.EVENT_FILE_WRITE",
                format!("failed to create directory '{}': {}", parent.display(), error),
            )
        })?;
    }
    fs::write(path, rendered).map_err(|error| {
        BipoError::io_system(
            "IO.EVENT_FILE_WRITE",
            format!("failed to write event file '{}': {}", path.display(), error),
        )
    })
}
