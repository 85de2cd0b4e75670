pub mod errors;

pub use errors::{
    BipoError, BipoErrorCategory, BipoResult, PipelineResult, SelectionResult,
};

use crate::numerics::{cylindrical_radius, distance3};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn radius(&self) -> f64 {
        cylindrical_radius(self.x, self.y)
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        distance3(self.as_array(), other.as_array())
    }

    pub const fn as_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// One reconstructed detector hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Visible energy in MeV-equivalent charge units.
    pub energy: f64,
    pub position: Position,
    /// Reconstruction time in nanoseconds.
    pub timestamp_ns: i64,
}

impl Event {
    pub const fn new(energy: f64, position: Position, timestamp_ns: i64) -> Self {
        Self {
            energy,
            position,
            timestamp_ns,
        }
    }
}

/// Events read from a single data file together with that file's live time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventBatch {
    pub events: Vec<Event>,
    pub live_time_seconds: f64,
}

impl EventBatch {
    pub fn new(events: Vec<Event>, live_time_seconds: f64) -> Self {
        Self {
            events,
            live_time_seconds,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RangeError {
    #[error("{label} range [{min}, {max}] has min > max")]
    Inverted {
        label: &'static str,
        min: String,
        max: String,
    },
    #[error("{label} range bounds must be finite numbers")]
    NotFinite { label: &'static str },
    #[error("{label} must be non-negative, got {value}")]
    Negative { label: &'static str, value: f64 },
}

impl From<RangeError> for BipoError {
    fn from(error: RangeError) -> Self {
        BipoError::input_validation("INPUT.INVALID_RANGE", error.to_string())
    }
}

/// Inclusive `[min, max]` interval over real values. Serialized as a
/// two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    pub fn validate(&self, label: &'static str) -> Result<(), RangeError> {
        if self.min.is_nan() || self.max.is_nan() {
            return Err(RangeError::NotFinite { label });
        }
        if self.min > self.max {
            return Err(RangeError::Inverted {
                label,
                min: self.min.to_string(),
                max: self.max.to_string(),
            });
        }
        Ok(())
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

impl From<[f64; 2]> for Range {
    fn from(bounds: [f64; 2]) -> Self {
        Self::new(bounds[0], bounds[1])
    }
}

impl From<Range> for [f64; 2] {
    fn from(range: Range) -> Self {
        [range.min, range.max]
    }
}

impl Display for Range {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Inclusive coincidence time window in nanoseconds. Bounds are signed so
/// that windows reaching into negative `dt` stay expressible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i64; 2]", into = "[i64; 2]")]
pub struct TimeWindow {
    pub min_ns: i64,
    pub max_ns: i64,
}

impl TimeWindow {
    pub const fn new(min_ns: i64, max_ns: i64) -> Self {
        Self { min_ns, max_ns }
    }

    pub fn contains(&self, dt_ns: i64) -> bool {
        self.min_ns <= dt_ns && dt_ns <= self.max_ns
    }

    pub fn validate(&self, label: &'static str) -> Result<(), RangeError> {
        if self.min_ns > self.max_ns {
            return Err(RangeError::Inverted {
                label,
                min: self.min_ns.to_string(),
                max: self.max_ns.to_string(),
            });
        }
        Ok(())
    }
}

impl From<[i64; 2]> for TimeWindow {
    fn from(bounds: [i64; 2]) -> Self {
        Self::new(bounds[0], bounds[1])
    }
}

impl From<TimeWindow> for [i64; 2] {
    fn from(window: TimeWindow) -> Self {
        [window.min_ns, window.max_ns]
    }
}

impl Display for TimeWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} ns, {} ns]", self.min_ns, self.max_ns)
    }
}
