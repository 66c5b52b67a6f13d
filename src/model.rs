//! In-memory shapes of the data flowing through a run.
//!
//! Measurement fields are defined by the upstream API, not by this crate, so
//! records carry an ordered list of `(name, value)` pairs rather than a struct.

use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::fmt;

/// Column holding the station tag in the raw dataset.
pub const STATION_COLUMN: &str = "site";

/// Field carrying the observation timestamp in upstream records.
pub const TIMESTAMP_COLUMN: &str = "DateTime";

/// Column holding the calendar date in the daily aggregate.
pub const DATE_COLUMN: &str = "date";

/// Identifier of a monitoring station, e.g. `BX1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Station(String);

impl Station {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Station {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// A single cell of a measurement record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Missing,
}

impl FieldValue {
    /// Maps a JSON value onto a cell. Booleans, arrays and objects become text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Missing,
            Value::Number(n) => n
                .as_f64()
                .map(FieldValue::Number)
                .unwrap_or_else(|| FieldValue::Text(n.to_string())),
            Value::String(s) => FieldValue::Text(s.clone()),
            other => FieldValue::Text(other.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Renders the value as a CSV cell; missing values are empty.
    pub fn to_cell(&self) -> String {
        match self {
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Missing => String::new(),
        }
    }
}

/// One observation from one station.
///
/// The station tag is fixed at construction. A payload field that collides
/// with [`STATION_COLUMN`] is discarded in favour of the tag.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    station: Station,
    fields: Vec<(String, FieldValue)>,
}

impl MeasurementRecord {
    pub fn new(station: Station, fields: Vec<(String, FieldValue)>) -> Self {
        let fields = fields
            .into_iter()
            .filter(|(name, _)| name != STATION_COLUMN)
            .collect();
        Self { station, fields }
    }

    /// Builds a record from a JSON object, keeping the object's key order.
    pub fn from_json(station: Station, object: &Map<String, Value>) -> Self {
        let fields = object
            .iter()
            .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
            .collect();
        Self::new(station, fields)
    }

    pub fn station(&self) -> &Station {
        &self.station
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// All records collected in one run, in station discovery order.
///
/// Columns are the union of record fields in first-appearance order. No
/// de-duplication of records is performed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDataset {
    columns: Vec<String>,
    records: Vec<MeasurementRecord>,
}

impl RawDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends records, preserving their order.
    pub fn extend(&mut self, records: impl IntoIterator<Item = MeasurementRecord>) {
        for record in records {
            for (name, _) in record.fields() {
                if !self.columns.iter().any(|c| c == name) {
                    self.columns.push(name.to_string());
                }
            }
            self.records.push(record);
        }
    }

    pub fn records(&self) -> &[MeasurementRecord] {
        &self.records
    }

    /// Measurement columns, excluding the station tag.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Full CSV header: measurement columns followed by [`STATION_COLUMN`].
    pub fn header(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(STATION_COLUMN))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Means for one calendar date, aligned with [`DailyAggregate::columns`].
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub means: Vec<Option<f64>>,
}

/// Station-agnostic per-date means of every numeric column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyAggregate {
    pub columns: Vec<String>,
    pub rows: Vec<DailyRow>,
}

impl DailyAggregate {
    /// Mean of `column` on the row for `date`, if both exist and the group had values.
    pub fn mean(&self, date: NaiveDate, column: &str) -> Option<f64> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows
            .iter()
            .find(|r| r.date == date)
            .and_then(|r| r.means[idx])
    }
}
