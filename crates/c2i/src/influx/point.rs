use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::Precision;
use crate::timestamp::Timestamp;

/// Tag set, ordered by key as the line protocol expects.
pub type Tags = BTreeMap<String, String>;

/// Field set, ordered by key.
pub type Fields = BTreeMap<String, FieldValue>;

const MEASUREMENT_ESCAPES: &[char] = &[',', ' '];
const KEY_ESCAPES: &[char] = &[',', '=', ' '];
const STRING_ESCAPES: &[char] = &['"', '\\'];

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Str(String),
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_owned())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PointError {
    #[error("missing measurement name")]
    MissingMeasurement,

    #[error("point {0} has no fields")]
    NoFields(String),

    #[error("{value} is an unsupported value for field {field}")]
    NonFinite { field: String, value: f64 },

    #[error("invalid field name: time")]
    ReservedFieldName,
}

/// A single validated line-protocol point.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    measurement: String,
    tags: Tags,
    fields: Fields,
    time: Timestamp,
}

impl Point {
    pub fn new(
        measurement: &str,
        tags: Tags,
        fields: Fields,
        time: Timestamp,
    ) -> Result<Self, PointError> {
        if measurement.is_empty() {
            return Err(PointError::MissingMeasurement);
        }
        if fields.is_empty() {
            return Err(PointError::NoFields(measurement.to_owned()));
        }
        for (key, value) in &fields {
            if key == "time" {
                return Err(PointError::ReservedFieldName);
            }
            if let FieldValue::Float(v) = value
                && !v.is_finite()
            {
                return Err(PointError::NonFinite {
                    field: key.clone(),
                    value: *v,
                });
            }
        }

        Ok(Self {
            measurement: measurement.to_owned(),
            tags,
            fields,
            time,
        })
    }

    /// Encode as one line, with the timestamp expressed in `precision`.
    /// A zero timestamp is left off entirely.
    pub fn line(&self, precision: Precision) -> String {
        let mut out = String::new();
        push_escaped(&mut out, &self.measurement, MEASUREMENT_ESCAPES);

        for (key, value) in &self.tags {
            if key.is_empty() || value.is_empty() {
                continue;
            }
            out.push(',');
            push_escaped(&mut out, key, KEY_ESCAPES);
            out.push('=');
            push_escaped(&mut out, value, KEY_ESCAPES);
        }

        let mut sep = ' ';
        for (key, value) in &self.fields {
            out.push(sep);
            sep = ',';
            push_escaped(&mut out, key, KEY_ESCAPES);
            out.push('=');
            match value {
                FieldValue::Float(v) => {
                    let _ = write!(out, "{v}");
                }
                FieldValue::Str(s) => {
                    out.push('"');
                    push_escaped(&mut out, s, STRING_ESCAPES);
                    out.push('"');
                }
            }
        }

        if let Some(ts) = self.time.datetime().and_then(|dt| unix_in(dt, precision)) {
            let _ = write!(out, " {ts}");
        }
        out
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line(Precision::Nanoseconds))
    }
}

fn push_escaped(out: &mut String, raw: &str, escapes: &[char]) {
    for c in raw.chars() {
        if escapes.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}

fn unix_in(dt: DateTime<Utc>, precision: Precision) -> Option<i64> {
    match precision {
        Precision::Nanoseconds => dt.timestamp_nanos_opt(),
        Precision::Microseconds => Some(dt.timestamp_micros()),
        Precision::Milliseconds => Some(dt.timestamp_millis()),
        Precision::Seconds => Some(dt.timestamp()),
        Precision::Minutes => Some(dt.timestamp() / 60),
        Precision::Hours => Some(dt.timestamp() / 3600),
    }
}
