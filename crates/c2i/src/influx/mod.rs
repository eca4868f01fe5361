//! Minimal InfluxDB 1.x write client: line-protocol points, batches, and an
//! HTTP client for the `/write` endpoint.

mod batch;
mod client;
mod point;

pub use batch::{BatchConfig, BatchError, BatchPoints};
pub use client::{ClientError, HttpClient, InfluxConnector, WriteError};
pub use point::{FieldValue, Fields, Point, PointError, Tags};

/// Timestamp precision of a batch, as sent in the `precision` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
}

impl Precision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Nanoseconds => "n",
            Precision::Microseconds => "u",
            Precision::Milliseconds => "ms",
            Precision::Seconds => "s",
            Precision::Minutes => "m",
            Precision::Hours => "h",
        }
    }
}
