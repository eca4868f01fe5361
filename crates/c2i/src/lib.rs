//! Maps JSON performance-test reports onto three InfluxDB measurements
//! (`test_timing`, `test_byte`, `test_counter`) and writes them in one batch.
//!
//! The HTTP server and the Lambda function share everything in this crate;
//! they differ only in the [`TimestampPolicy`] they hand to the [`Ingestor`].

pub mod config;
pub mod influx;
pub mod logging;
pub mod measurements;
pub mod pipeline;
pub mod report;
pub mod timestamp;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{Config, ConfigError, InfluxSettings, WriteEncoding};
pub use influx::InfluxConnector;
pub use measurements::Measurements;
pub use pipeline::{Connector, IngestError, Ingestor, PointWriter};
pub use report::Report;
pub use timestamp::{Timestamp, TimestampError, TimestampPolicy};
