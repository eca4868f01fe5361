use std::future::Future;

use thiserror::Error;
use tracing::debug;

use crate::influx::{BatchConfig, BatchError, BatchPoints, ClientError, Point, PointError, WriteError};
use crate::measurements::Measurements;
use crate::report::Report;
use crate::timestamp::{TimestampError, TimestampPolicy};

/// Opens a write client for one request and describes the batch it expects.
pub trait Connector: Send + Sync {
    type Writer: PointWriter;

    fn connect(&self) -> Result<Self::Writer, ClientError>;
    fn batch_config(&self) -> BatchConfig;
}

pub trait PointWriter: Send + Sync {
    fn write(&self, batch: &BatchPoints) -> impl Future<Output = Result<(), WriteError>> + Send;
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("no name was provided in the HTTP body")]
    EmptyBody,

    #[error("JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("timestamp error: {0}")]
    Timestamp(#[from] TimestampError),

    #[error("InfluxDB connection error: {0}")]
    Connect(#[from] ClientError),

    #[error("InfluxDB batch error: {0}")]
    Batch(#[from] BatchError),

    #[error("InfluxDB point error: {0}")]
    Point(#[from] PointError),

    #[error("InfluxDB write error: {0}")]
    Write(#[from] WriteError),
}

impl IngestError {
    /// Stable category name, reported as the Lambda `errorType`.
    pub fn error_type(&self) -> &'static str {
        match self {
            IngestError::EmptyBody | IngestError::Decode(_) => "Ingest.InputInvalid",
            IngestError::Timestamp(_) => "Ingest.TimestampInvalid",
            IngestError::Connect(_) => "Ingest.BackendConnection",
            IngestError::Batch(_) => "Ingest.BackendBatch",
            IngestError::Point(_) => "Ingest.PointInvalid",
            IngestError::Write(_) => "Ingest.BackendWrite",
        }
    }
}

/// Report-to-backend pipeline shared by both entry points.
pub struct Ingestor<C> {
    connector: C,
    policy: TimestampPolicy,
}

impl<C: Connector> Ingestor<C> {
    pub fn new(connector: C, policy: TimestampPolicy) -> Self {
        Self { connector, policy }
    }

    pub fn policy(&self) -> TimestampPolicy {
        self.policy
    }

    /// Parse `body`, map it, and write the three points in one batch.
    pub async fn ingest(&self, body: &[u8]) -> Result<(), IngestError> {
        let report = Report::parse(body)?;
        let measurements = Measurements::build(&report, self.policy)?;
        self.write(&measurements).await
    }

    /// Build the batch and submit it. Any failure aborts before the write.
    pub async fn write(&self, measurements: &Measurements) -> Result<(), IngestError> {
        let client = self.connector.connect()?;
        let mut batch = BatchPoints::new(self.connector.batch_config())?;

        for (name, fields) in measurements.iter() {
            let point = Point::new(
                name,
                measurements.tags.clone(),
                fields.clone(),
                measurements.time,
            )?;
            debug!(measurement = name, %point, "InfluxDB batch point");
            batch.add_point(point);
        }

        client.write(&batch).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
