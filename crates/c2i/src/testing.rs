//! Backend doubles shared by this crate's tests and the entry-point crates.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use reqwest::StatusCode;

use crate::influx::{BatchConfig, BatchPoints, ClientError, Precision, WriteError};
use crate::pipeline::{Connector, PointWriter};

/// 2024-05-01 12:00:00 UTC, for `TimestampPolicy::ProcessingTime`.
pub fn fixed_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Failure {
    None,
    Connect,
    Write,
}

#[derive(Default)]
pub struct MockState {
    pub connects: AtomicU32,
    pub writes: Mutex<Vec<String>>,
}

/// Records every written batch as line protocol instead of sending it.
#[derive(Clone)]
pub struct MockConnector {
    pub state: Arc<MockState>,
    database: String,
    failure: Failure,
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockState::default()),
            database: "reports".into(),
            failure: Failure::None,
        }
    }

    /// `connect()` fails as an unusable server address would.
    pub fn failing_connect() -> Self {
        Self {
            failure: Failure::Connect,
            ..Self::new()
        }
    }

    /// `write()` fails as a server outage would.
    pub fn failing_write() -> Self {
        Self {
            failure: Failure::Write,
            ..Self::new()
        }
    }

    pub fn with_database(mut self, database: &str) -> Self {
        self.database = database.into();
        self
    }

    pub fn connects(&self) -> u32 {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn written(&self) -> Vec<String> {
        self.state.writes.lock().unwrap().clone()
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for MockConnector {
    type Writer = MockWriter;

    fn connect(&self) -> Result<MockWriter, ClientError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        if self.failure == Failure::Connect {
            return Err(ClientError::UnsupportedScheme("ftp".into()));
        }
        Ok(MockWriter {
            state: Arc::clone(&self.state),
            fail: self.failure == Failure::Write,
        })
    }

    fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            database: self.database.clone(),
            precision: Precision::Seconds,
        }
    }
}

pub struct MockWriter {
    state: Arc<MockState>,
    fail: bool,
}

impl PointWriter for MockWriter {
    async fn write(&self, batch: &BatchPoints) -> Result<(), WriteError> {
        if self.fail {
            return Err(WriteError::Rejected {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: "simulated outage".into(),
            });
        }
        self.state
            .writes
            .lock()
            .unwrap()
            .push(batch.line_protocol());
        Ok(())
    }
}
