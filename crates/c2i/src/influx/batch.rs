use thiserror::Error;

use super::{Point, Precision};

#[derive(Debug, Error, PartialEq)]
pub enum BatchError {
    #[error("database name is required")]
    DatabaseMissing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    pub database: String,
    pub precision: Precision,
}

/// Points submitted together in one `/write` call.
#[derive(Debug)]
pub struct BatchPoints {
    database: String,
    precision: Precision,
    points: Vec<Point>,
}

impl BatchPoints {
    pub fn new(config: BatchConfig) -> Result<Self, BatchError> {
        if config.database.is_empty() {
            return Err(BatchError::DatabaseMissing);
        }
        Ok(Self {
            database: config.database,
            precision: config.precision,
            points: Vec::new(),
        })
    }

    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Request body for `/write`: one line per point in insertion order.
    pub fn line_protocol(&self) -> String {
        self.points
            .iter()
            .map(|p| p.line(self.precision))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
