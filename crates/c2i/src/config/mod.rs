use std::collections::HashMap;
use std::env;
use std::fmt;

use thiserror::Error;

const INFLUXDB_PREFIX: &str = "INFLUXDB_";
const APP_PORT: &str = "APP_PORT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteEncoding {
    Gzip,
    None,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("APP_PORT is required but not set")]
    PortMissing,

    #[error("{0} has invalid value: {1}")]
    InvalidNumeric(String, String),

    #[error("INFLUXDB_WRITE_ENCODING has invalid value: {0} (expected \"gzip\" or \"none\")")]
    InvalidEncoding(String),
}

/// Connection parameters for the InfluxDB backend.
///
/// Address and database are checked when a request builds its client and
/// batch, not at startup.
#[derive(Clone, PartialEq)]
pub struct InfluxSettings {
    pub url: String,
    pub username: String,
    pub password: String,
    pub database: String,
    pub write_encoding: WriteEncoding,
}

impl fmt::Debug for InfluxSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfluxSettings")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("write_encoding", &self.write_encoding)
            .finish()
    }
}

#[derive(Debug)]
pub struct Config {
    pub influx: InfluxSettings,
    /// HTTP listen port; only the server needs it.
    pub app_port: Option<u16>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = env::vars()
            .filter(|(k, _)| k.starts_with(INFLUXDB_PREFIX) || k == APP_PORT)
            .collect();
        Self::parse(&vars)
    }

    fn parse(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let influx = InfluxSettings {
            url: string_var(vars, "INFLUXDB_URL"),
            username: string_var(vars, "INFLUXDB_USERNAME"),
            password: string_var(vars, "INFLUXDB_PASSWORD"),
            database: string_var(vars, "INFLUXDB_DB_DATA"),
            write_encoding: parse_encoding(vars)?,
        };
        let app_port = parse_port(vars, APP_PORT)?;

        Ok(Self { influx, app_port })
    }

    /// The listen port, for entry points that serve HTTP.
    pub fn require_port(&self) -> Result<u16, ConfigError> {
        self.app_port.ok_or(ConfigError::PortMissing)
    }
}

fn string_var(vars: &HashMap<String, String>, name: &str) -> String {
    vars.get(name).cloned().unwrap_or_default()
}

fn parse_port(vars: &HashMap<String, String>, name: &str) -> Result<Option<u16>, ConfigError> {
    match vars.get(name).filter(|s| !s.is_empty()) {
        Some(val) => val
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumeric(name.to_owned(), val.clone())),
        None => Ok(None),
    }
}

fn parse_encoding(vars: &HashMap<String, String>) -> Result<WriteEncoding, ConfigError> {
    match vars.get("INFLUXDB_WRITE_ENCODING").map(|s| s.as_str()) {
        Some("none") | Some("") | None => Ok(WriteEncoding::None),
        Some("gzip") => Ok(WriteEncoding::Gzip),
        Some(other) => Err(ConfigError::InvalidEncoding(other.to_owned())),
    }
}
