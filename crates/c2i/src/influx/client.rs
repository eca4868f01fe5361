use std::io::Write;

use flate2::write::GzEncoder;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

use super::{BatchConfig, BatchPoints, Precision};
use crate::config::{InfluxSettings, WriteEncoding};
use crate::pipeline::{Connector, PointWriter};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid address {addr:?}: {reason}")]
    InvalidUrl { addr: String, reason: String },

    #[error("unsupported protocol scheme: {0}, your address must start with http:// or https://")]
    UnsupportedScheme(String),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server rejected write ({status}): {body}")]
    Rejected { status: StatusCode, body: String },

    #[error("gzip compression failed: {0}")]
    Compression(#[from] std::io::Error),
}

/// Per-request handle on one InfluxDB server.
#[derive(Debug)]
pub struct HttpClient {
    http: Client,
    write_url: Url,
    username: String,
    password: String,
    encoding: WriteEncoding,
}

impl HttpClient {
    /// Validate the server address and derive the `/write` endpoint from it.
    pub fn new(settings: &InfluxSettings, http: Client) -> Result<Self, ClientError> {
        let invalid = |reason: String| ClientError::InvalidUrl {
            addr: settings.url.clone(),
            reason,
        };

        let mut write_url = Url::parse(&settings.url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(write_url.scheme(), "http" | "https") {
            return Err(ClientError::UnsupportedScheme(write_url.scheme().to_owned()));
        }
        write_url
            .path_segments_mut()
            .map_err(|_| invalid("address cannot be a base URL".to_owned()))?
            .pop_if_empty()
            .push("write");

        Ok(Self {
            http,
            write_url,
            username: settings.username.clone(),
            password: settings.password.clone(),
            encoding: settings.write_encoding,
        })
    }

    pub fn write_url(&self) -> &Url {
        &self.write_url
    }
}

impl PointWriter for HttpClient {
    async fn write(&self, batch: &BatchPoints) -> Result<(), WriteError> {
        let mut url = self.write_url.clone();
        url.query_pairs_mut()
            .append_pair("db", batch.database())
            .append_pair("precision", batch.precision().as_str());

        let mut req = self
            .http
            .post(url)
            .header("content-type", "text/plain; charset=utf-8");

        let body = batch.line_protocol().into_bytes();
        let body = if self.encoding == WriteEncoding::Gzip {
            req = req.header("content-encoding", "gzip");
            compress_gzip(&body)?
        } else {
            body
        };

        if !self.username.is_empty() {
            req = req.basic_auth(&self.username, Some(&self.password));
        }

        let resp = req.body(body).send().await?;
        let status = resp.status();
        if status == StatusCode::NO_CONTENT || status == StatusCode::OK {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(WriteError::Rejected {
            status,
            body: body.trim_end().to_owned(),
        })
    }
}

/// Builds an [`HttpClient`] per request from the configured settings,
/// sharing one connection pool.
#[derive(Debug, Clone)]
pub struct InfluxConnector {
    http: Client,
    settings: InfluxSettings,
}

impl InfluxConnector {
    pub fn new(settings: InfluxSettings) -> Result<Self, ClientError> {
        let http = Client::builder()
            .user_agent(concat!("c2i/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, settings })
    }
}

impl Connector for InfluxConnector {
    type Writer = HttpClient;

    fn connect(&self) -> Result<HttpClient, ClientError> {
        HttpClient::new(&self.settings, self.http.clone())
    }

    fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            database: self.settings.database.clone(),
            precision: Precision::Seconds,
        }
    }
}

fn compress_gzip(data: &[u8]) -> Result<Vec<u8>, std::io::Error> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(data)?;
    encoder.finish()
}
