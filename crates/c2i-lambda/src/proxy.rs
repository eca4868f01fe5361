#![allow(clippy::question_mark)] // nanoserde DeJson derive

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use c2i::{Connector, IngestError, Ingestor};
use nanoserde::{DeJson, SerJson};
use thiserror::Error;
use tracing::debug;

use crate::runtime_api::FunctionError;

/// API Gateway proxy event. Only the fields the handler reads are decoded.
#[derive(DeJson)]
pub struct ProxyRequest {
    #[nserde(rename = "httpMethod")]
    pub http_method: Option<String>,
    pub path: Option<String>,
    pub body: Option<String>,
    #[nserde(rename = "isBase64Encoded")]
    pub is_base64_encoded: Option<bool>,
    #[nserde(rename = "requestContext")]
    pub request_context: Option<RequestContext>,
}

#[derive(DeJson)]
pub struct RequestContext {
    #[nserde(rename = "requestId")]
    pub request_id: Option<String>,
}

impl ProxyRequest {
    pub fn request_id(&self) -> &str {
        self.request_context
            .as_ref()
            .and_then(|ctx| ctx.request_id.as_deref())
            .unwrap_or_default()
    }

    /// Raw report bytes, decoding base64 when the gateway flagged it.
    pub fn payload(&self) -> Result<Vec<u8>, HandlerError> {
        let body = self.body.as_deref().unwrap_or_default();
        if self.is_base64_encoded.unwrap_or(false) {
            Ok(BASE64.decode(body)?)
        } else {
            Ok(body.as_bytes().to_vec())
        }
    }
}

#[derive(Debug, PartialEq, SerJson)]
pub struct ProxyResponse {
    #[nserde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
    #[nserde(rename = "isBase64Encoded")]
    pub is_base64_encoded: bool,
}

impl ProxyResponse {
    pub fn ok() -> Self {
        Self {
            status_code: 200,
            body: "OK".to_owned(),
            is_base64_encoded: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("invalid proxy event: {0}")]
    Event(#[from] nanoserde::DeJsonErr),

    #[error("invalid base64 body: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error(transparent)]
    Ingest(#[from] IngestError),
}

impl HandlerError {
    pub fn error_type(&self) -> &'static str {
        match self {
            HandlerError::Event(_) | HandlerError::Base64(_) => "Function.EventInvalid",
            HandlerError::Ingest(e) => e.error_type(),
        }
    }
}

impl From<&HandlerError> for FunctionError {
    fn from(e: &HandlerError) -> Self {
        FunctionError::new(e.error_type(), e.to_string())
    }
}

/// Handle one proxy event: decode it, then ingest the report in its body.
///
/// An empty body fails before any backend client is built.
pub async fn handle<C: Connector>(
    event: &str,
    ingestor: &Ingestor<C>,
) -> Result<ProxyResponse, HandlerError> {
    let request: ProxyRequest = DeJson::deserialize_json(event)?;
    debug!(
        request_id = request.request_id(),
        method = request.http_method.as_deref().unwrap_or_default(),
        path = request.path.as_deref().unwrap_or_default(),
        "Processing Lambda request"
    );

    let payload = request.payload()?;
    if payload.is_empty() {
        return Err(IngestError::EmptyBody.into());
    }

    ingestor.ingest(&payload).await?;
    Ok(ProxyResponse::ok())
}
