use std::future::Future;

use nanoserde::SerJson;
use thiserror::Error;

const API_VERSION: &str = "2018-06-01";
const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";
const ERROR_TYPE_HEADER: &str = "Lambda-Runtime-Function-Error-Type";

/// The slice of the Lambda Runtime API the function loop needs.
pub trait RuntimeApi {
    fn next_invocation(&self) -> impl Future<Output = Result<Invocation, ApiError>> + Send;
    fn send_response(
        &self,
        request_id: &str,
        body: String,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
    fn send_error(
        &self,
        request_id: &str,
        error: &FunctionError,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("runtime API HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("AWS_LAMBDA_RUNTIME_API is not set")]
    EndpointMissing,
    #[error("missing Lambda-Runtime-Aws-Request-Id header")]
    MissingRequestId,
    #[error("runtime API rejected {path}: HTTP {status}")]
    Rejected { path: String, status: u16 },
}

#[derive(Debug)]
pub struct Invocation {
    pub request_id: String,
    pub body: String,
}

/// Failure reported for an invocation or for initialization.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionError {
    pub error_type: String,
    pub message: String,
}

#[derive(SerJson)]
struct ErrorBody {
    #[nserde(rename = "errorMessage")]
    error_message: String,
    #[nserde(rename = "errorType")]
    error_type: String,
}

impl FunctionError {
    pub fn new(error_type: &str, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.to_owned(),
            message: message.into(),
        }
    }

    fn to_json(&self) -> String {
        ErrorBody {
            error_message: self.message.clone(),
            error_type: self.error_type.clone(),
        }
        .serialize_json()
    }
}

#[derive(Debug)]
pub struct RuntimeApiClient {
    client: reqwest::Client,
    runtime_api: String,
}

impl RuntimeApiClient {
    pub fn from_env() -> Result<Self, ApiError> {
        let runtime_api = std::env::var("AWS_LAMBDA_RUNTIME_API")
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or(ApiError::EndpointMissing)?;
        Ok(Self::new(reqwest::Client::new(), &runtime_api))
    }

    pub fn new(client: reqwest::Client, runtime_api: &str) -> Self {
        Self {
            client,
            runtime_api: runtime_api.to_owned(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}/{API_VERSION}/runtime/{path}", self.runtime_api)
    }

    async fn post_error(&self, path: &str, error: &FunctionError) -> Result<(), ApiError> {
        let resp = self
            .client
            .post(self.url(path))
            .header(ERROR_TYPE_HEADER, &error.error_type)
            .header("Content-Type", "application/json")
            .body(error.to_json())
            .send()
            .await?;
        check_accepted(path, resp.status())
    }

    /// Report a startup failure. Lambda tears the environment down afterwards,
    /// so failures here are only logged.
    pub async fn report_init_error(&self, error: &FunctionError) {
        if let Err(e) = self.post_error("init/error", error).await {
            tracing::error!(error = %e, "failed to report init error");
        }
    }
}

impl RuntimeApi for RuntimeApiClient {
    async fn next_invocation(&self) -> Result<Invocation, ApiError> {
        let resp = self
            .client
            .get(self.url("invocation/next"))
            .send()
            .await?;

        let request_id = resp
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(ApiError::MissingRequestId)?
            .to_owned();
        let body = resp.text().await?;

        Ok(Invocation { request_id, body })
    }

    async fn send_response(&self, request_id: &str, body: String) -> Result<(), ApiError> {
        let path = format!("invocation/{request_id}/response");
        let resp = self
            .client
            .post(self.url(&path))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;
        check_accepted(&path, resp.status())
    }

    async fn send_error(&self, request_id: &str, error: &FunctionError) -> Result<(), ApiError> {
        self.post_error(&format!("invocation/{request_id}/error"), error)
            .await
    }
}

fn check_accepted(path: &str, status: reqwest::StatusCode) -> Result<(), ApiError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(ApiError::Rejected {
            path: path.to_owned(),
            status: status.as_u16(),
        })
    }
}
