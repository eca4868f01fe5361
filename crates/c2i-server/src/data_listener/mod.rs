use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use c2i::{Connector, Ingestor};
use http_body_util::{BodyExt, Full};
use hyper::header::{CONTENT_TYPE, HOST};
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto::Builder;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const DATA_ROUTE: &str = "/data/";

fn response(status: StatusCode) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::default())
        .unwrap()
}

fn text_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header("x-content-type-options", "nosniff")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Validate the incoming request: route, method, and body.
async fn validate<B>(req: Request<B>) -> Result<Bytes, (StatusCode, String)>
where
    B: hyper::body::Body<Data = Bytes> + Send + 'static,
{
    let path = req.uri().path().to_owned();
    let method = req.method().clone();

    if !path.starts_with(DATA_ROUTE) {
        return Err((StatusCode::NOT_FOUND, format!("unknown path: {path}")));
    }
    if method != Method::POST {
        return Err((StatusCode::METHOD_NOT_ALLOWED, format!("{method} {path}")));
    }

    req.collect().await.map(|c| c.to_bytes()).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            format!("POST {path}: failed to read body"),
        )
    })
}

async fn handle<B, C>(
    req: Request<B>,
    remote: SocketAddr,
    ingestor: Arc<Ingestor<C>>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: hyper::body::Body<Data = Bytes> + Send + 'static,
    C: Connector,
{
    let host = req
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    info!(
        %remote,
        method = %req.method(),
        version = ?req.version(),
        host,
        uri = %req.uri(),
        "Processing request"
    );

    let body = match validate(req).await {
        Ok(body) => body,
        Err((status, reason)) => {
            warn!(reason, "data request rejected");
            return Ok(response(status));
        }
    };

    match ingestor.ingest(&body).await {
        Ok(()) => Ok(text_response(StatusCode::OK, "OK".to_owned())),
        Err(e) => {
            error!(error = %e, error_type = e.error_type(), "report ingestion failed");
            Ok(text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{e}\n"),
            ))
        }
    }
}

/// Accept connections until `cancel` fires, serving each on its own task.
pub async fn serve<C>(listener: TcpListener, ingestor: Arc<Ingestor<C>>, cancel: CancellationToken)
where
    C: Connector + 'static,
{
    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, remote) = match result {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };
                let ingestor = Arc::clone(&ingestor);
                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        let ingestor = Arc::clone(&ingestor);
                        handle(req, remote, ingestor)
                    });
                    let _ = Builder::new(hyper_util::rt::TokioExecutor::new())
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
            _ = cancel.cancelled() => {
                break;
            }
        }
    }
}
