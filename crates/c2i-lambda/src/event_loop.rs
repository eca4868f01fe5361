use c2i::{Connector, Ingestor};
use nanoserde::SerJson;
use tracing::{debug, error, warn};

use crate::proxy;
use crate::runtime_api::{ApiError, FunctionError, RuntimeApi};

/// Fetch one invocation, handle it, and post the outcome.
///
/// Only a failure to fetch the invocation is returned; a failure to post the
/// outcome is logged and the loop moves on.
pub async fn serve_next<A, C>(api: &A, ingestor: &Ingestor<C>) -> Result<(), ApiError>
where
    A: RuntimeApi,
    C: Connector,
{
    let invocation = api.next_invocation().await?;
    let request_id = invocation.request_id.as_str();
    debug!(request_id, "Received invocation");

    let posted = match proxy::handle(&invocation.body, ingestor).await {
        Ok(response) => api.send_response(request_id, response.serialize_json()).await,
        Err(e) => {
            error!(request_id, error = %e, error_type = e.error_type(), "invocation failed");
            api.send_error(request_id, &FunctionError::from(&e)).await
        }
    };

    if let Err(e) = posted {
        warn!(request_id, error = %e, "failed to post invocation result");
    }
    Ok(())
}

/// Serve invocations until the runtime API stops handing them out.
pub async fn run<A, C>(api: &A, ingestor: &Ingestor<C>) -> ApiError
where
    A: RuntimeApi,
    C: Connector,
{
    loop {
        if let Err(e) = serve_next(api, ingestor).await {
            return e;
        }
    }
}

#[cfg(test)]
mod tests;
