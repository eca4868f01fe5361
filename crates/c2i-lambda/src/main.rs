mod event_loop;
mod proxy;
mod runtime_api;

#[cfg(test)]
mod testing;

use c2i::logging::{fatal, setup_logging};
use c2i::{Config, InfluxConnector, Ingestor, TimestampPolicy};
use runtime_api::{FunctionError, RuntimeApiClient};
use tracing::{error, info};

const CONFIG_ERROR_TYPE: &str = "Function.ConfigInvalid";

fn setup_rustls() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        fatal("failed to install rustls ring provider", &"provider already set");
    }
}

#[tokio::main]
async fn main() {
    setup_logging();
    setup_rustls();
    info!("Starting c2i");

    let api = RuntimeApiClient::from_env()
        .unwrap_or_else(|e| fatal("failed to reach Lambda runtime API", &e));

    // Config errors are reported to the runtime before exiting.
    let connector = match Config::from_env()
        .map_err(|e| e.to_string())
        .and_then(|config| InfluxConnector::new(config.influx).map_err(|e| e.to_string()))
    {
        Ok(c) => c,
        Err(message) => {
            error!(error = %message, "config error");
            api.report_init_error(&FunctionError::new(CONFIG_ERROR_TYPE, message))
                .await;
            std::process::exit(1);
        }
    };
    let ingestor = Ingestor::new(connector, TimestampPolicy::FromReport);

    let err = event_loop::run(&api, &ingestor).await;
    fatal("runtime API error", &err);
}
