use tracing_subscriber::filter::LevelFilter;

const LOG_LEVEL_VAR: &str = "C2I_LOG_LEVEL";

/// Install the JSON subscriber on stderr. Call once, first thing in `main`.
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;

    let level = level_from(
        std::env::var(LOG_LEVEL_VAR).ok().as_deref(),
        std::env::var("DEBUG").ok().as_deref(),
    );

    tracing_subscriber::registry()
        .with(level)
        .with(tracing_microjson::JsonLayer::new(std::io::stderr).with_target(true))
        .init();
}

/// `DEBUG=true` wins; otherwise the configured level, falling back to INFO.
fn level_from(log_level: Option<&str>, debug: Option<&str>) -> LevelFilter {
    if debug == Some("true") {
        return LevelFilter::DEBUG;
    }
    log_level
        .and_then(|val| {
            val.parse::<LevelFilter>().ok().or_else(|| {
                eprintln!("invalid {LOG_LEVEL_VAR}: {val:?}, defaulting to INFO");
                None
            })
        })
        .unwrap_or(LevelFilter::INFO)
}

/// Exceptional startup failure: log and exit.
pub fn fatal(msg: &str, error: &dyn std::fmt::Display) -> ! {
    tracing::error!(%error, "{msg}");
    std::process::exit(1);
}
