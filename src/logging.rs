/*!
 * Logging and tracing initialization
 */

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initialize structured logging. `verbose` forces debug level regardless
/// of `RUST_LOG`; `json` switches the formatter so log aggregation doesn't
/// have to parse the compact human format.
pub fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { Level::DEBUG } else { Level::INFO };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("coordinator={default_level}")));

    if json {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .json();
        tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();
    } else {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_span_events(FmtSpan::NONE)
            .compact();
        tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();
    }
}

/// Initialize logging with a test-friendly writer. Safe to call from more
/// than one test; only the first call actually installs a subscriber.
#[cfg(test)]
pub fn init_test_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("coordinator=debug"));
        let fmt_layer = fmt::layer().with_test_writer().with_target(false).compact();
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .ok();
    });
}
