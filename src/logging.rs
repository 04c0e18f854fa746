// src/logging.rs
// =============================================================================
// Logging setup.
//
// Logs go to stderr so `--json` output on stdout stays machine-readable.
// RUST_LOG wins when set; otherwise --verbose picks between two defaults.
// =============================================================================

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "info,site_crawler=debug"
    } else {
        "warn,site_crawler=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
