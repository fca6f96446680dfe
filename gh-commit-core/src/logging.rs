use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static LOG_INIT: OnceLock<()> = OnceLock::new();

/// install the stderr subscriber once; `RUST_LOG` wins over `verbose`
pub fn init_logging(verbose: bool) {
    LOG_INIT.get_or_init(|| {
        let default_level = if verbose { "debug" } else { "warn" };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

        // stdout carries csv and commit output only
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(verbose)
            .compact();

        // a subscriber set elsewhere (tests, embedding apps) is left alone
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init();
    });
}
