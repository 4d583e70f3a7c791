use std::io;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level used when `RUST_LOG` is not set
const DEFAULT_LOG_FILTER: &str = "warn";

/// Initialize the tracing subscriber for logging.
///
/// Use the RUST_LOG env var to control log level (e.g., RUST_LOG=gainly_core=debug).
/// Returns false if the host application already installed a subscriber.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        init_tracing();
        assert!(!init_tracing());
    }
}
