//! Structured logging with `tracing`.
//!
//! The library only emits events; installing a subscriber is the embedding
//! application's choice. [`init_subscriber`] is the stock stderr setup and
//! [`capture_logs`] records events in memory for assertions.

pub mod capture;

pub use capture::{CapturedEvent, CapturedLogs, capture_logs};

/// Initialize the global tracing subscriber with stderr output.
///
/// `RUST_LOG` takes precedence over `level`. Subsequent calls are no-ops.
pub fn init_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // try_init fails once a global default exists
    let _ = subscriber.try_init();
}

/// Initialize the global subscriber from the `logging` settings section.
pub fn init_from_settings(settings: &ragline_settings::LoggingSettings) {
    init_subscriber(&settings.level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_subscriber_does_not_panic() {
        init_subscriber("warn");
        init_subscriber("debug");
        init_from_settings(&ragline_settings::LoggingSettings::default());
    }
}
