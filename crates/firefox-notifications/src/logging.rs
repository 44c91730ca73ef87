//! Logging setup for test binaries.
//!
//! The library only emits `tracing` events; this module installs a
//! subscriber so they show up when a notification test fails. `RUST_LOG`
//! overrides the default filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "firefox_notifications=info";

/// Verbose filter: debug for this crate, warnings from the `WebDriver` stack.
const VERBOSE_FILTER: &str = "firefox_notifications=debug,fantoccini=warn";

/// Initializes the global tracing subscriber.
///
/// Safe to call from every test: only the first call installs a subscriber,
/// later calls return false.
///
/// ```rust,no_run
/// let _ = firefox_notifications::logging::init_logger(true);
/// tracing::debug!("visible with verbose logging");
/// ```
#[must_use]
pub fn init_logger(verbose: bool) -> bool {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    init_logger_with_filter(filter)
}

/// Initializes the global tracing subscriber with a custom filter.
///
/// Returns false if a subscriber was already installed.
#[must_use]
pub fn init_logger_with_filter(filter: EnvFilter) -> bool {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_test_writer()
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_ok()
}
