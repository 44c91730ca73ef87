//! Polling primitives for conditions observed in a remote browser.
//!
//! Firefox exposes no event stream for its notification banners over
//! `WebDriver`, so every wait in this crate is a sleep-and-retest loop. The
//! condition is always evaluated before the deadline is checked, which means
//! the last state before expiry is never skipped.

use crate::error::{NotificationError, Result};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Default timeout for wait operations (1 second).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Default poll interval for checking conditions (500ms).
///
/// Every sample costs several `WebDriver` round trips, so this stays coarse.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Configuration for wait operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    /// Maximum time to wait for the condition.
    pub timeout: Duration,

    /// How long to sleep between samples.
    pub interval: Duration,
}

impl WaitConfig {
    /// Creates a new wait configuration.
    #[must_use]
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Creates a config with custom timeout and default poll interval.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(timeout, DEFAULT_POLL_INTERVAL)
    }

    /// Returns a copy of this config with a different poll interval.
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_POLL_INTERVAL)
    }
}

/// Polls `condition` until it yields a value, with timeout.
///
/// `Ok(None)` from the condition means "not yet"; `Ok(Some(value))` ends the
/// wait. Errors from the condition end the wait immediately and are returned
/// unchanged. When the timeout elapses the result is a
/// [`NotificationError::Timeout`] whose message is `message`.
///
/// # Errors
///
/// Returns `Timeout` if the condition never yields a value, or whatever
/// error the condition itself returned.
pub async fn wait_until<F, Fut, T>(mut condition: F, config: WaitConfig, message: &str) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let start = Instant::now();

    loop {
        if let Some(value) = condition().await? {
            return Ok(value);
        }

        if start.elapsed() >= config.timeout {
            return Err(NotificationError::Timeout {
                message: message.to_string(),
                timeout: config.timeout,
            });
        }

        sleep(config.interval).await;
    }
}

/// Waits for a boolean condition to become true, with timeout.
///
/// # Example
///
/// ```ignore
/// wait_for(
///     || async { window.notification().await.is_ok_and(|n| n.is_none()) },
///     WaitConfig::default(),
///     "notification slot to clear",
/// )
/// .await?;
/// ```
///
/// # Errors
///
/// Returns `Timeout` if the condition is still false when the timeout elapses.
pub async fn wait_for<F, Fut>(mut condition: F, config: WaitConfig, message: &str) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    wait_until(
        || {
            let check = condition();
            async move { Ok(check.await.then_some(())) }
        },
        config,
        message,
    )
    .await
}
