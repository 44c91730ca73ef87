//! Harness configuration.
//!
//! Values are layered with figment, later sources overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. a TOML file (`firefox-notifications.toml` in the working directory, or
//!    an explicit path)
//! 3. `FXN_`-prefixed environment variables, nested keys split on `__`
//!    (`FXN_WAIT__TIMEOUT=5`)
//!
//! ```toml
//! webdriver_url = "http://localhost:4444"
//! headless = false
//!
//! [wait]
//! timeout = 1.0
//! interval = 0.5
//! ```

use crate::error::Result;
use crate::wait::{DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, WaitConfig};
use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "firefox-notifications.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "FXN_";

/// Timeout and poll interval for notification waits, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitSettings {
    /// Maximum time to wait for the notification slot.
    pub timeout: f64,
    /// Time between samples.
    pub interval: f64,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT.as_secs_f64(),
            interval: DEFAULT_POLL_INTERVAL.as_secs_f64(),
        }
    }
}

/// Everything needed to start a Firefox session for notification tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// geckodriver endpoint.
    pub webdriver_url: String,

    /// Run Firefox without a visible window.
    pub headless: bool,

    /// Firefox executable (None = geckodriver's default lookup).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firefox_binary: Option<PathBuf>,

    /// Preferences applied to the fresh profile.
    pub prefs: BTreeMap<String, serde_json::Value>,

    /// Waiter timing.
    pub wait: WaitSettings,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        let mut prefs = BTreeMap::new();
        // Test add-ons are unsigned.
        prefs.insert(
            "xpinstall.signatures.required".to_string(),
            serde_json::Value::Bool(false),
        );

        Self {
            webdriver_url: "http://localhost:4444".to_string(),
            headless: false,
            firefox_binary: None,
            prefs,
            wait: WaitSettings::default(),
        }
    }
}

impl HarnessConfig {
    /// Loads configuration from the default file (if present) and environment.
    ///
    /// # Errors
    ///
    /// Returns `Config` if a source cannot be parsed or the result is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Loads configuration, reading `path` instead of the default file.
    ///
    /// # Errors
    ///
    /// Returns `Config` if a source cannot be parsed or the result is invalid.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(path).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// The layered figment behind [`Self::load_from`].
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = path.map(Path::to_path_buf).or_else(|| {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            default_path.exists().then(|| default_path.to_path_buf())
        });

        if let Some(file) = config_file {
            figment = figment.merge(Toml::file(file));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Checks that the wait timing is usable.
    ///
    /// # Errors
    ///
    /// Returns `Config` for a non-positive interval, a negative timeout, a
    /// value too large for a `Duration`, or an interval longer than the
    /// timeout.
    pub fn validate(&self) -> Result<()> {
        self.wait_config().map(|_| ())
    }

    /// The waiter configuration these settings describe.
    ///
    /// # Errors
    ///
    /// Returns `Config` under the same conditions as [`Self::validate`].
    pub fn wait_config(&self) -> Result<WaitConfig> {
        let WaitSettings { timeout, interval } = self.wait;

        let timeout_duration = seconds("wait.timeout", timeout)?;
        let interval_duration = seconds("wait.interval", interval)?;

        if interval_duration.is_zero() {
            return Err(figment::Error::from(format!(
                "wait.interval must be a positive number of seconds, got {interval}"
            ))
            .into());
        }

        if interval_duration > timeout_duration {
            return Err(figment::Error::from(format!(
                "wait.interval ({interval}s) must not exceed wait.timeout ({timeout}s)"
            ))
            .into());
        }

        Ok(WaitConfig::new(timeout_duration, interval_duration))
    }
}

/// Converts a seconds value to a `Duration`, rejecting negative, non-finite
/// and out-of-range values.
fn seconds(key: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).map_err(|err| {
        figment::Error::from(format!(
            "{key} must be a non-negative number of seconds, got {value} ({err})"
        ))
        .into()
    })
}
