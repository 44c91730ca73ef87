//! The Firefox window under test and its `WebDriver` session.
//!
//! `BrowserWindow` owns a geckodriver session. Page interaction (navigating,
//! clicking links) happens in the content context; reading the notification
//! slot happens in the chrome context and is switched back afterwards.
//!
//! # Resource Safety
//!
//! The session should be ended with `close()`. Dropping a window without
//! closing it only logs a warning; geckodriver reaps the session once the
//! connection goes away.

use crate::config::HarnessConfig;
use crate::context::{Context, current_context, in_chrome, is_gone, set_context};
use crate::error::{NotificationError, Result};
use crate::notification::{Notification, NotificationKind, NotificationVariant};
use crate::waiter::{Expected, NotificationSlot, wait_for_notification};
use crate::wait::WaitConfig;
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

const NOTIFICATION_POPUP: &str = "#notification-popup popupnotification";
const APP_MENU_NOTIFICATION_POPUP: &str = "#appMenu-notification-popup popupnotification";

/// Builds the capabilities for a new Firefox session.
///
/// Notifications are only displayed while the window has focus, so Firefox
/// always starts with `-foreground`. Chrome-context access additionally
/// needs `MOZ_REMOTE_SETTINGS_DEVTOOLS` in recent releases.
#[must_use]
pub fn firefox_capabilities(config: &HarnessConfig) -> Map<String, Value> {
    let mut args = vec!["-foreground"];
    if config.headless {
        args.push("-headless");
    }

    let mut options = json!({
        "args": args,
        "prefs": config.prefs,
        "env": { "MOZ_REMOTE_SETTINGS_DEVTOOLS": "1" },
    });

    if let Some(binary) = &config.firefox_binary {
        options["binary"] = json!(binary);
    }

    let mut caps = Map::new();
    caps.insert("browserName".to_string(), json!("firefox"));
    caps.insert("moz:firefoxOptions".to_string(), options);
    caps
}

/// A Firefox window driven over `WebDriver`.
#[derive(Debug)]
pub struct BrowserWindow {
    client: Client,
    wait: WaitConfig,
    closed: bool,
}

impl BrowserWindow {
    /// Starts a new Firefox session as described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the wait timing is unusable, or `Session` if
    /// geckodriver is unreachable or refuses the capabilities.
    pub async fn connect(config: &HarnessConfig) -> Result<Self> {
        let wait = config.wait_config()?;
        debug!(webdriver_url = %config.webdriver_url, "connecting to WebDriver");

        let client = ClientBuilder::native()
            .capabilities(firefox_capabilities(config))
            .connect(&config.webdriver_url)
            .await?;

        info!(webdriver_url = %config.webdriver_url, "Firefox session started");

        Ok(Self::from_client(client, wait))
    }

    /// Wraps an existing session.
    #[must_use]
    pub fn from_client(client: Client, wait: WaitConfig) -> Self {
        Self {
            client,
            wait,
            closed: false,
        }
    }

    /// The underlying `WebDriver` client.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The wait configuration used by `wait_for_*` without overrides.
    #[must_use]
    pub fn wait_config(&self) -> WaitConfig {
        self.wait
    }

    /// Navigates the current tab to `url`.
    ///
    /// # Errors
    ///
    /// Returns `WebDriver` if navigation fails.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        debug!(url, "navigating");
        self.client.goto(url).await?;
        Ok(())
    }

    /// Returns the URL of the current tab.
    ///
    /// # Errors
    ///
    /// Returns `WebDriver` if the session is gone.
    pub async fn current_url(&self) -> Result<url::Url> {
        Ok(self.client.current_url().await?)
    }

    /// Clicks the first link in the page whose text is `text`.
    ///
    /// # Errors
    ///
    /// Returns `WebDriver` if no such link exists.
    pub async fn click_link(&self, text: &str) -> Result<()> {
        debug!(text, "clicking link");
        self.client.find(Locator::LinkText(text)).await?.click().await?;
        Ok(())
    }

    /// Returns the session's current scripting context.
    ///
    /// # Errors
    ///
    /// Returns `WebDriver` if the driver does not support context switching.
    pub async fn context(&self) -> Result<Context> {
        current_context(&self.client).await
    }

    /// Switches the session's scripting context.
    ///
    /// # Errors
    ///
    /// Returns `WebDriver` if the driver does not support context switching.
    pub async fn set_context(&self, context: Context) -> Result<()> {
        set_context(&self.client, context).await
    }

    /// Reads the notification slot once.
    ///
    /// The main notification popup takes precedence; if it is empty, the
    /// first visible notification under the app menu is used.
    ///
    /// # Errors
    ///
    /// Returns `WebDriver` for failures other than the banner being absent
    /// or vanishing mid-read.
    pub async fn notification(&self) -> Result<Option<Notification>> {
        in_chrome(&self.client, || async {
            let Some(root) = self.notification_root().await? else {
                return Ok(None);
            };

            match root.attr("id").await {
                Ok(id) => {
                    let kind = NotificationKind::from_id(id.as_deref().unwrap_or_default());
                    Ok(Some(Notification::new(self.client.clone(), root, kind)))
                }
                Err(err) if is_gone(&err) => Ok(None),
                Err(err) => Err(err.into()),
            }
        })
        .await
    }

    async fn notification_root(&self) -> Result<Option<Element>> {
        match self.client.find(Locator::Css(NOTIFICATION_POPUP)).await {
            Ok(root) => return Ok(Some(root)),
            Err(err) if is_gone(&err) => {}
            Err(err) => return Err(err.into()),
        }

        for candidate in self
            .client
            .find_all(Locator::Css(APP_MENU_NOTIFICATION_POPUP))
            .await?
        {
            match candidate.is_displayed().await {
                Ok(true) => return Ok(Some(candidate)),
                Ok(false) => {}
                Err(err) if is_gone(&err) => {}
                Err(err) => return Err(err.into()),
            }
        }

        Ok(None)
    }

    /// Waits until the slot satisfies `expected`, using the window's config.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` with a message naming the unmet expectation.
    pub async fn wait_for_notification(&self, expected: Expected) -> Result<Option<Notification>> {
        self.wait_for_notification_with(expected, self.wait).await
    }

    /// Waits until the slot satisfies `expected` under `config`.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` with a message naming the unmet expectation.
    pub async fn wait_for_notification_with(
        &self,
        expected: Expected,
        config: WaitConfig,
    ) -> Result<Option<Notification>> {
        wait_for_notification(self, expected, config).await
    }

    /// Waits for a banner of type `V` and returns it.
    ///
    /// ```ignore
    /// let blocked = window.wait_for::<AddOnInstallBlocked>().await?;
    /// blocked.allow().await?;
    /// let confirmation = window.wait_for::<AddOnInstallConfirmation>().await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `Timeout` with `"<Type> was not shown"`.
    pub async fn wait_for<V: NotificationVariant>(&self) -> Result<V> {
        let expected = Expected::Kind(V::KIND);
        self.wait_for_notification(expected)
            .await?
            .and_then(Notification::into_variant)
            .ok_or_else(|| NotificationError::Timeout {
                message: expected.timeout_message(),
                timeout: self.wait.timeout,
            })
    }

    /// Waits for any banner and returns it.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` with `"No notification was shown"`.
    pub async fn wait_for_any(&self) -> Result<Notification> {
        self.wait_for_notification(Expected::Any)
            .await?
            .ok_or_else(|| NotificationError::Timeout {
                message: Expected::Any.timeout_message(),
                timeout: self.wait.timeout,
            })
    }

    /// Waits for the slot to be empty.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` with `"Unexpected notification shown"`.
    pub async fn wait_for_none(&self) -> Result<()> {
        self.wait_for_notification(Expected::Nothing).await?;
        Ok(())
    }

    /// Ends the `WebDriver` session and closes Firefox.
    ///
    /// # Errors
    ///
    /// Returns `WebDriver` if the session cannot be deleted.
    pub async fn close(mut self) -> Result<()> {
        self.closed = true;
        let client = self.client.clone();
        drop(self);

        debug!("closing Firefox session");
        client.close().await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationSlot for BrowserWindow {
    type View = Notification;

    async fn sample(&self) -> Result<Option<Notification>> {
        self.notification().await
    }
}

impl Drop for BrowserWindow {
    fn drop(&mut self) {
        if !self.closed {
            warn!("BrowserWindow dropped without explicit close()");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_keep_firefox_in_foreground() {
        let caps = firefox_capabilities(&HarnessConfig::default());
        let options = &caps["moz:firefoxOptions"];

        assert_eq!(caps["browserName"], "firefox");
        assert_eq!(options["args"], json!(["-foreground"]));
        assert_eq!(options["env"]["MOZ_REMOTE_SETTINGS_DEVTOOLS"], "1");
        assert_eq!(options["prefs"]["xpinstall.signatures.required"], false);
        assert!(options.get("binary").is_none());
    }

    #[test]
    fn capabilities_honour_headless_and_binary() {
        let config = HarnessConfig {
            headless: true,
            firefox_binary: Some("/opt/firefox/firefox".into()),
            ..HarnessConfig::default()
        };

        let caps = firefox_capabilities(&config);
        let options = &caps["moz:firefoxOptions"];

        assert_eq!(options["args"], json!(["-foreground", "-headless"]));
        assert_eq!(options["binary"], "/opt/firefox/firefox");
    }
}
