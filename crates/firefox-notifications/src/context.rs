//! Switching between Firefox's content and chrome scripting contexts.
//!
//! Notification banners live in the browser UI, not in the page, so any
//! query against them has to run in the chrome context. Marionette exposes
//! this through a vendor extension endpoint (`/session/{id}/moz/context`)
//! that plain `WebDriver` clients know nothing about; this module issues it
//! as a custom command.

use crate::error::{NotificationError, Result};
use fantoccini::Client;
use fantoccini::error::CmdError;
use fantoccini::wd::WebDriverCompatibleCommand;
use serde_json::json;
use std::fmt;
use std::future::Future;
use tracing::debug;

/// A Marionette scripting context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// The web page of the current tab.
    Content,
    /// The browser's own user interface.
    Chrome,
}

impl Context {
    /// Returns the wire name Marionette uses for this context.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Chrome => "chrome",
        }
    }

    fn parse(value: &serde_json::Value) -> Result<Self> {
        match value.as_str() {
            Some("content") => Ok(Self::Content),
            Some("chrome") => Ok(Self::Chrome),
            _ => Err(NotificationError::Context(value.to_string())),
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
enum ContextCommand {
    Get,
    Set(Context),
}

impl WebDriverCompatibleCommand for ContextCommand {
    fn endpoint(
        &self,
        base_url: &url::Url,
        session_id: Option<&str>,
    ) -> std::result::Result<url::Url, url::ParseError> {
        let session = session_id.unwrap_or_default();
        base_url.join(&format!("session/{session}/moz/context"))
    }

    fn method_and_body(&self, _request_url: &url::Url) -> (http::Method, Option<String>) {
        match self {
            Self::Get => (http::Method::GET, None),
            Self::Set(context) => (
                http::Method::POST,
                Some(json!({ "context": context.as_str() }).to_string()),
            ),
        }
    }
}

/// Returns the session's current context.
///
/// # Errors
///
/// Returns `WebDriver` if the command fails (e.g. the driver is not
/// geckodriver) or `Context` if the response is not a known context name.
pub async fn current_context(client: &Client) -> Result<Context> {
    let value = client.issue_cmd(ContextCommand::Get).await?;
    Context::parse(&value)
}

/// Switches the session to `context`.
///
/// # Errors
///
/// Returns `WebDriver` if the command fails.
pub async fn set_context(client: &Client, context: Context) -> Result<()> {
    debug!(%context, "switching browser context");
    client.issue_cmd(ContextCommand::Set(context)).await?;
    Ok(())
}

/// Runs `f` in the chrome context and restores the previous context.
///
/// The previous context is restored even when `f` fails; an error from `f`
/// takes precedence over an error from restoring.
///
/// # Errors
///
/// Returns the error of `f`, or any failure while switching contexts.
pub async fn in_chrome<T, F, Fut>(client: &Client, f: F) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let previous = current_context(client).await?;
    if previous == Context::Chrome {
        return f().await;
    }

    set_context(client, Context::Chrome).await?;
    let result = f().await;
    let restored = set_context(client, previous).await;

    let value = result?;
    restored?;
    Ok(value)
}

/// Returns true if the error means the element is not (or no longer) there.
///
/// Banners disappear between a lookup and the next read all the time during
/// install flows, so both "no such element" and "stale element" count.
pub(crate) fn is_gone(err: &CmdError) -> bool {
    err.is_no_such_element() || err.is_stale_element_reference()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fantoccini::error::{ErrorStatus, WebDriver};

    fn webdriver_error(status: ErrorStatus) -> CmdError {
        CmdError::Standard(WebDriver::new(status, "from geckodriver"))
    }

    #[test]
    fn missing_and_stale_banners_count_as_gone() {
        assert!(is_gone(&webdriver_error(ErrorStatus::NoSuchElement)));
        assert!(is_gone(&webdriver_error(ErrorStatus::StaleElementReference)));
    }

    #[test]
    fn other_webdriver_errors_are_not_gone() {
        assert!(!is_gone(&webdriver_error(ErrorStatus::JavascriptError)));
        assert!(!is_gone(&webdriver_error(ErrorStatus::InvalidSessionId)));
    }

    #[test]
    fn context_endpoint_is_session_scoped() {
        let base = url::Url::parse("http://localhost:4444/").unwrap();
        let url = ContextCommand::Get.endpoint(&base, Some("abc")).unwrap();

        assert_eq!(url.as_str(), "http://localhost:4444/session/abc/moz/context");
    }

    #[test]
    fn set_context_posts_context_name() {
        let base = url::Url::parse("http://localhost:4444/").unwrap();
        let (method, body) = ContextCommand::Set(Context::Chrome).method_and_body(&base);

        assert_eq!(method, http::Method::POST);
        let body: serde_json::Value = serde_json::from_str(&body.unwrap()).unwrap();
        assert_eq!(body, json!({ "context": "chrome" }));

        let (method, body) = ContextCommand::Get.method_and_body(&base);
        assert_eq!(method, http::Method::GET);
        assert!(body.is_none());
    }

    #[test]
    fn parses_context_names() {
        assert_eq!(Context::parse(&json!("chrome")).unwrap(), Context::Chrome);
        assert_eq!(Context::parse(&json!("content")).unwrap(), Context::Content);
        assert!(matches!(
            Context::parse(&json!(null)),
            Err(NotificationError::Context(_))
        ));
    }
}
