//! Typed views over Firefox's add-on install notification banners.
//!
//! A banner is classified once, when it is observed, from its element id.
//! The result is a [`Notification`] whose variant carries only the actions
//! that make sense for that install phase:
//!
//! ```text
//! None -> Blocked -> Confirmation -> Complete -> None
//!            |            |
//!            +-> None     +-> None (cancel)
//! ```
//!
//! Views are bound to one banner element. Once the banner is dismissed or
//! replaced the view is stale and further calls fail with the `WebDriver`
//! error for a stale element. Actions only click; they never wait for the
//! next banner, so callers go back to the waiter after each one.

use crate::context::{in_chrome, is_gone};
use crate::error::Result;
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::{Client, Locator};
use std::fmt;
use std::future::Future;
use tracing::debug;

const PRIMARY_BUTTON: &str = ".popup-notification-primary-button";
const SECONDARY_BUTTON: &str = ".popup-notification-secondary-button";
const CLOSE_BUTTON: &str = ".popup-notification-closebutton";
const DESCRIPTION: &str = ".popup-notification-description";

/// The install phase a banner belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// The site is not allowed to install add-ons without permission.
    Blocked,
    /// The add-on has downloaded and asks to be installed.
    Confirmation,
    /// The add-on has been installed.
    Complete,
    /// The add-on is downloading.
    Progress,
    /// Download or installation failed.
    Failed,
    /// A banner outside the add-on install family.
    Unrecognized,
}

impl NotificationKind {
    /// Classifies a banner by its element id.
    #[must_use]
    pub fn from_id(id: &str) -> Self {
        match id {
            "addon-install-blocked-notification" => Self::Blocked,
            "addon-install-confirmation-notification" => Self::Confirmation,
            "addon-installed-notification" | "addon-install-complete-notification" => {
                Self::Complete
            }
            "addon-progress-notification" => Self::Progress,
            "addon-install-failed-notification" => Self::Failed,
            _ => Self::Unrecognized,
        }
    }

    /// Returns the view type name used in timeout messages.
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Blocked => "AddOnInstallBlocked",
            Self::Confirmation => "AddOnInstallConfirmation",
            Self::Complete => "AddOnInstallComplete",
            Self::Progress => "AddOnProgress",
            Self::Failed => "AddOnInstallFailed",
            Self::Unrecognized => "BaseNotification",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Anything observed in the notification slot that has a kind.
pub trait Classified {
    /// The install phase this observation belongs to.
    fn kind(&self) -> NotificationKind;
}

impl Classified for NotificationKind {
    fn kind(&self) -> NotificationKind {
        *self
    }
}

/// The element handle and session shared by every notification view.
#[derive(Debug, Clone)]
pub struct BaseNotification {
    client: Client,
    root: Element,
    kind: NotificationKind,
}

impl BaseNotification {
    pub(crate) fn new(client: Client, root: Element, kind: NotificationKind) -> Self {
        Self { client, root, kind }
    }

    /// The install phase of the banner.
    #[must_use]
    pub fn kind(&self) -> NotificationKind {
        self.kind
    }

    /// The banner's root `popupnotification` element.
    ///
    /// Interacting with it requires the chrome context, see [`Self::in_chrome`].
    #[must_use]
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Runs `f` with the session switched to the chrome context.
    ///
    /// # Errors
    ///
    /// Returns the error of `f` or of the context switch.
    pub async fn in_chrome<T, F, Fut>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        in_chrome(&self.client, f).await
    }

    /// Reads an attribute of the banner element.
    ///
    /// # Errors
    ///
    /// Returns `WebDriver` if the banner is gone.
    pub async fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.in_chrome(|| async { Ok(self.root.attr(name).await?) })
            .await
    }

    /// Finds an element inside the banner by CSS selector.
    ///
    /// # Errors
    ///
    /// Returns `WebDriver` if no element matches or the banner is gone.
    pub async fn find(&self, selector: &str) -> Result<Element> {
        self.in_chrome(|| async { Ok(self.root.find(Locator::Css(selector)).await?) })
            .await
    }

    /// Finds the primary action button.
    ///
    /// # Errors
    ///
    /// Returns `WebDriver` if the button is missing.
    pub async fn find_primary_button(&self) -> Result<Element> {
        self.find(PRIMARY_BUTTON).await
    }

    /// Finds the secondary action button.
    ///
    /// # Errors
    ///
    /// Returns `WebDriver` if the button is missing.
    pub async fn find_secondary_button(&self) -> Result<Element> {
        self.find(SECONDARY_BUTTON).await
    }

    /// Finds the close button.
    ///
    /// # Errors
    ///
    /// Returns `WebDriver` if the button is missing.
    pub async fn find_close_button(&self) -> Result<Element> {
        self.find(CLOSE_BUTTON).await
    }

    /// Finds the description element.
    ///
    /// # Errors
    ///
    /// Returns `WebDriver` if the description is missing.
    pub async fn find_description(&self) -> Result<Element> {
        self.find(DESCRIPTION).await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        debug!(kind = %self.kind, selector, "clicking notification control");
        self.in_chrome(|| async {
            self.root.find(Locator::Css(selector)).await?.click().await?;
            Ok(())
        })
        .await
    }
}

/// Attributes and actions every notification supports.
#[async_trait]
pub trait NotificationView: Send + Sync {
    /// The shared banner handle.
    fn base(&self) -> &BaseNotification;

    /// The domain that triggered the banner, if one is shown.
    async fn origin(&self) -> Result<Option<String>> {
        self.base().attribute("origin").await
    }

    /// The banner's accessible label.
    async fn label(&self) -> Result<Option<String>> {
        self.base().attribute("label").await
    }

    /// Dismisses the banner.
    ///
    /// Not idempotent: closing a view whose banner is already gone fails.
    async fn close(&self) -> Result<()> {
        self.base().click(CLOSE_BUTTON).await
    }
}

#[async_trait]
impl NotificationView for BaseNotification {
    fn base(&self) -> &BaseNotification {
        self
    }
}

macro_rules! notification_variant {
    ($(#[$meta:meta])* $name:ident => $kind:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(BaseNotification);

        impl Classified for $name {
            fn kind(&self) -> NotificationKind {
                self.0.kind
            }
        }

        impl NotificationVariant for $name {
            const KIND: NotificationKind = NotificationKind::$kind;

            fn from_notification(notification: Notification) -> Option<Self> {
                match notification {
                    Notification::$kind(view) => Some(view),
                    _ => None,
                }
            }
        }
    };
}

/// A notification type that can be waited for by type.
pub trait NotificationVariant: NotificationView + Sized {
    /// The kind this type represents.
    const KIND: NotificationKind;

    /// Extracts this variant, or `None` if the notification is another kind.
    fn from_notification(notification: Notification) -> Option<Self>;
}

notification_variant!(
    /// Shown when a site tries to install an add-on without permission.
    AddOnInstallBlocked => Blocked
);

notification_variant!(
    /// Asks the user to confirm installing a downloaded add-on.
    AddOnInstallConfirmation => Confirmation
);

notification_variant!(
    /// Reports a finished installation.
    AddOnInstallComplete => Complete
);

notification_variant!(
    /// Shown while an add-on downloads.
    AddOnProgress => Progress
);

notification_variant!(
    /// Reports a failed download or installation.
    AddOnInstallFailed => Failed
);

impl NotificationVariant for BaseNotification {
    const KIND: NotificationKind = NotificationKind::Unrecognized;

    fn from_notification(notification: Notification) -> Option<Self> {
        match notification {
            Notification::Unrecognized(view) => Some(view),
            _ => None,
        }
    }
}

impl AddOnInstallBlocked {
    /// Allows the site to install the add-on.
    ///
    /// The confirmation banner follows asynchronously.
    ///
    /// # Errors
    ///
    /// Returns `WebDriver` if the banner is gone.
    pub async fn allow(&self) -> Result<()> {
        self.0.click(PRIMARY_BUTTON).await
    }
}

#[async_trait]
impl NotificationView for AddOnInstallBlocked {
    fn base(&self) -> &BaseNotification {
        &self.0
    }
}

impl AddOnInstallConfirmation {
    /// The name of the add-on awaiting confirmation.
    ///
    /// # Errors
    ///
    /// Returns `WebDriver` if neither the description nor the banner names
    /// the add-on.
    pub async fn addon_name(&self) -> Result<String> {
        let root = &self.0.root;
        self.0
            .in_chrome(|| async {
                let description = root.find(Locator::Css(DESCRIPTION)).await?;
                match description.find(Locator::Css("b")).await {
                    Ok(name) => Ok(name.text().await?),
                    Err(err) if is_gone(&err) => match root.attr("name").await? {
                        Some(name) => Ok(name),
                        None => Err(err.into()),
                    },
                    Err(err) => Err(err.into()),
                }
            })
            .await
    }

    /// Installs the add-on.
    ///
    /// # Errors
    ///
    /// Returns `WebDriver` if the banner is gone.
    pub async fn install(&self) -> Result<()> {
        self.0.click(PRIMARY_BUTTON).await
    }

    /// Cancels the installation; no further banner follows.
    ///
    /// # Errors
    ///
    /// Returns `WebDriver` if the banner is gone.
    pub async fn cancel(&self) -> Result<()> {
        self.0.click(SECONDARY_BUTTON).await
    }
}

#[async_trait]
impl NotificationView for AddOnInstallConfirmation {
    fn base(&self) -> &BaseNotification {
        &self.0
    }
}

#[async_trait]
impl NotificationView for AddOnInstallComplete {
    fn base(&self) -> &BaseNotification {
        &self.0
    }

    /// Acknowledges the installation, which ends the flow.
    async fn close(&self) -> Result<()> {
        self.0.click(PRIMARY_BUTTON).await
    }
}

#[async_trait]
impl NotificationView for AddOnProgress {
    fn base(&self) -> &BaseNotification {
        &self.0
    }
}

#[async_trait]
impl NotificationView for AddOnInstallFailed {
    fn base(&self) -> &BaseNotification {
        &self.0
    }
}

/// A banner observed in the notification slot, resolved to its variant.
#[derive(Debug, Clone)]
pub enum Notification {
    /// See [`AddOnInstallBlocked`].
    Blocked(AddOnInstallBlocked),
    /// See [`AddOnInstallConfirmation`].
    Confirmation(AddOnInstallConfirmation),
    /// See [`AddOnInstallComplete`].
    Complete(AddOnInstallComplete),
    /// See [`AddOnProgress`].
    Progress(AddOnProgress),
    /// See [`AddOnInstallFailed`].
    Failed(AddOnInstallFailed),
    /// Any other banner.
    Unrecognized(BaseNotification),
}

impl Notification {
    /// Wraps a banner element in the variant matching `kind`.
    pub(crate) fn new(client: Client, root: Element, kind: NotificationKind) -> Self {
        let base = BaseNotification::new(client, root, kind);
        match kind {
            NotificationKind::Blocked => Self::Blocked(AddOnInstallBlocked(base)),
            NotificationKind::Confirmation => Self::Confirmation(AddOnInstallConfirmation(base)),
            NotificationKind::Complete => Self::Complete(AddOnInstallComplete(base)),
            NotificationKind::Progress => Self::Progress(AddOnProgress(base)),
            NotificationKind::Failed => Self::Failed(AddOnInstallFailed(base)),
            NotificationKind::Unrecognized => Self::Unrecognized(base),
        }
    }

    /// Converts into a specific variant type.
    #[must_use]
    pub fn into_variant<V: NotificationVariant>(self) -> Option<V> {
        V::from_notification(self)
    }

    fn view(&self) -> &dyn NotificationView {
        match self {
            Self::Blocked(view) => view,
            Self::Confirmation(view) => view,
            Self::Complete(view) => view,
            Self::Progress(view) => view,
            Self::Failed(view) => view,
            Self::Unrecognized(view) => view,
        }
    }
}

impl Classified for Notification {
    fn kind(&self) -> NotificationKind {
        self.base().kind
    }
}

impl Classified for BaseNotification {
    fn kind(&self) -> NotificationKind {
        self.kind
    }
}

#[async_trait]
impl NotificationView for Notification {
    fn base(&self) -> &BaseNotification {
        self.view().base()
    }

    async fn close(&self) -> Result<()> {
        self.view().close().await
    }
}
