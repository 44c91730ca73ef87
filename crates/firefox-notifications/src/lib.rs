//! # firefox-notifications
//!
//! Waits for and drives Firefox's add-on install notifications over
//! `WebDriver` (geckodriver/Marionette).
//!
//! When a page triggers an add-on install, Firefox walks the user through a
//! short series of banners in a single notification slot: the install is
//! blocked, then awaits confirmation, then reports completion. This crate
//! observes that slot and exposes each banner as a typed view.
//!
//! ## Architecture
//!
//! - **`BrowserWindow`**: Owns the `WebDriver` session and reads the slot
//! - **Notification**: Closed set of banner variants with their actions
//! - **`wait_for_notification`**: Polls a slot until it matches an expectation
//! - **`WebServer`**: Serves the page and add-on that trigger an install
//! - **`HarnessConfig`**: Layered configuration (defaults, TOML, environment)
//!
//! ## Example Usage
//!
//! ```ignore
//! use firefox_notifications::{
//!     AddOnInstallBlocked, AddOnInstallComplete, AddOnInstallConfirmation, BrowserWindow,
//!     HarnessConfig, NotificationView, StaticFileServer, WebServer,
//! };
//!
//! #[tokio::test]
//! async fn install_addon() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HarnessConfig::load()?;
//!     let server = StaticFileServer::start("fixtures").await?;
//!     let window = BrowserWindow::connect(&config).await?;
//!
//!     window.navigate(&server.url("/")).await?;
//!     window.click_link("webextension.xpi").await?;
//!
//!     let blocked = window.wait_for::<AddOnInstallBlocked>().await?;
//!     blocked.allow().await?;
//!
//!     let confirmation = window.wait_for::<AddOnInstallConfirmation>().await?;
//!     assert_eq!(confirmation.addon_name().await?, "WebExtension");
//!     confirmation.install().await?;
//!
//!     let complete = window.wait_for::<AddOnInstallComplete>().await?;
//!     complete.close().await?;
//!     window.wait_for_none().await?;
//!
//!     window.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Testing Strategy
//!
//! 1. **Unit tests**: The waiter against scripted slots, configuration,
//!    the web server
//! 2. **Integration tests**: Real Firefox through geckodriver
//!
//! Run with `cargo test` (unit) or `cargo test -- --ignored` (integration,
//! needs geckodriver listening on the configured URL).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod browser;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod notification;
pub mod server;
pub mod wait;
pub mod waiter;

// Re-export main types for convenience
pub use browser::BrowserWindow;
pub use config::{HarnessConfig, WaitSettings};
pub use context::Context;
pub use error::{NotificationError, Result};
pub use notification::{
    AddOnInstallBlocked, AddOnInstallComplete, AddOnInstallConfirmation, AddOnInstallFailed,
    AddOnProgress, BaseNotification, Classified, Notification, NotificationKind,
    NotificationVariant, NotificationView,
};
pub use server::{StaticFileServer, StaticUrlServer, WebServer};
pub use wait::{DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, WaitConfig};
pub use waiter::{Expected, NotificationSlot, wait_for_notification};
