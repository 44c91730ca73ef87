//! Web servers that trigger add-on installs.
//!
//! Notification tests need a page with a link to an `.xpi` file, and need to
//! know the host that served it: Firefox reports that host as the banner's
//! origin. `WebServer` is the minimal interface for that; `StaticFileServer`
//! serves a local directory, `StaticUrlServer` points at something already
//! running.

use crate::error::{NotificationError, Result};
use async_trait::async_trait;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use std::fmt::{self, Write as _};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

/// A running web server that test pages are loaded from.
///
/// The trait is object-safe, allowing dynamic dispatch when needed.
#[async_trait]
pub trait WebServer: Send + Sync {
    /// Returns the base URL of the server (e.g., `<http://127.0.0.1:8000>`).
    fn base_url(&self) -> &str;

    /// Returns the host Firefox will report as a notification's origin.
    fn host(&self) -> &str;

    /// Performs a health check to ensure the server is responsive.
    ///
    /// The default implementation returns Ok(()), assuming the server is healthy.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    /// Returns a full URL by joining a path to the base URL.
    ///
    /// ```ignore
    /// server.url("/webextension.xpi") // "http://127.0.0.1:8000/webextension.xpi"
    /// ```
    fn url(&self, path: &str) -> String {
        let base = self.base_url().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

impl fmt::Debug for dyn WebServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebServer")
            .field("base_url", &self.base_url())
            .field("host", &self.host())
            .finish()
    }
}

/// Serves a directory on an ephemeral localhost port.
///
/// `/` lists the directory with one link per file, the link text being the
/// file name; every other path is served from the directory itself.
///
/// ```ignore
/// let server = StaticFileServer::start(fixtures_dir).await?;
/// window.navigate(&server.url("/")).await?;
/// window.click_link("webextension.xpi").await?;
/// ```
#[derive(Debug)]
pub struct StaticFileServer {
    base_url: String,
    host: String,
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl StaticFileServer {
    /// Starts serving `root` on `127.0.0.1` with an OS-assigned port.
    ///
    /// # Errors
    ///
    /// Returns `Server` if `root` is not a directory, or `Io` if binding fails.
    pub async fn start(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(NotificationError::Server {
                reason: format!("{} is not a directory", root.display()),
                source: None,
            });
        }

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let addr = listener.local_addr()?;

        let app = Router::new()
            .route("/", get(index))
            .fallback_service(ServeDir::new(&root))
            .with_state(Arc::new(root.clone()));

        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = signal.await;
            });
            if let Err(e) = server.await {
                warn!("web server stopped with error: {}", e);
            }
        });

        let host = addr.ip().to_string();
        let base_url = format!("http://{host}:{}", addr.port());
        info!(%base_url, root = %root.display(), "web server started");

        Ok(Self {
            base_url,
            host,
            addr,
            shutdown: Some(shutdown),
            task,
        })
    }

    /// The socket address the server listens on.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stops the server and waits for it to finish.
    ///
    /// # Errors
    ///
    /// Returns `Server` if the server task panicked.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }

        (&mut self.task)
            .await
            .map_err(|e| NotificationError::Server {
                reason: "server task failed".to_string(),
                source: Some(Box::new(e)),
            })?;

        debug!(base_url = %self.base_url, "web server stopped");
        Ok(())
    }
}

#[async_trait]
impl WebServer for StaticFileServer {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn host(&self) -> &str {
        &self.host
    }

    async fn health_check(&self) -> Result<()> {
        if self.task.is_finished() {
            return Err(NotificationError::Server {
                reason: format!("server at {} is no longer running", self.base_url),
                source: None,
            });
        }
        Ok(())
    }
}

impl Drop for StaticFileServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

async fn index(State(root): State<Arc<PathBuf>>) -> Response {
    match list_files(&root).await {
        Ok(names) => Html(render_index(&names)).into_response(),
        Err(e) => {
            warn!("failed to list {}: {}", root.display(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to list directory").into_response()
        }
    }
}

async fn list_files(root: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(root).await?;
    let mut names = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    names.sort();
    Ok(names)
}

/// Renders the directory listing page.
fn render_index(names: &[String]) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head><title>Directory listing</title></head>\n<body>\n<ul>\n",
    );

    for name in names {
        let escaped = escape_html(name);
        let _ = writeln!(html, "<li><a href=\"{escaped}\">{escaped}</a></li>");
    }

    html.push_str("</ul>\n</body>\n</html>\n");
    html
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// A server that is already running somewhere else.
///
/// ```ignore
/// let server = StaticUrlServer::new("http://localhost:8080");
/// window.navigate(&server.url("/")).await?;
/// ```
#[derive(Debug, Clone)]
pub struct StaticUrlServer {
    base_url: String,
    host: String,
}

impl StaticUrlServer {
    /// Creates a new static URL server.
    ///
    /// The host is taken from the URL; an unparseable URL yields an empty host.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let host = url::Url::parse(&base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default();
        Self { base_url, host }
    }
}

#[async_trait]
impl WebServer for StaticUrlServer {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn host(&self) -> &str {
        &self.host
    }
}
