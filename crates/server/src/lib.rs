use anyhow::{Context, Result};
use axum::{
    Router,
    handler::HandlerWithoutStateExt,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Local HTTP server for a built single-page site.
///
/// Existing files are served as-is. Every other path, directories
/// included, gets the root document captured at startup, so client-side
/// routes resolve the same way they do behind production hosting.
/// Directory listing is never produced.
///
/// The listening socket is held until [`StaticServer::shutdown`] is called
/// or the handle is dropped.
pub struct StaticServer {
    addr: SocketAddr,
    root: PathBuf,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl StaticServer {
    /// Bind `addr` and start serving `root` in the background.
    ///
    /// Returns an error (rather than waiting) if the address is in use.
    pub async fn start(root: impl Into<PathBuf>, addr: SocketAddr) -> Result<Self> {
        let root = root.into();

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind static server to {}", addr))?;
        let addr = listener.local_addr()?;

        let shell = read_shell(&root).await;
        let app = router(&root, shell);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tracing::info!(addr = %addr, root = %root.display(), "static server listening");

        Ok(Self {
            addr,
            root,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `http://127.0.0.1:<port>`
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop accepting connections and wait for the server task to finish.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.await
                .context("Static server task panicked")?
                .context("Static server error")?;
        }
        tracing::info!(addr = %self.addr, "static server stopped");
        Ok(())
    }

    /// Run until the process receives Ctrl+C.
    pub async fn wait_for_ctrl_c(self) -> Result<()> {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")?;
        self.shutdown().await
    }
}

impl Drop for StaticServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn read_shell(root: &Path) -> Option<Arc<str>> {
    let index = root.join("index.html");
    match tokio::fs::read_to_string(&index).await {
        Ok(html) => Some(html.into()),
        Err(e) => {
            tracing::warn!(path = %index.display(), error = %e, "root document unavailable, unmatched paths will 404");
            None
        }
    }
}

/// Router serving files under `root`, falling back to `shell`.
pub fn router(root: &Path, shell: Option<Arc<str>>) -> Router {
    let serve_shell = move || {
        let shell = shell.clone();
        async move { shell_response(shell.as_deref()) }
    };

    let files = ServeDir::new(root)
        .append_index_html_on_directories(false)
        .fallback(serve_shell.into_service());

    Router::new()
        .fallback_service(files)
        .layer(TraceLayer::new_for_http())
}

/// The root document with status 200, or a plain 404 when there is none.
pub fn shell_response(shell: Option<&str>) -> Response {
    match shell {
        Some(html) => Html(html.to_string()).into_response(),
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SHELL: &str =
        "<!doctype html><html><head></head><body><div id=\"root\"></div></body></html>";

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), SHELL).unwrap();
        fs::create_dir_all(dir.path().join("assets")).unwrap();
        fs::write(dir.path().join("assets/app.js"), "console.log('app');").unwrap();
        dir
    }

    fn loopback() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    #[tokio::test]
    async fn test_serves_existing_file() {
        let dir = site();
        let server = StaticServer::start(dir.path(), loopback()).await.unwrap();

        let response = reqwest::get(format!("{}/assets/app.js", server.base_url()))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "console.log('app');");

        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unmatched_paths_get_shell() {
        let dir = site();
        let server = StaticServer::start(dir.path(), loopback()).await.unwrap();

        for path in ["/", "/about", "/blog/hello-world", "/admin/dashboard"] {
            let response = reqwest::get(format!("{}{}", server.base_url(), path))
                .await
                .unwrap();
            assert_eq!(response.status(), 200, "status for {}", path);
            assert_eq!(response.text().await.unwrap(), SHELL, "body for {}", path);
        }

        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_directories_are_not_listed() {
        let dir = site();
        let server = StaticServer::start(dir.path(), loopback()).await.unwrap();

        let body = reqwest::get(format!("{}/assets/", server.base_url()))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, SHELL);
        assert!(!body.contains("app.js"));

        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shell_is_captured_at_startup() {
        let dir = site();
        let server = StaticServer::start(dir.path(), loopback()).await.unwrap();

        // Overwriting index.html (as the root snapshot does) must not change the shell
        fs::write(dir.path().join("index.html"), "<html>rendered</html>").unwrap();

        let body = reqwest::get(format!("{}/contact", server.base_url()))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, SHELL);

        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_shell_returns_404() {
        let dir = TempDir::new().unwrap();
        let server = StaticServer::start(dir.path(), loopback()).await.unwrap();

        let response = reqwest::get(format!("{}/about", server.base_url()))
            .await
            .unwrap();
        assert_eq!(response.status(), 404);

        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_port_in_use_is_error() {
        let dir = site();
        let first = StaticServer::start(dir.path(), loopback()).await.unwrap();

        let result = StaticServer::start(dir.path(), first.local_addr()).await;
        let err = result.err().unwrap();
        assert!(format!("{:#}", err).contains("Failed to bind"));

        first.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_releases_port() {
        let dir = site();
        let server = StaticServer::start(dir.path(), loopback()).await.unwrap();
        let addr = server.local_addr();
        server.shutdown().await.unwrap();

        let again = StaticServer::start(dir.path(), addr).await.unwrap();
        again.shutdown().await.unwrap();
    }

    #[test]
    fn test_shell_response_status() {
        assert_eq!(shell_response(Some(SHELL)).status(), StatusCode::OK);
        assert_eq!(shell_response(None).status(), StatusCode::NOT_FOUND);
    }
}
