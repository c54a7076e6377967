use async_trait::async_trait;
use prerender_core::Viewport;
use std::path::Path;

/// Settings applied when starting the browser process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchOptions {
    pub viewport: Viewport,
    /// Upper bound for a single DevTools request, navigation included.
    pub request_timeout: std::time::Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            request_timeout: std::time::Duration::from_secs(60),
        }
    }
}

/// Starts a browser from an executable found by a [`crate::BrowserLocator`].
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, executable: &Path, options: LaunchOptions)
    -> anyhow::Result<Box<dyn Browser>>;
}

/// A running browser process.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Open a fresh, isolated page.
    async fn new_page(&self) -> anyhow::Result<Box<dyn Page>>;

    /// Close the browser and wait for the process to exit.
    async fn close(self: Box<Self>) -> anyhow::Result<()>;
}

/// One open browser page.
#[async_trait]
pub trait Page: Send {
    /// Navigate to `url` and return once the network is idle.
    async fn navigate(&mut self, url: &str) -> anyhow::Result<()>;

    /// Serialize the current document, doctype included.
    async fn content(&mut self) -> anyhow::Result<String>;

    async fn close(self: Box<Self>) -> anyhow::Result<()>;
}
