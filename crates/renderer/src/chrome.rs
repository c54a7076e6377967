// Chrome DevTools Protocol driver for the Browser/Page traits

use crate::browser::{Browser, BrowserLauncher, LaunchOptions, Page};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::handler::viewport::Viewport as CdpViewport;
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use std::path::Path;
use tokio::task::JoinHandle;

/// Launches a headless Chrome/Chromium/Edge process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeLauncher;

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self, executable: &Path, options: LaunchOptions) -> Result<Box<dyn Browser>> {
        let viewport = CdpViewport {
            width: options.viewport.width,
            height: options.viewport.height,
            ..Default::default()
        };

        let config = BrowserConfig::builder()
            .chrome_executable(executable)
            .no_sandbox()
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .window_size(options.viewport.width, options.viewport.height)
            .viewport(viewport)
            .request_timeout(options.request_timeout)
            .build()
            .map_err(|e| anyhow!("Invalid browser configuration: {}", e))?;

        let (browser, mut handler) = CdpBrowser::launch(config)
            .await
            .with_context(|| format!("Failed to launch browser at {}", executable.display()))?;

        // The handler drives the DevTools connection and must be polled
        // for as long as the browser is in use.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "browser handler event error");
                }
            }
        });

        tracing::info!(executable = %executable.display(), "browser launched");

        Ok(Box::new(ChromeBrowser {
            browser,
            handler_task,
        }))
    }
}

struct ChromeBrowser {
    browser: CdpBrowser,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl Browser for ChromeBrowser {
    async fn new_page(&self) -> Result<Box<dyn Page>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("Failed to create page")?;
        Ok(Box::new(ChromePage { page }))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let ChromeBrowser {
            mut browser,
            handler_task,
        } = *self;

        let result = shut_down(&mut browser).await;
        handler_task.abort();

        result?;
        tracing::info!("browser closed");
        Ok(())
    }
}

/// Process-level calls made when closing a browser.
#[async_trait]
trait BrowserProcess: Send {
    /// Ask the browser to exit over the DevTools connection.
    async fn request_close(&mut self) -> Result<()>;
    async fn force_kill(&mut self) -> Result<()>;
    async fn wait_exit(&mut self) -> Result<()>;
}

#[async_trait]
impl BrowserProcess for CdpBrowser {
    async fn request_close(&mut self) -> Result<()> {
        self.close().await?;
        Ok(())
    }

    async fn force_kill(&mut self) -> Result<()> {
        // `None` means the process was never spawned by us
        if let Some(result) = self.kill().await {
            result?;
        }
        Ok(())
    }

    async fn wait_exit(&mut self) -> Result<()> {
        self.wait().await?;
        Ok(())
    }
}

/// Close, killing the process first if the close request failed, then
/// wait for it to exit.
async fn shut_down(process: &mut dyn BrowserProcess) -> Result<()> {
    let closed = process.request_close().await;
    if closed.is_err() {
        // A still-running process would block `wait_exit` forever
        if let Err(e) = process.force_kill().await {
            tracing::warn!(error = %e, "failed to kill browser process");
        }
    }
    let waited = process.wait_exit().await;

    closed.context("Failed to close browser")?;
    waited.context("Failed waiting for browser to exit")?;
    Ok(())
}

struct ChromePage {
    page: CdpPage,
}

#[async_trait]
impl Page for ChromePage {
    /// Waits for the `networkIdle` lifecycle event of this navigation: no
    /// network connections for 500ms after load.
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.page
            .execute(SetLifecycleEventsEnabledParams::new(true))
            .await
            .context("Failed to enable lifecycle events")?;

        // Subscribe before navigating so no event of the new document is missed
        let mut events = self
            .page
            .event_listener::<EventLifecycleEvent>()
            .await
            .context("Failed to subscribe to lifecycle events")?;

        self.page.goto(url).await?;

        let mut idle = NetworkIdle::default();
        while let Some(event) = events.next().await {
            if idle.observe(&event.name, &event.frame_id, &event.loader_id) {
                return Ok(());
            }
        }

        Err(anyhow!("Page closed before the network became idle"))
    }

    async fn content(&mut self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.page.close().await?;
        Ok(())
    }
}

/// Tracks lifecycle events until the navigation that was just started
/// reaches `networkIdle`.
///
/// The first `init` seen after subscribing belongs to the new document's main
/// frame. Later events from about:blank or child frames carry another frame or
/// loader id and are ignored.
#[derive(Debug)]
struct NetworkIdle<F, L> {
    navigation: Option<(F, L)>,
}

impl<F, L> Default for NetworkIdle<F, L> {
    fn default() -> Self {
        Self { navigation: None }
    }
}

impl<F: Clone + PartialEq, L: Clone + PartialEq> NetworkIdle<F, L> {
    /// Feed one event; true once this navigation's network is idle.
    fn observe(&mut self, name: &str, frame_id: &F, loader_id: &L) -> bool {
        match &self.navigation {
            None => {
                if name == "init" {
                    self.navigation = Some((frame_id.clone(), loader_id.clone()));
                }
                false
            }
            Some((frame, loader)) => {
                name == "networkIdle" && frame == frame_id && loader == loader_id
            }
        }
    }
}
