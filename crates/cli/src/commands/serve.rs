use anyhow::Result;
use prerender_server::StaticServer;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use super::load_config;

/// Serve the build output until Ctrl+C, with the same fallback rules the
/// renderer sees.
pub async fn run(
    config_path: Option<&Path>,
    dist: Option<PathBuf>,
    port: Option<u16>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(dist) = dist {
        config.dist_dir = dist;
    }
    if let Some(port) = port {
        config.port = port;
    }

    if !config.dist_dir.is_dir() {
        anyhow::bail!(
            "Build output does not exist: {}\nBuild the site first",
            config.dist_dir.display()
        );
    }

    println!("🌐 Starting static server...");
    println!("   Serving: {}", config.dist_dir.display());

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let server = StaticServer::start(&config.dist_dir, addr).await?;

    println!();
    println!("✅ Server running at {}", server.base_url());
    println!("   Press Ctrl+C to stop");
    println!();

    server.wait_for_ctrl_c().await
}
