use anyhow::Result;
use prerender_discovery::{ContentSource, discover_routes};
use std::path::Path;

use super::{content_source, load_config};

/// Print every route a run would render, in render order.
pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let source = content_source(&config);

    let routes = discover_routes(
        &config.static_routes,
        source.as_ref().map(|s| s as &dyn ContentSource),
    )
    .await;

    for route in &routes {
        println!("{}", route);
    }
    eprintln!("{} routes", routes.len());

    Ok(())
}
