pub mod routes;
pub mod run;
pub mod serve;
pub mod verify;

use anyhow::{Context, Result};
use prerender_core::Config;
use prerender_discovery::SupabaseSource;
use std::path::Path;

const DEFAULT_CONFIG_FILE: &str = "prerender.toml";

/// Defaults, then prerender.toml, then the environment.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    let path = path.or_else(|| default_path.exists().then_some(default_path));

    let mut config = Config::load(path).context("Failed to load configuration")?;
    config
        .apply_process_env()
        .context("Invalid environment configuration")?;
    Ok(config)
}

/// Content store client, or `None` when unconfigured or unusable.
///
/// Discovery treats `None` as "static routes only", so a broken client
/// is logged rather than aborting the run.
pub fn content_source(config: &Config) -> Option<SupabaseSource> {
    let store = config.content_store.as_ref()?;
    match SupabaseSource::new(store) {
        Ok(source) => Some(source),
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "invalid content store configuration");
            None
        }
    }
}
