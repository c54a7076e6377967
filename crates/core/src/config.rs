use crate::error::{Error, Result};
use crate::types::{Route, Viewport};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Marketing routes rendered on every run, before any discovered content.
pub const DEFAULT_STATIC_ROUTES: &[&str] = &[
    "/",
    "/about",
    "/services",
    "/portfolio",
    "/blog",
    "/faq",
    "/contact",
    "/privacy-policy",
    "/terms-of-use",
];

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Complete prerender configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Built site, read by the server and rewritten with snapshots.
    pub dist_dir: PathBuf,
    pub port: u16,
    pub static_routes: Vec<Route>,
    /// Upper bound for a page to reach network idle.
    pub navigation_timeout: Duration,
    /// Extra wait after network idle for late client-side mounting.
    pub settle_delay: Duration,
    pub viewport: Viewport,
    /// Explicit browser executable; skips probing when set.
    pub browser: Option<PathBuf>,
    /// Remote content store; `None` limits discovery to static routes.
    pub content_store: Option<ContentStoreConfig>,
}

/// Credentials for the hosted content store
#[derive(Clone, PartialEq)]
pub struct ContentStoreConfig {
    pub url: String,
    pub anon_key: String,
}

impl std::fmt::Debug for ContentStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStoreConfig")
            .field("url", &self.url)
            .field("anon_key", &"<redacted>")
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dist_dir: PathBuf::from("dist"),
            port: DEFAULT_PORT,
            static_routes: DEFAULT_STATIC_ROUTES
                .iter()
                .filter_map(|r| Route::parse(r).ok())
                .collect(),
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            viewport: Viewport::default(),
            browser: None,
            content_store: None,
        }
    }
}

/// Raw TOML configuration structure
/// Every key is optional; missing keys keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    dist: Option<String>,
    #[serde(default)]
    server: RawServer,
    #[serde(default)]
    routes: RawRoutes,
    #[serde(default)]
    render: RawRender,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawServer {
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRoutes {
    #[serde(rename = "static")]
    static_routes: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRender {
    navigation_timeout_secs: Option<u64>,
    settle_delay_ms: Option<u64>,
    viewport_width: Option<u32>,
    viewport_height: Option<u32>,
    browser: Option<String>,
}

/// Parse prerender.toml from a file path
pub fn parse_config_toml<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    parse_config_toml_str(&content)
}

/// Parse prerender.toml from a string (useful for testing)
pub fn parse_config_toml_str(content: &str) -> Result<Config> {
    let raw: RawConfig = toml::from_str(content)?;
    let mut config = Config::default();

    if let Some(dist) = raw.dist {
        config.dist_dir = non_empty_path(&dist, "dist")?;
    }

    if let Some(port) = raw.server.port {
        config.port = port;
    }

    if let Some(routes) = raw.routes.static_routes {
        config.static_routes = routes
            .iter()
            .map(|r| {
                Route::parse(r).map_err(|e| {
                    Error::ConfigParse(format!("Invalid entry in 'routes.static': {}", e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
    }

    if let Some(secs) = raw.render.navigation_timeout_secs {
        config.navigation_timeout =
            Duration::from_secs(positive(secs, "render.navigation_timeout_secs")?);
    }

    if let Some(ms) = raw.render.settle_delay_ms {
        config.settle_delay = Duration::from_millis(ms);
    }

    if let Some(width) = raw.render.viewport_width {
        config.viewport.width = positive(width.into(), "render.viewport_width")? as u32;
    }

    if let Some(height) = raw.render.viewport_height {
        config.viewport.height = positive(height.into(), "render.viewport_height")? as u32;
    }

    if let Some(browser) = raw.render.browser {
        config.browser = Some(non_empty_path(&browser, "render.browser")?);
    }

    Ok(config)
}

impl Config {
    /// Load defaults, then overlay `path` when given.
    ///
    /// A missing file is an error only when the path was given explicitly.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => parse_config_toml(path).map_err(|e| match e {
                Error::Io(err) => {
                    Error::ConfigParse(format!("Failed to read {}: {}", path.display(), err))
                }
                other => other,
            }),
            None => Ok(Config::default()),
        }
    }

    /// Overlay environment variables read through `lookup`.
    ///
    /// Recognised variables:
    /// - `VITE_SUPABASE_URL` / `SUPABASE_URL`: content store base URL
    /// - `VITE_SUPABASE_ANON_KEY` / `SUPABASE_ANON_KEY`: content store anonymous key
    /// - `PRERENDER_DIST_DIR`, `PRERENDER_PORT`
    /// - `PRERENDER_TIMEOUT_SECS`, `PRERENDER_SETTLE_MS`
    /// - `CHROME_PATH`: browser executable
    ///
    /// Empty values are treated as unset. The content store is only
    /// configured when both the URL and the key are present.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(dist) = get("PRERENDER_DIST_DIR") {
            self.dist_dir = PathBuf::from(dist);
        }

        if let Some(port) = get("PRERENDER_PORT") {
            self.port = parse_number(&port, "PRERENDER_PORT")?;
        }

        if let Some(secs) = get("PRERENDER_TIMEOUT_SECS") {
            let secs = parse_number(&secs, "PRERENDER_TIMEOUT_SECS")?;
            self.navigation_timeout =
                Duration::from_secs(positive(secs, "PRERENDER_TIMEOUT_SECS")?);
        }

        if let Some(ms) = get("PRERENDER_SETTLE_MS") {
            self.settle_delay = Duration::from_millis(parse_number(&ms, "PRERENDER_SETTLE_MS")?);
        }

        if let Some(browser) = get("CHROME_PATH") {
            self.browser = Some(PathBuf::from(browser));
        }

        let url = get("VITE_SUPABASE_URL").or_else(|| get("SUPABASE_URL"));
        let key = get("VITE_SUPABASE_ANON_KEY").or_else(|| get("SUPABASE_ANON_KEY"));
        if let (Some(url), Some(anon_key)) = (url, key) {
            self.content_store = Some(ContentStoreConfig {
                url: url.trim_end_matches('/').to_string(),
                anon_key,
            });
        }

        tracing::debug!(
            dist = %self.dist_dir.display(),
            port = self.port,
            routes = self.static_routes.len(),
            content_store = self.content_store.is_some(),
            "configuration loaded"
        );

        Ok(())
    }

    /// Overlay the real process environment.
    pub fn apply_process_env(&mut self) -> Result<()> {
        self.apply_env(|key| std::env::var(key).ok())
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, name: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::ConfigParse(format!("Invalid number in '{}': '{}'", name, value)))
}

fn positive(value: u64, name: &str) -> Result<u64> {
    if value == 0 {
        return Err(Error::ConfigParse(format!(
            "'{}' must be greater than zero",
            name
        )));
    }
    Ok(value)
}

fn non_empty_path(value: &str, name: &str) -> Result<PathBuf> {
    if value.trim().is_empty() {
        return Err(Error::ConfigParse(format!(
            "Empty path in '{}' field",
            name
        )));
    }
    Ok(PathBuf::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.dist_dir, PathBuf::from("dist"));
        assert_eq!(config.port, 3000);
        assert_eq!(config.navigation_timeout, Duration::from_secs(60));
        assert_eq!(config.settle_delay, Duration::from_millis(1000));
        assert_eq!(config.viewport, Viewport::default());
        assert!(config.content_store.is_none());

        let routes: Vec<&str> = config.static_routes.iter().map(Route::as_str).collect();
        assert_eq!(routes, DEFAULT_STATIC_ROUTES);
    }

    #[test]
    fn test_parse_empty_config() {
        assert_eq!(parse_config_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
dist = "build"

[server]
port = 4173

[routes]
static = ["/", "/about/", "/pricing"]

[render]
navigation_timeout_secs = 30
settle_delay_ms = 250
viewport_width = 1440
viewport_height = 900
browser = "/usr/bin/chromium"
        "#;

        let config = parse_config_toml_str(toml).unwrap();
        assert_eq!(config.dist_dir, PathBuf::from("build"));
        assert_eq!(config.port, 4173);
        let routes: Vec<&str> = config.static_routes.iter().map(Route::as_str).collect();
        assert_eq!(routes, vec!["/", "/about", "/pricing"]);
        assert_eq!(config.navigation_timeout, Duration::from_secs(30));
        assert_eq!(config.settle_delay, Duration::from_millis(250));
        assert_eq!((config.viewport.width, config.viewport.height), (1440, 900));
        assert_eq!(config.browser, Some(PathBuf::from("/usr/bin/chromium")));
    }

    #[test]
    fn test_parse_rejects_invalid_route() {
        let result = parse_config_toml_str("[routes]\nstatic = [\"/\", \"about\"]\n");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("routes.static"));
        assert!(err.contains("about"));
    }

    #[test]
    fn test_parse_rejects_zero_timeout() {
        let err = parse_config_toml_str("[render]\nnavigation_timeout_secs = 0\n").unwrap_err();
        assert!(err.to_string().contains("navigation_timeout_secs"));
    }

    #[test]
    fn test_parse_rejects_unknown_key() {
        assert!(parse_config_toml_str("[render]\nsettle = 3\n").is_err());
    }

    #[test]
    fn test_parse_allows_zero_settle_delay() {
        let config = parse_config_toml_str("[render]\nsettle_delay_ms = 0\n").unwrap();
        assert_eq!(config.settle_delay, Duration::ZERO);
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/prerender.toml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/prerender.toml"));
    }

    #[test]
    fn test_env_content_store() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("VITE_SUPABASE_URL", "https://abc.supabase.co/"),
                ("VITE_SUPABASE_ANON_KEY", "anon"),
            ]))
            .unwrap();
        let store = config.content_store.unwrap();
        assert_eq!(store.url, "https://abc.supabase.co");
        assert_eq!(store.anon_key, "anon");
    }

    #[test]
    fn test_env_content_store_fallback_names() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("SUPABASE_URL", "https://abc.supabase.co"),
                ("SUPABASE_ANON_KEY", "anon"),
            ]))
            .unwrap();
        assert!(config.content_store.is_some());
    }

    #[test]
    fn test_env_content_store_requires_both() {
        let mut config = Config::default();
        config
            .apply_env(env(&[("VITE_SUPABASE_URL", "https://abc.supabase.co")]))
            .unwrap();
        assert!(config.content_store.is_none());

        config
            .apply_env(env(&[
                ("VITE_SUPABASE_URL", "https://abc.supabase.co"),
                ("VITE_SUPABASE_ANON_KEY", "   "),
            ]))
            .unwrap();
        assert!(config.content_store.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("PRERENDER_DIST_DIR", "out"),
                ("PRERENDER_PORT", "8081"),
                ("PRERENDER_TIMEOUT_SECS", "5"),
                ("PRERENDER_SETTLE_MS", "0"),
                ("CHROME_PATH", "/opt/chrome/chrome"),
            ]))
            .unwrap();
        assert_eq!(config.dist_dir, PathBuf::from("out"));
        assert_eq!(config.port, 8081);
        assert_eq!(config.navigation_timeout, Duration::from_secs(5));
        assert_eq!(config.settle_delay, Duration::ZERO);
        assert_eq!(config.browser, Some(PathBuf::from("/opt/chrome/chrome")));
    }

    #[test]
    fn test_env_invalid_number() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("PRERENDER_PORT", "not-a-port")]))
            .unwrap_err();
        assert!(err.to_string().contains("PRERENDER_PORT"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let store = ContentStoreConfig {
            url: "https://abc.supabase.co".to_string(),
            anon_key: "secret-key".to_string(),
        };
        let debug = format!("{:?}", store);
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("abc.supabase.co"));
    }
}
