use std::env;
use std::path::{Path, PathBuf};

/// Finds a runnable browser executable.
pub trait BrowserLocator: Send + Sync {
    fn locate(&self) -> Option<PathBuf>;
}

/// Always returns the same answer; used for explicit overrides and tests.
#[derive(Debug, Clone, Default)]
pub struct FixedLocator(pub Option<PathBuf>);

impl BrowserLocator for FixedLocator {
    fn locate(&self) -> Option<PathBuf> {
        self.0.clone()
    }
}

const WINDOWS_SUFFIXES: &[&str] = &[
    r"Google\Chrome\Application\chrome.exe",
    r"Google\Chrome Beta\Application\chrome.exe",
    r"Google\Chrome Canary\Application\chrome.exe",
    r"Microsoft\Edge\Application\msedge.exe",
];

const WINDOWS_PREFIX_VARS: &[&str] = &["LOCALAPPDATA", "PROGRAMFILES", "PROGRAMFILES(X86)"];

const WINDOWS_PREFIXES: &[&str] = &[r"C:\Program Files", r"C:\Program Files (x86)"];

const MACOS_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Google Chrome Beta.app/Contents/MacOS/Google Chrome Beta",
    "/Applications/Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
];

const LINUX_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/google-chrome-beta",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/usr/bin/microsoft-edge",
    "/snap/bin/chromium",
    "/opt/google/chrome/chrome",
];

const PATH_NAMES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "microsoft-edge",
    "chrome",
    "msedge",
];

/// Checks well-known installation paths across vendors and channels,
/// then executables on `PATH`.
///
/// Candidates are tried in this order:
/// 1. the explicit override, if any
/// 2. Windows install prefixes × Chrome/Beta/Canary/Edge
/// 3. macOS application bundles
/// 4. Linux package paths
/// 5. well-known executable names on `PATH`
#[derive(Debug, Clone)]
pub struct KnownPathsLocator {
    candidates: Vec<PathBuf>,
}

impl KnownPathsLocator {
    /// Candidates from the running system's environment.
    pub fn from_env(explicit: Option<PathBuf>) -> Self {
        Self::with_env(explicit, |key| env::var_os(key).map(PathBuf::from))
    }

    /// Candidates built from `lookup` instead of the process environment.
    pub fn with_env<F>(explicit: Option<PathBuf>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<PathBuf>,
    {
        let mut candidates: Vec<PathBuf> = explicit.into_iter().collect();

        let prefixes = WINDOWS_PREFIX_VARS
            .iter()
            .filter_map(|var| lookup(var))
            .filter(|p| !p.as_os_str().is_empty())
            .chain(WINDOWS_PREFIXES.iter().map(PathBuf::from));
        for prefix in prefixes {
            for suffix in WINDOWS_SUFFIXES {
                candidates.push(join_windows(&prefix, suffix));
            }
        }

        candidates.extend(MACOS_PATHS.iter().map(PathBuf::from));
        candidates.extend(LINUX_PATHS.iter().map(PathBuf::from));

        if let Some(path_var) = lookup("PATH") {
            for dir in env::split_paths(&path_var) {
                for name in PATH_NAMES {
                    candidates.push(dir.join(name));
                    if cfg!(windows) {
                        candidates.push(dir.join(format!("{}.exe", name)));
                    }
                }
            }
        }

        Self { candidates }
    }

    /// Check exactly `candidates`, in order.
    pub fn with_candidates(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }
}

impl BrowserLocator for KnownPathsLocator {
    fn locate(&self) -> Option<PathBuf> {
        let found = self.candidates.iter().find(|p| p.is_file()).cloned();
        match &found {
            Some(path) => tracing::debug!(path = %path.display(), "browser executable found"),
            None => tracing::debug!(checked = self.candidates.len(), "no browser executable found"),
        }
        found
    }
}

// Windows suffixes use backslashes; join them component-wise so the result
// is well-formed on every host.
fn join_windows(prefix: &Path, suffix: &str) -> PathBuf {
    suffix
        .split('\\')
        .fold(prefix.to_path_buf(), |path, part| path.join(part))
}
