// Headless rendering of a built single-page site into static snapshots

pub mod browser;
pub mod chrome;
pub mod locator;
pub mod render;
pub mod shell;

pub use browser::{Browser, BrowserLauncher, LaunchOptions, Page};
pub use chrome::ChromeLauncher;
pub use locator::{BrowserLocator, FixedLocator, KnownPathsLocator};
pub use render::{RenderOptions, render_routes};
pub use shell::{ShellPreservation, preserve_spa_shell};
