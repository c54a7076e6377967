pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, ContentStoreConfig, parse_config_toml, parse_config_toml_str};
pub use error::{Error, Result};
pub use types::*;
