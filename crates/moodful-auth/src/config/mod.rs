//! Configuration management
//!
//! Supports configuration loading with precedence: env > file > CLI > defaults

mod builder;
mod env;
mod file;

pub use builder::{Config, ConfigBuilder, HttpConfig, TelemetryConfig};

use std::path::Path;

use crate::Result;

/// Apply the config file and then the environment on top of `builder`.
///
/// Values already on `builder` (typically CLI arguments) are kept unless a
/// file or environment variable overrides them. Without an explicit `path`
/// the standard locations are searched.
pub fn layer_sources(mut builder: ConfigBuilder, path: Option<&Path>) -> Result<ConfigBuilder> {
    let path = path.map(Path::to_path_buf).or_else(file::find_config_file);

    if let Some(path) = path {
        tracing::info!("Loading configuration from {}", path.display());
        builder = file::load_from_file(&path, builder)?;
    }

    env::load_from_env(builder)
}
