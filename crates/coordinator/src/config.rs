use std::path::Path;

use anyhow::Context;
use config::{Config, Environment, File};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "coordinator";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Prefix of every overlay id this coordinator hands out.
    pub instance_id: String,
    pub menu_id: String,
    pub menu_title: String,
    pub overlay_hidden: bool,
    /// Used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            instance_id: "pixel-relay".into(),
            menu_id: "pixelate-image".into(),
            menu_title: "Pixelate image".into(),
            overlay_hidden: true,
            log_filter: "info".into(),
        }
    }
}

/// Defaults, then `coordinator.toml` in the working directory if present, then
/// `APP__*` environment variables.
pub fn load_settings() -> anyhow::Result<Settings> {
    build(File::with_name(DEFAULT_CONFIG_FILE).required(false))
}

pub fn load_settings_from(path: &Path) -> anyhow::Result<Settings> {
    build(File::from(path).required(true))
        .with_context(|| format!("failed to load settings from '{}'", path.display()))
}

fn build<S>(file: S) -> anyhow::Result<Settings>
where
    S: config::Source + Send + Sync + 'static,
{
    let settings = Config::builder()
        .add_source(file)
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()
        .context("failed to assemble coordinator settings")?
        .try_deserialize::<Settings>()
        .context("invalid coordinator settings")?;
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
