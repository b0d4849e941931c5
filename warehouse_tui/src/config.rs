//! Configuration loading for the warehouse front end.

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::Deserialize;
use warehouse_core::{generate::GeneratorConfig, simulation::SimulationOptions};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "warehouse.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub simulation: SimulationOptions,
    pub display: DisplayConfig,
    /// Used when a map is generated with `--random`.
    pub generator: GeneratorConfig,
}

/// Pacing of the terminal view.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Time between simulation ticks.
    pub tick_rate_ms: u64,
    /// Time the first frame stays on screen before the first tick.
    pub start_delay_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            tick_rate_ms: 250,
            start_delay_ms: 1000,
        }
    }
}

impl DisplayConfig {
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }
}

impl AppConfig {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("In config file {}", path.display()))
    }

    /// Loads `path` if given, else the default file when it exists, else
    /// built-in defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::load(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }
}
