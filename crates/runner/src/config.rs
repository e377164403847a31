//! Configuration loading for the blotter runner
//!
//! One JSON document configures:
//! - View timing, projection workers and update policy
//! - The simulated trade flow (customers, currency pairs, rates)
//! - Initial page size, sort preset and search text
//! - An optional script of control changes applied while running

use blotter_core::{DEFAULT_PAGE_SIZE, SortSelection};
use blotter_feed::GeneratorConfig;
use blotter_view::ViewOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Root configuration for the blotter runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlotterConfig {
    #[serde(default)]
    pub view: ViewOptions,

    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Interval between generator ticks
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Name of a sort preset
    #[serde(default = "default_sort")]
    pub sort: String,

    #[serde(default)]
    pub search_text: String,

    /// Stop after this long; run until Ctrl-C when absent
    #[serde(default)]
    pub run_for_ms: Option<u64>,

    /// Rows printed per page snapshot
    #[serde(default = "default_rows_shown")]
    pub rows_shown: usize,

    /// Control changes applied at fixed offsets from start
    #[serde(default)]
    pub script: Vec<ScriptStep>,
}

/// One scripted control change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    /// Offset from session start
    pub at_ms: u64,
    #[serde(default)]
    pub search_text: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
    /// Sort preset name
    #[serde(default)]
    pub sort: Option<String>,
}

fn default_tick_interval_ms() -> u64 {
    250
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_sort() -> String {
    SortSelection::default().name
}

fn default_rows_shown() -> usize {
    5
}

impl Default for BlotterConfig {
    fn default() -> Self {
        Self {
            view: ViewOptions::default(),
            generator: GeneratorConfig::default(),
            tick_interval_ms: default_tick_interval_ms(),
            page_size: default_page_size(),
            sort: default_sort(),
            search_text: String::new(),
            run_for_ms: None,
            rows_shown: default_rows_shown(),
            script: Vec::new(),
        }
    }
}

impl BlotterConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be positive".into()));
        }
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be positive".into()));
        }
        self.sort_selection()?;
        for step in &self.script {
            if let Some(sort) = &step.sort {
                resolve_sort(sort)?;
            }
        }
        self.generator
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn sort_selection(&self) -> Result<SortSelection, ConfigError> {
        resolve_sort(&self.sort)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn run_for(&self) -> Option<Duration> {
        self.run_for_ms.map(Duration::from_millis)
    }
}

/// Look up a sort preset by name
pub fn resolve_sort(name: &str) -> Result<SortSelection, ConfigError> {
    SortSelection::preset(name).ok_or_else(|| {
        let known: Vec<String> = SortSelection::presets().into_iter().map(|s| s.name).collect();
        ConfigError::Invalid(format!(
            "unknown sort '{}', expected one of: {}",
            name,
            known.join(", ")
        ))
    })
}

/// Configuration errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
