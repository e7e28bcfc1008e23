use chrono::Weekday;
use serde::Deserialize;

use crate::types::LeadDefinition;

/// Root application configuration. Loaded from environment variables
/// with the prefix `ADBOARD__` and an optional TOML config file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub reporting: ReportingConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportingConfig {
    #[serde(default)]
    pub lead_definition: LeadDefinition,
    #[serde(default)]
    pub week_start: WeekStart,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_path")]
    pub path: String,
    /// Maximum number of fetched snapshots shared between views.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

/// First day of the week for the `this-week` / `last-week` date modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    pub fn weekday(&self) -> Weekday {
        match self {
            Self::Sunday => Weekday::Sun,
            Self::Monday => Weekday::Mon,
        }
    }
}

// Default functions
fn default_top_n() -> usize {
    10
}
fn default_source_path() -> String {
    "data/records.json".to_string()
}
fn default_cache_capacity() -> usize {
    16
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            lead_definition: LeadDefinition::default(),
            week_start: WeekStart::default(),
            top_n: default_top_n(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_source_path(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            reporting: ReportingConfig::default(),
            source: SourceConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and an optional config file.
    pub fn load(file: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("ADBOARD")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
