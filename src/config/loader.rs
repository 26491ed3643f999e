//! Configuration loading with multi-layer merge

use super::{IntegrationsConfig, MatcherConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level lift-assist configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AssistConfig {
    /// Global defaults
    #[serde(default)]
    pub defaults: Defaults,

    /// Problem matcher tuning
    #[serde(default)]
    pub matcher: MatcherConfig,

    /// Placeholder remote integrations (always disabled)
    #[serde(default)]
    pub integrations: IntegrationsConfig,
}

/// Global default settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    /// Simulated analysis latency in milliseconds
    #[serde(default = "default_analysis_delay")]
    pub analysis_delay_ms: u64,

    /// Simulated photo analysis latency in milliseconds
    #[serde(default = "default_photo_delay")]
    pub photo_delay_ms: u64,

    /// Path to the key-value database (`~` is expanded)
    pub database: Option<String>,
}

fn default_analysis_delay() -> u64 {
    1500
}

fn default_photo_delay() -> u64 {
    3000
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            analysis_delay_ms: default_analysis_delay(),
            photo_delay_ms: default_photo_delay(),
            database: None,
        }
    }
}

impl AssistConfig {
    /// Load configuration from the standard hierarchy
    ///
    /// Load order (later overrides earlier):
    /// 1. Built-in defaults
    /// 2. ~/.config/lift-assist/config.toml
    /// 3. .lift-assist/config.toml (project)
    /// 4. Explicit file passed on the command line
    pub fn load(project_dir: Option<&Path>, explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                let user_config = Self::load_file(&user_config_path)
                    .with_context(|| format!("loading {}", user_config_path.display()))?;
                config.merge(user_config);
            }
        }

        let project_config_path = project_dir
            .map(|p| p.join(".lift-assist/config.toml"))
            .unwrap_or_else(|| PathBuf::from(".lift-assist/config.toml"));

        if project_config_path.exists() {
            let project_config = Self::load_file(&project_config_path)
                .with_context(|| format!("loading {}", project_config_path.display()))?;
            config.merge(project_config);
        }

        if let Some(path) = explicit {
            let explicit_config =
                Self::load_file(path).with_context(|| format!("loading {}", path.display()))?;
            config.merge(explicit_config);
        }

        config.validate().map_err(|errors| {
            anyhow::anyhow!("configuration is invalid:\n  {}", errors.join("\n  "))
        })?;

        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Get the user config path (~/.config/lift-assist/config.toml)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lift-assist/config.toml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        if other.defaults.analysis_delay_ms != default_analysis_delay() {
            self.defaults.analysis_delay_ms = other.defaults.analysis_delay_ms;
        }
        if other.defaults.photo_delay_ms != default_photo_delay() {
            self.defaults.photo_delay_ms = other.defaults.photo_delay_ms;
        }
        if other.defaults.database.is_some() {
            self.defaults.database = other.defaults.database;
        }

        self.matcher.merge(other.matcher);
        self.integrations.merge(other.integrations);
    }

    /// Check cross-field constraints, collecting every problem found
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = self.matcher.validate();
        errors.extend(self.integrations.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Resolve the database path: configured value or the platform data dir
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(ref configured) = self.defaults.database {
            return Ok(PathBuf::from(shellexpand::tilde(configured).into_owned()));
        }

        let data_dir = dirs::data_dir().context("Could not determine data directory")?;
        Ok(data_dir.join("lift-assist").join("store.db"))
    }
}
