//! Remote integration placeholders
//!
//! The remote database and the cloud drive were never wired up. They stay
//! in the configuration surface so `doctor` can report them, but enabling
//! either one is a validation error.

use serde::{Deserialize, Serialize};

/// All remote integrations
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IntegrationsConfig {
    /// Remote document database
    #[serde(default)]
    pub remote_db: IntegrationConfig,

    /// Cloud drive used for document uploads
    #[serde(default)]
    pub cloud_drive: IntegrationConfig,
}

/// A single placeholder integration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IntegrationConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Service endpoint, informational only
    pub endpoint: Option<String>,

    /// Remote folder or database name
    pub folder: Option<String>,
}

impl IntegrationsConfig {
    pub fn merge(&mut self, other: Self) {
        self.remote_db.merge(other.remote_db);
        self.cloud_drive.merge(other.cloud_drive);
    }

    /// Iterate integrations with their config names
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &IntegrationConfig)> {
        [("remote_db", &self.remote_db), ("cloud_drive", &self.cloud_drive)].into_iter()
    }

    pub fn validate(&self) -> Vec<String> {
        self.iter()
            .filter(|(_, integration)| integration.enabled)
            .map(|(name, _)| {
                format!(
                    "integrations.{} cannot be enabled: no client is available",
                    name
                )
            })
            .collect()
    }
}

impl IntegrationConfig {
    fn merge(&mut self, other: Self) {
        if other.enabled {
            self.enabled = true;
        }
        if other.endpoint.is_some() {
            self.endpoint = other.endpoint;
        }
        if other.folder.is_some() {
            self.folder = other.folder;
        }
    }

    /// One-line status for diagnostics output
    pub fn status(&self) -> String {
        match (&self.endpoint, self.enabled) {
            (_, true) => "enabled (unsupported)".to_string(),
            (Some(endpoint), false) => format!("disabled ({})", endpoint),
            (None, false) => "disabled".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_disabled() {
        let config = IntegrationsConfig::default();
        assert!(config.validate().is_empty());
        assert!(config.iter().all(|(_, i)| !i.enabled));
    }

    #[test]
    fn test_enabling_is_reported() {
        let mut config = IntegrationsConfig::default();
        config.cloud_drive.enabled = true;

        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("cloud_drive"));
    }

    #[test]
    fn test_status() {
        let mut integration = IntegrationConfig::default();
        assert_eq!(integration.status(), "disabled");

        integration.endpoint = Some("https://drive.example".into());
        assert_eq!(integration.status(), "disabled (https://drive.example)");
    }
}
