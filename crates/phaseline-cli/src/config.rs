//! `phaseline.toml` configuration
//!
//! Every section is optional. A missing file yields the defaults; a file that
//! exists but cannot be read or parsed is an error. Command-line flags are
//! applied on top with [`Config::apply_overrides`].

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use phaseline_core::ProjectSummary;
use phaseline_parser::{Normalizer, NormalizerConfig, RolloverPolicy};
use phaseline_render::{AggregatorConfig, Viewport};
use phaseline_source::{RemoteConfig, SourceConfig};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "phaseline.toml";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sources: SourcesSection,
    pub remote: RemoteConfig,
    pub project: ProjectSection,
    pub display: DisplaySection,
    pub dates: DatesSection,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesSection {
    /// CSV-derived JSON export, path or http(s) URL
    pub csv_json: Option<String>,
    /// Normalized bundle, path or http(s) URL
    pub data: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySection {
    pub viewport: Viewport,
    pub phase_order: Vec<String>,
}

impl Default for DisplaySection {
    fn default() -> Self {
        let aggregator = AggregatorConfig::default();
        Self {
            viewport: aggregator.viewport,
            phase_order: aggregator.phase_order,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatesSection {
    pub rollover: RolloverPolicy,
}

/// Values given on the command line, each overriding the file
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub csv_json: Option<String>,
    pub data: Option<String>,
    pub remote_token: Option<String>,
    pub database_id: Option<String>,
    pub mobile: bool,
}

impl Config {
    /// Read `path`, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid configuration {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(v) = &overrides.csv_json {
            self.sources.csv_json = Some(v.clone());
        }
        if let Some(v) = &overrides.data {
            self.sources.data = Some(v.clone());
        }
        if let Some(v) = &overrides.remote_token {
            self.remote.token = v.clone();
        }
        if let Some(v) = &overrides.database_id {
            self.remote.database_id = v.clone();
        }
        if overrides.mobile {
            self.display.viewport = Viewport::Mobile;
        }
    }

    pub fn source_config(&self) -> SourceConfig {
        SourceConfig {
            csv_json: self.sources.csv_json.clone(),
            data: self.sources.data.clone(),
            remote: Some(self.remote.clone()).filter(RemoteConfig::is_complete),
        }
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(NormalizerConfig {
            project_name: self.project.name.clone(),
            project_description: self.project.description.clone(),
            rollover: self.dates.rollover,
        })
    }

    /// Summary heading bundles built from remote records
    pub fn project_summary(&self) -> ProjectSummary {
        let defaults = ProjectSummary::default();
        ProjectSummary::new(
            self.project.name.clone().unwrap_or(defaults.name),
            self.project
                .description
                .clone()
                .unwrap_or(defaults.description),
        )
    }
}
