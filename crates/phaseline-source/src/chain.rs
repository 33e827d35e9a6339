//! Ordered source strategies with fallback.
//!
//! Sources are tried in a fixed priority order: CSV-derived JSON, then the
//! plain bundle JSON, then the remote database. A failing source is logged
//! and the next one is tried; only when every configured source fails does
//! loading fail.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use phaseline_core::{Bundle, ProjectSummary, SourceKind};
use phaseline_parser::bundle::parse_bundle_value;
use phaseline_parser::csv::{records_from_value, CsvRecord, Normalizer};
use phaseline_parser::remote::pages_to_bundle;

use crate::fetch::{Fetcher, Location, DEFAULT_TIMEOUT};
use crate::remote::{RemoteClient, RemoteConfig};
use crate::{LoadError, SourceFailure};

// ============================================================================
// Configuration
// ============================================================================

/// Which sources are available. Unset entries are left out of the chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// CSV-derived JSON export (path or URL)
    pub csv_json: Option<String>,
    /// Already-normalized bundle (path or URL)
    pub data: Option<String>,
    pub remote: Option<RemoteConfig>,
}

impl SourceConfig {
    /// Sources in priority order
    pub fn sources(&self) -> Vec<Source> {
        let mut sources = Vec::new();
        if let Some(location) = non_empty(&self.csv_json) {
            sources.push(Source::CsvJson(Location::parse(location)));
        }
        if let Some(location) = non_empty(&self.data) {
            sources.push(Source::Json(Location::parse(location)));
        }
        if let Some(remote) = self.remote.as_ref().filter(|r| r.is_complete()) {
            sources.push(Source::Remote(remote.clone()));
        }
        sources
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// ============================================================================
// Sources
// ============================================================================

/// One source strategy
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    CsvJson(Location),
    Json(Location),
    Remote(RemoteConfig),
}

impl Source {
    pub fn kind(&self) -> SourceKind {
        match self {
            Source::CsvJson(_) => SourceKind::CsvJson,
            Source::Json(_) => SourceKind::Json,
            Source::Remote(_) => SourceKind::RemoteApi,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::CsvJson(location) | Source::Json(location) => {
                write!(f, "{} ({})", self.kind(), location)
            }
            Source::Remote(config) => write!(f, "{} ({})", self.kind(), config.query_url()),
        }
    }
}

/// Result of a successful load
#[derive(Clone, Debug)]
pub struct Loaded {
    pub bundle: Bundle,
    /// Raw rows, kept only for CSV-derived sources so filters can
    /// re-normalize them
    pub raw_records: Option<Vec<CsvRecord>>,
}

impl Loaded {
    pub fn source(&self) -> SourceKind {
        self.bundle.metadata.source
    }
}

// ============================================================================
// Chain
// ============================================================================

/// Ordered list of sources plus what it takes to read them
#[derive(Debug, Clone)]
pub struct SourceChain {
    sources: Vec<Source>,
    normalizer: Option<Normalizer>,
    project: ProjectSummary,
    fetcher: Fetcher,
}

impl SourceChain {
    /// Build the chain for a configuration.
    ///
    /// Fails when nothing is configured at all.
    pub fn from_config(config: &SourceConfig) -> Result<Self, LoadError> {
        Self::new(config.sources())
    }

    pub fn new(sources: Vec<Source>) -> Result<Self, LoadError> {
        if sources.is_empty() {
            return Err(LoadError::Misconfiguration(
                "set sources.csv_json, sources.data or remote.token with remote.database_id"
                    .into(),
            ));
        }
        Ok(Self {
            sources,
            normalizer: Some(Normalizer::default()),
            project: ProjectSummary::default(),
            fetcher: Fetcher::new(DEFAULT_TIMEOUT)?,
        })
    }

    /// Normalizer used for CSV-derived sources
    pub fn normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Drop the normalizer; CSV-derived sources then fail fatally
    pub fn without_normalizer(mut self) -> Self {
        self.normalizer = None;
        self
    }

    /// Summary heading remote bundles
    pub fn project(mut self, project: ProjectSummary) -> Self {
        self.project = project;
        self
    }

    pub fn fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Try each source in order, returning the first success.
    ///
    /// Single-source failures are logged and skipped. Fatal errors stop the
    /// chain immediately.
    pub async fn load(&self) -> Result<Loaded, LoadError> {
        let mut failures = Vec::new();

        for source in &self.sources {
            match self.load_source(source).await {
                Ok(loaded) => {
                    info!(
                        source = %source,
                        tasks = loaded.bundle.metadata.task_count,
                        projects = loaded.bundle.metadata.project_count,
                        "bundle loaded"
                    );
                    return Ok(loaded);
                }
                Err(e) if e.fatal() => return Err(e),
                Err(e) => {
                    warn!(source = %source, error = %e, "source failed, trying next");
                    failures.push(SourceFailure {
                        source_kind: source.kind(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Err(LoadError::AllSourcesFailed(failures))
    }

    /// Load a single source, without fallback
    pub async fn load_source(&self, source: &Source) -> Result<Loaded, LoadError> {
        match source {
            Source::CsvJson(location) => {
                let normalizer = self.normalizer.as_ref().ok_or_else(|| {
                    LoadError::MissingDependency(
                        "CSV-derived sources need a normalizer; configure one or point \
                         sources.data at a normalized bundle"
                            .into(),
                    )
                })?;
                let value = self
                    .fetcher
                    .fetch_json(location)
                    .await
                    .map_err(|e| e.unavailable(source.kind()))?;
                let records = records_from_value(&value)?;
                Ok(Loaded {
                    bundle: normalizer.normalize(&records),
                    raw_records: Some(records),
                })
            }
            Source::Json(location) => {
                let value = self
                    .fetcher
                    .fetch_json(location)
                    .await
                    .map_err(|e| e.unavailable(source.kind()))?;
                Ok(Loaded {
                    bundle: parse_bundle_value(&value)?,
                    raw_records: None,
                })
            }
            Source::Remote(config) => {
                let client = RemoteClient::new(self.fetcher.client().clone(), config.clone());
                let pages = client
                    .fetch_all_pages()
                    .await
                    .map_err(|e| e.unavailable(source.kind()))?;
                Ok(Loaded {
                    bundle: pages_to_bundle(&pages, self.project.clone(), Utc::now().date_naive()),
                    raw_records: None,
                })
            }
        }
    }
}
