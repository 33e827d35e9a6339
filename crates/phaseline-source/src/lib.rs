//! # phaseline-source
//!
//! Where bundles come from and where the current one lives.
//!
//! This crate provides:
//! - File and HTTP fetching of JSON documents (`fetch`)
//! - A paginating client for the remote database API (`remote`)
//! - The ordered source chain with fallback (`chain`)
//! - The session context holding the current bundle and filter (`session`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use phaseline_source::{Session, SourceChain, SourceConfig};
//!
//! let config = SourceConfig {
//!     csv_json: Some("data/projects.json".into()),
//!     data: Some("data/cronograma.json".into()),
//!     ..SourceConfig::default()
//! };
//! let chain = SourceChain::from_config(&config)?;
//!
//! let mut session = Session::default();
//! let ticket = session.begin_load();
//! let loaded = chain.load().await?;
//! session.complete_load(ticket, loaded);
//! ```

pub mod chain;
pub mod fetch;
pub mod remote;
pub mod session;

pub use chain::{Loaded, Source, SourceChain, SourceConfig};
pub use fetch::{Fetcher, Location};
pub use remote::{RemoteClient, RemoteConfig};
pub use session::{LoadTicket, Session, SessionState};

use phaseline_core::SourceKind;
use phaseline_parser::ParseError;
use thiserror::Error;

/// Why one source in the chain could not produce a bundle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFailure {
    pub source_kind: SourceKind,
    pub reason: String,
}

impl std::fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.source_kind, self.reason)
    }
}

/// Loading error
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{source_kind} source unavailable: {reason}")]
    SourceUnavailable {
        source_kind: SourceKind,
        reason: String,
    },

    #[error("No data source configured: {0}")]
    Misconfiguration(String),

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("All data sources failed ({})", join_failures(.0))]
    AllSourcesFailed(Vec<SourceFailure>),

    #[error("{url} answered with status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    /// Whether the error should stop the program and be shown to the user.
    ///
    /// Everything else is a single-source failure the chain recovers from.
    pub fn fatal(&self) -> bool {
        matches!(
            self,
            LoadError::Misconfiguration(_)
                | LoadError::MissingDependency(_)
                | LoadError::AllSourcesFailed(_)
        )
    }

    /// Report a failed fetch as the source being unavailable; other errors
    /// pass through
    pub fn unavailable(self, source_kind: SourceKind) -> Self {
        match self {
            LoadError::Io(_) | LoadError::Http(_) | LoadError::HttpStatus { .. } => {
                LoadError::SourceUnavailable {
                    source_kind,
                    reason: self.to_string(),
                }
            }
            other => other,
        }
    }
}

fn join_failures(failures: &[SourceFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
