//! # phaseline-parser
//!
//! Input formats and normalization for phaseline.
//!
//! This crate provides:
//! - The localized date-range parser (`daterange`)
//! - CSV-derived JSON records and the normalizer (`csv`)
//! - Already-normalized bundle documents (`bundle`)
//! - Remote database page records (`remote`)
//! - Tag indexing and filtering (`tags`)
//!
//! ## Example
//!
//! ```rust
//! use phaseline_parser::csv::Normalizer;
//!
//! let input = r#"[
//!     {"Projeto": "X", "Dt Planejamento": "01/01/2026 → 15/01/2026",
//!      "Status Projeto": "Em Andamento"}
//! ]"#;
//!
//! let bundle = Normalizer::default().normalize_str(input).unwrap();
//! assert_eq!(bundle.tasks.len(), 1);
//! assert_eq!(bundle.tasks[0].start, "2026-01-01");
//! ```

pub mod bundle;
pub mod csv;
pub mod daterange;
pub mod remote;
pub mod tags;

pub use csv::{CsvRecord, Normalizer, NormalizerConfig};
pub use daterange::{parse_date_range, parse_date_range_with, DateRange, RolloverPolicy};
pub use tags::{filter_by_tag, tag_index, TagFilter};

use chrono::Utc;
use phaseline_core::{Bundle, ProjectSummary, SourceKind};
use serde_json::Value;
use thiserror::Error;

/// Parsing error
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Input is not an ordered sequence of records")]
    NotASequence,

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Guess which source shape a JSON document has.
///
/// Arrays are CSV-derived exports, objects with `tasks` are bundles, and
/// objects with `results` are database query responses.
pub fn detect_format(value: &Value) -> Option<SourceKind> {
    match value {
        Value::Array(_) => Some(SourceKind::CsvJson),
        Value::Object(map) if map.contains_key("tasks") => Some(SourceKind::Json),
        Value::Object(map) if map.contains_key("results") => Some(SourceKind::RemoteApi),
        _ => None,
    }
}

/// Parse any supported document into a bundle (auto-detects format)
pub fn parse_value(value: &Value, normalizer: &Normalizer) -> Result<Bundle, ParseError> {
    match detect_format(value) {
        Some(SourceKind::CsvJson) => normalizer.normalize_value(value),
        Some(SourceKind::Json) => bundle::parse_bundle_value(value),
        Some(SourceKind::RemoteApi) => {
            let response = remote::parse_query_response(value)?;
            Ok(remote::pages_to_bundle(
                &response.results,
                ProjectSummary::default(),
                Utc::now().date_naive(),
            ))
        }
        None => Err(ParseError::InvalidValue(
            "expected a record array, a bundle or a query response".into(),
        )),
    }
}

/// Parse a document file from a path (auto-detects format)
pub fn parse_file(path: &std::path::Path, normalizer: &Normalizer) -> Result<Bundle, ParseError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ParseError::InvalidValue(e.to_string()))?;
    let value: Value = serde_json::from_str(&content)?;
    parse_value(&value, normalizer)
}
