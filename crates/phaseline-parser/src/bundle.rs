//! Already-normalized bundle documents (`{ "project": {...}, "tasks": [...] }`).

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use phaseline_core::{Bundle, CanonicalTask, ProjectSummary, SourceKind};

use crate::ParseError;

#[derive(Deserialize)]
struct BundleDocument {
    #[serde(default)]
    project: Option<ProjectSummary>,
    tasks: Vec<Value>,
}

/// Read a bundle document.
///
/// Tasks that do not match the canonical shape are skipped. Metadata is
/// recomputed from the tasks that survive, whatever the document claims.
pub fn parse_bundle_value(value: &Value) -> Result<Bundle, ParseError> {
    let document = BundleDocument::deserialize(value)
        .map_err(|e| ParseError::InvalidValue(format!("not a bundle document: {}", e)))?;

    let tasks: Vec<CanonicalTask> = document
        .tasks
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| match CanonicalTask::deserialize(raw) {
            Ok(task) => Some(task),
            Err(e) => {
                debug!(index, error = %e, "malformed bundle task skipped");
                None
            }
        })
        .collect();

    Ok(Bundle::new(
        document.project.unwrap_or_default(),
        tasks,
        SourceKind::Json,
    ))
}

/// Read a bundle document from JSON text
pub fn parse_bundle(input: &str) -> Result<Bundle, ParseError> {
    let value: Value = serde_json::from_str(input)?;
    parse_bundle_value(&value)
}
