//! CSV-derived JSON records and their normalization.
//!
//! A spreadsheet export arrives as an array of objects keyed by the
//! spreadsheet's column names. Each row describes one project with up to
//! three phase windows; normalization expands a row into one canonical
//! task per phase window that parses.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use phaseline_core::{
    de, Bundle, CanonicalTask, Phase, ProjectSummary, SourceKind, TagField, Tagged, TaskId,
    TaskStatus,
};

use crate::daterange::{parse_date_range_with, RolloverPolicy};
use crate::ParseError;

/// Task ids are `(record_index + 1) * TASK_ID_STRIDE + phase_counter`
pub const TASK_ID_STRIDE: TaskId = 1000;

/// One row of the CSV-derived export.
///
/// Rows decoded by [`records_from_value`] keep the JSON they were read from
/// and serialize back to it unchanged; rows built in code serialize their
/// present columns only.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct CsvRecord {
    #[serde(rename = "Projeto", default, deserialize_with = "de::optional_string")]
    pub project: Option<String>,

    #[serde(rename = "Dt Planejamento", default, deserialize_with = "de::optional_string")]
    pub planning_range: Option<String>,

    #[serde(rename = "Dt Execução", default, deserialize_with = "de::optional_string")]
    pub execution_range: Option<String>,

    #[serde(rename = "Dt Contratação", default, deserialize_with = "de::optional_string")]
    pub contracting_range: Option<String>,

    #[serde(rename = "Status Projeto", default, deserialize_with = "de::optional_string")]
    pub status: Option<String>,

    #[serde(rename = "Evolução Execução", default, deserialize_with = "de::optional_number")]
    pub progress: Option<f64>,

    #[serde(rename = "Responsável", default, deserialize_with = "de::optional_string")]
    pub responsible: Option<String>,

    #[serde(rename = "Impacto", default, deserialize_with = "de::optional_string")]
    pub impact: Option<String>,

    #[serde(rename = "Resumo", default, deserialize_with = "de::optional_string")]
    pub summary: Option<String>,

    #[serde(rename = "SEI", default, deserialize_with = "de::optional_string")]
    pub reference: Option<String>,

    #[serde(rename = "Diretoria", default, deserialize_with = "de::optional_string")]
    pub org_unit: Option<String>,

    #[serde(
        rename = "Assessoria | Núcleo | Programas",
        default,
        deserialize_with = "de::optional_string"
    )]
    pub program: Option<String>,

    /// Columns the normalizer does not interpret
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,

    /// The row as it appeared in the export
    #[serde(skip)]
    source: Option<Value>,
}

/// Serialized form of a record built in code
#[derive(Serialize)]
struct Columns<'a> {
    #[serde(rename = "Projeto", skip_serializing_if = "Option::is_none")]
    project: Option<&'a str>,
    #[serde(rename = "Dt Planejamento", skip_serializing_if = "Option::is_none")]
    planning_range: Option<&'a str>,
    #[serde(rename = "Dt Execução", skip_serializing_if = "Option::is_none")]
    execution_range: Option<&'a str>,
    #[serde(rename = "Dt Contratação", skip_serializing_if = "Option::is_none")]
    contracting_range: Option<&'a str>,
    #[serde(rename = "Status Projeto", skip_serializing_if = "Option::is_none")]
    status: Option<&'a str>,
    #[serde(rename = "Evolução Execução", skip_serializing_if = "Option::is_none")]
    progress: Option<f64>,
    #[serde(rename = "Responsável", skip_serializing_if = "Option::is_none")]
    responsible: Option<&'a str>,
    #[serde(rename = "Impacto", skip_serializing_if = "Option::is_none")]
    impact: Option<&'a str>,
    #[serde(rename = "Resumo", skip_serializing_if = "Option::is_none")]
    summary: Option<&'a str>,
    #[serde(rename = "SEI", skip_serializing_if = "Option::is_none")]
    reference: Option<&'a str>,
    #[serde(rename = "Diretoria", skip_serializing_if = "Option::is_none")]
    org_unit: Option<&'a str>,
    #[serde(
        rename = "Assessoria | Núcleo | Programas",
        skip_serializing_if = "Option::is_none"
    )]
    program: Option<&'a str>,
    #[serde(flatten)]
    extra: &'a BTreeMap<String, Value>,
}

impl Serialize for CsvRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let Some(source) = &self.source {
            return source.serialize(serializer);
        }
        Columns {
            project: self.project.as_deref(),
            planning_range: self.planning_range.as_deref(),
            execution_range: self.execution_range.as_deref(),
            contracting_range: self.contracting_range.as_deref(),
            status: self.status.as_deref(),
            progress: self.progress,
            responsible: self.responsible.as_deref(),
            impact: self.impact.as_deref(),
            summary: self.summary.as_deref(),
            reference: self.reference.as_deref(),
            org_unit: self.org_unit.as_deref(),
            program: self.program.as_deref(),
            extra: &self.extra,
        }
        .serialize(serializer)
    }
}

impl CsvRecord {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            ..Default::default()
        }
    }

    pub fn with_range(mut self, phase: &Phase, range: impl Into<String>) -> Self {
        let range = Some(range.into());
        match phase {
            Phase::Planning => self.planning_range = range,
            Phase::Execution => self.execution_range = range,
            Phase::Contracting => self.contracting_range = range,
            Phase::Other(_) => {}
        }
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_tag(mut self, field: TagField, value: impl Into<String>) -> Self {
        let value = Some(value.into());
        match field {
            TagField::OrgUnit => self.org_unit = value,
            TagField::Program => self.program = value,
        }
        self
    }

    /// Project name, if present and non-empty
    /// The row exactly as read, when it came from an export
    pub fn source(&self) -> Option<&Value> {
        self.source.as_ref()
    }

    pub fn project_name(&self) -> Option<&str> {
        non_empty(&self.project)
    }

    /// Date-range text for one of the recognized phases
    pub fn phase_range(&self, phase: &Phase) -> Option<&str> {
        match phase {
            Phase::Planning => non_empty(&self.planning_range),
            Phase::Execution => non_empty(&self.execution_range),
            Phase::Contracting => non_empty(&self.contracting_range),
            Phase::Other(_) => None,
        }
    }
}

impl Tagged for CsvRecord {
    fn tag(&self, field: TagField) -> Option<&str> {
        match field {
            TagField::OrgUnit => non_empty(&self.org_unit),
            TagField::Program => non_empty(&self.program),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn text_or_empty(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Decode an export into records.
///
/// Fails only when the document is not an array. Elements that are not
/// objects become empty records so indices (and therefore task ids) stay
/// aligned with the export's row order.
pub fn records_from_value(value: &Value) -> Result<Vec<CsvRecord>, ParseError> {
    let rows = value.as_array().ok_or(ParseError::NotASequence)?;
    Ok(rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let mut record = CsvRecord::deserialize(row).unwrap_or_else(|e| {
                debug!(index, error = %e, "unreadable row treated as empty");
                CsvRecord::default()
            });
            record.source = Some(row.clone());
            record
        })
        .collect())
}

/// Decode an export from JSON text
pub fn records_from_str(input: &str) -> Result<Vec<CsvRecord>, ParseError> {
    let value: Value = serde_json::from_str(input)?;
    records_from_value(&value)
}

// ============================================================================
// Normalizer
// ============================================================================

/// Normalization settings
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Summary placed at the head of every bundle
    pub project_name: Option<String>,
    pub project_description: Option<String>,
    /// Treatment of impossible calendar dates in phase windows
    pub rollover: RolloverPolicy,
}

/// Converts CSV-derived records into a canonical bundle
#[derive(Clone, Debug, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    fn summary(&self) -> ProjectSummary {
        let defaults = ProjectSummary::default();
        ProjectSummary::new(
            self.config.project_name.clone().unwrap_or(defaults.name),
            self.config
                .project_description
                .clone()
                .unwrap_or(defaults.description),
        )
    }

    /// Normalize an ordered slice of records.
    ///
    /// Records without a project are skipped; phases whose window is absent
    /// or unparseable are skipped. Nothing here fails.
    pub fn normalize(&self, records: &[CsvRecord]) -> Bundle {
        let mut tasks = Vec::new();
        let mut projects = HashSet::new();

        for (index, record) in records.iter().enumerate() {
            let Some(project) = record.project_name() else {
                debug!(index, "record without project skipped");
                continue;
            };
            projects.insert(project);
            tasks.extend(self.normalize_record(record, index));
        }

        Bundle::with_project_count(self.summary(), tasks, SourceKind::CsvJson, projects.len())
    }

    /// Normalize a JSON document; fails only when it is not an array
    pub fn normalize_value(&self, value: &Value) -> Result<Bundle, ParseError> {
        let records = records_from_value(value)?;
        Ok(self.normalize(&records))
    }

    /// Normalize JSON text
    pub fn normalize_str(&self, input: &str) -> Result<Bundle, ParseError> {
        let value: Value = serde_json::from_str(input)?;
        self.normalize_value(&value)
    }

    /// Expand one record into zero to three tasks, in phase-table order
    pub fn normalize_record(&self, record: &CsvRecord, index: usize) -> Vec<CanonicalTask> {
        let Some(project) = record.project_name() else {
            return Vec::new();
        };

        let base_id = (index as TaskId + 1) * TASK_ID_STRIDE;
        let status = TaskStatus::from_label(record.status.as_deref().unwrap_or_default());
        let progress = record.progress.filter(|p| !p.is_nan()).unwrap_or(0.0);

        let mut tasks = Vec::new();
        for phase in Phase::RECOGNIZED {
            let Some(text) = record.phase_range(&phase) else {
                continue;
            };
            let Some(range) = parse_date_range_with(text, self.config.rollover) else {
                debug!(
                    index,
                    project,
                    phase = %phase,
                    range = text,
                    "unparseable phase window skipped"
                );
                continue;
            };

            let mut task = CanonicalTask::new(base_id + tasks.len() as TaskId, project, phase)
                .dates(range.start_iso(), range.end_iso())
                .status(status)
                .progress(progress)
                .responsible(text_or_empty(&record.responsible))
                .org_unit(text_or_empty(&record.org_unit))
                .program(text_or_empty(&record.program));
            task.impact = text_or_empty(&record.impact);
            task.description = text_or_empty(&record.summary);
            task.reference = text_or_empty(&record.reference);
            tasks.push(task);
        }
        tasks
    }
}
