//! # phaseline-core
//!
//! Core domain model for the phaseline portfolio timeline.
//!
//! This crate provides:
//! - Domain types: `Phase`, `TaskStatus`, `CanonicalTask`, `Bundle`
//! - The status mapper (`TaskStatus::from_label`)
//! - Tag field access shared by raw records and canonical tasks (`Tagged`)
//! - Dashboard statistics (`status::DashboardStats`)
//! - The `Renderer` trait and error types
//!
//! ## Example
//!
//! ```rust
//! use phaseline_core::{Bundle, CanonicalTask, Phase, SourceKind, TaskStatus};
//!
//! let task = CanonicalTask::new(1000, "Portal", Phase::Planning)
//!     .dates("2026-01-01", "2026-01-15")
//!     .status(TaskStatus::from_label("Em Andamento"));
//!
//! let bundle = Bundle::from_tasks(vec![task], SourceKind::Json);
//! assert_eq!(bundle.metadata.task_count, 1);
//! assert_eq!(bundle.tasks[0].name, "Portal - Planejamento");
//! ```

pub mod de;
pub mod status;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use thiserror::Error;

// ============================================================================
// Type Aliases
// ============================================================================

/// Identifier of a canonical task, unique within one normalization run
pub type TaskId = u64;

/// Organizational unit label used when a record carries none
pub const UNASSIGNED_ORG_UNIT: &str = "Sem Diretoria";

/// Delimiter between the values of a multi-value tag field
pub const TAG_DELIMITER: char = ',';

// ============================================================================
// Phase
// ============================================================================

/// A named stage of project execution
///
/// The three recognized phases carry the labels used by the source
/// spreadsheets. Anything else lands in `Other` with its label preserved.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Planning,
    Execution,
    Contracting,
    Other(String),
}

impl Phase {
    /// The recognized phases, in phase-table order
    pub const RECOGNIZED: [Phase; 3] = [Phase::Planning, Phase::Execution, Phase::Contracting];

    /// Display label of the phase
    pub fn label(&self) -> &str {
        match self {
            Phase::Planning => "Planejamento",
            Phase::Execution => "Execução",
            Phase::Contracting => "Contratação",
            Phase::Other(label) => label,
        }
    }

    /// Resolve a phase from a label. Accepts the source labels and their
    /// English names; unknown labels become `Other`.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Planejamento" | "Planning" => Phase::Planning,
            "Execução" | "Execution" => Phase::Execution,
            "Contratação" | "Contracting" => Phase::Contracting,
            other => Phase::Other(other.to_string()),
        }
    }

    /// Legend color used by the presentation layer
    pub fn color(&self) -> &'static str {
        match self {
            Phase::Planning => "#29b6f6",
            Phase::Execution => "#ffd200",
            Phase::Contracting => "#e53935",
            Phase::Other(_) => "#999999",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Phase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Phase {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Phase::from_label(&label))
    }
}

// ============================================================================
// Task Status
// ============================================================================

/// Canonical status code of a task
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Completed,
    InProgress,
    #[default]
    NotStarted,
    AtRisk,
}

impl TaskStatus {
    /// All canonical codes
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Completed,
        TaskStatus::InProgress,
        TaskStatus::NotStarted,
        TaskStatus::AtRisk,
    ];

    /// Canonical code string
    pub fn code(&self) -> &'static str {
        match self {
            TaskStatus::Completed => "completed",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::NotStarted => "not-started",
            TaskStatus::AtRisk => "at-risk",
        }
    }

    /// Parse a canonical code (`completed`, `in-progress`, ...)
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    /// Map a free-text source label to a canonical code.
    ///
    /// Exact match against the source vocabulary. Unknown or empty labels
    /// map to `NotStarted`; this never fails.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Concluído" => TaskStatus::Completed,
            "Em Andamento" | "Em dia" => TaskStatus::InProgress,
            "Planejamento" | "Não iniciado" => TaskStatus::NotStarted,
            "Atrasado" => TaskStatus::AtRisk,
            _ => TaskStatus::NotStarted,
        }
    }

    /// Accept either a canonical code or a source label
    pub fn resolve(value: &str) -> Self {
        Self::from_code(value).unwrap_or_else(|| Self::from_label(value))
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// Tag Fields
// ============================================================================

/// Multi-value tag fields used for grouping and filtering
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagField {
    /// Organizational unit ("Diretoria")
    OrgUnit,
    /// Program or unit tag ("Assessoria | Núcleo | Programas")
    Program,
}

impl TagField {
    /// Column name in the CSV-derived source
    pub fn source_name(&self) -> &'static str {
        match self {
            TagField::OrgUnit => "Diretoria",
            TagField::Program => "Assessoria | Núcleo | Programas",
        }
    }
}

impl std::str::FromStr for TagField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "org-unit" | "diretoria" | "Diretoria" => Ok(TagField::OrgUnit),
            "program" | "Assessoria | Núcleo | Programas" => Ok(TagField::Program),
            other => Err(format!("unknown tag field: {}", other)),
        }
    }
}

/// Anything that carries multi-value tag fields
pub trait Tagged {
    /// Raw (unsplit) value of a tag field, if present
    fn tag(&self, field: TagField) -> Option<&str>;
}

/// Split a multi-value tag into its trimmed, non-empty pieces
pub fn split_tags(value: &str) -> impl Iterator<Item = &str> {
    value.split(TAG_DELIMITER).map(str::trim).filter(|v| !v.is_empty())
}

// ============================================================================
// Canonical Task
// ============================================================================

/// The normalized, source-independent representation of one phase of one project
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalTask {
    pub id: TaskId,
    pub name: String,
    pub phase: Phase,
    pub project: String,
    /// ISO date (`YYYY-MM-DD`). Not validated against `end`.
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default, deserialize_with = "de::status")]
    pub status: TaskStatus,
    #[serde(default, deserialize_with = "de::number_or_zero")]
    pub progress: f64,
    #[serde(default, deserialize_with = "de::string_or_empty")]
    pub responsible: String,
    #[serde(default, deserialize_with = "de::string_or_empty")]
    pub impact: String,
    #[serde(default, deserialize_with = "de::string_or_empty")]
    pub description: String,
    #[serde(default, alias = "sei", deserialize_with = "de::string_or_empty")]
    pub reference: String,
    #[serde(default, alias = "diretoria", deserialize_with = "de::string_or_empty")]
    pub org_unit: String,
    #[serde(
        default,
        alias = "assessoriaOuNucleo",
        deserialize_with = "de::string_or_empty"
    )]
    pub program: String,
}

impl CanonicalTask {
    /// Create a task for one phase of a project, named `"{project} - {phase}"`
    pub fn new(id: TaskId, project: impl Into<String>, phase: Phase) -> Self {
        let project = project.into();
        Self {
            id,
            name: format!("{} - {}", project, phase.label()),
            phase,
            project,
            start: String::new(),
            end: String::new(),
            status: TaskStatus::default(),
            progress: 0.0,
            responsible: String::new(),
            impact: String::new(),
            description: String::new(),
            reference: String::new(),
            org_unit: String::new(),
            program: String::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn dates(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start = start.into();
        self.end = end.into();
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn progress(mut self, progress: f64) -> Self {
        self.progress = progress;
        self
    }

    pub fn responsible(mut self, responsible: impl Into<String>) -> Self {
        self.responsible = responsible.into();
        self
    }

    pub fn org_unit(mut self, org_unit: impl Into<String>) -> Self {
        self.org_unit = org_unit.into();
        self
    }

    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Parsed start date, `None` when absent or malformed
    pub fn start_date(&self) -> Option<NaiveDate> {
        parse_iso_date(&self.start)
    }

    /// Parsed end date, `None` when absent or malformed
    pub fn end_date(&self) -> Option<NaiveDate> {
        parse_iso_date(&self.end)
    }

    /// First organizational unit, or the unassigned sentinel
    pub fn primary_org_unit(&self) -> &str {
        self.org_unit
            .split(TAG_DELIMITER)
            .next()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(UNASSIGNED_ORG_UNIT)
    }

    /// Whether `[start, end]` (inclusive, date-only) contains `day`
    pub fn is_active_on(&self, day: NaiveDate) -> bool {
        match (self.start_date(), self.end_date()) {
            (Some(start), Some(end)) => start <= day && day <= end,
            _ => false,
        }
    }
}

impl Tagged for CanonicalTask {
    fn tag(&self, field: TagField) -> Option<&str> {
        let value = match field {
            TagField::OrgUnit => &self.org_unit,
            TagField::Program => &self.program,
        };
        Some(value.as_str()).filter(|v| !v.is_empty())
    }
}

/// Parse the date part of an ISO 8601 date or date-time string
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let date_part = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

// ============================================================================
// Bundle
// ============================================================================

/// Where a bundle came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// CSV-derived JSON export, normalized locally
    CsvJson,
    /// Already-normalized bundle JSON
    Json,
    /// Remote database query
    RemoteApi,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::CsvJson => write!(f, "csv-json"),
            SourceKind::Json => write!(f, "json"),
            SourceKind::RemoteApi => write!(f, "remote-api"),
        }
    }
}

/// Project summary heading a bundle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Synthesized start date (ISO)
    #[serde(default)]
    pub start_date: String,
    /// Distinct source projects, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_count: Option<usize>,
}

impl ProjectSummary {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            start_date: Utc::now().date_naive().format("%Y-%m-%d").to_string(),
            project_count: None,
        }
    }
}

impl Default for ProjectSummary {
    fn default() -> Self {
        Self::new("Strategic Portfolio", "Project portfolio timeline")
    }
}

/// Bookkeeping recorded by the normalization pass
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleMetadata {
    pub source: SourceKind,
    pub normalized_at: DateTime<Utc>,
    /// Exact count of distinct projects
    pub project_count: usize,
    /// Exact count of emitted tasks
    pub task_count: usize,
}

/// Full normalized output of one load/normalize pass.
///
/// Bundles are never mutated after construction; filtering produces a new one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub project: ProjectSummary,
    pub tasks: Vec<CanonicalTask>,
    pub metadata: BundleMetadata,
}

impl Bundle {
    /// Assemble a bundle, computing counts from `tasks`
    pub fn new(project: ProjectSummary, tasks: Vec<CanonicalTask>, source: SourceKind) -> Self {
        let project_count = count_distinct_projects(&tasks);
        Self::with_project_count(project, tasks, source, project_count)
    }

    /// Assemble a bundle with an externally tracked project count
    pub fn with_project_count(
        mut project: ProjectSummary,
        tasks: Vec<CanonicalTask>,
        source: SourceKind,
        project_count: usize,
    ) -> Self {
        project.project_count = Some(project_count);
        let metadata = BundleMetadata {
            source,
            normalized_at: Utc::now(),
            project_count,
            task_count: tasks.len(),
        };
        Self {
            project,
            tasks,
            metadata,
        }
    }

    /// Bundle with a default project summary
    pub fn from_tasks(tasks: Vec<CanonicalTask>, source: SourceKind) -> Self {
        Self::new(ProjectSummary::default(), tasks, source)
    }

    /// A new bundle holding a subset of tasks, same summary and source
    pub fn with_tasks(&self, tasks: Vec<CanonicalTask>) -> Self {
        Self::new(self.project.clone(), tasks, self.metadata.source)
    }

    pub fn task_by_id(&self, id: TaskId) -> Option<&CanonicalTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn tasks_by_status(&self, status: TaskStatus) -> Vec<&CanonicalTask> {
        self.tasks.iter().filter(|t| t.status == status).collect()
    }

    /// Distinct project names in first-seen order
    pub fn distinct_projects(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.tasks
            .iter()
            .map(|t| t.project.as_str())
            .filter(|p| seen.insert(*p))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

fn count_distinct_projects(tasks: &[CanonicalTask]) -> usize {
    tasks
        .iter()
        .map(|t| t.project.as_str())
        .collect::<HashSet<_>>()
        .len()
}

// ============================================================================
// Traits
// ============================================================================

/// Renders a bundle into some output format
pub trait Renderer {
    type Output;

    fn render(&self, bundle: &Bundle) -> Result<Self::Output, RenderError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Rendering error
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

// ============================================================================
// Tests
// ============================================================================
