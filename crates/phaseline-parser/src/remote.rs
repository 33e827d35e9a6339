//! Remote database page records.
//!
//! A database query returns pages whose properties are typed values keyed by
//! field name. Each canonical field is looked up under its localized name
//! first, then under a generic fallback name, and finally defaults to a
//! fixed placeholder.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use phaseline_core::{
    Bundle, CanonicalTask, Phase, ProjectSummary, SourceKind, TaskId, TaskStatus,
};

use crate::ParseError;

/// One page of a database query
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<Page>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// A database record
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Page {
    #[serde(default)]
    pub properties: HashMap<String, Property>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Named {
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct DateValue {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

/// A typed property value
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Property {
    Title {
        #[serde(default)]
        title: Vec<RichText>,
    },
    RichText {
        #[serde(default)]
        rich_text: Vec<RichText>,
    },
    Select {
        #[serde(default)]
        select: Option<Named>,
    },
    Number {
        #[serde(default)]
        number: Option<f64>,
    },
    Status {
        #[serde(default)]
        status: Option<Named>,
    },
    Date {
        #[serde(default)]
        date: Option<DateValue>,
    },
    #[serde(other)]
    Unsupported,
}

impl Property {
    /// Text content, for the property kinds that have one
    pub fn text(&self) -> Option<&str> {
        let text = match self {
            Property::Title { title: runs } | Property::RichText { rich_text: runs } => {
                runs.first().map(|r| r.plain_text.as_str())
            }
            Property::Select { select: named } | Property::Status { status: named } => {
                named.as_ref().map(|n| n.name.as_str())
            }
            _ => None,
        };
        text.filter(|t| !t.is_empty())
    }

    pub fn number(&self) -> Option<f64> {
        match self {
            Property::Number { number } => *number,
            _ => None,
        }
    }

    /// Start of a date property
    pub fn date_start(&self) -> Option<&str> {
        match self {
            Property::Date { date: Some(value) } => value.start.as_deref(),
            _ => None,
        }
    }
}

impl Page {
    /// First non-empty text among `names`
    pub fn text(&self, names: &[&str]) -> Option<&str> {
        names
            .iter()
            .find_map(|name| self.properties.get(*name).and_then(Property::text))
    }

    /// First non-zero number among `names`
    pub fn number(&self, names: &[&str]) -> Option<f64> {
        names.iter().find_map(|name| {
            self.properties
                .get(*name)
                .and_then(Property::number)
                .filter(|n| *n != 0.0 && !n.is_nan())
        })
    }

    /// First date start among `names`
    pub fn date(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| {
            self.properties
                .get(*name)
                .and_then(Property::date_start)
                .filter(|d| !d.is_empty())
        })
    }
}

// ============================================================================
// Field Vocabulary
// ============================================================================

const NAME: [&str; 2] = ["Nome", "name"];
const PHASE: [&str; 2] = ["Etapa", "phase"];
const PROJECT: [&str; 2] = ["Projeto", "project"];
const START: [&str; 2] = ["Data Início", "start"];
const END: [&str; 2] = ["Data Fim", "end"];
const STATUS: [&str; 2] = ["Status", "status"];
const PROGRESS: [&str; 2] = ["Progresso", "progress"];
const RESPONSIBLE: [&str; 2] = ["Responsável", "responsible"];
const ORG_UNIT: [&str; 2] = ["Diretoria", "org_unit"];
const PROGRAM: [&str; 2] = ["Assessoria | Núcleo | Programas", "program"];

const NAME_PLACEHOLDER: &str = "Sem nome";
const PHASE_PLACEHOLDER: &str = "Planejamento";
const PROJECT_PLACEHOLDER: &str = "Meu Projeto";
const RESPONSIBLE_PLACEHOLDER: &str = "Não atribuído";

/// Convert one page into a canonical task
pub fn page_to_task(page: &Page, id: TaskId, today: NaiveDate) -> CanonicalTask {
    let today = today.format("%Y-%m-%d").to_string();
    let phase = Phase::from_label(page.text(&PHASE).unwrap_or(PHASE_PLACEHOLDER));
    let project = page.text(&PROJECT).unwrap_or(PROJECT_PLACEHOLDER);

    CanonicalTask::new(id, project, phase)
        .name(page.text(&NAME).unwrap_or(NAME_PLACEHOLDER))
        .dates(
            page.date(&START).unwrap_or(&today),
            page.date(&END).unwrap_or(&today),
        )
        .status(page.text(&STATUS).map(TaskStatus::resolve).unwrap_or_default())
        .progress(page.number(&PROGRESS).unwrap_or(0.0))
        .responsible(page.text(&RESPONSIBLE).unwrap_or(RESPONSIBLE_PLACEHOLDER))
        .org_unit(page.text(&ORG_UNIT).unwrap_or_default())
        .program(page.text(&PROGRAM).unwrap_or_default())
}

/// Convert query pages into a bundle. Task ids are `index + 1`.
pub fn pages_to_bundle(pages: &[Page], project: ProjectSummary, today: NaiveDate) -> Bundle {
    let tasks = pages
        .iter()
        .enumerate()
        .map(|(index, page)| page_to_task(page, index as TaskId + 1, today))
        .collect();
    Bundle::new(project, tasks, SourceKind::RemoteApi)
}

/// Decode one query response page
pub fn parse_query_response(value: &Value) -> Result<QueryResponse, ParseError> {
    QueryResponse::deserialize(value)
        .map_err(|e| ParseError::InvalidValue(format!("not a query response: {}", e)))
}
