//! Tag indexing and filtering over multi-value tag fields.
//!
//! Tag fields hold comma-separated values. Indexing collects the distinct
//! trimmed values; filtering keeps records where any value contains the
//! query, case-insensitively. Works on anything implementing [`Tagged`],
//! so raw rows and canonical tasks filter the same way.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use phaseline_core::{split_tags, TagField, Tagged};

/// Distinct trimmed values of `field`, sorted, duplicates collapsed
pub fn tag_index<'a, T, I>(records: I, field: TagField) -> Vec<String>
where
    T: Tagged + 'a,
    I: IntoIterator<Item = &'a T>,
{
    records
        .into_iter()
        .filter_map(|r| r.tag(field))
        .flat_map(split_tags)
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Whether any comma-split value of `field` contains `query`,
/// case-insensitively. Records without the field never match.
pub fn matches_tag<T: Tagged>(record: &T, field: TagField, query: &str) -> bool {
    let needle = query.to_lowercase();
    record.tag(field).is_some_and(|value| {
        value
            .split(phaseline_core::TAG_DELIMITER)
            .any(|v| v.trim().to_lowercase().contains(&needle))
    })
}

/// Keep the records matching `query` on `field`. An empty or absent query
/// keeps everything.
pub fn filter_by_tag<'a, T: Tagged>(
    records: &'a [T],
    field: TagField,
    query: Option<&str>,
) -> Vec<&'a T> {
    match query.filter(|q| !q.is_empty()) {
        Some(q) => records
            .iter()
            .filter(|r| matches_tag(*r, field, q))
            .collect(),
        None => records.iter().collect(),
    }
}

/// Compound filter: AND across fields, OR across each field's values
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
}

impl TagFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn org_unit(mut self, query: impl Into<String>) -> Self {
        self.org_unit = Some(query.into());
        self
    }

    pub fn program(mut self, query: impl Into<String>) -> Self {
        self.program = Some(query.into());
        self
    }

    /// Query for a field, with empty strings treated as absent
    pub fn query(&self, field: TagField) -> Option<&str> {
        let query = match field {
            TagField::OrgUnit => self.org_unit.as_deref(),
            TagField::Program => self.program.as_deref(),
        };
        query.filter(|q| !q.is_empty())
    }

    /// True when no field is constrained
    pub fn is_empty(&self) -> bool {
        self.query(TagField::OrgUnit).is_none() && self.query(TagField::Program).is_none()
    }

    pub fn matches<T: Tagged>(&self, record: &T) -> bool {
        [TagField::OrgUnit, TagField::Program]
            .into_iter()
            .all(|field| match self.query(field) {
                Some(q) => matches_tag(record, field, q),
                None => true,
            })
    }

    pub fn apply<'a, T: Tagged>(&self, records: &'a [T]) -> Vec<&'a T> {
        records.iter().filter(|r| self.matches(*r)).collect()
    }

    pub fn apply_cloned<T: Tagged + Clone>(&self, records: &[T]) -> Vec<T> {
        records.iter().filter(|r| self.matches(*r)).cloned().collect()
    }
}
