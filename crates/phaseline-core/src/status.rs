//! Portfolio Status Dashboard
//!
//! Summary counts shown above the timeline. Dashboards answer the question:
//! "How many projects are we tracking, and what is happening today?"
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use phaseline_core::{CanonicalTask, Phase};
//! use phaseline_core::status::DashboardStats;
//!
//! let tasks = vec![
//!     CanonicalTask::new(1000, "Portal", Phase::Planning).dates("2026-01-01", "2026-01-31"),
//!     CanonicalTask::new(2000, "ERP", Phase::Execution).dates("2026-03-01", "2026-06-30"),
//! ];
//! let today = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
//! let stats = DashboardStats::from_tasks(&tasks, today);
//!
//! assert_eq!(stats.total_projects, 2);
//! assert_eq!(stats.planning_today, 1);
//! assert_eq!(stats.execution_today, 0);
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{CanonicalTask, Phase};

// ============================================================================
// Core Types
// ============================================================================

/// Summary counts over a task set
///
/// Always recomputed from scratch; holds no incremental state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// As-of date for the "today" counts
    pub as_of: NaiveDate,

    /// Distinct project names across all tasks
    pub total_projects: usize,

    /// Planning tasks whose date range contains `as_of`
    pub planning_today: usize,

    /// Contracting tasks whose date range contains `as_of`
    pub contracting_today: usize,

    /// Execution tasks whose date range contains `as_of`
    pub execution_today: usize,
}

impl DashboardStats {
    /// Compute the dashboard for `tasks` as of `today`.
    ///
    /// Tasks with missing or malformed dates count toward the project total
    /// but never toward the "today" counts.
    pub fn from_tasks<'a, I>(tasks: I, today: NaiveDate) -> Self
    where
        I: IntoIterator<Item = &'a CanonicalTask>,
    {
        let mut projects = HashSet::new();
        let mut planning_today = 0usize;
        let mut contracting_today = 0usize;
        let mut execution_today = 0usize;

        for task in tasks {
            projects.insert(task.project.as_str());
            if !task.is_active_on(today) {
                continue;
            }
            match task.phase {
                Phase::Planning => planning_today += 1,
                Phase::Contracting => contracting_today += 1,
                Phase::Execution => execution_today += 1,
                Phase::Other(_) => {}
            }
        }

        Self {
            as_of: today,
            total_projects: projects.len(),
            planning_today,
            contracting_today,
            execution_today,
        }
    }

    /// Count active today for one of the tracked phases
    pub fn active_today(&self, phase: &Phase) -> Option<usize> {
        match phase {
            Phase::Planning => Some(self.planning_today),
            Phase::Contracting => Some(self.contracting_today),
            Phase::Execution => Some(self.execution_today),
            Phase::Other(_) => None,
        }
    }

    /// Card titles and values in dashboard order
    pub fn cards(&self) -> [(&'static str, usize); 4] {
        [
            ("Total de Projetos", self.total_projects),
            ("Planejamento Hoje", self.planning_today),
            ("Contratação Hoje", self.contracting_today),
            ("Execução Hoje", self.execution_today),
        ]
    }
}

// ============================================================================
// Tests
// ============================================================================
