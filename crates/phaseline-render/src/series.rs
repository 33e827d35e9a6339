//! Aggregator: turns a bundle into phase-grouped chart series.
//!
//! One series per phase, ordered by a fixed priority list. Rows inside a
//! series are ordered by organizational unit, then project name. Tasks with
//! missing or malformed dates are kept; their duration is `None`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use phaseline_core::status::DashboardStats;
use phaseline_core::{Bundle, CanonicalTask, Phase, TaskId};

use crate::layout::{Layout, Viewport};

/// Marker appended to truncated labels
pub const ELLIPSIS: char = '…';

const MS_PER_DAY: i64 = 86_400_000;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AggregatorConfig {
    /// Phase labels in display order; unlisted phases go last
    pub phase_order: Vec<String>,
    pub viewport: Viewport,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            phase_order: Phase::RECOGNIZED
                .iter()
                .map(|p| p.label().to_string())
                .collect(),
            viewport: Viewport::Desktop,
        }
    }
}

// ============================================================================
// Output Types
// ============================================================================

/// Tooltip content for one bar
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoverInfo {
    pub phase: String,
    /// DD/MM/YYYY, empty when the date is missing or malformed
    pub start: String,
    pub end: String,
    /// Full, untruncated project name
    pub project: String,
}

/// One bar of the timeline
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesRow {
    pub task_id: TaskId,
    /// `end - start` in milliseconds; negative when inverted
    pub duration_ms: Option<i64>,
    /// Start as an ISO instant, the bar's base offset
    pub base: Option<String>,
    pub label: String,
    pub hover: HoverInfo,
}

/// All rows of one phase
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub phase: Phase,
    pub name: String,
    pub color: String,
    pub show_legend: bool,
    pub rows: Vec<SeriesRow>,
}

/// Series, layout and dashboard for one render pass
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartView {
    pub series: Vec<ChartSeries>,
    pub layout: Layout,
    pub stats: DashboardStats,
}

// ============================================================================
// Aggregator
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct Aggregator {
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    /// Default ordering for the given viewport
    pub fn for_viewport(viewport: Viewport) -> Self {
        Self::new(AggregatorConfig {
            viewport,
            ..AggregatorConfig::default()
        })
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Position of `phase` in the priority list, unlisted phases last
    pub fn priority(&self, phase: &Phase) -> usize {
        self.config
            .phase_order
            .iter()
            .position(|label| Phase::from_label(label) == *phase)
            .unwrap_or(self.config.phase_order.len())
    }

    /// Group tasks by phase in display order, rows sorted within each group
    pub fn group<'a>(
        &self,
        tasks: &'a [CanonicalTask],
    ) -> Vec<(Phase, Vec<&'a CanonicalTask>)> {
        let mut groups: Vec<(Phase, Vec<&CanonicalTask>)> = Vec::new();
        for task in tasks {
            match groups.iter_mut().find(|(phase, _)| *phase == task.phase) {
                Some((_, members)) => members.push(task),
                None => groups.push((task.phase.clone(), vec![task])),
            }
        }

        // stable: unlisted phases keep first-appearance order
        groups.sort_by_key(|(phase, _)| self.priority(phase));
        for (_, members) in &mut groups {
            members.sort_by(|a, b| {
                a.primary_org_unit()
                    .cmp(b.primary_org_unit())
                    .then_with(|| a.project.cmp(&b.project))
            });
        }
        groups
    }

    /// Chart series for `tasks`
    pub fn series(&self, tasks: &[CanonicalTask]) -> Vec<ChartSeries> {
        let width = self.config.viewport.label_width();
        let show_legend = self.config.viewport.shows_legend();

        self.group(tasks)
            .into_iter()
            .map(|(phase, members)| ChartSeries {
                name: phase.label().to_string(),
                color: phase.color().to_string(),
                show_legend,
                rows: members.into_iter().map(|t| row(t, width)).collect(),
                phase,
            })
            .collect()
    }

    /// Full chart view for a bundle as of `today`
    pub fn aggregate(&self, bundle: &Bundle, today: NaiveDate) -> ChartView {
        let stats = DashboardStats::from_tasks(&bundle.tasks, today);
        ChartView {
            series: self.series(&bundle.tasks),
            layout: Layout::new(self.config.viewport, today, stats.total_projects),
            stats,
        }
    }
}

fn row(task: &CanonicalTask, width: usize) -> SeriesRow {
    let start = task.start_date();
    let end = task.end_date();
    SeriesRow {
        task_id: task.id,
        duration_ms: bar_duration_ms(start, end),
        base: start.map(iso_instant),
        label: truncate(&row_label(task), width),
        hover: HoverInfo {
            phase: task.phase.label().to_string(),
            start: start.map(format_br).unwrap_or_default(),
            end: end.map(format_br).unwrap_or_default(),
            project: task.project.clone(),
        },
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// `[org unit] project`
pub fn row_label(task: &CanonicalTask) -> String {
    format!("[{}] {}", task.primary_org_unit(), task.project)
}

/// Cut `s` to `max` characters, the last one being an ellipsis.
/// Strings within budget are returned unchanged.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push(ELLIPSIS);
        out
    }
}

/// Bar length in milliseconds, `None` when either end is unknown
pub fn bar_duration_ms(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<i64> {
    let (start, end) = (start?, end?);
    end.signed_duration_since(start)
        .num_days()
        .checked_mul(MS_PER_DAY)
}

/// `DD/MM/YYYY`
pub fn format_br(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Midnight UTC as `YYYY-MM-DDT00:00:00.000Z`
pub fn iso_instant(date: NaiveDate) -> String {
    date.format("%Y-%m-%dT00:00:00.000Z").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use phaseline_core::SourceKind;
    use pretty_assertions::assert_eq;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn task(id: TaskId, project: &str, phase: Phase, org: &str) -> CanonicalTask {
        CanonicalTask::new(id, project, phase)
            .dates("2026-01-01", "2026-01-11")
            .org_unit(org)
    }

    #[test]
    fn series_follow_priority_not_input_order() {
        let tasks = vec![
            task(1, "A", Phase::Contracting, "DTI"),
            task(2, "B", Phase::Planning, "DTI"),
            task(3, "C", Phase::Execution, "DTI"),
        ];
        let names: Vec<String> = Aggregator::default()
            .series(&tasks)
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Planejamento", "Execução", "Contratação"]);
    }

    #[test]
    fn unlisted_phases_go_last_in_appearance_order() {
        let tasks = vec![
            task(1, "A", Phase::Other("Testes".into()), ""),
            task(2, "B", Phase::Execution, ""),
            task(3, "C", Phase::Other("Implantação".into()), ""),
        ];
        let names: Vec<String> = Aggregator::default()
            .series(&tasks)
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Execução", "Testes", "Implantação"]);
    }

    #[test]
    fn custom_phase_order() {
        let aggregator = Aggregator::new(AggregatorConfig {
            phase_order: vec!["Contratação".into(), "Planejamento".into()],
            viewport: Viewport::Desktop,
        });
        assert_eq!(aggregator.priority(&Phase::Contracting), 0);
        assert_eq!(aggregator.priority(&Phase::Planning), 1);
        assert_eq!(aggregator.priority(&Phase::Execution), 2);
    }

    #[test]
    fn rows_sorted_by_org_unit_then_project() {
        let tasks = vec![
            task(1, "Zeta", Phase::Planning, "DTI"),
            task(2, "Alfa", Phase::Planning, "DTI, DAF"),
            task(3, "Beta", Phase::Planning, "DAF"),
            task(4, "Gama", Phase::Planning, ""),
        ];
        let series = Aggregator::default().series(&tasks);
        let ids: Vec<TaskId> = series[0].rows.iter().map(|r| r.task_id).collect();
        assert_eq!(ids, vec![3, 2, 1, 4]);
        assert_eq!(series[0].rows[3].label, "[Sem Diretoria] Gama");
    }

    #[test]
    fn row_carries_duration_base_and_hover() {
        let tasks = vec![task(7, "Portal", Phase::Execution, "DTI")];
        let series = Aggregator::default().series(&tasks);
        let row = &series[0].rows[0];
        assert_eq!(row.duration_ms, Some(10 * MS_PER_DAY));
        assert_eq!(row.base.as_deref(), Some("2026-01-01T00:00:00.000Z"));
        assert_eq!(
            row.hover,
            HoverInfo {
                phase: "Execução".into(),
                start: "01/01/2026".into(),
                end: "11/01/2026".into(),
                project: "Portal".into(),
            }
        );
        assert_eq!(series[0].color, "#ffd200");
    }

    #[test]
    fn inverted_range_is_negative() {
        assert_eq!(
            bar_duration_ms(Some(date(2026, 1, 2)), Some(date(2026, 1, 1))),
            Some(-MS_PER_DAY)
        );
    }

    #[test]
    fn malformed_dates_are_kept_without_duration() {
        let tasks = vec![CanonicalTask::new(1, "P", Phase::Planning).dates("2026-01-01", "soon")];
        let series = Aggregator::default().series(&tasks);
        let row = &series[0].rows[0];
        assert_eq!(row.duration_ms, None);
        assert_eq!(row.base.as_deref(), Some("2026-01-01T00:00:00.000Z"));
        assert_eq!(row.hover.end, "");
    }

    #[test]
    fn truncate_boundaries() {
        let exact = "x".repeat(50);
        assert_eq!(truncate(&exact, 50), exact);

        let over = "y".repeat(51);
        let cut = truncate(&over, 50);
        assert_eq!(cut.chars().count(), 50);
        assert!(cut.ends_with(ELLIPSIS));
        assert_eq!(cut.matches(ELLIPSIS).count(), 1);
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate("Execução", 8), "Execução");
        assert_eq!(truncate("Execução", 5), "Exec…");
    }

    #[test]
    fn mobile_labels_are_shorter() {
        let long = "Programa de Modernização da Infraestrutura Tecnológica";
        let tasks = vec![task(1, long, Phase::Planning, "DTI")];
        let desktop = Aggregator::for_viewport(Viewport::Desktop).series(&tasks);
        let mobile = Aggregator::for_viewport(Viewport::Mobile).series(&tasks);
        assert_eq!(desktop[0].rows[0].label.chars().count(), 50);
        assert_eq!(mobile[0].rows[0].label.chars().count(), 35);
        assert!(desktop[0].show_legend);
        assert!(!mobile[0].show_legend);
    }

    #[test]
    fn aggregate_builds_stats_and_layout() {
        let bundle = Bundle::from_tasks(
            vec![
                task(1, "A", Phase::Planning, "DTI"),
                task(2, "A", Phase::Execution, "DTI").dates("2026-02-01", "2026-03-01"),
                task(3, "B", Phase::Contracting, "DAF"),
            ],
            SourceKind::Json,
        );
        let view = Aggregator::default().aggregate(&bundle, date(2026, 1, 5));
        assert_eq!(view.series.len(), 3);
        assert_eq!(view.stats.total_projects, 2);
        assert_eq!(view.stats.planning_today, 1);
        assert_eq!(view.stats.execution_today, 0);
        assert_eq!(view.stats.contracting_today, 1);
        assert_eq!(view.layout.row_count, 2);
        assert_eq!(view.layout.height, 520);
    }

    #[test]
    fn empty_input_yields_no_series() {
        let view = Aggregator::default().aggregate(
            &Bundle::from_tasks(Vec::new(), SourceKind::Json),
            date(2026, 1, 1),
        );
        assert!(view.series.is_empty());
        assert_eq!(view.stats.total_projects, 0);
    }
}
