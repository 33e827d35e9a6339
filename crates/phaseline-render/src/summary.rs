//! Plain-text summary of a chart view, for terminals.

use chrono::NaiveDate;

use phaseline_core::{Bundle, RenderError, Renderer};

use crate::series::{Aggregator, AggregatorConfig, ChartView};

/// Dashboard cards followed by one block per phase series
#[derive(Clone, Debug)]
pub struct SummaryRenderer {
    pub today: NaiveDate,
    pub aggregator: AggregatorConfig,
    /// Whether to list the rows under each phase
    pub show_rows: bool,
}

impl SummaryRenderer {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            aggregator: AggregatorConfig::default(),
            show_rows: true,
        }
    }

    pub fn aggregator(mut self, config: AggregatorConfig) -> Self {
        self.aggregator = config;
        self
    }

    /// Only the dashboard cards
    pub fn stats_only(mut self) -> Self {
        self.show_rows = false;
        self
    }

    /// Format an already aggregated view
    pub fn format_view(&self, title: &str, view: &ChartView) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "{} (as of {})\n",
            title,
            view.stats.as_of.format("%d/%m/%Y")
        ));

        let width = view
            .stats
            .cards()
            .iter()
            .map(|(name, _)| name.chars().count())
            .max()
            .unwrap_or(0);
        for (name, value) in view.stats.cards() {
            output.push_str(&format!("  {:<width$}  {:>4}\n", name, value, width = width));
        }

        if !self.show_rows {
            return output;
        }

        let label_width = view.layout.viewport.label_width();
        for series in &view.series {
            output.push_str(&format!("\n{} ({})\n", series.name, series.rows.len()));
            for row in &series.rows {
                let span = if row.hover.start.is_empty() || row.hover.end.is_empty() {
                    "sem datas".to_string()
                } else {
                    format!("{} - {}", row.hover.start, row.hover.end)
                };
                output.push_str(&format!(
                    "  {:<width$}  {}\n",
                    row.label,
                    span,
                    width = label_width
                ));
            }
        }
        output
    }
}

impl Renderer for SummaryRenderer {
    type Output = String;

    fn render(&self, bundle: &Bundle) -> Result<String, RenderError> {
        let view = Aggregator::new(self.aggregator.clone()).aggregate(bundle, self.today);
        Ok(self.format_view(&bundle.project.name, &view))
    }
}
