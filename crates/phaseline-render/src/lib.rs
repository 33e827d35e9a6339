//! # phaseline-render
//!
//! Chart aggregation and rendering backends for phaseline bundles.
//!
//! This crate provides:
//! - The aggregator: phase-grouped chart series with labels, durations and hover data
//! - The layout descriptor (time window, canvas height, legend)
//! - A plain-text summary for terminals
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use phaseline_core::{Bundle, CanonicalTask, Phase, SourceKind};
//! use phaseline_render::{Aggregator, Viewport};
//!
//! let bundle = Bundle::from_tasks(
//!     vec![CanonicalTask::new(1000, "Portal", Phase::Planning).dates("2026-01-01", "2026-01-15")],
//!     SourceKind::Json,
//! );
//! let today = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
//! let view = Aggregator::for_viewport(Viewport::Desktop).aggregate(&bundle, today);
//!
//! assert_eq!(view.series[0].name, "Planejamento");
//! assert_eq!(view.series[0].rows[0].label, "[Sem Diretoria] Portal");
//! assert_eq!(view.stats.planning_today, 1);
//! ```

pub mod layout;
pub mod series;
pub mod summary;

pub use layout::{Layout, Viewport};
pub use series::{
    Aggregator, AggregatorConfig, ChartSeries, ChartView, HoverInfo, SeriesRow,
};
pub use summary::SummaryRenderer;
