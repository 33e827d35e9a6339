//! Layout descriptor for the timeline canvas.
//!
//! The time axis is centered on today; canvas height grows with the number
//! of distinct projects, never dropping below a per-viewport base.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Days shown on each side of today
pub const WINDOW_DAYS: u64 = 45;

/// Target display width
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Viewport {
    #[default]
    Desktop,
    Mobile,
}

impl Viewport {
    /// Character budget for row labels
    pub fn label_width(&self) -> usize {
        match self {
            Viewport::Desktop => 50,
            Viewport::Mobile => 35,
        }
    }

    /// Minimum canvas height in pixels
    pub fn base_height(&self) -> u32 {
        match self {
            Viewport::Desktop => 520,
            Viewport::Mobile => 380,
        }
    }

    /// Pixels per project row
    pub fn row_height(&self) -> u32 {
        match self {
            Viewport::Desktop => 26,
            Viewport::Mobile => 34,
        }
    }

    /// Pixels reserved for axis, margins and legend
    pub fn extra_height(&self) -> u32 {
        match self {
            Viewport::Desktop => 220,
            Viewport::Mobile => 160,
        }
    }

    pub fn shows_legend(&self) -> bool {
        matches!(self, Viewport::Desktop)
    }
}

impl std::str::FromStr for Viewport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "desktop" => Ok(Viewport::Desktop),
            "mobile" => Ok(Viewport::Mobile),
            other => Err(format!(
                "unknown viewport '{}', expected desktop or mobile",
                other
            )),
        }
    }
}

impl std::fmt::Display for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Viewport::Desktop => write!(f, "desktop"),
            Viewport::Mobile => write!(f, "mobile"),
        }
    }
}

/// Everything the presentation layer needs besides the series
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub viewport: Viewport,
    /// First day of the visible time axis
    pub window_start: NaiveDate,
    /// Last day of the visible time axis
    pub window_end: NaiveDate,
    /// Date of the "today" marker line
    pub today: NaiveDate,
    /// Distinct projects, one row each
    pub row_count: usize,
    /// Canvas height in pixels
    pub height: u32,
    pub show_legend: bool,
}

impl Layout {
    pub fn new(viewport: Viewport, today: NaiveDate, row_count: usize) -> Self {
        let (window_start, window_end) = time_window(today);
        Self {
            viewport,
            window_start,
            window_end,
            today,
            row_count,
            height: canvas_height(viewport, row_count),
            show_legend: viewport.shows_legend(),
        }
    }
}

/// `today ± WINDOW_DAYS`, saturating at the calendar bounds
pub fn time_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let span = Days::new(WINDOW_DAYS);
    (
        today.checked_sub_days(span).unwrap_or(NaiveDate::MIN),
        today.checked_add_days(span).unwrap_or(NaiveDate::MAX),
    )
}

/// `max(base, rows × per_row + extra)` with at least one row
pub fn canvas_height(viewport: Viewport, row_count: usize) -> u32 {
    let rows = u32::try_from(row_count.max(1)).unwrap_or(u32::MAX);
    let grown = rows
        .saturating_mul(viewport.row_height())
        .saturating_add(viewport.extra_height());
    grown.max(viewport.base_height())
}
