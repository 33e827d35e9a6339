//! Session context: the current bundle, the active filter and load sequencing.
//!
//! The session owns a single reference to the bundle being displayed.
//! Every change (a completed load, a new filter) builds a fresh bundle and
//! swaps the whole `Arc`; nothing is mutated in place, so readers holding
//! the previous `Arc` keep a consistent view.
//!
//! Loads are sequenced: [`Session::begin_load`] hands out tickets in
//! increasing order and [`Session::complete_load`] only accepts the newest
//! one. A slow response for an older request is dropped instead of
//! overwriting a newer one.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use phaseline_core::{Bundle, SourceKind, TagField};
use phaseline_parser::csv::{CsvRecord, Normalizer};
use phaseline_parser::tags::{tag_index, TagFilter};
use phaseline_render::{Aggregator, AggregatorConfig, ChartView, Viewport};

use crate::chain::Loaded;

/// Sequence number of a load request
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

/// Coarse state for display
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing loaded and nothing pending
    Empty,
    /// A load newer than the displayed bundle is in flight
    Loading { pending: LoadTicket },
    /// A bundle is displayed
    Ready {
        source: SourceKind,
        task_count: usize,
        filtered: bool,
    },
}

#[derive(Debug, Clone)]
pub struct Session {
    normalizer: Normalizer,
    aggregator: AggregatorConfig,
    raw_records: Option<Arc<Vec<CsvRecord>>>,
    /// Unfiltered bundle of the last accepted load
    loaded: Option<Arc<Bundle>>,
    /// What is displayed: `loaded` with the filter applied
    current: Arc<Bundle>,
    filter: TagFilter,
    issued: u64,
    applied: Option<LoadTicket>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Normalizer::default())
    }
}

impl Session {
    /// `normalizer` re-normalizes raw records after filtering
    pub fn new(normalizer: Normalizer) -> Self {
        Self {
            normalizer,
            aggregator: AggregatorConfig::default(),
            raw_records: None,
            loaded: None,
            current: Arc::new(Bundle::from_tasks(Vec::new(), SourceKind::Json)),
            filter: TagFilter::default(),
            issued: 0,
            applied: None,
        }
    }

    /// Phase ordering used by [`Session::chart`]
    pub fn phase_order(mut self, order: Vec<String>) -> Self {
        self.aggregator.phase_order = order;
        self
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Register a new load request
    pub fn begin_load(&mut self) -> LoadTicket {
        self.issued += 1;
        debug!(ticket = self.issued, "load requested");
        LoadTicket(self.issued)
    }

    /// Install the result of a load. Returns `false` (and changes nothing)
    /// when a newer load has been requested since `ticket` was issued.
    pub fn complete_load(&mut self, ticket: LoadTicket, loaded: Loaded) -> bool {
        if ticket.0 != self.issued {
            debug!(
                ticket = ticket.0,
                newest = self.issued,
                "stale load result discarded"
            );
            return false;
        }

        info!(
            ticket = ticket.0,
            source = %loaded.source(),
            tasks = loaded.bundle.metadata.task_count,
            "bundle installed"
        );
        self.raw_records = loaded.raw_records.map(Arc::new);
        self.loaded = Some(Arc::new(loaded.bundle));
        self.applied = Some(ticket);
        self.current = self.filtered_bundle();
        true
    }

    // ========================================================================
    // Filtering
    // ========================================================================

    /// Replace the active filter and return the new current bundle.
    ///
    /// CSV-derived data is filtered at the raw-record level and normalized
    /// again, so task ids follow positions in the filtered set. Other sources
    /// filter their canonical tasks.
    pub fn apply_filter(&mut self, filter: TagFilter) -> Arc<Bundle> {
        self.filter = filter;
        self.current = self.filtered_bundle();
        Arc::clone(&self.current)
    }

    /// Remove the filter, showing the full bundle again
    pub fn clear_filter(&mut self) -> Arc<Bundle> {
        self.apply_filter(TagFilter::default())
    }

    pub fn filter(&self) -> &TagFilter {
        &self.filter
    }

    fn filtered_bundle(&self) -> Arc<Bundle> {
        let Some(loaded) = &self.loaded else {
            return Arc::clone(&self.current);
        };
        if self.filter.is_empty() {
            return Arc::clone(loaded);
        }

        let bundle = match &self.raw_records {
            Some(records) => {
                let kept = self.filter.apply_cloned(records.as_slice());
                self.normalizer.normalize(&kept)
            }
            None => loaded.with_tasks(self.filter.apply_cloned(&loaded.tasks)),
        };
        debug!(
            tasks = bundle.tasks.len(),
            filter = ?self.filter,
            "filter applied"
        );
        Arc::new(bundle)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// The bundle currently displayed
    pub fn current(&self) -> Arc<Bundle> {
        Arc::clone(&self.current)
    }

    /// Distinct values of `field` across the whole load, ignoring the filter
    pub fn tag_index(&self, field: TagField) -> Vec<String> {
        match (&self.raw_records, &self.loaded) {
            (Some(records), _) => tag_index(records.iter(), field),
            (None, Some(bundle)) => tag_index(&bundle.tasks, field),
            (None, None) => Vec::new(),
        }
    }

    /// Chart view of the current bundle, recomputed on every call
    pub fn chart(&self, viewport: Viewport, today: NaiveDate) -> ChartView {
        let config = AggregatorConfig {
            viewport,
            ..self.aggregator.clone()
        };
        Aggregator::new(config).aggregate(&self.current, today)
    }

    pub fn state(&self) -> SessionState {
        let pending = self.applied.map_or(self.issued > 0, |t| t.0 < self.issued);
        if pending {
            return SessionState::Loading {
                pending: LoadTicket(self.issued),
            };
        }
        match &self.loaded {
            Some(loaded) => SessionState::Ready {
                source: loaded.metadata.source,
                task_count: self.current.tasks.len(),
                filtered: !self.filter.is_empty(),
            },
            None => SessionState::Empty,
        }
    }
}
