//! The view session: combines column state, filtering, sorting, pagination,
//! formatting and FK lookups into the rows and columns to display.
//!
//! Per render cycle, [`ViewProjector::project`] runs:
//! 1. column ordering and visibility
//! 2. filtering (engine mode, when enabled)
//! 3. sorting (engine mode, when enabled)
//! 4. pagination
//! 5. formatting, keeping raw and display values side by side

mod export;
mod filtering;
mod formatting;
mod lookups;
mod projection;

pub use lookups::LookupLoadStats;
pub use projection::{
    LOOKUP_FAILED_DISPLAY, LOOKUP_NOT_FOUND_DISPLAY, LOOKUP_PENDING_DISPLAY, ProjectedCell,
    ProjectedColumn, ProjectedColumnKind, ProjectedRow, Projection,
};

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use tabula_core::{Column, ForeignKeyInfo, LookupSource, ResultSet, Row, RowId};

use crate::columns::ColumnViewState;
use crate::events::{EventQueue, ViewEvent};
use crate::filter::{self, FilterSet};
use crate::format::{AutoDetector, DetectionCache, FormatterConfig, FormatterRegistry};
use crate::lookup::{LookupConfig, LookupResolver};
use crate::pagination::{Pagination, PaginationMode};
use crate::settings::ViewSettings;
use crate::snapshot::ViewStateSnapshot;
use crate::sort::{self, SortSpec};

/// One view session over a fetched result set
pub struct ViewProjector {
    settings: ViewSettings,
    columns: Vec<Column>,
    rows: Vec<Row>,
    fk_by_column: HashMap<String, ForeignKeyInfo>,
    column_state: ColumnViewState,
    filters: FilterSet,
    sort: Option<SortSpec>,
    pagination: Pagination,
    filtering_enabled: bool,
    sorting_enabled: bool,
    formatters: IndexMap<String, FormatterConfig>,
    registry: Arc<FormatterRegistry>,
    detector: AutoDetector,
    detection_cache: DetectionCache,
    lookups: LookupConfig,
    resolver: Option<Arc<LookupResolver>>,
    events: EventQueue,
    /// Display strings from the last projection, per row and column
    derived: HashMap<RowId, HashMap<String, String>>,
}

impl std::fmt::Debug for ViewProjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewProjector")
            .field("columns", &self.columns.len())
            .field("rows", &self.rows.len())
            .field("filters", &self.filters.len())
            .field("sort", &self.sort)
            .field("pagination", &self.pagination)
            .field("lookups", &self.lookups.len())
            .finish()
    }
}

impl Default for ViewProjector {
    fn default() -> Self {
        Self::new(ViewSettings::default())
    }
}

impl ViewProjector {
    pub fn new(settings: ViewSettings) -> Self {
        Self {
            column_state: ColumnViewState::new(settings.default_column_width),
            pagination: Pagination::new(settings.page_size),
            detector: AutoDetector::new(settings.detection.clone()),
            settings,
            columns: Vec::new(),
            rows: Vec::new(),
            fk_by_column: HashMap::new(),
            filters: FilterSet::new(),
            sort: None,
            filtering_enabled: true,
            sorting_enabled: true,
            formatters: IndexMap::new(),
            registry: Arc::new(FormatterRegistry::with_defaults()),
            detection_cache: DetectionCache::new(),
            lookups: LookupConfig::new(),
            resolver: None,
            events: EventQueue::default(),
            derived: HashMap::new(),
        }
    }

    /// Use a custom formatter registry (e.g. with extra formatters)
    pub fn with_registry(mut self, registry: Arc<FormatterRegistry>) -> Self {
        self.registry = registry;
        self.invalidate_formatting();
        self
    }

    /// Enable FK lookups through `source`
    pub fn with_lookup_source(mut self, source: Arc<dyn LookupSource>) -> Self {
        self.resolver = Some(Arc::new(LookupResolver::new(
            source,
            self.settings.max_lookup_depth,
        )));
        self
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<FormatterRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> Option<&Arc<LookupResolver>> {
        self.resolver.as_ref()
    }

    // ============ Data ============

    /// Replace the columns and rows. Caches derived from the previous row
    /// set are dropped.
    pub fn set_result(&mut self, result: ResultSet) {
        let columns_changed = self.columns != result.columns;
        self.columns = result.columns;
        self.rows = result.rows;
        if let Some(total_rows) = result.total_rows
            && self.pagination.is_passthrough()
        {
            self.pagination
                .set_mode(PaginationMode::Passthrough { total_rows });
        }
        tracing::debug!(
            columns = self.columns.len(),
            rows = self.rows.len(),
            columns_changed,
            "view result set replaced"
        );

        self.invalidate_formatting();
        if let Some(resolver) = &self.resolver {
            resolver.invalidate();
        }
        if columns_changed {
            self.fk_by_column
                .retain(|column, _| self.columns.iter().any(|c| &c.name == column));
        }
        let local_rows = self.local_row_count();
        self.pagination.clamp(local_rows);
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Map foreign keys onto the view's columns
    pub fn set_foreign_keys(&mut self, foreign_keys: Vec<ForeignKeyInfo>) {
        self.fk_by_column.clear();

        for fk in foreign_keys {
            for column_name in &fk.columns {
                if self.columns.iter().any(|c| &c.name == column_name) {
                    tracing::debug!(
                        column = %column_name,
                        table = %fk.referenced_table,
                        referenced = %fk.referenced_columns.join(", "),
                        "FK mapping"
                    );
                    self.fk_by_column.insert(column_name.clone(), fk.clone());
                }
            }
        }

        tracing::info!(
            fk_columns = self.fk_by_column.len(),
            "FK mapping complete"
        );
    }

    pub fn is_foreign_key_column(&self, column: &str) -> bool {
        self.fk_by_column.contains_key(column)
    }

    pub fn fk_info(&self, column: &str) -> Option<&ForeignKeyInfo> {
        self.fk_by_column.get(column)
    }

    // ============ Columns ============

    pub fn column_state(&self) -> &ColumnViewState {
        &self.column_state
    }

    /// Columns in display order, hidden ones removed
    pub fn active_columns(&self) -> Vec<&Column> {
        self.column_state.active_columns(&self.columns)
    }

    pub fn set_column_order(&mut self, order: Vec<String>) {
        self.column_state.set_order(order);
    }

    pub fn move_column(&mut self, name: &str, to: usize) -> bool {
        self.column_state.move_column(&self.columns, name, to)
    }

    pub fn hide_column(&mut self, name: &str) {
        self.column_state.hide(name);
    }

    pub fn show_column(&mut self, name: &str) {
        self.column_state.show(name);
    }

    pub fn toggle_column(&mut self, name: &str) -> bool {
        self.column_state.toggle_visibility(name)
    }

    pub fn show_all_columns(&mut self) {
        self.column_state.show_all();
    }

    /// Resize a column. Width feeds format detection, so a change drops the
    /// detection cache.
    pub fn set_column_width(&mut self, name: &str, width: f32) -> bool {
        let changed = self.column_state.set_width(name, width);
        if changed {
            self.invalidate_formatting();
        }
        changed
    }

    pub fn reset_column_widths(&mut self) {
        if !self.column_state.widths().is_empty() {
            self.column_state.reset_widths();
            self.invalidate_formatting();
        }
    }

    // ============ Events ============

    /// Take the events emitted since the last call
    pub fn drain_events(&mut self) -> Vec<ViewEvent> {
        self.events.drain()
    }

    // ============ Persisted state ============

    pub fn snapshot(&self) -> ViewStateSnapshot {
        ViewStateSnapshot {
            columns: self.column_state.clone(),
            filters: self.filters.clone(),
            sort: self.sort.clone(),
            page_size: Some(self.pagination.page_size()),
            formatters: self.formatters.clone(),
            lookups: self.lookups.clone(),
        }
    }

    /// Restore a saved state. Formatter options are re-validated. Lookup
    /// chains over the depth limit, or not keyed by the foreign key of their
    /// column, are dropped, so foreign keys must be set first. No events are
    /// emitted.
    pub fn restore(&mut self, snapshot: ViewStateSnapshot) {
        self.column_state = snapshot.columns;
        self.filters = snapshot.filters;
        self.sort = snapshot.sort;
        if let Some(page_size) = snapshot.page_size {
            self.pagination.set_page_size(page_size);
        }
        self.formatters = snapshot
            .formatters
            .into_iter()
            .filter(|(_, config)| !config.is_auto())
            .map(|(column, config)| {
                let sanitized = self.registry.sanitize(&config);
                (column, sanitized)
            })
            .collect();
        let mut lookups = snapshot.lookups;
        lookups.retain_depth(self.settings.max_lookup_depth);
        let fks = &self.fk_by_column;
        let mismatched =
            lookups.retain(|column, lookup| fks.get(column) == Some(lookup.owning_fk()));
        if mismatched > 0 {
            tracing::warn!(
                dropped = mismatched,
                "dropping lookups whose key does not match the column's foreign key"
            );
        }
        self.lookups = lookups;

        self.invalidate_formatting();
        let local_rows = self.local_row_count();
        self.pagination.clamp(local_rows);
        tracing::debug!(
            filters = self.filters.len(),
            formatters = self.formatters.len(),
            lookups = self.lookups.len(),
            "restored view state"
        );
    }

    // ============ Pipeline ============

    fn applies_filters(&self) -> bool {
        self.filtering_enabled && !self.pagination.is_passthrough()
    }

    fn applies_sort(&self) -> bool {
        self.sorting_enabled && !self.pagination.is_passthrough()
    }

    /// Rows after filtering and sorting, across all pages
    pub fn processed_rows(&self) -> Vec<&Row> {
        let rows = if self.applies_filters() {
            filter::apply(&self.rows, &self.filters)
        } else {
            self.rows.iter().collect()
        };
        match &self.sort {
            Some(spec) if self.applies_sort() => sort::apply(rows, spec),
            _ => rows,
        }
    }

    /// Rows of the current page
    pub fn visible_rows(&self) -> Vec<&Row> {
        let processed = self.processed_rows();
        self.pagination.window(&processed).to_vec()
    }

    /// Row count the pager works from in engine mode
    fn local_row_count(&self) -> usize {
        if self.applies_filters() {
            filter::apply(&self.rows, &self.filters).len()
        } else {
            self.rows.len()
        }
    }

    fn invalidate_formatting(&mut self) {
        self.detection_cache.clear();
        self.derived.clear();
    }
}
