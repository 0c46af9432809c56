//! Filter, sort and page changes. Each change is applied locally in engine
//! mode and forwarded as an event in passthrough mode.

use super::*;
use crate::error::ViewResult;
use crate::filter::{FilterExpression, FilterSpec};

impl ViewProjector {
    // ============ Filters ============

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn filtering_enabled(&self) -> bool {
        self.filtering_enabled
    }

    pub fn set_filtering_enabled(&mut self, enabled: bool) {
        if self.filtering_enabled != enabled {
            self.filtering_enabled = enabled;
            self.after_row_set_change();
        }
    }

    /// Set the filter of one column; an empty spec clears it
    pub fn set_filter(&mut self, column: &str, spec: FilterSpec) -> bool {
        let changed = self.filters.set(column, spec);
        if changed {
            self.notify_filter_change();
        }
        changed
    }

    pub fn remove_filter(&mut self, column: &str) -> bool {
        let changed = self.filters.remove(column);
        if changed {
            self.notify_filter_change();
        }
        changed
    }

    pub fn clear_filters(&mut self) {
        if !self.filters.is_empty() {
            self.filters.clear();
            self.notify_filter_change();
        }
    }

    /// Replace all filters from a serialized expression
    pub fn set_filter_expression(&mut self, expr: &str) -> ViewResult<bool> {
        let filters = FilterExpression::parse(expr)?;
        if filters == self.filters {
            return Ok(false);
        }
        self.filters = filters;
        self.notify_filter_change();
        Ok(true)
    }

    pub fn filter_expression(&self) -> String {
        FilterExpression::serialize(&self.filters)
    }

    fn notify_filter_change(&mut self) {
        let expr = self.filter_expression();
        tracing::debug!(
            expr = %expr,
            passthrough = self.pagination.is_passthrough(),
            "filters changed"
        );
        if self.pagination.is_passthrough() {
            self.events.push(ViewEvent::FilterExternal { expr });
        } else {
            self.events.push(ViewEvent::FilterChanged { expr });
            let local_rows = self.local_row_count();
            self.pagination.go_first(local_rows);
        }
    }

    // ============ Sort ============

    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    pub fn sorting_enabled(&self) -> bool {
        self.sorting_enabled
    }

    pub fn set_sorting_enabled(&mut self, enabled: bool) {
        self.sorting_enabled = enabled;
    }

    /// Header click: ascending, descending, then unsorted
    pub fn toggle_sort(&mut self, column: &str) {
        let next = sort::toggle(self.sort.as_ref(), column);
        self.apply_sort(column, next);
    }

    pub fn set_sort(&mut self, spec: Option<SortSpec>) {
        if self.sort == spec {
            return;
        }
        let column = spec
            .as_ref()
            .or(self.sort.as_ref())
            .map(|s| s.column.clone())
            .unwrap_or_default();
        self.apply_sort(&column, spec);
    }

    fn apply_sort(&mut self, column: &str, next: Option<SortSpec>) {
        let direction = next.as_ref().map(|s| s.direction);
        self.sort = next;
        tracing::debug!(column, direction = ?direction, "sort changed");
        if self.pagination.is_passthrough() {
            self.events.push(ViewEvent::SortExternal {
                column: column.to_string(),
                direction,
            });
        } else {
            self.events.push(ViewEvent::Sort {
                column: column.to_string(),
            });
        }
    }

    // ============ Pagination ============

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn total_pages(&self) -> usize {
        self.pagination.total_pages(self.local_row_count())
    }

    pub fn total_rows(&self) -> u64 {
        self.pagination.total_rows(self.local_row_count())
    }

    /// Switch between engine pagination and passthrough
    pub fn set_pagination_mode(&mut self, mode: PaginationMode) {
        if self.pagination.set_mode(mode) {
            tracing::debug!(mode = ?mode, "pagination mode changed");
            self.after_row_set_change();
        }
    }

    /// Go to `page`, clamped to the valid range
    pub fn go_to_page(&mut self, page: usize) -> bool {
        let local_rows = self.local_row_count();
        let changed = self.pagination.go_to_page(page, local_rows);
        if changed {
            self.notify_page_change();
        }
        changed
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.pagination.page().saturating_add(1))
    }

    pub fn prev_page(&mut self) -> bool {
        self.go_to_page(self.pagination.page().saturating_sub(1))
    }

    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        let changed = self.pagination.set_page_size(page_size);
        if changed {
            self.notify_page_change();
        }
        changed
    }

    fn notify_page_change(&mut self) {
        if self.pagination.is_passthrough() {
            self.events.push(ViewEvent::PageChanged {
                page: self.pagination.page(),
                page_size: self.pagination.page_size(),
            });
        }
    }

    /// The set of rows feeding the pager changed without new data
    fn after_row_set_change(&mut self) {
        let local_rows = self.local_row_count();
        self.pagination.clamp(local_rows);
    }
}
