//! Page bookkeeping for engine-paginated and passthrough views

use serde::{Deserialize, Serialize};

/// Who owns pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationMode {
    /// The engine holds the whole row set and slices it into pages
    #[default]
    Engine,
    /// The rows supplied are exactly one page fetched by the data source;
    /// `total_rows` is the source's count
    Passthrough { total_rows: u64 },
}

/// Current page and page size (pages are 1-indexed)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    page: usize,
    page_size: usize,
    mode: PaginationMode,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            mode: PaginationMode::Engine,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn mode(&self) -> PaginationMode {
        self.mode
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self.mode, PaginationMode::Passthrough { .. })
    }

    /// Switch modes, returning to the first page when the mode kind changes
    pub fn set_mode(&mut self, mode: PaginationMode) -> bool {
        if self.mode == mode {
            return false;
        }
        if std::mem::discriminant(&self.mode) != std::mem::discriminant(&mode) {
            self.page = 1;
        }
        self.mode = mode;
        true
    }

    /// Rows across all pages. `local_rows` is the filtered row count in
    /// engine mode and is ignored in passthrough mode.
    pub fn total_rows(&self, local_rows: usize) -> u64 {
        match self.mode {
            PaginationMode::Engine => local_rows as u64,
            PaginationMode::Passthrough { total_rows } => total_rows,
        }
    }

    /// Number of pages, never less than one
    pub fn total_pages(&self, local_rows: usize) -> usize {
        let total = self.total_rows(local_rows);
        let page_size = self.page_size as u64;
        let pages = total.saturating_add(page_size - 1) / page_size;
        pages.min(usize::MAX as u64).max(1) as usize
    }

    /// Index of the first row of the current page at the data source
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }

    /// Navigate to `page`, clamped to the valid range. Returns whether the
    /// page changed.
    pub fn go_to_page(&mut self, page: usize, local_rows: usize) -> bool {
        let new_page = page.clamp(1, self.total_pages(local_rows));
        if self.page == new_page {
            return false;
        }
        self.page = new_page;
        true
    }

    pub fn go_next(&mut self, local_rows: usize) -> bool {
        self.go_to_page(self.page.saturating_add(1), local_rows)
    }

    pub fn go_prev(&mut self, local_rows: usize) -> bool {
        self.go_to_page(self.page.saturating_sub(1), local_rows)
    }

    pub fn go_first(&mut self, local_rows: usize) -> bool {
        self.go_to_page(1, local_rows)
    }

    pub fn go_last(&mut self, local_rows: usize) -> bool {
        self.go_to_page(usize::MAX, local_rows)
    }

    pub fn can_go_next(&self, local_rows: usize) -> bool {
        self.page < self.total_pages(local_rows)
    }

    pub fn can_go_prev(&self) -> bool {
        self.page > 1
    }

    /// Change the page size and return to the first page. Zero is ignored.
    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        if page_size == 0 || page_size == self.page_size {
            return false;
        }
        self.page_size = page_size;
        self.page = 1;
        true
    }

    /// Pull the current page back into range after the row count shrank
    pub fn clamp(&mut self, local_rows: usize) -> bool {
        self.go_to_page(self.page, local_rows)
    }

    /// The rows to display. Engine mode slices the current page out of
    /// `rows`; passthrough mode returns `rows` unchanged.
    pub fn window<'a, T>(&self, rows: &'a [T]) -> &'a [T] {
        match self.mode {
            PaginationMode::Passthrough { .. } => rows,
            PaginationMode::Engine => {
                let start = self.offset().min(rows.len());
                let end = start.saturating_add(self.page_size).min(rows.len());
                &rows[start..end]
            }
        }
    }

    /// Status line, e.g. "10 rows in page 2 of 5 (47 total)"
    pub fn status_text(&self, rows_in_page: usize, local_rows: usize) -> String {
        format!(
            "{} rows in page {} of {} ({} total)",
            rows_in_page,
            self.page,
            self.total_pages(local_rows),
            self.total_rows(local_rows)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_math() {
        let pagination = Pagination::new(10);
        assert_eq!(pagination.total_pages(47), 5);
        assert_eq!(pagination.total_pages(50), 5);
        assert_eq!(pagination.total_pages(51), 6);
        // an empty set still has one (empty) page
        assert_eq!(pagination.total_pages(0), 1);
    }

    #[test]
    fn test_last_page_window() {
        let rows: Vec<usize> = (0..47).collect();
        let mut pagination = Pagination::new(10);
        assert!(pagination.go_to_page(5, rows.len()));
        assert_eq!(pagination.window(&rows), &rows[40..47]);
        assert_eq!(pagination.window(&rows).len(), 7);
    }

    #[test]
    fn test_out_of_range_requests_clamp() {
        let mut pagination = Pagination::new(10);
        pagination.go_to_page(6, 47);
        assert_eq!(pagination.page(), 5);
        pagination.go_to_page(0, 47);
        assert_eq!(pagination.page(), 1);
        assert!(!pagination.go_prev(47));
        assert!(!pagination.go_to_page(0, 47));
    }

    #[test]
    fn test_navigation() {
        let mut pagination = Pagination::new(10);
        assert!(pagination.go_next(25));
        assert!(pagination.go_next(25));
        assert!(!pagination.go_next(25));
        assert!(!pagination.can_go_next(25));
        assert!(pagination.go_first(25));
        assert!(pagination.go_last(25));
        assert_eq!(pagination.page(), 3);
        assert_eq!(pagination.offset(), 20);
    }

    #[test]
    fn test_page_size_change_resets_page() {
        let mut pagination = Pagination::new(10);
        pagination.go_to_page(3, 100);
        assert!(pagination.set_page_size(25));
        assert_eq!(pagination.page(), 1);
        assert!(!pagination.set_page_size(0));
        assert_eq!(pagination.page_size(), 25);
    }

    #[test]
    fn test_clamp_after_shrink() {
        let mut pagination = Pagination::new(10);
        pagination.go_to_page(5, 47);
        assert!(pagination.clamp(12));
        assert_eq!(pagination.page(), 2);
    }

    #[test]
    fn test_passthrough_uses_external_total() {
        let rows: Vec<usize> = (0..10).collect();
        let mut pagination = Pagination::new(10);
        pagination.set_mode(PaginationMode::Passthrough { total_rows: 47 });
        assert_eq!(pagination.total_pages(rows.len()), 5);
        assert!(pagination.go_to_page(4, rows.len()));
        // the supplied rows already are the page
        assert_eq!(pagination.window(&rows), &rows[..]);
        assert_eq!(pagination.offset(), 30);
        assert_eq!(
            pagination.status_text(rows.len(), rows.len()),
            "10 rows in page 4 of 5 (47 total)"
        );
    }

    #[test]
    fn test_mode_switch_resets_page() {
        let mut pagination = Pagination::new(10);
        pagination.go_to_page(3, 100);
        assert!(pagination.set_mode(PaginationMode::Passthrough { total_rows: 100 }));
        assert_eq!(pagination.page(), 1);
        pagination.go_to_page(3, 0);
        // a new total keeps the page
        assert!(pagination.set_mode(PaginationMode::Passthrough { total_rows: 90 }));
        assert_eq!(pagination.page(), 3);
    }
}
