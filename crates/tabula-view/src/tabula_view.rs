//! Tabula View - the tabular view engine
//!
//! Turns a fetched `(columns, rows)` result set plus its foreign-key schema
//! into what a browsing session displays.
//!
//! # Architecture
//!
//! ```text
//! ViewProjector
//!     ↓
//! ColumnViewState → FilterSet → SortSpec → Pagination → FormatterRegistry
//!                                                          ↑
//!                                                     AutoDetector
//! LookupConfig → LookupResolver → LookupSource (tabula-core trait)
//! ```
//!
//! # Components
//!
//! - [`ColumnViewState`] - column ordering, visibility and widths
//! - [`FilterSet`] / [`FilterExpression`] - per-column filters and their
//!   serialized form
//! - [`SortSpec`] - single-key stable sort with NULLs last
//! - [`FormatterRegistry`] / [`AutoDetector`] - display formatting
//! - [`LookupResolver`] - FK record resolution with de-duplicated fetches
//! - [`Pagination`] - engine-paginated and passthrough paging
//! - [`ViewProjector`] - the session tying them together, plus export
//!
//! Row operations never fail. Errors ([`ViewError`]) only come out of
//! configuration changes such as building an invalid lookup chain.

mod columns;
mod error;
mod events;
mod filter;
mod format;
mod lookup;
mod pagination;
mod projector;
mod settings;
mod snapshot;
mod sort;

pub use columns::{ColumnViewState, DataTypeClass, TemporalKind};
pub use error::{ViewError, ViewResult};
pub use events::ViewEvent;
pub use filter::{FilterExpression, FilterKind, FilterSet, FilterSpec};
pub use format::{
    AUTO_FORMATTER, AutoDetector, BooleanFormatter, BytesFormatter, CellFormatter, CellRender,
    DateFormatter, DetectionCache, EnumFormatter, FALLBACK_FORMATTER, FormatOptions, Formatted,
    FormatterConfig, FormatterRegistry, JsonFormatter, NULL_DISPLAY, NumberFormatter,
    ResolvedFormatter, SuffixedNumberFormatter, TextFormatter,
};
pub use lookup::{
    ChainLevel, Expansion, ExpansionRequest, KEY_SEPARATOR, LookupCache,
    LookupChainEditor, LookupColumn, LookupConfig, LookupKey, LookupOutcome, LookupPreview,
    LookupResolver, LookupValue, PreviewState, RequestGate, RequestToken,
};
pub use pagination::{Pagination, PaginationMode};
pub use projector::{
    LOOKUP_FAILED_DISPLAY, LOOKUP_NOT_FOUND_DISPLAY, LOOKUP_PENDING_DISPLAY, LookupLoadStats,
    ProjectedCell, ProjectedColumn, ProjectedColumnKind, ProjectedRow, Projection, ViewProjector,
};
pub use settings::{DetectionSettings, MIN_COLUMN_WIDTH, ViewSettings};
pub use snapshot::ViewStateSnapshot;
pub use sort::{SortDirection, SortSpec, compare_values, locale_compare};

/// Filter rows by a filter set (free function form)
pub use filter::apply as apply_filters;
/// Stable sort of rows by one column (free function form)
pub use sort::apply as apply_sort;
/// Next sort state after a header click
pub use sort::toggle as toggle_sort;

pub use tabula_core;
