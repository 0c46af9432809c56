use super::*;
use crate::columns::DataTypeClass;
use crate::filter::FilterKind;
use crate::format::{CellRender, NULL_DISPLAY, ResolvedFormatter};
use crate::lookup::{LookupColumn, LookupValue};
use tabula_core::Value;

/// Shown while a lookup cell waits for its fetch
pub const LOOKUP_PENDING_DISPLAY: &str = "…";
/// Shown when the referenced record does not exist
pub const LOOKUP_NOT_FOUND_DISPLAY: &str = "(not found)";
/// Shown when fetching the referenced record failed
pub const LOOKUP_FAILED_DISPLAY: &str = "(error)";

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectedColumnKind {
    Data {
        formatter: FormatterConfig,
        class: DataTypeClass,
        filter_kind: FilterKind,
        foreign_key: Option<ForeignKeyInfo>,
    },
    /// Derived column read through an FK
    Lookup {
        fk_column: String,
        lookup: LookupColumn,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedColumn {
    /// Column name, or the derived key for lookup columns
    pub key: String,
    pub label: String,
    pub width: f32,
    pub kind: ProjectedColumnKind,
}

impl ProjectedColumn {
    pub fn is_lookup(&self) -> bool {
        matches!(self.kind, ProjectedColumnKind::Lookup { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedCell {
    /// Untouched value (the resolved value for lookup cells)
    pub raw: Value,
    pub display: String,
    pub render: CellRender,
    /// Lookup state, for lookup cells only
    pub lookup: Option<LookupValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedRow {
    pub id: RowId,
    pub cells: Vec<ProjectedCell>,
}

/// What one render cycle displays
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub columns: Vec<ProjectedColumn>,
    pub rows: Vec<ProjectedRow>,
    pub page: usize,
    pub total_pages: usize,
    /// Rows across all pages (the source's count in passthrough mode)
    pub total_rows: u64,
}

impl Projection {
    pub fn column_index(&self, key: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.key == key)
    }

    pub fn cell(&self, row: usize, key: &str) -> Option<&ProjectedCell> {
        let ix = self.column_index(key)?;
        self.rows.get(row).and_then(|r| r.cells.get(ix))
    }
}

impl ViewProjector {
    /// Columns to display: active data columns, each followed by the lookup
    /// columns configured for it
    pub fn projected_columns(&self) -> Vec<ProjectedColumn> {
        let mut columns = Vec::new();
        for column in self.active_columns() {
            columns.push(ProjectedColumn {
                key: column.name.clone(),
                label: column.display_label().to_string(),
                width: self.column_state.width(&column.name),
                kind: ProjectedColumnKind::Data {
                    formatter: self.effective_formatter(&column.name),
                    class: DataTypeClass::of(column),
                    filter_kind: FilterKind::for_column(column),
                    foreign_key: self.fk_by_column.get(&column.name).cloned(),
                },
            });
            for lookup in self.lookups.entries_for(&column.name) {
                let key = lookup.column_key(&column.name);
                columns.push(ProjectedColumn {
                    width: self.column_state.width(&key),
                    key,
                    label: lookup.label(),
                    kind: ProjectedColumnKind::Lookup {
                        fk_column: column.name.clone(),
                        lookup: lookup.clone(),
                    },
                });
            }
        }
        columns
    }

    /// Run one render cycle and remember the display strings for export
    pub fn project(&mut self) -> Projection {
        let columns = self.projected_columns();
        let sources: Vec<CellSource<'_>> = columns
            .iter()
            .map(|column| match &column.kind {
                ProjectedColumnKind::Data { formatter, .. } => {
                    CellSource::Data(self.registry.resolve(formatter))
                }
                ProjectedColumnKind::Lookup { fk_column, lookup } => {
                    CellSource::Lookup(fk_column, lookup)
                }
            })
            .collect();

        let processed = self.processed_rows();
        let local_rows = processed.len();
        let window = self.pagination.window(&processed);

        let mut derived = HashMap::with_capacity(window.len());
        let rows: Vec<ProjectedRow> = window
            .iter()
            .map(|row| {
                let mut texts = HashMap::with_capacity(columns.len());
                let cells = columns
                    .iter()
                    .zip(&sources)
                    .map(|(column, source)| match source {
                        CellSource::Data(formatter) => {
                            let raw = row.value(&column.key).clone();
                            let display = formatter.display(&raw);
                            texts.insert(column.key.clone(), display.clone());
                            ProjectedCell {
                                render: formatter.render(&raw),
                                raw,
                                display,
                                lookup: None,
                            }
                        }
                        CellSource::Lookup(fk_column, lookup) => {
                            self.lookup_cell(row, fk_column, lookup)
                        }
                    })
                    .collect();
                derived.insert(row.id(), texts);
                ProjectedRow {
                    id: row.id(),
                    cells,
                }
            })
            .collect();
        drop(sources);

        let projection = Projection {
            columns,
            rows,
            page: self.pagination.page(),
            total_pages: self.pagination.total_pages(local_rows),
            total_rows: self.pagination.total_rows(local_rows),
        };
        self.derived = derived;
        tracing::trace!(
            rows = projection.rows.len(),
            columns = projection.columns.len(),
            page = projection.page,
            "projected view"
        );
        projection
    }

    /// Lookup cell read from the resolver cache; never fetches
    pub fn lookup_cell(&self, row: &Row, fk_column: &str, lookup: &LookupColumn) -> ProjectedCell {
        let state = match &self.resolver {
            Some(resolver) => resolver.peek_chain(fk_column, row.value(fk_column), lookup),
            None => LookupValue::Pending,
        };
        let (display, render) = match &state {
            LookupValue::Value(value) if !value.is_null() => {
                let text = value.to_plain_string();
                (text.clone(), CellRender::Text(text))
            }
            LookupValue::Value(_) | LookupValue::Null => {
                (NULL_DISPLAY.to_string(), CellRender::Null)
            }
            LookupValue::Pending => (
                LOOKUP_PENDING_DISPLAY.to_string(),
                CellRender::Text(LOOKUP_PENDING_DISPLAY.to_string()),
            ),
            LookupValue::NotFound => (
                LOOKUP_NOT_FOUND_DISPLAY.to_string(),
                CellRender::Text(LOOKUP_NOT_FOUND_DISPLAY.to_string()),
            ),
            LookupValue::Failed(_) => (
                LOOKUP_FAILED_DISPLAY.to_string(),
                CellRender::Text(LOOKUP_FAILED_DISPLAY.to_string()),
            ),
        };
        ProjectedCell {
            raw: state.clone().into_value(),
            display,
            render,
            lookup: Some(state),
        }
    }
}

/// How the cells of one projected column are produced
enum CellSource<'a> {
    Data(ResolvedFormatter),
    Lookup(&'a str, &'a LookupColumn),
}
