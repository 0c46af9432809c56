//! Logical export payload
//!
//! Engine mode exports every row that survives filtering and sorting, across
//! all pages; passthrough mode exports the page the source supplied.

use super::*;
use tabula_core::{ExportMode, ExportPayload, ExportWriter, Value};

impl ViewProjector {
    /// Build the payload for an export writer.
    ///
    /// `Raw` carries untouched values; `Formatted` carries display strings,
    /// taken from the last projection where available. NULLs stay NULL in
    /// both modes. Lookup columns (when `include_lookups` is set) follow the
    /// data columns and are read from the lookup cache only; unresolved cells
    /// export as NULL, so call [`load_export_lookups`](Self::load_export_lookups)
    /// first for a complete export.
    pub fn build_export(&self, mode: ExportMode, include_lookups: bool) -> ExportPayload {
        let data_columns: Vec<&Column> = self.active_columns();
        let lookup_columns: Vec<(&str, &crate::lookup::LookupColumn)> = if include_lookups {
            self.lookups
                .iter()
                .filter(|(fk_column, _)| self.column(fk_column).is_some())
                .collect()
        } else {
            Vec::new()
        };

        let mut columns: Vec<String> = data_columns.iter().map(|c| c.name.clone()).collect();
        columns.extend(
            lookup_columns
                .iter()
                .map(|(fk_column, lookup)| lookup.column_key(fk_column)),
        );

        let formatters: Vec<_> = match mode {
            ExportMode::Raw => Vec::new(),
            ExportMode::Formatted => data_columns
                .iter()
                .map(|c| self.resolved_formatter(&c.name))
                .collect(),
        };

        let rows = self
            .processed_rows()
            .into_iter()
            .map(|row| {
                let mut values = Vec::with_capacity(columns.len());
                for (ix, column) in data_columns.iter().enumerate() {
                    let raw = row.value(&column.name);
                    let value = match mode {
                        ExportMode::Raw => raw.clone(),
                        ExportMode::Formatted if raw.is_null() => Value::Null,
                        ExportMode::Formatted => Value::String(
                            self.derived
                                .get(&row.id())
                                .and_then(|cells| cells.get(&column.name))
                                .cloned()
                                .unwrap_or_else(|| formatters[ix].display(raw)),
                        ),
                    };
                    values.push(value);
                }
                for (fk_column, lookup) in &lookup_columns {
                    let value = match &self.resolver {
                        Some(resolver) => resolver
                            .peek_chain(fk_column, row.value(fk_column), lookup)
                            .into_value(),
                        None => Value::Null,
                    };
                    values.push(match mode {
                        ExportMode::Formatted if !value.is_null() => {
                            Value::String(value.to_plain_string())
                        }
                        _ => value,
                    });
                }
                values
            })
            .collect();

        let payload = ExportPayload { columns, rows };
        tracing::debug!(
            mode = ?mode,
            columns = payload.columns.len(),
            rows = payload.row_count(),
            "built export payload"
        );
        payload
    }

    /// Build the payload and hand it to `writer`
    pub fn export_with(
        &self,
        writer: &dyn ExportWriter,
        mode: ExportMode,
        include_lookups: bool,
    ) -> tabula_core::Result<Vec<u8>> {
        let payload = self.build_export(mode, include_lookups);
        let bytes = writer.write(&payload)?;
        tracing::info!(
            format = writer.format_name(),
            rows = payload.row_count(),
            bytes = bytes.len(),
            "export written"
        );
        Ok(bytes)
    }
}
