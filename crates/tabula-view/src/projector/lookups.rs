use futures::future::join_all;

use super::*;
use crate::error::{ViewError, ViewResult};
use crate::lookup::{LookupChainEditor, LookupColumn, LookupValue};

/// Outcome counts of one lookup load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupLoadStats {
    pub resolved: usize,
    pub not_found: usize,
    pub failed: usize,
}

impl ViewProjector {
    pub fn lookup_config(&self) -> &LookupConfig {
        &self.lookups
    }

    /// Add a derived lookup column for an FK column of this view
    pub fn add_lookup(&mut self, fk_column: &str, lookup: LookupColumn) -> ViewResult<bool> {
        if self.column(fk_column).is_none() {
            return Err(ViewError::UnknownColumn(fk_column.to_string()));
        }
        if !self.is_foreign_key_column(fk_column) {
            tracing::warn!(column = fk_column, "lookup requested on a non-FK column");
            return Err(ViewError::NotForeignKey {
                table: lookup.owning_fk().referenced_table.clone(),
                column: fk_column.to_string(),
            });
        }
        if self.fk_info(fk_column) != Some(lookup.owning_fk()) {
            return Err(ViewError::ForeignKeyMismatch {
                column: fk_column.to_string(),
                referenced_table: lookup.owning_fk().referenced_table.clone(),
            });
        }
        lookup.check_depth(self.settings.max_lookup_depth)?;
        self.lookups.add(fk_column, lookup)
    }

    pub fn remove_lookup(&mut self, fk_column: &str, lookup: &LookupColumn) -> bool {
        self.lookups.remove(fk_column, lookup)
    }

    /// Start building a lookup chain for an FK column
    pub fn lookup_editor(&self, fk_column: &str) -> ViewResult<LookupChainEditor> {
        let fk = self
            .fk_info(fk_column)
            .ok_or_else(|| ViewError::UnknownColumn(fk_column.to_string()))?;
        Ok(LookupChainEditor::new(
            fk_column,
            fk.clone(),
            self.settings.max_lookup_depth,
        ))
    }

    /// Resolve every configured lookup cell of the current page.
    ///
    /// Cells resolve concurrently; levels within one chain stay sequential.
    pub async fn load_lookups(&self) -> LookupLoadStats {
        let visible = self.visible_rows();
        self.load_lookups_for(&visible).await
    }

    /// Resolve lookup cells for every row an export would contain
    pub async fn load_export_lookups(&self) -> LookupLoadStats {
        let rows = self.processed_rows();
        self.load_lookups_for(&rows).await
    }

    async fn load_lookups_for(&self, rows: &[&Row]) -> LookupLoadStats {
        let Some(resolver) = &self.resolver else {
            return LookupLoadStats::default();
        };
        if self.lookups.is_empty() {
            return LookupLoadStats::default();
        }

        let tasks = rows.iter().flat_map(|row| {
            self.lookups.iter().map(move |(fk_column, lookup)| {
                resolver.resolve_chain(fk_column, row.value(fk_column), lookup)
            })
        });
        let results = join_all(tasks).await;

        let mut stats = LookupLoadStats::default();
        for result in &results {
            match result {
                LookupValue::NotFound => stats.not_found += 1,
                LookupValue::Failed(_) => stats.failed += 1,
                _ => stats.resolved += 1,
            }
        }
        tracing::debug!(
            rows = rows.len(),
            resolved = stats.resolved,
            not_found = stats.not_found,
            failed = stats.failed,
            "loaded lookup cells"
        );
        stats
    }
}
