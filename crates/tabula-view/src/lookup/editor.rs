//! Interactive construction of lookup chains
//!
//! The editor starts at a view column's foreign key. Each level lists the
//! columns of one referenced table; picking a column that is itself a foreign
//! key of that table asks for another level. Levels are fetched
//! asynchronously, so every expansion carries a generation token and
//! results for abandoned expansions are ignored.

use tabula_core::ForeignKeyInfo;

use super::chain::LookupColumn;
use super::preview::{RequestGate, RequestToken};
use crate::error::{ViewError, ViewResult};

/// Request for the data of one chain level
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionRequest {
    pub token: RequestToken,
    /// Index the new level will occupy
    pub level: usize,
    /// Column holding the FK value: the view column for level 0, otherwise
    /// the column picked on the previous level
    pub fk_column: String,
    pub fk: ForeignKeyInfo,
}

/// Data fetched for one level
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expansion {
    pub columns: Vec<String>,
    /// Foreign keys declared on the level's table
    pub table_fks: Vec<ForeignKeyInfo>,
}

/// One level of an in-progress chain
#[derive(Debug, Clone, PartialEq)]
pub struct ChainLevel {
    pub fk: ForeignKeyInfo,
    pub columns: Vec<String>,
    pub table_fks: Vec<ForeignKeyInfo>,
    pub selected: Option<String>,
}

impl ChainLevel {
    /// Table this level reads from
    pub fn table(&self) -> &str {
        &self.fk.referenced_table
    }

    /// The foreign key declared on this level's table that involves `column`
    pub fn fk_for(&self, column: &str) -> Option<&ForeignKeyInfo> {
        self.table_fks.iter().find(|fk| fk.involves(column))
    }

    pub fn is_fk_column(&self, column: &str) -> bool {
        self.fk_for(column).is_some()
    }
}

#[derive(Debug)]
pub struct LookupChainEditor {
    fk_column: String,
    root_fk: ForeignKeyInfo,
    levels: Vec<ChainLevel>,
    max_depth: usize,
    gate: RequestGate,
}

impl LookupChainEditor {
    pub fn new(fk_column: impl Into<String>, fk: ForeignKeyInfo, max_depth: usize) -> Self {
        Self {
            fk_column: fk_column.into(),
            root_fk: fk,
            levels: Vec::new(),
            max_depth: max_depth.max(1),
            gate: RequestGate::new(),
        }
    }

    pub fn fk_column(&self) -> &str {
        &self.fk_column
    }

    pub fn levels(&self) -> &[ChainLevel] {
        &self.levels
    }

    /// Request the first level (the table the view column points at)
    pub fn start(&mut self) -> ExpansionRequest {
        self.levels.clear();
        ExpansionRequest {
            token: self.gate.issue(),
            level: 0,
            fk_column: self.fk_column.clone(),
            fk: self.root_fk.clone(),
        }
    }

    /// Pick `column` on level `level`, discarding any deeper levels.
    ///
    /// Returns a request for the next level when the column is a foreign key
    /// of the level's table and the depth limit allows another hop.
    pub fn select(&mut self, level: usize, column: &str) -> ViewResult<Option<ExpansionRequest>> {
        let Some(current) = self.levels.get_mut(level) else {
            return Err(ViewError::IncompleteChain(format!(
                "level {} has not been loaded",
                level
            )));
        };
        if !current.columns.iter().any(|c| c == column) {
            return Err(ViewError::UnknownColumn(column.to_string()));
        }
        current.selected = Some(column.to_string());
        let next_fk = current.fk_for(column).cloned();
        self.levels.truncate(level + 1);
        // any expansion still in flight belongs to the old selection
        self.gate.invalidate();

        let Some(fk) = next_fk else {
            return Ok(None);
        };
        if level + 1 >= self.max_depth {
            tracing::debug!(
                column,
                max_depth = self.max_depth,
                "not expanding lookup chain past the depth limit"
            );
            return Ok(None);
        }
        Ok(Some(ExpansionRequest {
            token: self.gate.issue(),
            level: level + 1,
            fk_column: column.to_string(),
            fk,
        }))
    }

    /// Apply fetched level data. Returns `false` for a stale request.
    pub fn apply_expansion(&mut self, request: &ExpansionRequest, expansion: Expansion) -> bool {
        if !self.gate.is_current(request.token) || request.level != self.levels.len() {
            tracing::debug!(
                column = %request.fk_column,
                level = request.level,
                "dropping stale lookup level"
            );
            return false;
        }
        self.levels.push(ChainLevel {
            fk: request.fk.clone(),
            columns: expansion.columns,
            table_fks: expansion.table_fks,
            selected: None,
        });
        true
    }

    /// Abandon any pending expansion (the editor was closed)
    pub fn cancel(&mut self) {
        self.gate.invalidate();
    }

    /// Build the chain from the selected levels.
    ///
    /// The chain ends at the last consecutive level with a selection, so a
    /// trailing level the user never picked from is ignored.
    pub fn build(&self) -> ViewResult<LookupColumn> {
        let selected: Vec<(&ChainLevel, &str)> = self
            .levels
            .iter()
            .map_while(|level| level.selected.as_deref().map(|column| (level, column)))
            .collect();
        let Some(((last, last_column), outer)) = selected.split_last() else {
            return Err(ViewError::EmptyChain);
        };
        if selected.len() > self.max_depth {
            return Err(ViewError::DepthExceeded {
                max: self.max_depth,
            });
        }

        let mut chain = LookupColumn::leaf(last.fk.clone(), *last_column);
        for (level, column) in outer.iter().rev() {
            chain = LookupColumn::chained(level.fk.clone(), *column, chain, &level.table_fks)?;
        }
        Ok(chain)
    }
}
