//! Lookup column chains and the per-view lookup configuration

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tabula_core::ForeignKeyInfo;

use crate::error::{ViewError, ViewResult};

/// Separator used in derived lookup column keys (`customer_id.country_id.name`)
pub const KEY_SEPARATOR: char = '.';

/// A derived column read from the record an FK points at.
///
/// `next` continues the chain: the value read from `lookup_column` is itself
/// a foreign key of the referenced table and is resolved one level further.
/// Built only through [`leaf`](Self::leaf) and [`chained`](Self::chained);
/// deserialized chains go through the same link check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "UncheckedLookupColumn")]
pub struct LookupColumn {
    owning_fk: ForeignKeyInfo,
    lookup_column: String,
    next: LookupChain,
}

/// Continuation of a lookup chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
enum LookupChain {
    #[default]
    Leaf,
    Chained(Box<LookupColumn>),
}

/// Serialized shape of a [`LookupColumn`] before its links are checked
#[derive(Deserialize)]
struct UncheckedLookupColumn {
    owning_fk: ForeignKeyInfo,
    lookup_column: String,
    #[serde(default)]
    next: LookupChain,
}

impl TryFrom<UncheckedLookupColumn> for LookupColumn {
    type Error = ViewError;

    fn try_from(raw: UncheckedLookupColumn) -> ViewResult<Self> {
        if let LookupChain::Chained(nested) = &raw.next {
            check_link(&raw.owning_fk, &raw.lookup_column, nested)?;
        }
        Ok(Self {
            owning_fk: raw.owning_fk,
            lookup_column: raw.lookup_column,
            next: raw.next,
        })
    }
}

/// `nested` may only continue through `lookup_column` when its key is on
/// that column
fn check_link(
    owning_fk: &ForeignKeyInfo,
    lookup_column: &str,
    nested: &LookupColumn,
) -> ViewResult<()> {
    if nested.owning_fk.involves(lookup_column) {
        return Ok(());
    }
    tracing::warn!(
        table = %owning_fk.referenced_table,
        column = %lookup_column,
        "rejected nested lookup through a non-foreign-key column"
    );
    Err(ViewError::NotForeignKey {
        table: owning_fk.referenced_table.clone(),
        column: lookup_column.to_string(),
    })
}

impl LookupColumn {
    /// Single-level lookup
    pub fn leaf(owning_fk: ForeignKeyInfo, lookup_column: impl Into<String>) -> Self {
        Self {
            owning_fk,
            lookup_column: lookup_column.into(),
            next: LookupChain::Leaf,
        }
    }

    /// Lookup that continues through `nested`.
    ///
    /// `referenced_table_fks` are the foreign keys declared on the table
    /// `owning_fk` points at. `nested.owning_fk` must be one of them and must
    /// involve `lookup_column`, otherwise the chain would hop through a
    /// column that is not a foreign key.
    pub fn chained(
        owning_fk: ForeignKeyInfo,
        lookup_column: impl Into<String>,
        nested: LookupColumn,
        referenced_table_fks: &[ForeignKeyInfo],
    ) -> ViewResult<Self> {
        let lookup_column = lookup_column.into();
        if !referenced_table_fks.contains(&nested.owning_fk) {
            tracing::warn!(
                table = %owning_fk.referenced_table,
                column = %lookup_column,
                "rejected nested lookup through an undeclared foreign key"
            );
            return Err(ViewError::NotForeignKey {
                table: owning_fk.referenced_table.clone(),
                column: lookup_column,
            });
        }
        check_link(&owning_fk, &lookup_column, &nested)?;
        Ok(Self {
            owning_fk,
            lookup_column,
            next: LookupChain::Chained(Box::new(nested)),
        })
    }

    /// Foreign key this level follows
    pub fn owning_fk(&self) -> &ForeignKeyInfo {
        &self.owning_fk
    }

    /// Column read from the referenced record
    pub fn lookup_column(&self) -> &str {
        &self.lookup_column
    }

    pub fn nested(&self) -> Option<&LookupColumn> {
        match &self.next {
            LookupChain::Leaf => None,
            LookupChain::Chained(next) => Some(next),
        }
    }

    /// Number of FK hops, 1 for a leaf
    pub fn depth(&self) -> usize {
        self.levels().count()
    }

    /// Levels from the outermost to the deepest
    pub fn levels(&self) -> impl Iterator<Item = &LookupColumn> {
        std::iter::successors(Some(self), |level| level.nested())
    }

    pub fn deepest(&self) -> &LookupColumn {
        let mut level = self;
        while let Some(next) = level.nested() {
            level = next;
        }
        level
    }

    /// Keep the first `levels` hops. `None` when `levels` is zero.
    pub fn truncated(&self, levels: usize) -> Option<Self> {
        if levels == 0 {
            return None;
        }
        let next = match self.nested().and_then(|n| n.truncated(levels - 1)) {
            Some(next) => LookupChain::Chained(Box::new(next)),
            None => LookupChain::Leaf,
        };
        Some(Self {
            owning_fk: self.owning_fk.clone(),
            lookup_column: self.lookup_column.clone(),
            next,
        })
    }

    pub fn check_depth(&self, max_depth: usize) -> ViewResult<()> {
        if self.depth() > max_depth {
            return Err(ViewError::DepthExceeded { max: max_depth });
        }
        Ok(())
    }

    /// Key of the derived column this lookup produces for `fk_column`
    pub fn column_key(&self, fk_column: &str) -> String {
        let mut key = fk_column.to_string();
        for level in self.levels() {
            key.push(KEY_SEPARATOR);
            key.push_str(&level.lookup_column);
        }
        key
    }

    /// Header label: `table.column` of the deepest level
    pub fn label(&self) -> String {
        let deepest = self.deepest();
        format!(
            "{}.{}",
            deepest.owning_fk.referenced_table, deepest.lookup_column
        )
    }
}

/// Lookup columns configured per FK-bearing column.
///
/// Only changed through [`add`](Self::add) and [`remove`](Self::remove);
/// nothing is inferred from the schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LookupConfig {
    entries: IndexMap<String, Vec<LookupColumn>>,
}

impl LookupConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a lookup for `fk_column`. Returns `false` if it was already present.
    pub fn add(&mut self, fk_column: &str, lookup: LookupColumn) -> ViewResult<bool> {
        if !lookup.owning_fk.involves(fk_column) {
            return Err(ViewError::ForeignKeyMismatch {
                column: fk_column.to_string(),
                referenced_table: lookup.owning_fk.referenced_table.clone(),
            });
        }
        let entries = self.entries.entry(fk_column.to_string()).or_default();
        if entries.contains(&lookup) {
            return Ok(false);
        }
        tracing::debug!(
            column = fk_column,
            lookup = %lookup.column_key(fk_column),
            depth = lookup.depth(),
            "added lookup column"
        );
        entries.push(lookup);
        Ok(true)
    }

    pub fn remove(&mut self, fk_column: &str, lookup: &LookupColumn) -> bool {
        let Some(entries) = self.entries.get_mut(fk_column) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|l| l != lookup);
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.entries.shift_remove(fk_column);
        }
        removed
    }

    /// Drop every lookup configured for `fk_column`
    pub fn remove_column(&mut self, fk_column: &str) -> bool {
        self.entries.shift_remove(fk_column).is_some()
    }

    pub fn entries_for(&self, fk_column: &str) -> &[LookupColumn] {
        self.entries.get(fk_column).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `(fk_column, lookup)` pairs in configuration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LookupColumn)> {
        self.entries
            .iter()
            .flat_map(|(column, lookups)| lookups.iter().map(move |l| (column.as_str(), l)))
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Keep the lookups `keep` accepts, returning how many were dropped
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &LookupColumn) -> bool) -> usize {
        let before = self.len();
        for (column, lookups) in self.entries.iter_mut() {
            lookups.retain(|lookup| keep(column, lookup));
        }
        self.entries.retain(|_, lookups| !lookups.is_empty());
        before - self.len()
    }

    /// Remove chains deeper than `max_depth`, returning how many were dropped
    pub fn retain_depth(&mut self, max_depth: usize) -> usize {
        let mut dropped = 0;
        for (column, lookups) in self.entries.iter_mut() {
            lookups.retain(|lookup| {
                let keep = lookup.depth() <= max_depth;
                if !keep {
                    tracing::warn!(
                        column = %column,
                        depth = lookup.depth(),
                        max_depth,
                        "dropping lookup chain over the depth limit"
                    );
                    dropped += 1;
                }
                keep
            });
        }
        self.entries.retain(|_, lookups| !lookups.is_empty());
        dropped
    }
}
