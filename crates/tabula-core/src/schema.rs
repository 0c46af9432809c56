//! Foreign-key schema types and the lookup collaborator trait

use crate::{Record, Result, Value};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Foreign-key lookup interface.
///
/// Implemented by whatever owns the connection (a driver adapter, a cache in
/// front of one, or a test double). Every method may perform I/O; the view
/// engine only awaits them at lookup boundaries.
#[async_trait]
pub trait LookupSource: Send + Sync {
    /// Resolve one foreign-key value to its referenced row.
    ///
    /// Returns `Ok(None)` when no row matches.
    async fn fetch_foreign_record(
        &self,
        fk_column: &str,
        value: &Value,
        fk: &ForeignKeyInfo,
    ) -> Result<Option<Record>>;

    /// List the columns of the table referenced by `fk`
    async fn fetch_referenced_columns(
        &self,
        fk_column: &str,
        fk: &ForeignKeyInfo,
    ) -> Result<Vec<String>>;

    /// List the foreign keys declared on `table`
    async fn fetch_referenced_table_fks(&self, table: &str) -> Result<Vec<ForeignKeyInfo>>;
}

/// Foreign key information.
///
/// Multi-column keys map positionally: `referenced_columns[i]` is the target
/// of `columns[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyInfo {
    #[serde(default)]
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub referenced_table: String,
    #[serde(default)]
    pub referenced_schema: Option<String>,
    pub referenced_columns: Vec<String>,
}

impl ForeignKeyInfo {
    pub fn new(
        columns: impl IntoIterator<Item = impl Into<String>>,
        referenced_table: impl Into<String>,
        referenced_columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
            referenced_table: referenced_table.into(),
            referenced_schema: None,
            referenced_columns: referenced_columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Shorthand for the common single-column key
    pub fn single(
        column: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        Self::new([column.into()], referenced_table, [referenced_column.into()])
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether `column` is one of the local columns of this key
    pub fn involves(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// The referenced column paired with a local column
    pub fn referenced_column_for(&self, column: &str) -> Option<&str> {
        let ix = self.columns.iter().position(|c| c == column)?;
        self.referenced_columns.get(ix).map(String::as_str)
    }
}
