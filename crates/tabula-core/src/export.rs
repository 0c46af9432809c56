//! Export payload and the writer contract

use crate::{Result, Value};
use serde::{Deserialize, Serialize};

/// Which values an export carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportMode {
    /// Untouched cell values
    #[default]
    Raw,
    /// Display strings produced by the column formatters
    Formatted,
}

/// Logical export payload handed to a writer.
///
/// This is the whole boundary: writers turn it into bytes for their format,
/// the engine never sees the bytes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExportPayload {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ExportPayload {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Byte-level export writer (CSV, Markdown, JSON, SQLite...), keyed by format name
pub trait ExportWriter: Send + Sync {
    /// Format name the writer is registered under (e.g. `"csv"`)
    fn format_name(&self) -> &str;

    /// Serialize the payload
    fn write(&self, payload: &ExportPayload) -> Result<Vec<u8>>;
}
