//! Persisted view state
//!
//! A plain serde value the embedding application can store however it
//! likes. JSON helpers are provided for convenience.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::columns::ColumnViewState;
use crate::filter::FilterSet;
use crate::format::FormatterConfig;
use crate::lookup::LookupConfig;
use crate::sort::SortSpec;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewStateSnapshot {
    pub columns: ColumnViewState,
    pub filters: FilterSet,
    pub sort: Option<SortSpec>,
    pub page_size: Option<usize>,
    /// Explicit formatter choices; columns left on auto are absent
    pub formatters: IndexMap<String, FormatterConfig>,
    pub lookups: LookupConfig,
}

impl ViewStateSnapshot {
    pub fn to_json(&self) -> tabula_core::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> tabula_core::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
