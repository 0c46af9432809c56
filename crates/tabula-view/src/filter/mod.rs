//! Per-column row filtering
//!
//! A row passes when it passes every active column filter (logical AND).
//! Filters never fail: a value that cannot be read as a number simply does
//! not satisfy a numeric bound.

mod expression;

pub use expression::FilterExpression;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tabula_core::{Column, Row, Value};

use crate::columns::DataTypeClass;

/// Filter for a single column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub equals: Option<Value>,
    #[serde(default = "default_true")]
    pub allow_null: bool,
    #[serde(default = "default_true")]
    pub allow_non_null: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            equals: None,
            allow_null: true,
            allow_non_null: true,
        }
    }
}

impl FilterSpec {
    pub fn range(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            min,
            max,
            ..Default::default()
        }
    }

    pub fn equals(value: impl Into<Value>) -> Self {
        Self {
            equals: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn only_null() -> Self {
        Self {
            allow_non_null: false,
            ..Default::default()
        }
    }

    pub fn not_null() -> Self {
        Self {
            allow_null: false,
            ..Default::default()
        }
    }

    /// A spec with no bound and both null flags set filters nothing
    pub fn is_empty(&self) -> bool {
        self.min.is_none()
            && self.max.is_none()
            && self.equals.is_none()
            && self.allow_null
            && self.allow_non_null
    }

    /// Evaluate the filter against one cell value
    pub fn matches(&self, value: &Value) -> bool {
        if value.is_null() {
            return self.allow_null;
        }
        if !self.allow_non_null {
            return false;
        }

        if let Some(min) = self.min {
            match value.coerce_number() {
                Some(n) if n >= min => {}
                _ => return false,
            }
        }
        if let Some(max) = self.max {
            match value.coerce_number() {
                Some(n) if n <= max => {}
                _ => return false,
            }
        }
        if let Some(expected) = &self.equals {
            return equals_matches(expected, value);
        }
        true
    }
}

/// Equality is decided by the type of the expected value.
///
/// Booleans compare by identity (a string "true" does not equal `true`),
/// numbers compare numerically after coercion, everything else compares the
/// plain string forms.
fn equals_matches(expected: &Value, value: &Value) -> bool {
    match expected {
        Value::Bool(b) => value.as_bool() == Some(*b),
        e if e.is_number() => match (value.coerce_number(), e.as_number()) {
            (Some(v), Some(e)) => v == e,
            _ => false,
        },
        e => value.to_plain_string() == e.to_plain_string(),
    }
}

/// What kind of filter a column offers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// min/max bounds plus null flags
    Range,
    /// equals plus null flags
    Equality,
    /// only the null flags
    NullOnly,
}

impl FilterKind {
    pub fn for_column(column: &Column) -> Self {
        match DataTypeClass::of(column) {
            DataTypeClass::Numeric | DataTypeClass::Temporal(_) => Self::Range,
            DataTypeClass::Binary | DataTypeClass::Json => Self::NullOnly,
            DataTypeClass::Text
            | DataTypeClass::Enum
            | DataTypeClass::Boolean
            | DataTypeClass::Unknown => Self::Equality,
        }
    }
}

/// Active filters keyed by column, in insertion order.
///
/// Empty specs are pruned on insert and on deserialize, so `is_empty()`
/// means "no filtering".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "IndexMap<String, FilterSpec>",
    into = "IndexMap<String, FilterSpec>"
)]
pub struct FilterSet {
    filters: IndexMap<String, FilterSpec>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter for a column; an empty spec removes it.
    /// Returns true when the active set changed.
    pub fn set(&mut self, column: impl Into<String>, spec: FilterSpec) -> bool {
        let column = column.into();
        if spec.is_empty() {
            return self.filters.shift_remove(&column).is_some();
        }
        match self.filters.get(&column) {
            Some(existing) if *existing == spec => false,
            _ => {
                self.filters.insert(column, spec);
                true
            }
        }
    }

    pub fn remove(&mut self, column: &str) -> bool {
        self.filters.shift_remove(column).is_some()
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }

    pub fn get(&self, column: &str) -> Option<&FilterSpec> {
        self.filters.get(column)
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterSpec)> {
        self.filters.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.filters
            .iter()
            .all(|(column, spec)| spec.matches(row.value(column)))
    }
}

impl FromIterator<(String, FilterSpec)> for FilterSet {
    fn from_iter<I: IntoIterator<Item = (String, FilterSpec)>>(iter: I) -> Self {
        let mut set = FilterSet::new();
        for (column, spec) in iter {
            set.set(column, spec);
        }
        set
    }
}

impl From<IndexMap<String, FilterSpec>> for FilterSet {
    fn from(filters: IndexMap<String, FilterSpec>) -> Self {
        filters.into_iter().collect()
    }
}

impl From<FilterSet> for IndexMap<String, FilterSpec> {
    fn from(set: FilterSet) -> Self {
        set.filters
    }
}

/// Keep the rows that pass every filter, preserving order
pub fn apply<'a>(rows: impl IntoIterator<Item = &'a Row>, filters: &FilterSet) -> Vec<&'a Row> {
    if filters.is_empty() {
        return rows.into_iter().collect();
    }
    rows.into_iter().filter(|row| filters.matches(row)).collect()
}

#[cfg(test)]
mod tests;
