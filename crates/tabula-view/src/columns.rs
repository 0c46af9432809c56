//! Column model: data-type classification and per-view column state
//! (ordering, visibility, widths).

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tabula_core::Column;

use crate::settings::MIN_COLUMN_WIDTH;

/// Temporal sub-kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalKind {
    Date,
    Time,
    DateTime,
}

/// Coarse classification of a column's declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataTypeClass {
    Numeric,
    Text,
    Boolean,
    Temporal(TemporalKind),
    Enum,
    Binary,
    Json,
    Unknown,
}

impl DataTypeClass {
    /// Classify a column from its declared type, falling back to its name for
    /// text columns that conventionally hold timestamps.
    pub fn of(column: &Column) -> Self {
        if column.enum_values.as_ref().is_some_and(|v| !v.is_empty()) {
            return Self::Enum;
        }
        let Some(declared) = column.data_type.as_deref() else {
            return Self::Unknown;
        };
        match Self::from_declared(declared) {
            Self::Text => Self::from_name(&column.name).unwrap_or(Self::Text),
            class => class,
        }
    }

    /// Classify a declared type string alone
    pub fn from_declared(declared: &str) -> Self {
        let t = declared.trim().to_lowercase();
        if t.is_empty() {
            return Self::Unknown;
        }

        if t.starts_with("enum") || t.starts_with("set(") || t.contains("user-defined") {
            return Self::Enum;
        }
        if t.starts_with("bool") || t == "bit" || t == "tinyint(1)" {
            return Self::Boolean;
        }
        if t == "date" {
            return Self::Temporal(TemporalKind::Date);
        }
        if t.starts_with("timestamp") || t.starts_with("datetime") || t == "smalldatetime" {
            return Self::Temporal(TemporalKind::DateTime);
        }
        if t.starts_with("time") || t.starts_with("interval") {
            return Self::Temporal(TemporalKind::Time);
        }
        if t == "json" || t == "jsonb" {
            return Self::Json;
        }
        if t.contains("blob")
            || t == "bytea"
            || t.starts_with("binary")
            || t.starts_with("varbinary")
            || t == "image"
            || t.starts_with("raw")
        {
            return Self::Binary;
        }
        const NUMERIC_PREFIXES: &[&str] = &[
            "int", "tinyint", "smallint", "mediumint", "bigint", "serial", "bigserial",
            "smallserial", "numeric", "decimal", "real", "double", "float", "money", "number",
        ];
        if NUMERIC_PREFIXES.iter().any(|p| t.starts_with(p)) {
            return Self::Numeric;
        }
        if t.starts_with("char")
            || t.starts_with("varchar")
            || t.starts_with("character")
            || t.starts_with("nvarchar")
            || t.starts_with("nchar")
            || t.contains("text")
            || t == "string"
            || t == "uuid"
            || t == "citext"
            || t == "dynamic"
        {
            return Self::Text;
        }
        Self::Unknown
    }

    fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        if name.ends_with("_date") || name == "date" || name == "birthdate" || name == "dob" {
            return Some(Self::Temporal(TemporalKind::Date));
        }
        if name.ends_with("_at")
            || name.ends_with("_time")
            || name == "timestamp"
            || name == "datetime"
            || name == "created"
            || name == "updated"
            || name == "deleted"
        {
            return Some(Self::Temporal(TemporalKind::DateTime));
        }
        None
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Temporal(_))
    }
}

/// Per-view column ordering, visibility and widths.
///
/// Owned by one view session. Names that no longer exist in the column set
/// are kept but ignored, so a saved state survives a re-fetch that drops and
/// later restores a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnViewState {
    /// Explicit permutation; unlisted columns append in natural order
    order: Vec<String>,
    /// `None` means every column is visible
    hidden: Option<HashSet<String>>,
    widths: HashMap<String, f32>,
    default_width: f32,
}

impl Default for ColumnViewState {
    fn default() -> Self {
        Self::new(150.0)
    }
}

impl ColumnViewState {
    pub fn new(default_width: f32) -> Self {
        Self {
            order: Vec::new(),
            hidden: None,
            widths: HashMap::new(),
            default_width: default_width.max(MIN_COLUMN_WIDTH),
        }
    }

    /// Columns in display order with hidden ones removed
    pub fn active_columns<'a>(&self, columns: &'a [Column]) -> Vec<&'a Column> {
        self.ordered_columns(columns)
            .into_iter()
            .filter(|c| self.is_visible(&c.name))
            .collect()
    }

    /// All columns in display order, hidden ones included
    pub fn ordered_columns<'a>(&self, columns: &'a [Column]) -> Vec<&'a Column> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(columns.len());
        let mut ordered = Vec::with_capacity(columns.len());

        for name in &self.order {
            if let Some(col) = columns.iter().find(|c| &c.name == name) {
                if seen.insert(col.name.as_str()) {
                    ordered.push(col);
                }
            }
        }
        for col in columns {
            if seen.insert(col.name.as_str()) {
                ordered.push(col);
            }
        }
        ordered
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn set_order(&mut self, order: Vec<String>) {
        self.order = order;
    }

    /// Move `name` to position `to` of the current display order
    pub fn move_column(&mut self, columns: &[Column], name: &str, to: usize) -> bool {
        let mut names: Vec<String> = self
            .ordered_columns(columns)
            .into_iter()
            .map(|c| c.name.clone())
            .collect();
        let Some(from) = names.iter().position(|n| n == name) else {
            return false;
        };
        let moved = names.remove(from);
        let to = to.min(names.len());
        names.insert(to, moved);
        self.order = names;
        true
    }

    pub fn is_visible(&self, name: &str) -> bool {
        self.hidden.as_ref().is_none_or(|hidden| !hidden.contains(name))
    }

    pub fn hidden(&self) -> Option<&HashSet<String>> {
        self.hidden.as_ref()
    }

    pub fn hide(&mut self, name: &str) {
        self.hidden
            .get_or_insert_with(HashSet::new)
            .insert(name.to_string());
    }

    pub fn show(&mut self, name: &str) {
        if let Some(hidden) = self.hidden.as_mut() {
            hidden.remove(name);
            if hidden.is_empty() {
                self.hidden = None;
            }
        }
    }

    /// Toggle visibility; returns the new visibility
    pub fn toggle_visibility(&mut self, name: &str) -> bool {
        if self.is_visible(name) {
            self.hide(name);
            false
        } else {
            self.show(name);
            true
        }
    }

    pub fn show_all(&mut self) {
        self.hidden = None;
    }

    pub fn set_hidden(&mut self, hidden: Option<HashSet<String>>) {
        self.hidden = hidden.filter(|h| !h.is_empty());
    }

    pub fn width(&self, name: &str) -> f32 {
        self.widths.get(name).copied().unwrap_or(self.default_width)
    }

    pub fn widths(&self) -> &HashMap<String, f32> {
        &self.widths
    }

    /// Set a column width; returns true if the stored width changed
    pub fn set_width(&mut self, name: &str, width: f32) -> bool {
        let width = width.max(MIN_COLUMN_WIDTH);
        if (self.width(name) - width).abs() < f32::EPSILON {
            return false;
        }
        self.widths.insert(name.to_string(), width);
        true
    }

    pub fn reset_widths(&mut self) {
        self.widths.clear();
    }

    pub fn default_width(&self) -> f32 {
        self.default_width
    }
}
