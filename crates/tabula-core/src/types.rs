//! Core types for Tabula

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// A cell value as delivered by a driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean
    Bool(bool),
    /// 8-bit signed integer
    Int8(i8),
    /// 16-bit signed integer
    Int16(i16),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 32-bit floating point
    Float32(f32),
    /// 64-bit floating point
    Float64(f64),
    /// Decimal/Numeric (stored as string for precision)
    Decimal(String),
    /// UTF-8 string
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// UUID
    Uuid(Uuid),
    /// Date (year, month, day)
    Date(NaiveDate),
    /// Time (hour, minute, second, nanosecond)
    Time(NaiveTime),
    /// DateTime without timezone
    DateTime(NaiveDateTime),
    /// DateTime with timezone (UTC)
    DateTimeUtc(DateTime<Utc>),
    /// JSON value
    Json(serde_json::Value),
    /// Array of values
    Array(Vec<Value>),
}

static NULL_VALUE: Value = Value::Null;

impl Value {
    /// Check if the value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(*v as i64),
            Value::Int16(v) => Some(*v as i64),
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            Value::String(s) => s.parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether the value is a native number.
    ///
    /// Decimals count as numbers when their text parses; strings never do,
    /// even when they look numeric.
    pub fn is_number(&self) -> bool {
        self.as_number().is_some()
    }

    /// The numeric value of a native number, `None` for anything else
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            Value::Int8(v) => *v as f64,
            Value::Int16(v) => *v as f64,
            Value::Int32(v) => *v as f64,
            Value::Int64(v) => *v as f64,
            Value::Float32(v) => *v as f64,
            Value::Float64(v) => *v,
            Value::Decimal(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        Some(n)
    }

    /// Lenient numeric coercion used by range filters.
    ///
    /// Booleans become 0/1, blank strings become 0, numeric strings parse,
    /// temporal values become epoch milliseconds. Anything that cannot be
    /// read as a finite-or-infinite number (including NaN) yields `None`.
    pub fn coerce_number(&self) -> Option<f64> {
        let n = match self {
            Value::Null => return None,
            Value::Bool(b) => if *b { 1.0 } else { 0.0 },
            Value::String(s) | Value::Decimal(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().ok()?
                }
            }
            Value::Date(d) => d.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis() as f64,
            Value::DateTime(dt) => dt.and_utc().timestamp_millis() as f64,
            Value::DateTimeUtc(dt) => dt.timestamp_millis() as f64,
            Value::Json(serde_json::Value::Number(n)) => n.as_f64()?,
            other => other.as_number()?,
        };
        if n.is_nan() { None } else { Some(n) }
    }

    /// Plain string form of the value, as used for string comparison.
    ///
    /// Unlike `Display`, arrays are joined with `,` and JSON strings are
    /// unquoted so the result matches what a user typed into a filter.
    pub fn to_plain_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Json(serde_json::Value::String(s)) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(Value::to_plain_string)
                .collect::<Vec<_>>()
                .join(","),
            other => other.to_string(),
        }
    }

    /// Key used to identify a value in caches (`(column, value)` pairs)
    pub fn cache_key(&self) -> String {
        match self {
            Value::Null => "\u{0}null".to_string(),
            other => other.to_plain_string(),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Uuid(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v),
            Value::Time(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "{}", v),
            Value::DateTimeUtc(v) => write!(f, "{}", v),
            Value::Json(v) => write!(f, "{}", v),
            Value::Array(v) => write!(f, "[{} items]", v.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A referenced record returned by a lookup source (column name -> value)
pub type Record = HashMap<String, Value>;

/// Stable identity of a row within one result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(pub u64);

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A row from a result set.
///
/// Rows are immutable snapshots: the engine derives formatted and looked-up
/// values next to the row, never into it.
#[derive(Debug, Clone)]
pub struct Row {
    id: RowId,
    /// Column names (shared across all rows of a result set)
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Create a new row
    pub fn new(id: RowId, columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self {
            id,
            columns,
            values,
        }
    }

    pub fn id(&self) -> RowId {
        self.id
    }

    /// Get a value by column index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by column name
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Value of a column, treating a missing column as NULL
    pub fn value(&self, name: &str) -> &Value {
        self.get_by_name(name).unwrap_or(&NULL_VALUE)
    }

    /// Get column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Convert to a record map
    pub fn to_map(&self) -> Record {
        self.columns
            .iter()
            .zip(self.values.iter())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Column metadata for one column of a result set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Column {
    /// Column name, unique within a view
    #[serde(default)]
    pub name: String,
    /// Optional display label
    #[serde(default)]
    pub label: Option<String>,
    /// Declared data type (database-specific string)
    #[serde(default)]
    pub data_type: Option<String>,
    /// Whether the column can be NULL
    #[serde(default)]
    pub nullable: bool,
    /// Enum values (for enum/set types)
    #[serde(default)]
    pub enum_values: Option<Vec<String>>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nullable: true,
            ..Default::default()
        }
    }

    pub fn with_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_enum_values(mut self, values: Vec<String>) -> Self {
        self.enum_values = Some(values);
        self
    }

    /// Label shown in headers, falling back to the name
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// A fetched `(columns, rows)` result set
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    /// Total row count at the data source (if known)
    pub total_rows: Option<u64>,
}

impl ResultSet {
    /// Build a result set from plain value rows, assigning sequential ids
    pub fn from_values(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Self {
        let names: Arc<[String]> = columns.iter().map(|c| c.name.clone()).collect();
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(ix, values)| Row::new(RowId(ix as u64), names.clone(), values))
            .collect();
        Self {
            columns,
            rows,
            total_rows: None,
        }
    }

    pub fn with_total_rows(mut self, total: u64) -> Self {
        self.total_rows = Some(total);
        self
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
