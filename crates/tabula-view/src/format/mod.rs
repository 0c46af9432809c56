//! Cell formatting
//!
//! Each formatter is registered under a type string and converts a raw value
//! into a display string, optionally with a richer render descriptor. Options
//! are free-form JSON objects sanitized by the formatter that owns them.

mod detect;
mod formatters;
mod registry;

pub use detect::{AutoDetector, DetectionCache, FALLBACK_FORMATTER};
pub use formatters::{
    BooleanFormatter, BytesFormatter, DateFormatter, EnumFormatter, JsonFormatter,
    NumberFormatter, SuffixedNumberFormatter, TextFormatter,
};
pub use registry::{FormatterRegistry, ResolvedFormatter};

use serde::{Deserialize, Serialize};
use tabula_core::Value;

/// Formatter options (JSON object)
pub type FormatOptions = serde_json::Map<String, serde_json::Value>;

/// Type string meaning "let the auto-detector decide"
pub const AUTO_FORMATTER: &str = "auto";

/// Display text for NULL cells
pub const NULL_DISPLAY: &str = "NULL";

/// Per-column formatter choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatterConfig {
    #[serde(rename = "type")]
    pub formatter: String,
    #[serde(default)]
    pub options: FormatOptions,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self::auto()
    }
}

impl FormatterConfig {
    pub fn auto() -> Self {
        Self::new(AUTO_FORMATTER)
    }

    pub fn new(formatter: impl Into<String>) -> Self {
        Self {
            formatter: formatter.into(),
            options: FormatOptions::new(),
        }
    }

    pub fn with_options(mut self, options: FormatOptions) -> Self {
        self.options = options;
        self
    }

    /// Builder-style single option
    pub fn with_option(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    pub fn is_auto(&self) -> bool {
        self.formatter == AUTO_FORMATTER
    }
}

/// Result of formatting one value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formatted {
    Text(String),
    /// Magnitude-suffixed number, e.g. `1.2` + `K`
    Suffixed { number: String, suffix: String },
}

impl Formatted {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Suffixed { number, suffix } => number + &suffix,
        }
    }
}

impl std::fmt::Display for Formatted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            Self::Suffixed { number, suffix } => write!(f, "{}{}", number, suffix),
        }
    }
}

/// Render descriptor for rich (non-text) cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellRender {
    Text(String),
    /// NULL placeholder, styled by the renderer
    Null,
    /// Categorical badge; `color` indexes the renderer's palette
    Badge { label: String, color: usize },
    /// Number with a separately styled magnitude suffix
    Suffixed { number: String, suffix: String },
    /// Monospace block (JSON and the like)
    Code(String),
}

impl From<Formatted> for CellRender {
    fn from(formatted: Formatted) -> Self {
        match formatted {
            Formatted::Text(s) => CellRender::Text(s),
            Formatted::Suffixed { number, suffix } => CellRender::Suffixed { number, suffix },
        }
    }
}

/// A pluggable value formatter
pub trait CellFormatter: Send + Sync {
    /// Registry key (e.g. `"number"`)
    fn type_name(&self) -> &'static str;

    /// Human-readable name for formatter pickers
    fn label(&self) -> &'static str;

    fn default_options(&self) -> FormatOptions;

    /// Return a copy of `options` restricted to known keys with valid values,
    /// filling gaps from the defaults.
    fn validate_options(&self, options: &FormatOptions) -> FormatOptions;

    /// Format a non-null value. NULL handling is done by the registry.
    fn format(&self, value: &Value, options: &FormatOptions) -> Formatted;

    /// Rich rendering; `None` means render the text from [`format`](Self::format)
    fn render_cell(&self, _value: &Value, _options: &FormatOptions) -> Option<CellRender> {
        None
    }
}

pub(crate) mod options {
    //! Typed accessors over JSON option maps

    use super::FormatOptions;

    pub fn get_u64(options: &FormatOptions, key: &str) -> Option<u64> {
        options.get(key).and_then(|v| v.as_u64())
    }

    pub fn get_bool(options: &FormatOptions, key: &str) -> Option<bool> {
        options.get(key).and_then(|v| v.as_bool())
    }

    pub fn get_str<'a>(options: &'a FormatOptions, key: &str) -> Option<&'a str> {
        options.get(key).and_then(|v| v.as_str())
    }

    /// Copy a bounded integer option, falling back to the default
    pub fn copy_u64(
        out: &mut FormatOptions,
        options: &FormatOptions,
        defaults: &FormatOptions,
        key: &str,
        max: u64,
    ) {
        let value = get_u64(options, key)
            .filter(|v| *v <= max)
            .or_else(|| get_u64(defaults, key));
        if let Some(value) = value {
            out.insert(key.to_string(), value.into());
        }
    }

    pub fn copy_bool(
        out: &mut FormatOptions,
        options: &FormatOptions,
        defaults: &FormatOptions,
        key: &str,
    ) {
        if let Some(value) = get_bool(options, key).or_else(|| get_bool(defaults, key)) {
            out.insert(key.to_string(), value.into());
        }
    }

    pub fn copy_str(
        out: &mut FormatOptions,
        options: &FormatOptions,
        defaults: &FormatOptions,
        key: &str,
        accept: impl Fn(&str) -> bool,
    ) {
        let value = get_str(options, key)
            .filter(|v| accept(v))
            .or_else(|| get_str(defaults, key));
        if let Some(value) = value {
            out.insert(key.to_string(), value.into());
        }
    }
}
