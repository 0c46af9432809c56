use indexmap::IndexMap;
use std::sync::Arc;
use tabula_core::Value;

use super::formatters::{
    BooleanFormatter, BytesFormatter, DateFormatter, EnumFormatter, JsonFormatter,
    NumberFormatter, SuffixedNumberFormatter, TextFormatter,
};
use super::{CellFormatter, CellRender, FormatOptions, Formatted, FormatterConfig, NULL_DISPLAY};

/// Registry of formatters keyed by type string
#[derive(Clone)]
pub struct FormatterRegistry {
    formatters: IndexMap<&'static str, Arc<dyn CellFormatter>>,
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for FormatterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatterRegistry")
            .field("types", &self.formatters.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FormatterRegistry {
    /// An empty registry; every config falls back to plain string conversion
    pub fn empty() -> Self {
        Self {
            formatters: IndexMap::new(),
        }
    }

    /// Registry with the built-in formatters
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(TextFormatter);
        registry.register(NumberFormatter);
        registry.register(SuffixedNumberFormatter);
        registry.register(BytesFormatter);
        registry.register(DateFormatter);
        registry.register(EnumFormatter);
        registry.register(BooleanFormatter);
        registry.register(JsonFormatter);
        registry
    }

    /// Register a formatter, replacing any previous one with the same type
    pub fn register(&mut self, formatter: impl CellFormatter + 'static) {
        let formatter: Arc<dyn CellFormatter> = Arc::new(formatter);
        self.formatters.insert(formatter.type_name(), formatter);
    }

    pub fn get(&self, formatter_type: &str) -> Option<&Arc<dyn CellFormatter>> {
        self.formatters.get(formatter_type)
    }

    pub fn contains(&self, formatter_type: &str) -> bool {
        self.formatters.contains_key(formatter_type)
    }

    /// `(type, label)` pairs in registration order
    pub fn available(&self) -> Vec<(&'static str, &'static str)> {
        self.formatters
            .values()
            .map(|f| (f.type_name(), f.label()))
            .collect()
    }

    /// Sanitize a config against its formatter. Unknown types keep their
    /// options untouched (they are formatted with the identity fallback).
    pub fn sanitize(&self, config: &FormatterConfig) -> FormatterConfig {
        match self.get(&config.formatter) {
            Some(formatter) => FormatterConfig {
                formatter: config.formatter.clone(),
                options: formatter.validate_options(&config.options),
            },
            None => config.clone(),
        }
    }

    /// Bind a config to its formatter with validated options
    pub fn resolve(&self, config: &FormatterConfig) -> ResolvedFormatter {
        match self.get(&config.formatter) {
            Some(formatter) => ResolvedFormatter {
                formatter: Some(formatter.clone()),
                options: formatter.validate_options(&config.options),
            },
            None => {
                tracing::debug!(
                    formatter = %config.formatter,
                    "unregistered formatter type, using plain string conversion"
                );
                ResolvedFormatter {
                    formatter: None,
                    options: config.options.clone(),
                }
            }
        }
    }

    pub fn format(&self, config: &FormatterConfig, value: &Value) -> Formatted {
        self.resolve(config).format(value)
    }

    pub fn render(&self, config: &FormatterConfig, value: &Value) -> CellRender {
        self.resolve(config).render(value)
    }
}

/// A formatter bound to validated options, reused across a column's cells
#[derive(Clone)]
pub struct ResolvedFormatter {
    formatter: Option<Arc<dyn CellFormatter>>,
    options: FormatOptions,
}

impl std::fmt::Debug for ResolvedFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedFormatter")
            .field("type", &self.type_name())
            .field("options", &self.options)
            .finish()
    }
}

impl ResolvedFormatter {
    /// Formatter type, `None` for the identity fallback
    pub fn type_name(&self) -> Option<&'static str> {
        self.formatter.as_ref().map(|f| f.type_name())
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    pub fn format(&self, value: &Value) -> Formatted {
        if value.is_null() {
            return Formatted::text(NULL_DISPLAY);
        }
        match &self.formatter {
            Some(formatter) => formatter.format(value, &self.options),
            None => Formatted::Text(value.to_plain_string()),
        }
    }

    pub fn display(&self, value: &Value) -> String {
        self.format(value).into_string()
    }

    pub fn render(&self, value: &Value) -> CellRender {
        if value.is_null() {
            return CellRender::Null;
        }
        self.formatter
            .as_ref()
            .and_then(|f| f.render_cell(value, &self.options))
            .unwrap_or_else(|| self.format(value).into())
    }
}
