use super::*;
use crate::format::{FALLBACK_FORMATTER, ResolvedFormatter};

impl ViewProjector {
    /// The configured formatter for a column, `auto` when none was set
    pub fn formatter_config(&self, column: &str) -> FormatterConfig {
        self.formatters.get(column).cloned().unwrap_or_default()
    }

    /// Pin a formatter for a column. An `auto` config clears the choice.
    pub fn set_formatter(&mut self, column: &str, config: FormatterConfig) {
        if config.is_auto() {
            self.clear_formatter(column);
            return;
        }
        let config = self.registry.sanitize(&config);
        tracing::debug!(column, formatter = %config.formatter, "formatter set");
        self.formatters.insert(column.to_string(), config);
        self.derived.clear();
    }

    /// Return a column to auto-detection
    pub fn clear_formatter(&mut self, column: &str) {
        if self.formatters.shift_remove(column).is_some() {
            self.derived.clear();
        }
    }

    /// The formatter actually used: the pinned one, or the detected one
    pub fn effective_formatter(&self, column: &str) -> FormatterConfig {
        match self.formatters.get(column) {
            Some(config) if !config.is_auto() => config.clone(),
            _ => self.detected_formatter(column),
        }
    }

    fn detected_formatter(&self, column: &str) -> FormatterConfig {
        let config = self.detection_cache.get_or_detect(column, || {
            let samples = self
                .detector
                .sample(self.rows.iter().map(|row| row.value(column)));
            let declared = self.column(column).and_then(|c| c.data_type.as_deref());
            let width = self.column_state.width(column);
            self.detector.detect(&samples, column, declared, width)
        });
        if config.is_auto() {
            return FormatterConfig::new(FALLBACK_FORMATTER);
        }
        config
    }

    pub(crate) fn resolved_formatter(&self, column: &str) -> ResolvedFormatter {
        self.registry.resolve(&self.effective_formatter(column))
    }

    /// Display string for one cell, using the last projection when possible
    pub fn display_value(&self, row: &Row, column: &str) -> String {
        if let Some(text) = self.derived.get(&row.id()).and_then(|cells| cells.get(column)) {
            return text.clone();
        }
        self.resolved_formatter(column).display(row.value(column))
    }
}
