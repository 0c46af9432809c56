//! Default formatter selection for columns without an explicit formatter

use parking_lot::RwLock;
use std::collections::HashMap;
use tabula_core::Value;

use super::{FormatterConfig, AUTO_FORMATTER};
use crate::settings::DetectionSettings;

/// Formatter used when detection cannot produce a concrete type
pub const FALLBACK_FORMATTER: &str = "number";

/// Picks a formatter from a column's declared type, sampled values and width.
///
/// Rules, first match wins:
/// 1. declared type mentions date/time/timestamp -> `date`
/// 2. declared type mentions enum -> `enum`
/// 3. numeric sample above the magnitude threshold in a narrow column -> `suffixed`
/// 4. numeric sample -> `number`, decimals depending on width
/// 5. anything else -> `text`
///
/// Detection is a pure function of its inputs.
#[derive(Debug, Clone, Default)]
pub struct AutoDetector {
    settings: DetectionSettings,
}

impl AutoDetector {
    pub fn new(settings: DetectionSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DetectionSettings {
        &self.settings
    }

    pub fn detect(
        &self,
        samples: &[&Value],
        column_name: &str,
        declared_type: Option<&str>,
        width: f32,
    ) -> FormatterConfig {
        let config = self.detect_inner(samples, declared_type, width);
        tracing::trace!(
            column = column_name,
            formatter = %config.formatter,
            width,
            samples = samples.len(),
            "auto-detected formatter"
        );
        if config.formatter == AUTO_FORMATTER {
            return FormatterConfig::new(FALLBACK_FORMATTER);
        }
        config
    }

    fn detect_inner(
        &self,
        samples: &[&Value],
        declared_type: Option<&str>,
        width: f32,
    ) -> FormatterConfig {
        if let Some(declared) = declared_type.map(str::to_lowercase) {
            if declared.contains("timestamp") || declared.contains("datetime") {
                return FormatterConfig::new("date").with_option("style", "datetime");
            }
            if declared.contains("date") {
                return FormatterConfig::new("date").with_option("style", "date");
            }
            if declared.contains("time") {
                return FormatterConfig::new("date").with_option("style", "time");
            }
            if declared.contains("enum") {
                return FormatterConfig::new("enum");
            }
        }

        let numbers: Vec<f64> = samples
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| v.as_number())
            .collect::<Option<Vec<_>>>()
            .unwrap_or_default();
        if numbers.is_empty() {
            return FormatterConfig::new("text");
        }

        let max_magnitude = numbers.iter().fold(0.0f64, |acc, n| acc.max(n.abs()));
        let narrow = width < self.settings.narrow_width;
        if narrow && max_magnitude > self.settings.suffix_threshold {
            return FormatterConfig::new("suffixed").with_option("decimals", 1);
        }

        let all_integral = numbers.iter().all(|n| n.fract() == 0.0);
        let decimals = if all_integral || narrow {
            0
        } else if width < self.settings.wide_width {
            1
        } else {
            2
        };
        FormatterConfig::new("number").with_option("decimals", decimals)
    }

    /// Take up to `sample_size` non-null values from a column
    pub fn sample<'a>(&self, values: impl IntoIterator<Item = &'a Value>) -> Vec<&'a Value> {
        values
            .into_iter()
            .filter(|v| !v.is_null())
            .take(self.settings.sample_size)
            .collect()
    }
}

/// Per-column detection results for one view session.
///
/// Cleared as a whole whenever rows, columns or widths change, since those
/// are the detector's inputs.
#[derive(Debug, Default)]
pub struct DetectionCache {
    entries: RwLock<HashMap<String, FormatterConfig>>,
}

impl DetectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<FormatterConfig> {
        self.entries.read().get(column).cloned()
    }

    pub fn get_or_detect(
        &self,
        column: &str,
        detect: impl FnOnce() -> FormatterConfig,
    ) -> FormatterConfig {
        if let Some(hit) = self.get(column) {
            return hit;
        }
        let config = detect();
        self.entries
            .write()
            .insert(column.to_string(), config.clone());
        config
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write();
        if !entries.is_empty() {
            tracing::debug!(entries = entries.len(), "clearing format detection cache");
        }
        entries.clear();
    }
}
