//! Built-in formatters

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::json;
use std::fmt::Write;
use tabula_core::Value;

use super::options::{copy_bool, copy_str, copy_u64, get_bool, get_str, get_u64};
use super::{CellFormatter, CellRender, FormatOptions, Formatted};

const MAX_DECIMALS: u64 = 10;

fn defaults(value: serde_json::Value) -> FormatOptions {
    match value {
        serde_json::Value::Object(map) => map,
        _ => FormatOptions::new(),
    }
}

/// Read a value as a number, accepting numeric strings
fn numeric_value(value: &Value) -> Option<f64> {
    value.as_number().or_else(|| match value {
        Value::String(s) if !s.trim().is_empty() => {
            s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
        }
        _ => None,
    })
}

/// Insert `separator` between groups of three integer digits
pub(crate) fn group_digits(digits: &str, separator: &str) -> String {
    if separator.is_empty() || digits.len() <= 3 {
        return digits.to_string();
    }
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 * separator.len());
    let lead = digits.len() % 3;
    for (ix, ch) in digits.chars().enumerate() {
        if ix != 0 && (ix + 3 - lead) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(ch);
    }
    out
}

/// Fixed-decimal rendering with grouped thousands
pub(crate) fn format_grouped(n: f64, decimals: usize, separator: &str) -> String {
    if !n.is_finite() {
        return n.to_string();
    }
    let fixed = format!("{:.*}", decimals, n.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };
    // "-0" and "-0.00" render without the sign
    let negative = n < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&group_digits(int_part, separator));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Index into `units` (smallest first, each `base` times the previous) and
/// the value scaled to it. The unit is chosen on the value as it will be
/// displayed, so 999,990 at one decimal becomes 1M rather than 1000K.
fn pick_unit(n: f64, base: f64, units: usize, decimals: usize) -> (usize, f64) {
    let factor = 10f64.powi(decimals as i32);
    let mut ix = 0;
    let mut scaled = n;
    while ix + 1 < units && (scaled.abs() * factor).round() / factor >= base {
        ix += 1;
        scaled = n / base.powi(ix as i32);
    }
    (ix, scaled)
}

fn trim_trailing_zeros(s: String) -> String {
    if !s.contains('.') {
        return s;
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Plain text with optional truncation
pub struct TextFormatter;

impl CellFormatter for TextFormatter {
    fn type_name(&self) -> &'static str {
        "text"
    }

    fn label(&self) -> &'static str {
        "Text"
    }

    fn default_options(&self) -> FormatOptions {
        defaults(json!({ "max_length": 0 }))
    }

    fn validate_options(&self, options: &FormatOptions) -> FormatOptions {
        let mut out = FormatOptions::new();
        copy_u64(&mut out, options, &self.default_options(), "max_length", u32::MAX as u64);
        out
    }

    fn format(&self, value: &Value, options: &FormatOptions) -> Formatted {
        let text = value.to_plain_string();
        let max = get_u64(options, "max_length").unwrap_or(0) as usize;
        if max == 0 || text.chars().count() <= max {
            return Formatted::Text(text);
        }
        let mut truncated: String = text.chars().take(max).collect();
        truncated.push('…');
        Formatted::Text(truncated)
    }
}

/// Grouped-thousands number
pub struct NumberFormatter;

impl CellFormatter for NumberFormatter {
    fn type_name(&self) -> &'static str {
        "number"
    }

    fn label(&self) -> &'static str {
        "Number"
    }

    fn default_options(&self) -> FormatOptions {
        defaults(json!({ "decimals": 0, "thousands_separator": "," }))
    }

    fn validate_options(&self, options: &FormatOptions) -> FormatOptions {
        let defaults = self.default_options();
        let mut out = FormatOptions::new();
        copy_u64(&mut out, options, &defaults, "decimals", MAX_DECIMALS);
        copy_str(&mut out, options, &defaults, "thousands_separator", |s| {
            s.chars().count() <= 1
        });
        out
    }

    fn format(&self, value: &Value, options: &FormatOptions) -> Formatted {
        let Some(n) = numeric_value(value) else {
            return Formatted::Text(value.to_plain_string());
        };
        let decimals = get_u64(options, "decimals").unwrap_or(0) as usize;
        let separator = get_str(options, "thousands_separator").unwrap_or(",");
        Formatted::Text(format_grouped(n, decimals, separator))
    }
}

/// Magnitude-suffixed number (`1.2K`, `3.4M`)
pub struct SuffixedNumberFormatter;

impl SuffixedNumberFormatter {
    const UNITS: [&'static str; 5] = ["", "K", "M", "B", "T"];
}

impl CellFormatter for SuffixedNumberFormatter {
    fn type_name(&self) -> &'static str {
        "suffixed"
    }

    fn label(&self) -> &'static str {
        "Number (K/M/B)"
    }

    fn default_options(&self) -> FormatOptions {
        defaults(json!({ "decimals": 1 }))
    }

    fn validate_options(&self, options: &FormatOptions) -> FormatOptions {
        let mut out = FormatOptions::new();
        copy_u64(&mut out, options, &self.default_options(), "decimals", MAX_DECIMALS);
        out
    }

    fn format(&self, value: &Value, options: &FormatOptions) -> Formatted {
        let Some(n) = numeric_value(value) else {
            return Formatted::Text(value.to_plain_string());
        };
        let decimals = get_u64(options, "decimals").unwrap_or(1) as usize;
        let (unit, scaled) = pick_unit(n, 1000.0, Self::UNITS.len(), decimals);
        Formatted::Suffixed {
            number: trim_trailing_zeros(format_grouped(scaled, decimals, "")),
            suffix: Self::UNITS[unit].to_string(),
        }
    }
}

/// Byte counts (`48 B`, `1.2 KB`)
pub struct BytesFormatter;

impl CellFormatter for BytesFormatter {
    fn type_name(&self) -> &'static str {
        "bytes"
    }

    fn label(&self) -> &'static str {
        "File size"
    }

    fn default_options(&self) -> FormatOptions {
        defaults(json!({ "decimals": 1 }))
    }

    fn validate_options(&self, options: &FormatOptions) -> FormatOptions {
        let mut out = FormatOptions::new();
        copy_u64(&mut out, options, &self.default_options(), "decimals", MAX_DECIMALS);
        out
    }

    fn format(&self, value: &Value, options: &FormatOptions) -> Formatted {
        let bytes = match value {
            Value::Bytes(b) => b.len() as f64,
            other => match numeric_value(other) {
                Some(n) => n,
                None => return Formatted::Text(other.to_plain_string()),
            },
        };
        let decimals = get_u64(options, "decimals").unwrap_or(1) as usize;
        const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
        let text = match pick_unit(bytes, 1024.0, UNITS.len(), decimals) {
            (0, _) => format!("{} B", bytes),
            (unit, scaled) => format!("{:.*} {}", decimals, scaled, UNITS[unit]),
        };
        Formatted::Text(text)
    }
}

/// Date, time and timestamp values
pub struct DateFormatter;

enum Temporal {
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

impl DateFormatter {
    const STYLES: [&'static str; 3] = ["date", "time", "datetime"];

    fn default_pattern(style: &str, value: &Temporal) -> &'static str {
        match (value, style) {
            (Temporal::Date(_), _) | (Temporal::DateTime(_), "date") => "%Y-%m-%d",
            (Temporal::Time(_), _) | (Temporal::DateTime(_), "time") => "%H:%M:%S",
            (Temporal::DateTime(_), _) => "%Y-%m-%d %H:%M:%S",
        }
    }

    fn is_valid_pattern(pattern: &str) -> bool {
        !pattern.is_empty() && StrftimeItems::new(pattern).all(|item| !matches!(item, Item::Error))
    }

    fn parse(value: &Value) -> Option<Temporal> {
        match value {
            Value::Date(d) => Some(Temporal::Date(*d)),
            Value::Time(t) => Some(Temporal::Time(*t)),
            Value::DateTime(dt) => Some(Temporal::DateTime(*dt)),
            Value::DateTimeUtc(dt) => Some(Temporal::DateTime(dt.naive_utc())),
            Value::String(s) => Self::parse_str(s.trim()),
            _ => None,
        }
    }

    fn parse_str(s: &str) -> Option<Temporal> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Temporal::DateTime(dt.naive_utc()));
        }
        for pattern in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, pattern) {
                return Some(Temporal::DateTime(dt));
            }
        }
        if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Some(Temporal::Date(d));
        }
        if let Ok(t) = NaiveTime::parse_from_str(s, "%H:%M:%S%.f") {
            return Some(Temporal::Time(t));
        }
        None
    }

    fn render(value: &Temporal, pattern: &str) -> Option<String> {
        let mut out = String::new();
        let written = match value {
            Temporal::Date(d) => match d.and_hms_opt(0, 0, 0) {
                Some(dt) => write!(out, "{}", dt.format(pattern)),
                None => return None,
            },
            Temporal::Time(t) => write!(out, "{}", t.format(pattern)),
            Temporal::DateTime(dt) => write!(out, "{}", dt.format(pattern)),
        };
        written.ok().map(|_| out)
    }
}

impl CellFormatter for DateFormatter {
    fn type_name(&self) -> &'static str {
        "date"
    }

    fn label(&self) -> &'static str {
        "Date / Time"
    }

    fn default_options(&self) -> FormatOptions {
        defaults(json!({ "style": "datetime" }))
    }

    fn validate_options(&self, options: &FormatOptions) -> FormatOptions {
        let mut out = FormatOptions::new();
        copy_str(&mut out, options, &self.default_options(), "style", |s| {
            Self::STYLES.contains(&s)
        });
        if let Some(pattern) = get_str(options, "pattern").filter(|p| Self::is_valid_pattern(p)) {
            out.insert("pattern".to_string(), pattern.into());
        }
        out
    }

    fn format(&self, value: &Value, options: &FormatOptions) -> Formatted {
        let Some(temporal) = Self::parse(value) else {
            return Formatted::Text(value.to_plain_string());
        };
        let style = get_str(options, "style").unwrap_or("datetime");
        let pattern = get_str(options, "pattern")
            .filter(|p| Self::is_valid_pattern(p))
            .unwrap_or_else(|| Self::default_pattern(style, &temporal));
        // a custom pattern can still ask for fields a time-only value lacks
        let text = Self::render(&temporal, pattern)
            .or_else(|| Self::render(&temporal, Self::default_pattern(style, &temporal)))
            .unwrap_or_else(|| value.to_plain_string());
        Formatted::Text(text)
    }
}

/// Categorical values shown as colored badges
pub struct EnumFormatter;

impl EnumFormatter {
    /// Stable palette slot for a label
    pub fn color_index(label: &str, palette_size: usize) -> usize {
        let hash = label
            .bytes()
            .fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(b as u32));
        hash as usize % palette_size.max(1)
    }
}

impl CellFormatter for EnumFormatter {
    fn type_name(&self) -> &'static str {
        "enum"
    }

    fn label(&self) -> &'static str {
        "Category"
    }

    fn default_options(&self) -> FormatOptions {
        defaults(json!({ "palette_size": 8 }))
    }

    fn validate_options(&self, options: &FormatOptions) -> FormatOptions {
        let mut out = FormatOptions::new();
        copy_u64(&mut out, options, &self.default_options(), "palette_size", 64);
        if get_u64(&out, "palette_size") == Some(0) {
            out.insert("palette_size".to_string(), 8.into());
        }
        out
    }

    fn format(&self, value: &Value, _options: &FormatOptions) -> Formatted {
        Formatted::Text(value.to_plain_string())
    }

    fn render_cell(&self, value: &Value, options: &FormatOptions) -> Option<CellRender> {
        let label = value.to_plain_string();
        let palette = get_u64(options, "palette_size").unwrap_or(8) as usize;
        let color = Self::color_index(&label, palette);
        Some(CellRender::Badge { label, color })
    }
}

/// Booleans with configurable labels
pub struct BooleanFormatter;

impl BooleanFormatter {
    fn parse(value: &Value) -> Option<bool> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.to_lowercase().as_str() {
                "true" | "t" | "1" | "yes" | "y" | "on" => Some(true),
                "false" | "f" | "0" | "no" | "n" | "off" => Some(false),
                _ => None,
            },
            other => other.as_i64().map(|n| n != 0),
        }
    }
}

impl CellFormatter for BooleanFormatter {
    fn type_name(&self) -> &'static str {
        "boolean"
    }

    fn label(&self) -> &'static str {
        "Boolean"
    }

    fn default_options(&self) -> FormatOptions {
        defaults(json!({ "true_label": "true", "false_label": "false" }))
    }

    fn validate_options(&self, options: &FormatOptions) -> FormatOptions {
        let defaults = self.default_options();
        let mut out = FormatOptions::new();
        copy_str(&mut out, options, &defaults, "true_label", |s| !s.is_empty());
        copy_str(&mut out, options, &defaults, "false_label", |s| !s.is_empty());
        out
    }

    fn format(&self, value: &Value, options: &FormatOptions) -> Formatted {
        let text = match Self::parse(value) {
            Some(true) => get_str(options, "true_label").unwrap_or("true").to_string(),
            Some(false) => get_str(options, "false_label").unwrap_or("false").to_string(),
            None => value.to_plain_string(),
        };
        Formatted::Text(text)
    }
}

/// JSON documents, compact or pretty
pub struct JsonFormatter;

impl CellFormatter for JsonFormatter {
    fn type_name(&self) -> &'static str {
        "json"
    }

    fn label(&self) -> &'static str {
        "JSON"
    }

    fn default_options(&self) -> FormatOptions {
        defaults(json!({ "pretty": false }))
    }

    fn validate_options(&self, options: &FormatOptions) -> FormatOptions {
        let mut out = FormatOptions::new();
        copy_bool(&mut out, options, &self.default_options(), "pretty");
        out
    }

    fn format(&self, value: &Value, options: &FormatOptions) -> Formatted {
        let parsed = match value {
            Value::Json(json) => Some(json.clone()),
            Value::String(s) => serde_json::from_str::<serde_json::Value>(s).ok(),
            _ => None,
        };
        let Some(json) = parsed else {
            return Formatted::Text(value.to_plain_string());
        };
        let text = if get_bool(options, "pretty").unwrap_or(false) {
            serde_json::to_string_pretty(&json)
        } else {
            serde_json::to_string(&json)
        };
        Formatted::Text(text.unwrap_or_else(|_| value.to_plain_string()))
    }

    fn render_cell(&self, value: &Value, options: &FormatOptions) -> Option<CellRender> {
        Some(CellRender::Code(self.format(value, options).into_string()))
    }
}
