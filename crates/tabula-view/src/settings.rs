//! View engine settings
//!
//! Plain serde structs with per-field defaults so partial JSON files load.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ViewError, ViewResult};

/// Smallest width a column can be resized to
pub const MIN_COLUMN_WIDTH: f32 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    /// Rows per page in engine-paginated mode
    pub page_size: usize,
    /// Page sizes offered to the user
    pub page_size_options: Vec<usize>,
    /// Width assigned to columns the user has not resized
    pub default_column_width: f32,
    /// Guard against pathological lookup chains
    pub max_lookup_depth: usize,
    pub detection: DetectionSettings,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            page_size: 1000,
            page_size_options: vec![100, 500, 1000, 5000, 10000],
            default_column_width: 150.0,
            max_lookup_depth: 5,
            detection: DetectionSettings::default(),
        }
    }
}

/// Thresholds read by the formatter auto-detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Non-null values inspected per column
    pub sample_size: usize,
    /// Magnitude above which narrow numeric columns use a K/M/B suffix
    pub suffix_threshold: f64,
    /// Columns narrower than this are considered narrow
    pub narrow_width: f32,
    /// Columns at least this wide get two decimal places
    pub wide_width: f32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            sample_size: 200,
            suffix_threshold: 100_000.0,
            narrow_width: 120.0,
            wide_width: 200.0,
        }
    }
}

impl ViewSettings {
    pub fn from_json(json: &str) -> ViewResult<Self> {
        let settings: Self = serde_json::from_str(json)
            .map_err(|e| ViewError::InvalidSettings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> ViewResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ViewError::InvalidSettings(e.to_string()))
    }

    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read view settings from {}", path.display()))?;
        let settings = Self::from_json(&contents)
            .with_context(|| format!("Failed to parse view settings in {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded view settings");
        Ok(settings)
    }

    pub fn validate(&self) -> ViewResult<()> {
        if self.page_size == 0 {
            return Err(ViewError::InvalidSettings("page_size must be at least 1".into()));
        }
        if self.page_size_options.contains(&0) {
            return Err(ViewError::InvalidSettings(
                "page_size_options must not contain 0".into(),
            ));
        }
        if self.default_column_width < MIN_COLUMN_WIDTH {
            return Err(ViewError::InvalidSettings(format!(
                "default_column_width must be at least {}",
                MIN_COLUMN_WIDTH
            )));
        }
        if self.max_lookup_depth == 0 {
            return Err(ViewError::InvalidSettings(
                "max_lookup_depth must be at least 1".into(),
            ));
        }
        if self.detection.narrow_width > self.detection.wide_width {
            return Err(ViewError::InvalidSettings(
                "detection.narrow_width must not exceed detection.wide_width".into(),
            ));
        }
        Ok(())
    }
}
