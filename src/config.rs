// Runtime settings loaded from JSON

use crate::cache::CacheOptions;
use crate::canvas::LayoutOptions;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Top-level settings. Every field falls back to its default when absent.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub layout: LayoutOptions,
    pub cache: CacheOptions,
}

impl Settings {
    pub fn from_json_str(input: &str) -> Result<Self> {
        serde_json::from_str(input).context("Failed to parse settings JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings = Self::from_json_str(&text)
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        tracing::debug!(path = %path.display(), ?settings, "loaded settings");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let settings = Settings::from_json_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.layout.grid_unit, 20.0);
        assert!(settings.cache.enabled);
    }

    #[test]
    fn test_partial_override() {
        let settings =
            Settings::from_json_str(r#"{"layout": {"columns": 3}, "cache": {"enabled": false}}"#)
                .unwrap();
        assert_eq!(settings.layout.columns, 3);
        assert_eq!(settings.layout.column_width, 600.0);
        assert!(!settings.cache.enabled);
        assert_eq!(settings.cache.max_entries, 256);
    }

    #[test]
    fn test_malformed_json() {
        assert!(Settings::from_json_str("{layout:").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Settings::load(Path::new("/nonexistent/settings.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read settings file"));
    }
}
