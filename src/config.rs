/*!
# Pipeline Configuration

Options honored by every pipeline stage. Loaded from TOML or YAML,
validated on load, and overridden by CLI flags.

```toml
max_files = 1000
max_items_per_file = 50
max_file_size_kb = 50
content_truncation_length = 300
verbose = false
```
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::HelpParserError;

pub const DEFAULT_SOURCE_LABEL: &str = "1C BSL Documentation";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Cap on HTML entries processed by the extractor (`None` = all)
    pub max_files: Option<usize>,
    pub max_items_per_file: usize,
    pub max_file_size_kb: usize,
    /// Character budget for free-text fields in the optimized context
    pub content_truncation_length: usize,
    /// Keywords of this length or shorter are not indexed
    pub min_keyword_length: usize,
    /// Report every written file instead of a summary line
    pub verbose: bool,
    pub source_label: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_files: None,
            max_items_per_file: 50,
            max_file_size_kb: 50,
            content_truncation_length: 300,
            min_keyword_length: 2,
            verbose: false,
            source_label: DEFAULT_SOURCE_LABEL.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration, picking the format by file extension
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::load_from_yaml(path),
            _ => Self::load_from_toml(path),
        }
    }

    pub fn load_from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).with_context(|| {
            format!("Failed to read config from {}", path.as_ref().display())
        })?;

        let config: Self = toml::from_str(&content).with_context(|| {
            format!("Failed to parse TOML config from {}", path.as_ref().display())
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).with_context(|| {
            format!("Failed to read config from {}", path.as_ref().display())
        })?;

        let config: Self = serde_yaml::from_str(&content).with_context(|| {
            format!("Failed to parse YAML config from {}", path.as_ref().display())
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration as TOML
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        std::fs::write(&path, content).with_context(|| {
            format!("Failed to write config to {}", path.as_ref().display())
        })?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), HelpParserError> {
        if self.max_items_per_file == 0 {
            return Err(HelpParserError::Config(
                "max_items_per_file must be greater than 0".to_string(),
            ));
        }
        if self.max_file_size_kb == 0 {
            return Err(HelpParserError::Config(
                "max_file_size_kb must be greater than 0".to_string(),
            ));
        }
        if self.content_truncation_length == 0 {
            return Err(HelpParserError::Config(
                "content_truncation_length must be greater than 0".to_string(),
            ));
        }
        if self.max_files == Some(0) {
            return Err(HelpParserError::Config(
                "max_files must be greater than 0 when set".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_items_per_file, 50);
        assert_eq!(config.content_truncation_length, 300);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("parser.toml");
        std::fs::write(&path, "max_files = 10\nverbose = true\n").unwrap();

        let config = PipelineConfig::load_from_file(&path).unwrap();
        assert_eq!(config.max_files, Some(10));
        assert!(config.verbose);
        assert_eq!(config.max_file_size_kb, 50);
    }

    #[test]
    fn test_yaml_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("parser.yaml");
        std::fs::write(&path, "max_items_per_file: 5\nmin_keyword_length: 3\n").unwrap();

        let config = PipelineConfig::load_from_file(&path).unwrap();
        assert_eq!(config.max_items_per_file, 5);
        assert_eq!(config.min_keyword_length, 3);
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("parser.toml");
        std::fs::write(&path, "max_file_size_kb = 0\n").unwrap();

        assert!(PipelineConfig::load_from_file(&path).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("saved.toml");
        let config = PipelineConfig {
            max_files: Some(42),
            ..PipelineConfig::default()
        };
        config.save_to_file(&path).unwrap();

        assert_eq!(PipelineConfig::load_from_file(&path).unwrap(), config);
    }
}
