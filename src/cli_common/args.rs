//! Общие аргументы командной строки

use clap::Args;
use std::path::PathBuf;

use crate::config::PipelineConfig;

/// Аргументы для работы с архивом справки
#[derive(Args, Debug, Clone)]
pub struct ArchiveArgs {
    /// Path to the 1C help archive (.hbk or .zip)
    #[arg(short, long)]
    pub archive: PathBuf,

    /// Process only the first N HTML pages (all by default)
    #[arg(long)]
    pub max_files: Option<usize>,
}

/// Лимиты разбиения и усечения, переопределяющие файл конфигурации
#[derive(Args, Debug, Clone, Default)]
pub struct LimitArgs {
    /// Maximum items per chunk file
    #[arg(long)]
    pub max_items_per_file: Option<usize>,

    /// Maximum chunk file size in KB
    #[arg(long)]
    pub max_file_size_kb: Option<usize>,

    /// Truncate long texts in optimized output to N characters
    #[arg(long)]
    pub truncate: Option<usize>,
}

impl ArchiveArgs {
    pub fn apply_to(&self, config: &mut PipelineConfig) {
        if self.max_files.is_some() {
            config.max_files = self.max_files;
        }
    }
}

impl LimitArgs {
    pub fn apply_to(&self, config: &mut PipelineConfig) {
        if let Some(value) = self.max_items_per_file {
            config.max_items_per_file = value;
        }
        if let Some(value) = self.max_file_size_kb {
            config.max_file_size_kb = value;
        }
        if let Some(value) = self.truncate {
            config.content_truncation_length = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let mut config = PipelineConfig::default();
        LimitArgs {
            max_items_per_file: Some(10),
            max_file_size_kb: None,
            truncate: Some(120),
        }
        .apply_to(&mut config);
        ArchiveArgs {
            archive: PathBuf::from("help.hbk"),
            max_files: Some(5),
        }
        .apply_to(&mut config);

        assert_eq!(config.max_items_per_file, 10);
        assert_eq!(config.max_file_size_kb, 50);
        assert_eq!(config.content_truncation_length, 120);
        assert_eq!(config.max_files, Some(5));
    }
}
