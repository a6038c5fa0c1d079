/*!
# Documentation Integration Module

Извлечение документации из архива справки 1С (`.hbk` / `.zip` с HTML-страницами).

## Основные компоненты

- `HbkArchiveParser` - чтение и анализ структуры архива справки
- `RuleSet` / `ExtractionRule` - подключаемые правила разбора HTML-страниц
- `BslSyntaxExtractor` - построение записей документации из страниц архива
- `ChunkedDocsLoader` - загрузка записанной по частям документации

## Использование

```rust,ignore
use onec_help_parser::docs_integration::DocsIntegration;
use onec_help_parser::PipelineConfig;

let mut docs = DocsIntegration::new();
let summary = docs.load_documentation("1C_Help.hbk", &PipelineConfig::default())?;
println!("{}", summary);
println!("{}", docs.get_statistics().unwrap());
docs.save_record_set("output/records.json")?;
```
*/

pub mod bsl_syntax_extractor;
pub mod chunked_loader;
pub mod extraction_rules;
pub mod hbk_parser;
pub mod record;

pub use bsl_syntax_extractor::{categorize_entry, BslSyntaxExtractor, ExtractionOutcome, PageOutcome};
pub use chunked_loader::{ChunkedDocsLoader, DocumentationStats};
pub use extraction_rules::{ExtractionRule, HelpPage, RecordField, RuleSet};
pub use hbk_parser::{ArchiveStructure, EntryKind, FileInfo, HbkArchiveParser, HtmlContent};
pub use record::{
    Category, CollectionElementsInfo, DocumentationRecord, LinkInfo, MethodRef, ParameterInfo, RecordSet, SyntaxVariant,
    VariantParameters,
};

use std::path::Path;

use crate::config::PipelineConfig;
use crate::core::{read_json_file, write_json_file, HelpParserError, HelpResult, RunSummary};

/// Основной фасад для работы с документацией 1С
#[derive(Default)]
pub struct DocsIntegration {
    record_set: Option<RecordSet>,
}

impl DocsIntegration {
    /// Создает новый экземпляр интеграции документации
    pub fn new() -> Self {
        Self::default()
    }

    /// Извлекает документацию из архива справки
    pub fn load_documentation<P: AsRef<Path>>(
        &mut self,
        hbk_path: P,
        config: &PipelineConfig,
    ) -> HelpResult<&RunSummary> {
        self.load_documentation_with_progress(hbk_path, config, |_, _, _| {})
    }

    pub fn load_documentation_with_progress<P, F>(
        &mut self,
        hbk_path: P,
        config: &PipelineConfig,
        progress: F,
    ) -> HelpResult<&RunSummary>
    where
        P: AsRef<Path>,
        F: FnMut(usize, usize, &str),
    {
        tracing::info!(
            "Loading BSL documentation from: {}",
            hbk_path.as_ref().display()
        );

        let mut extractor = BslSyntaxExtractor::new(hbk_path.as_ref());
        let outcome = extractor.extract_records_with_progress(config.max_files, progress)?;
        let record_set = RecordSet::new(config.source_label.clone(), outcome.records, outcome.summary);

        tracing::info!("Documentation loaded: {} records", record_set.records.len());
        Ok(&self.record_set.insert(record_set).metadata.summary)
    }

    /// Загружает ранее сохраненный набор записей, проверяя их инварианты
    pub fn load_record_set<P: AsRef<Path>>(&mut self, json_path: P) -> HelpResult<()> {
        let json_path = json_path.as_ref();
        tracing::info!("Loading extracted records from: {}", json_path.display());

        let record_set: RecordSet = read_json_file(json_path)?;
        record_set.validate()?;
        self.record_set = Some(record_set);
        Ok(())
    }

    /// Сохраняет извлеченные записи в JSON файл
    pub fn save_record_set<P: AsRef<Path>>(&self, json_path: P) -> HelpResult<u64> {
        let record_set = self.record_set.as_ref().ok_or_else(|| {
            HelpParserError::InvalidInput("no documentation loaded to save".to_string())
        })?;
        let size = write_json_file(json_path.as_ref(), record_set)?;
        tracing::info!("Records saved to {}", json_path.as_ref().display());
        Ok(size)
    }

    pub fn records(&self) -> &[DocumentationRecord] {
        self.record_set
            .as_ref()
            .map(|set| set.records.as_slice())
            .unwrap_or_default()
    }

    pub fn record_set(&self) -> Option<&RecordSet> {
        self.record_set.as_ref()
    }

    /// Проверяет, загружена ли документация
    pub fn is_loaded(&self) -> bool {
        self.record_set.is_some()
    }

    /// Получает статистику загруженной документации
    pub fn get_statistics(&self) -> Option<DocumentationStatistics> {
        let set = self.record_set.as_ref()?;

        Some(DocumentationStatistics {
            objects_count: set.count_by_category(Category::Objects),
            properties_count: set.count_by_category(Category::Properties),
            methods_count: set.count_by_category(Category::Methods),
            functions_count: set.count_by_category(Category::Functions),
            operators_count: set.count_by_category(Category::Operators),
            skipped_entries: set.metadata.summary.skipped(),
        })
    }
}

/// Статистика документации BSL
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentationStatistics {
    pub objects_count: usize,
    pub properties_count: usize,
    pub methods_count: usize,
    pub functions_count: usize,
    pub operators_count: usize,
    pub skipped_entries: usize,
}

impl DocumentationStatistics {
    pub fn total(&self) -> usize {
        self.objects_count
            + self.properties_count
            + self.methods_count
            + self.functions_count
            + self.operators_count
    }
}

impl std::fmt::Display for DocumentationStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BSL Documentation Statistics:\n\
             Objects: {}\n\
             Properties: {}\n\
             Methods: {}\n\
             Functions: {}\n\
             Operators: {}\n\
             Skipped entries: {}",
            self.objects_count,
            self.properties_count,
            self.methods_count,
            self.functions_count,
            self.operators_count,
            self.skipped_entries
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_docs_integration_creation() {
        let integration = DocsIntegration::new();
        assert!(!integration.is_loaded());
        assert!(integration.get_statistics().is_none());
        assert!(integration.records().is_empty());
    }

    #[test]
    fn test_save_without_records_fails() {
        let temp_dir = TempDir::new().unwrap();
        let integration = DocsIntegration::new();
        assert!(integration
            .save_record_set(temp_dir.path().join("records.json"))
            .is_err());
    }

    #[test]
    fn test_record_set_round_trip_through_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("records.json");

        let draft = record::RecordDraft {
            title: Some("Массив".to_string()),
            ..record::RecordDraft::new("objects/Array.html")
        };
        let rec = DocumentationRecord::from_draft("objects_0".into(), Category::Objects, draft).unwrap();
        write_json_file(&path, &RecordSet::new("test", vec![rec], RunSummary::new())).unwrap();

        let mut integration = DocsIntegration::new();
        integration.load_record_set(&path).unwrap();
        let stats = integration.get_statistics().unwrap();
        assert_eq!(stats.objects_count, 1);
        assert_eq!(stats.total(), 1);
    }
}
