/*!
# Optimized Context Converter

Компактный контекст: только критически важные поля, длинные тексты усечены,
плюс поисковая карта `ключевое слово -> [id]`.
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::search_index::{SearchIndexBuilder, SearchMap};
use super::{clean_text, normalize_lines, truncate_chars};
use crate::config::PipelineConfig;
use crate::docs_integration::record::{Category, DocumentationRecord, ParameterInfo};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedParameter {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub param_type: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub description: String,
}

/// Компактный элемент контекста
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedItem {
    pub id: String,
    pub title: String,
    pub category: Category,
    #[serde(default)]
    pub syntax: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<OptimizedParameter>,
    #[serde(default)]
    pub return_value: String,
    #[serde(default)]
    pub availability: Vec<String>,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub example: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedMetadata {
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub total_items: usize,
    pub format: String,
}

/// Оптимизированный документ (`1c_context_optimized.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedDocument {
    pub metadata: OptimizedMetadata,
    pub items: Vec<OptimizedItem>,
    pub search: SearchMap,
}

#[derive(Debug, Clone)]
pub struct OptimizedContextConverter {
    source_label: String,
    truncation_length: usize,
    min_keyword_length: usize,
}

impl OptimizedContextConverter {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            source_label: config.source_label.clone(),
            truncation_length: config.content_truncation_length,
            min_keyword_length: config.min_keyword_length,
        }
    }

    pub fn convert(&self, records: &[DocumentationRecord]) -> OptimizedDocument {
        self.convert_at(records, Utc::now())
    }

    pub fn convert_at(
        &self,
        records: &[DocumentationRecord],
        generated_at: DateTime<Utc>,
    ) -> OptimizedDocument {
        let items: Vec<OptimizedItem> = records.iter().map(|r| self.format_item(r)).collect();
        let search = self.build_search(&items);

        info!(
            "Optimized context: {} items, {} search keys",
            items.len(),
            search.len()
        );

        OptimizedDocument {
            metadata: OptimizedMetadata {
                source: self.source_label.clone(),
                generated_at,
                total_items: items.len(),
                format: "optimized".to_string(),
            },
            items,
            search,
        }
    }

    pub fn format_item(&self, record: &DocumentationRecord) -> OptimizedItem {
        OptimizedItem {
            id: record.id.clone(),
            title: record.title.clone(),
            category: record.category,
            syntax: record.syntax.clone(),
            description: self.truncate(&clean_text(&record.description)),
            parameters: record
                .parameters
                .iter()
                .map(|p| self.format_parameter(p))
                .collect(),
            return_value: self.truncate(&clean_text(&record.return_value)),
            availability: record.availability.clone(),
            version: record.version.clone(),
            example: self.truncate(&normalize_lines(&record.example)),
        }
    }

    fn format_parameter(&self, param: &ParameterInfo) -> OptimizedParameter {
        OptimizedParameter {
            name: param.name.clone(),
            param_type: param.param_type.clone().unwrap_or_default(),
            optional: param.is_optional,
            description: self.truncate(&clean_text(param.description.as_deref().unwrap_or(""))),
        }
    }

    fn truncate(&self, text: &str) -> String {
        truncate_chars(text, self.truncation_length)
    }

    /// Слова заголовка и описания, теги доступности, версия, категория и типы параметров
    fn build_search(&self, items: &[OptimizedItem]) -> SearchMap {
        let mut builder = SearchIndexBuilder::new(self.min_keyword_length);
        for item in items {
            builder.add_text(&item.id, &item.title);
            builder.add_text(&item.id, &item.description);
            for tag in &item.availability {
                builder.add_key(&item.id, tag);
            }
            builder.add_key(&item.id, &item.version);
            builder.add_key(&item.id, item.category.as_str());
            for param in &item.parameters {
                builder.add_key(&item.id, &param.param_type);
            }
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn record(id: &str, title: &str, category: Category) -> DocumentationRecord {
        DocumentationRecord {
            id: id.to_string(),
            title: title.to_string(),
            category,
            syntax: String::new(),
            syntax_variants: Vec::new(),
            description: String::new(),
            parameters: Vec::new(),
            parameters_by_variant: Vec::new(),
            return_value: String::new(),
            availability: Vec::new(),
            version: String::new(),
            example: String::new(),
            methods: Vec::new(),
            links: Vec::new(),
            collection_elements: None,
            source_filename: format!("{}.html", id),
        }
    }

    fn message_function() -> DocumentationRecord {
        DocumentationRecord {
            syntax: "Сообщить(<ТекстСообщения>)".to_string(),
            description: "Выводит сообщение пользователю.".to_string(),
            parameters: vec![ParameterInfo {
                name: "ТекстСообщения".to_string(),
                param_type: Some("Строка".to_string()),
                description: None,
                is_optional: false,
                link: None,
            }],
            availability: vec!["Тонкий клиент".to_string(), "Сервер".to_string()],
            version: "8.0".to_string(),
            ..record("functions_0", "Сообщить", Category::Functions)
        }
    }

    fn converter_with_limit(limit: usize) -> OptimizedContextConverter {
        OptimizedContextConverter::new(&PipelineConfig {
            content_truncation_length: limit,
            ..PipelineConfig::default()
        })
    }

    #[test]
    fn test_truncation() {
        let mut rec = record("objects_0", "Таблица", Category::Objects);
        rec.description = "д".repeat(400);
        rec.return_value = "короткое".to_string();

        let item = converter_with_limit(300).format_item(&rec);
        assert_eq!(item.description.chars().count(), 303);
        assert!(item.description.ends_with("..."));
        assert_eq!(item.return_value, "короткое");
    }

    #[test]
    fn test_search_keys() {
        let doc = converter_with_limit(300).convert_at(
            &[message_function(), record("objects_1", "Таблица", Category::Objects)],
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
        );

        assert_eq!(doc.metadata.format, "optimized");
        assert_eq!(doc.search["сообщить"], vec!["functions_0"]);
        assert_eq!(doc.search["тонкий клиент"], vec!["functions_0"]);
        assert_eq!(doc.search["строка"], vec!["functions_0"]);
        assert_eq!(doc.search["8.0"], vec!["functions_0"]);
        assert_eq!(doc.search["objects"], vec!["objects_1"]);
        assert!(!doc.search.contains_key(""));

        for ids in doc.search.values() {
            for id in ids {
                assert!(doc.items.iter().any(|i| &i.id == id), "dangling id {}", id);
            }
        }
    }

    #[test]
    fn test_parameter_type_serialized_as_type() {
        let item = converter_with_limit(300).format_item(&message_function());
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["parameters"][0]["type"], "Строка");
        assert_eq!(json["parameters"][0]["optional"], false);
        assert_eq!(json["category"], "functions");
    }
}
