/*!
# Context Converter

Строит полный контекст для LLM: каждый элемент получает Markdown-описание
(`content`) и все поля записи в `metadata`. Из того же документа строятся
текстовый экспорт, поисковый индекс и краткое резюме.
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use super::search_index::{SearchIndexBuilder, SearchMap};
use super::{clean_text, normalize_lines};
use crate::config::PipelineConfig;
use crate::docs_integration::record::{
    Category, CollectionElementsInfo, DocumentationRecord, LinkInfo, MethodRef, ParameterInfo,
    SyntaxVariant, VariantParameters,
};

const TEXT_SEPARATOR_WIDTH: usize = 80;
const TOP_KEYWORDS: usize = 20;

/// Метаданные контекстного документа
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextDocumentMetadata {
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub total_items: usize,
    /// Присутствующие категории в каноническом порядке
    pub categories: Vec<Category>,
    pub format: String,
}

/// Полный контекстный документ (`1c_context.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextDocument {
    pub metadata: ContextDocumentMetadata,
    pub context_items: Vec<ContextItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItemMetadata {
    pub filename: String,
    #[serde(default)]
    pub syntax: String,
    #[serde(default)]
    pub syntax_variants: Vec<SyntaxVariant>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ParameterInfo>,
    #[serde(default)]
    pub parameters_by_variant: Vec<VariantParameters>,
    #[serde(default)]
    pub return_value: String,
    #[serde(default)]
    pub example: String,
    #[serde(default)]
    pub availability: Vec<String>,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub methods: Vec<MethodRef>,
    #[serde(default)]
    pub links: Vec<LinkInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_elements: Option<CollectionElementsInfo>,
}

/// Элемент контекста
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    pub id: String,
    pub title: String,
    pub category: Category,
    pub content: String,
    pub metadata: ContextItemMetadata,
}

/// Поисковый индекс по контексту (`1c_search_index.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIndexDocument {
    pub metadata: SummaryMetadata,
    pub index: SearchMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetadata {
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub total_items: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub word: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxExample {
    pub title: String,
    pub syntax: String,
}

/// Краткое резюме документации (`1c_summary.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSummary {
    pub metadata: SummaryMetadata,
    pub categories: BTreeMap<Category, usize>,
    pub top_keywords: Vec<KeywordCount>,
    pub examples: Vec<SyntaxExample>,
}

/// Конвертер записей в контекст для LLM
#[derive(Debug, Clone)]
pub struct ContextConverter {
    source_label: String,
    min_keyword_length: usize,
}

impl ContextConverter {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            source_label: config.source_label.clone(),
            min_keyword_length: config.min_keyword_length,
        }
    }

    pub fn convert(&self, records: &[DocumentationRecord]) -> ContextDocument {
        self.convert_at(records, Utc::now())
    }

    /// Конвертация с фиксированным временем генерации
    pub fn convert_at(
        &self,
        records: &[DocumentationRecord],
        generated_at: DateTime<Utc>,
    ) -> ContextDocument {
        let context_items: Vec<ContextItem> =
            records.iter().map(|r| self.format_for_context(r)).collect();

        let categories = Category::ALL
            .into_iter()
            .filter(|c| context_items.iter().any(|item| item.category == *c))
            .collect();

        info!("Created {} context items", context_items.len());

        ContextDocument {
            metadata: ContextDocumentMetadata {
                source: self.source_label.clone(),
                generated_at,
                total_items: context_items.len(),
                categories,
                format: "context".to_string(),
            },
            context_items,
        }
    }

    /// Формирует элемент контекста с Markdown-описанием
    pub fn format_for_context(&self, record: &DocumentationRecord) -> ContextItem {
        ContextItem {
            id: record.id.clone(),
            title: record.title.clone(),
            category: record.category,
            content: render_markdown(record),
            metadata: ContextItemMetadata {
                filename: record.source_filename.clone(),
                syntax: record.syntax.clone(),
                syntax_variants: record.syntax_variants.clone(),
                description: record.description.clone(),
                parameters: record.parameters.clone(),
                parameters_by_variant: record.parameters_by_variant.clone(),
                return_value: record.return_value.clone(),
                example: record.example.clone(),
                availability: record.availability.clone(),
                version: record.version.clone(),
                methods: record.methods.clone(),
                links: record.links.clone(),
                collection_elements: record.collection_elements.clone(),
            },
        }
    }

    /// Текстовый экспорт для LLM: все элементы подряд через разделитель
    pub fn render_text(&self, doc: &ContextDocument) -> String {
        let separator = "=".repeat(TEXT_SEPARATOR_WIDTH);
        let mut text = String::from("# Документация синтаксиса 1С (BSL)\n\n");
        text.push_str("Этот файл содержит документацию по синтаксису языка 1С:Предприятие.\n");
        text.push_str(
            "Используйте эту информацию для ответов на вопросы о программировании в 1С.\n\n",
        );
        text.push_str(&separator);
        text.push_str("\n\n");

        for item in &doc.context_items {
            text.push_str(&item.content);
            text.push_str("\n\n");
            text.push_str(&separator);
            text.push_str("\n\n");
        }
        text
    }

    /// Поисковый индекс по заголовкам и содержимому элементов
    pub fn build_search_index_document(&self, doc: &ContextDocument) -> SearchIndexDocument {
        let mut builder = SearchIndexBuilder::new(self.min_keyword_length);
        for item in &doc.context_items {
            builder.add_text(&item.id, &item.title);
            builder.add_text(&item.id, &item.content);
        }

        SearchIndexDocument {
            metadata: self.summary_metadata(doc),
            index: builder.build(),
        }
    }

    /// Резюме: количество по категориям, частые слова заголовков, примеры синтаксиса
    pub fn build_summary(&self, doc: &ContextDocument) -> ContextSummary {
        let mut categories = BTreeMap::new();
        let mut keywords: BTreeMap<String, usize> = BTreeMap::new();
        let mut examples = Vec::new();

        for item in &doc.context_items {
            *categories.entry(item.category).or_insert(0) += 1;

            for word in item
                .title
                .split(|c: char| !(c.is_alphanumeric() || c == '_'))
                .filter(|w| w.chars().count() > 3)
            {
                *keywords.entry(word.to_lowercase()).or_insert(0) += 1;
            }

            if !item.metadata.syntax.is_empty() {
                examples.push(SyntaxExample {
                    title: item.title.clone(),
                    syntax: item.metadata.syntax.clone(),
                });
            }
        }

        // BTreeMap уже отсортирован по слову, стабильная сортировка сохраняет этот порядок при равенстве
        let mut top_keywords: Vec<KeywordCount> = keywords
            .into_iter()
            .map(|(word, count)| KeywordCount { word, count })
            .collect();
        top_keywords.sort_by(|a, b| b.count.cmp(&a.count));
        top_keywords.truncate(TOP_KEYWORDS);

        ContextSummary {
            metadata: self.summary_metadata(doc),
            categories,
            top_keywords,
            examples,
        }
    }

    fn summary_metadata(&self, doc: &ContextDocument) -> SummaryMetadata {
        SummaryMetadata {
            source: doc.metadata.source.clone(),
            generated_at: doc.metadata.generated_at,
            total_items: doc.context_items.len(),
        }
    }
}

fn render_markdown(record: &DocumentationRecord) -> String {
    let mut parts = vec![format!("# {}", record.title)];

    if !record.syntax_variants.is_empty() {
        parts.push("\n## Синтаксис".to_string());
        for variant in &record.syntax_variants {
            parts.push(format!(
                "\n### {}\n```bsl\n{}\n```",
                variant.variant_name, variant.syntax
            ));
        }
    } else if !record.syntax.is_empty() {
        parts.push(format!("\n## Синтаксис\n```bsl\n{}\n```", record.syntax));
    }

    let description = clean_text(&record.description);
    if !description.is_empty() {
        parts.push(format!("\n## Описание\n{}", description));
    }

    if !record.parameters_by_variant.is_empty() {
        parts.push("\n## Параметры".to_string());
        for variant in &record.parameters_by_variant {
            parts.push(format!("\n### {}", variant.variant_name));
            parts.extend(variant.parameters.iter().map(parameter_line));
        }
    } else if !record.parameters.is_empty() {
        parts.push("\n## Параметры".to_string());
        parts.extend(record.parameters.iter().map(parameter_line));
    }

    let return_value = clean_text(&record.return_value);
    if !return_value.is_empty() {
        parts.push(format!("\n## Возвращаемое значение\n{}", return_value));
    }

    if let Some(elements) = &record.collection_elements {
        let lines: Vec<String> = [
            ("Тип", &elements.element_type),
            ("Описание", &elements.description),
            ("Использование", &elements.usage),
        ]
        .into_iter()
        .filter_map(|(label, text)| {
            text.as_deref()
                .map(|t| format!("- {}: {}", label, clean_text(t)))
        })
        .collect();
        if !lines.is_empty() {
            parts.push(format!("\n## Элементы коллекции\n{}", lines.join("\n")));
        }
    }

    let example = normalize_lines(&record.example);
    if !example.is_empty() {
        parts.push(format!("\n## Пример\n```bsl\n{}\n```", example));
    }

    parts.join("\n")
}

fn parameter_line(param: &ParameterInfo) -> String {
    let optional = if param.is_optional {
        "(необязательный)"
    } else {
        "(обязательный)"
    };
    let mut line = format!("- {} {}", param.name, optional);
    if let Some(param_type) = param.param_type.as_deref().filter(|t| !t.is_empty()) {
        line.push_str(": ");
        line.push_str(param_type);
    }
    if let Some(desc) = param.description.as_deref().filter(|d| !d.is_empty()) {
        line.push_str(" - ");
        line.push_str(&clean_text(desc));
    }
    line
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

    fn add_method() -> DocumentationRecord {
        let param = ParameterInfo {
            name: "Значение".to_string(),
            param_type: Some("Произвольный".to_string()),
            description: Some("Добавляемое   значение.".to_string()),
            is_optional: true,
            link: None,
        };
        DocumentationRecord {
            syntax: "Добавить(<Значение>)".to_string(),
            description: "Добавляет элемент\n в конец массива.".to_string(),
            parameters: vec![param.clone()],
            parameters_by_variant: vec![VariantParameters {
                variant_name: "Основной".to_string(),
                parameters: vec![param],
            }],
            example: "Массив.Добавить(1);\nМассив.Добавить(2);".to_string(),
            availability: vec!["Сервер".to_string(), "Клиент".to_string()],
            ..record("methods_0", "Массив.Добавить", Category::Methods)
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_markdown_content() {
        let converter = ContextConverter::new(&PipelineConfig::default());
        let item = converter.format_for_context(&add_method());

        assert_eq!(
            item.content,
            "# Массив.Добавить\n\
             \n## Синтаксис\n```bsl\nДобавить(<Значение>)\n```\n\
             \n## Описание\nДобавляет элемент в конец массива.\n\
             \n## Параметры\n\
             \n### Основной\n\
             - Значение (необязательный): Произвольный - Добавляемое значение.\n\
             \n## Пример\n```bsl\nМассив.Добавить(1);\nМассив.Добавить(2);\n```"
        );
        assert_eq!(item.metadata.availability, vec!["Сервер", "Клиент"]);
    }

    #[test]
    fn test_title_only_record() {
        let converter = ContextConverter::new(&PipelineConfig::default());
        let item = converter.format_for_context(&record("objects_0", "Таблица", Category::Objects));
        assert_eq!(item.content, "# Таблица");
    }

    #[test]
    fn test_collection_elements_section() {
        let converter = ContextConverter::new(&PipelineConfig::default());
        let array = DocumentationRecord {
            collection_elements: Some(CollectionElementsInfo {
                element_type: Some("Элементами коллекции являются значения".to_string()),
                description: None,
                usage: Some("Для каждого ... Из ... Цикл".to_string()),
            }),
            ..record("objects_0", "Массив", Category::Objects)
        };
        let item = converter.format_for_context(&array);

        assert_eq!(
            item.content,
            "# Массив\n\
             \n## Элементы коллекции\n\
             - Тип: Элементами коллекции являются значения\n\
             - Использование: Для каждого ... Из ... Цикл"
        );
        assert_eq!(item.metadata.collection_elements, array.collection_elements);
    }

    #[test]
    fn test_convert_is_deterministic_with_fixed_time() {
        let converter = ContextConverter::new(&PipelineConfig::default());
        let records = vec![
            record("functions_0", "Сообщить", Category::Functions),
            add_method(),
            record("objects_2", "Массив", Category::Objects),
        ];

        let first = converter.convert_at(&records, fixed_time());
        let second = converter.convert_at(&records, fixed_time());
        assert_eq!(first, second);
        assert_eq!(first.metadata.total_items, 3);
        assert_eq!(first.metadata.format, "context");
        assert_eq!(
            first.metadata.categories,
            vec![Category::Objects, Category::Methods, Category::Functions]
        );
    }

    #[test]
    fn test_render_text_contains_every_item() {
        let converter = ContextConverter::new(&PipelineConfig::default());
        let doc = converter.convert_at(
            &[record("objects_0", "Таблица", Category::Objects), add_method()],
            fixed_time(),
        );
        let text = converter.render_text(&doc);

        assert!(text.starts_with("# Документация синтаксиса 1С (BSL)\n\n"));
        assert!(text.contains("# Таблица\n\n"));
        assert!(text.contains("# Массив.Добавить"));
        assert_eq!(text.matches(&"=".repeat(80)).count(), 3);
    }

    #[test]
    fn test_search_index_ids_exist() {
        let converter = ContextConverter::new(&PipelineConfig::default());
        let doc = converter.convert_at(
            &[record("objects_0", "Таблица", Category::Objects), add_method()],
            fixed_time(),
        );
        let index = converter.build_search_index_document(&doc);

        assert_eq!(index.index["таблица"], vec!["objects_0"]);
        assert_eq!(index.index["массив"], vec!["methods_0"]);
        for ids in index.index.values() {
            for id in ids {
                assert!(doc.context_items.iter().any(|i| &i.id == id));
            }
        }
    }

    #[test]
    fn test_summary() {
        let converter = ContextConverter::new(&PipelineConfig::default());
        let doc = converter.convert_at(
            &[
                record("objects_0", "Массив", Category::Objects),
                add_method(),
                record("objects_2", "ФиксированныйМассив", Category::Objects),
            ],
            fixed_time(),
        );
        let summary = converter.build_summary(&doc);

        assert_eq!(summary.categories[&Category::Objects], 2);
        assert_eq!(summary.categories[&Category::Methods], 1);
        assert_eq!(
            summary.top_keywords[0],
            KeywordCount {
                word: "массив".to_string(),
                count: 2
            }
        );
        assert_eq!(
            summary.examples,
            vec![SyntaxExample {
                title: "Массив.Добавить".to_string(),
                syntax: "Добавить(<Значение>)".to_string()
            }]
        );

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["categories"]["objects"], 2);
    }
}
