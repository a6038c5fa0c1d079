/*!
# Context Search

Поиск по сгенерированному контексту. [`ContextIndex`] загружается из любого
артефакта конвейера: оптимизированного документа (`items` + `search`),
полного контекста (`context_items`) или набора записей (`records`).

Индекс только читает данные; результаты всегда в исходном порядке элементов.
*/

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use crate::converters::{ContextDocument, OptimizedDocument, SearchMap};
use crate::core::{read_text_file, HelpParserError, HelpResult};
use crate::docs_integration::record::{Category, RecordSet};

/// Общий вид элемента для поиска
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedItem {
    pub id: String,
    pub title: String,
    pub category: Category,
    pub syntax: String,
    pub description: String,
    pub availability: Vec<String>,
    pub version: String,
}

/// Формат загруженного артефакта
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Optimized,
    Context,
    Records,
}

/// Поисковый индекс по контексту
#[derive(Debug, Clone)]
pub struct ContextIndex {
    format: SourceFormat,
    items: Vec<IndexedItem>,
    positions: HashMap<String, usize>,
    search: Option<SearchMap>,
}

impl ContextIndex {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> HelpResult<Self> {
        let path = path.as_ref();
        let content = read_text_file(path).map_err(|e| {
            HelpParserError::InvalidInput(format!("cannot read {}: {}", path.display(), e))
        })?;
        let index = Self::from_json(&content)?;
        tracing::info!(
            "Loaded {} items from {} ({:?})",
            index.len(),
            path.display(),
            index.format
        );
        Ok(index)
    }

    /// Определяет формат по ключам верхнего уровня
    pub fn from_json(json: &str) -> HelpResult<Self> {
        let value: Value = serde_json::from_str(json)?;

        if value.get("items").is_some() {
            let doc = OptimizedDocument::deserialize(value)?;
            Ok(Self::from_optimized(doc))
        } else if value.get("context_items").is_some() {
            let doc = ContextDocument::deserialize(value)?;
            Ok(Self::from_context(doc))
        } else if value.get("records").is_some() {
            let set = RecordSet::deserialize(value)?;
            set.validate()?;
            Ok(Self::from_records(set))
        } else {
            Err(HelpParserError::InvalidInput(
                "expected 'items', 'context_items' or 'records' at the top level".to_string(),
            ))
        }
    }

    pub fn from_optimized(doc: OptimizedDocument) -> Self {
        let items = doc
            .items
            .into_iter()
            .map(|item| IndexedItem {
                id: item.id,
                title: item.title,
                category: item.category,
                syntax: item.syntax,
                description: item.description,
                availability: item.availability,
                version: item.version,
            })
            .collect();
        Self::build(SourceFormat::Optimized, items, Some(doc.search))
    }

    pub fn from_context(doc: ContextDocument) -> Self {
        let items = doc
            .context_items
            .into_iter()
            .map(|item| IndexedItem {
                id: item.id,
                title: item.title,
                category: item.category,
                syntax: item.metadata.syntax,
                description: item.metadata.description,
                availability: item.metadata.availability,
                version: item.metadata.version,
            })
            .collect();
        Self::build(SourceFormat::Context, items, None)
    }

    pub fn from_records(set: RecordSet) -> Self {
        let items = set
            .records
            .into_iter()
            .map(|r| IndexedItem {
                id: r.id,
                title: r.title,
                category: r.category,
                syntax: r.syntax,
                description: r.description,
                availability: r.availability,
                version: r.version,
            })
            .collect();
        Self::build(SourceFormat::Records, items, None)
    }

    fn build(format: SourceFormat, items: Vec<IndexedItem>, search: Option<SearchMap>) -> Self {
        let positions = items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.id.clone(), i))
            .collect();
        Self {
            format,
            items,
            positions,
            search,
        }
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[IndexedItem] {
        &self.items
    }

    pub fn has_search_map(&self) -> bool {
        self.search.is_some()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&IndexedItem> {
        self.positions.get(id).map(|&i| &self.items[i])
    }

    /// Поиск по ключевому слову: сначала поисковая карта, затем подстрока в заголовке и описании
    pub fn search_by_keyword(&self, term: &str) -> Vec<&IndexedItem> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Vec::new();
        }

        if let Some(ids) = self.search.as_ref().and_then(|map| map.get(&term)) {
            let mut positions: Vec<usize> = ids
                .iter()
                .filter_map(|id| self.positions.get(id).copied())
                .collect();
            positions.sort_unstable();
            positions.dedup();
            return positions.into_iter().map(|i| &self.items[i]).collect();
        }

        self.items
            .iter()
            .filter(|item| {
                item.title.to_lowercase().contains(&term)
                    || item.description.to_lowercase().contains(&term)
            })
            .collect()
    }

    /// Подстрока без учета регистра в заголовке, синтаксисе или описании
    pub fn find_by_pattern(&self, pattern: &str) -> Vec<&IndexedItem> {
        let pattern = pattern.trim().to_lowercase();
        if pattern.is_empty() {
            return Vec::new();
        }
        self.items
            .iter()
            .filter(|item| {
                [&item.title, &item.syntax, &item.description]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&pattern))
            })
            .collect()
    }

    pub fn search_by_category(&self, category: Category) -> Vec<&IndexedItem> {
        self.items.iter().filter(|i| i.category == category).collect()
    }

    /// Точное совпадение тега доступности без учета регистра
    pub fn search_by_availability(&self, tag: &str) -> Vec<&IndexedItem> {
        let tag = tag.trim().to_lowercase();
        self.items
            .iter()
            .filter(|item| item.availability.iter().any(|a| a.to_lowercase() == tag))
            .collect()
    }

    pub fn search_by_version(&self, fragment: &str) -> Vec<&IndexedItem> {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return Vec::new();
        }
        self.items
            .iter()
            .filter(|item| item.version.contains(fragment))
            .collect()
    }

    /// Количество элементов по категориям в каноническом порядке
    pub fn category_counts(&self) -> Vec<(Category, usize)> {
        Category::ALL
            .into_iter()
            .map(|c| (c, self.items.iter().filter(|i| i.category == c).count()))
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::converters::{ContextConverter, OptimizedContextConverter};
    use crate::core::RunSummary;
    use crate::docs_integration::record::DocumentationRecord;
    use pretty_assertions::assert_eq;

    fn record(id: &str, title: &str, category: Category, description: &str) -> DocumentationRecord {
        DocumentationRecord {
            id: id.to_string(),
            title: title.to_string(),
            category,
            syntax: String::new(),
            syntax_variants: Vec::new(),
            description: description.to_string(),
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

    fn records() -> Vec<DocumentationRecord> {
        let mut message = record(
            "functions_0",
            "Сообщить",
            Category::Functions,
            "Выводит сообщение пользователю.",
        );
        message.availability = vec!["Тонкий клиент".to_string(), "Сервер".to_string()];
        message.version = "8.0".to_string();

        let mut add = record("methods_1", "Массив.Добавить", Category::Methods, "Добавляет элемент.");
        add.availability = vec!["Сервер".to_string()];
        add.version = "8.3.7".to_string();

        vec![
            message,
            add,
            record("objects_2", "Массив", Category::Objects, "Коллекция значений."),
        ]
    }

    fn ids(items: Vec<&IndexedItem>) -> Vec<&str> {
        items.into_iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn test_optimized_document_uses_search_map() {
        let doc = OptimizedContextConverter::new(&PipelineConfig::default()).convert(&records());
        let json = serde_json::to_string(&doc).unwrap();
        let index = ContextIndex::from_json(&json).unwrap();

        assert_eq!(index.format(), SourceFormat::Optimized);
        assert!(index.has_search_map());
        assert_eq!(ids(index.search_by_keyword("СЕРВЕР")), vec!["functions_0", "methods_1"]);
        assert_eq!(ids(index.search_by_keyword("массив")), vec!["methods_1", "objects_2"]);
        // нет ключа в карте: поиск по подстроке
        assert_eq!(ids(index.search_by_keyword("ссив.доб")), vec!["methods_1"]);
    }

    #[test]
    fn test_context_document_falls_back_to_substring() {
        let doc = ContextConverter::new(&PipelineConfig::default()).convert(&records());
        let json = serde_json::to_string(&doc).unwrap();
        let index = ContextIndex::from_json(&json).unwrap();

        assert_eq!(index.format(), SourceFormat::Context);
        assert!(!index.has_search_map());
        assert_eq!(ids(index.search_by_keyword("коллекция")), vec!["objects_2"]);
    }

    #[test]
    fn test_find_by_pattern_checks_syntax() {
        let mut records = records();
        records[1].syntax = "Добавить(<Значение>)".to_string();
        let index = ContextIndex::from_records(RecordSet::new("test", records, RunSummary::new()));

        assert_eq!(ids(index.find_by_pattern("<значение>")), vec!["methods_1"]);
        assert_eq!(ids(index.find_by_pattern("МАССИВ")), vec!["methods_1", "objects_2"]);
        assert_eq!(ids(index.find_by_pattern("пользователю")), vec!["functions_0"]);
        assert!(index.find_by_pattern("").is_empty());
    }

    #[test]
    fn test_filters() {
        let set = RecordSet::new("test", records(), RunSummary::new());
        let index = ContextIndex::from_json(&serde_json::to_string(&set).unwrap()).unwrap();

        assert_eq!(index.format(), SourceFormat::Records);
        assert_eq!(ids(index.search_by_category(Category::Methods)), vec!["methods_1"]);
        assert_eq!(
            ids(index.search_by_availability("тонкий клиент")),
            vec!["functions_0"]
        );
        assert!(index.search_by_availability("клиент").is_empty());
        assert_eq!(ids(index.search_by_version("8.3")), vec!["methods_1"]);
        assert_eq!(index.find_by_id("objects_2").unwrap().title, "Массив");
        assert!(index.find_by_id("objects_9").is_none());
        assert!(index.search_by_keyword("   ").is_empty());
        assert_eq!(
            index.category_counts(),
            vec![
                (Category::Objects, 1),
                (Category::Methods, 1),
                (Category::Functions, 1)
            ]
        );
    }

    #[test]
    fn test_unknown_document_is_rejected() {
        assert!(matches!(
            ContextIndex::from_json("{\"foo\": []}"),
            Err(HelpParserError::InvalidInput(_))
        ));
    }
}
