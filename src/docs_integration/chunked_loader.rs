/*!
# Chunked Documentation Loader

Модуль для загрузки документации из разбитых JSON файлов, записанных
[`ChunkedSyntaxWriter`](crate::converters::ChunkedSyntaxWriter).

Читает `main_index.json` и индексы категорий, строит карту
`id -> chunk-файл` и при запросе элемента загружает только его chunk.
Элементы возвращаются как `serde_json::Value`: в chunk'ах могут лежать
записи, элементы контекста или оптимизированные элементы.
*/

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use super::record::Category;
use crate::converters::chunked_writer::{
    category_index_filename, CategoryIndex, CategoryInfo, ChunkFile, MainIndex,
    MAIN_INDEX_FILENAME,
};
use crate::converters::SplitMode;
use crate::core::read_json_file;

/// Загрузчик chunked документации
pub struct ChunkedDocsLoader {
    docs_dir: PathBuf,
    index_cache: Option<MainIndexCache>,
}

/// Кэш главного индекса
#[derive(Debug, Clone)]
struct MainIndexCache {
    total_items: usize,
    mode: SplitMode,
    categories: BTreeMap<Category, CategoryInfo>,
    item_index: HashMap<String, ItemLocation>,
}

/// Местоположение элемента
#[derive(Debug, Clone, PartialEq)]
pub struct ItemLocation {
    pub category: Category,
    pub file: String,
}

/// Минимальный вид элемента chunk'а для построения индекса
#[derive(Debug, Deserialize)]
struct ItemHeader {
    id: String,
}

impl ChunkedDocsLoader {
    /// Создает новый загрузчик
    pub fn new<P: AsRef<Path>>(docs_dir: P) -> Self {
        Self {
            docs_dir: docs_dir.as_ref().to_path_buf(),
            index_cache: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.index_cache.is_some()
    }

    /// Загружает главный индекс и индексы категорий
    pub fn load_index(&mut self) -> Result<()> {
        let index_path = self.docs_dir.join(MAIN_INDEX_FILENAME);
        let main_index: MainIndex = read_json_file(&index_path)
            .with_context(|| format!("Failed to load {}", index_path.display()))?;

        let mut item_index = HashMap::new();
        for (category, info) in &main_index.categories {
            self.index_category(*category, info, &mut item_index)?;
        }

        tracing::debug!(
            "Loaded chunk index from {}: {} items",
            self.docs_dir.display(),
            item_index.len()
        );

        self.index_cache = Some(MainIndexCache {
            total_items: main_index.total_items,
            mode: main_index.mode,
            categories: main_index.categories,
            item_index,
        });

        Ok(())
    }

    fn index_category(
        &self,
        category: Category,
        info: &CategoryInfo,
        item_index: &mut HashMap<String, ItemLocation>,
    ) -> Result<()> {
        let category_dir = self.docs_dir.join(category.as_str());
        let index_path = category_dir.join(category_index_filename(category));
        let category_index: CategoryIndex = read_json_file(&index_path)
            .with_context(|| format!("Failed to load {}", index_path.display()))?;

        for chunk in &category_index.chunks {
            let ids = if chunk.item_ids.is_empty() {
                // индекс без списка id: читаем сам chunk
                let chunk_path = category_dir.join(&chunk.filename);
                let data: ChunkFile<ItemHeader> = read_json_file(&chunk_path)
                    .with_context(|| format!("Failed to load {}", chunk_path.display()))?;
                data.items.into_iter().map(|item| item.id).collect()
            } else {
                chunk.item_ids.clone()
            };

            for id in ids {
                item_index.insert(
                    id,
                    ItemLocation {
                        category,
                        file: chunk.filename.clone(),
                    },
                );
            }
        }

        if category_index.total_items != info.items_count {
            tracing::warn!(
                "{}: main index lists {} items, category index {}",
                category,
                info.items_count,
                category_index.total_items
            );
        }
        Ok(())
    }

    fn cache(&self) -> Result<&MainIndexCache> {
        self.index_cache.as_ref().context("Index not loaded")
    }

    fn read_chunk(&self, category: Category, file: &str) -> Result<Vec<Value>> {
        let path = self.docs_dir.join(category.as_str()).join(file);
        let chunk: ChunkFile<Value> = read_json_file(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        Ok(chunk.items)
    }

    pub fn locate(&self, item_id: &str) -> Result<Option<ItemLocation>> {
        Ok(self.cache()?.item_index.get(item_id).cloned())
    }

    /// Получает элемент по ID, загружая только его chunk
    pub fn get_item(&self, item_id: &str) -> Result<Option<Value>> {
        let location = match self.cache()?.item_index.get(item_id) {
            Some(location) => location,
            None => return Ok(None),
        };

        let items = self.read_chunk(location.category, &location.file)?;
        Ok(items
            .into_iter()
            .find(|item| item.get("id").and_then(Value::as_str) == Some(item_id)))
    }

    /// Ищет элементы по имени объекта (часть заголовка до точки или скобки)
    pub fn find_by_object(&self, object_name: &str) -> Result<Vec<Value>> {
        let cache = self.cache()?;
        let mut matches = Vec::new();
        for (category, info) in &cache.categories {
            for file in &info.files {
                for item in self.read_chunk(*category, file)? {
                    let title = item.get("title").and_then(Value::as_str).unwrap_or("");
                    if extract_object_name(title) == object_name {
                        matches.push(item);
                    }
                }
            }
        }
        Ok(matches)
    }

    /// Получает все элементы категории в порядке записи
    pub fn get_category_items(&self, category: Category) -> Result<Vec<Value>> {
        let cache = self.cache()?;
        let mut items = Vec::new();

        if let Some(cat_info) = cache.categories.get(&category) {
            for file_name in &cat_info.files {
                items.extend(self.read_chunk(category, file_name)?);
            }
        }

        Ok(items)
    }

    /// Получает статистику
    pub fn get_statistics(&self) -> Result<DocumentationStats> {
        let cache = self.cache()?;

        let categories = cache
            .categories
            .iter()
            .map(|(category, info)| {
                (
                    *category,
                    CategoryStats {
                        items_count: info.items_count,
                        files_count: info.files.len(),
                    },
                )
            })
            .collect();

        Ok(DocumentationStats {
            total_items: cache.total_items,
            indexed_items: cache.item_index.len(),
            mode: cache.mode,
            categories,
        })
    }
}

/// Статистика документации
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentationStats {
    pub total_items: usize,
    pub indexed_items: usize,
    pub mode: SplitMode,
    pub categories: BTreeMap<Category, CategoryStats>,
}

/// Статистика категории
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStats {
    pub items_count: usize,
    pub files_count: usize,
}

/// Извлекает имя объекта из заголовка
pub fn extract_object_name(title: &str) -> &str {
    // Примеры:
    // "ДинамическийСписок.АвтоЗаполнениеДоступныхПолей (DynamicList.AutoFillAvailableFields)"
    // "СоединитьСтроки (StrConcat)"
    if let Some(dot_pos) = title.find('.') {
        &title[..dot_pos]
    } else if let Some(paren_pos) = title.find(" (") {
        &title[..paren_pos]
    } else {
        title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::{ChunkSettings, ChunkedSyntaxWriter};
    use crate::docs_integration::record::DocumentationRecord;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

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

    fn write_fixture(dir: &Path) {
        let settings = ChunkSettings {
            max_items_per_file: 2,
            ..ChunkSettings::default()
        };
        let mut writer = ChunkedSyntaxWriter::new(dir, settings);
        writer.add_items(vec![
            record("objects_0", "Массив", Category::Objects),
            record("methods_1", "Массив.Добавить", Category::Methods),
            record("methods_2", "Массив.Вставить", Category::Methods),
            record("methods_3", "Массив.Очистить", Category::Methods),
        ]);
        writer.write_all().unwrap();
    }

    #[test]
    fn test_get_item_loads_its_chunk() {
        let temp_dir = TempDir::new().unwrap();
        write_fixture(temp_dir.path());

        let mut loader = ChunkedDocsLoader::new(temp_dir.path());
        assert!(loader.get_item("methods_1").is_err());
        loader.load_index().unwrap();

        let item = loader.get_item("methods_3").unwrap().unwrap();
        assert_eq!(item["title"], "Массив.Очистить");
        assert_eq!(
            loader.locate("methods_3").unwrap(),
            Some(ItemLocation {
                category: Category::Methods,
                file: "methods_002.json".to_string()
            })
        );
        assert!(loader.get_item("missing_9").unwrap().is_none());
    }

    #[test]
    fn test_category_items_and_statistics() {
        let temp_dir = TempDir::new().unwrap();
        write_fixture(temp_dir.path());
        let mut loader = ChunkedDocsLoader::new(temp_dir.path());
        loader.load_index().unwrap();

        let methods = loader.get_category_items(Category::Methods).unwrap();
        let ids: Vec<&str> = methods.iter().filter_map(|m| m["id"].as_str()).collect();
        assert_eq!(ids, vec!["methods_1", "methods_2", "methods_3"]);
        assert!(loader.get_category_items(Category::Operators).unwrap().is_empty());

        let stats = loader.get_statistics().unwrap();
        assert_eq!(stats.total_items, 4);
        assert_eq!(stats.indexed_items, 4);
        assert_eq!(stats.categories[&Category::Methods].files_count, 2);
        assert_eq!(stats.mode, SplitMode::MaxSplit);

        assert_eq!(loader.find_by_object("Массив").unwrap().len(), 4);
    }

    #[test]
    fn test_extract_object_name() {
        assert_eq!(
            extract_object_name(
                "ДинамическийСписок.АвтоЗаполнениеДоступныхПолей (DynamicList.AutoFillAvailableFields)"
            ),
            "ДинамическийСписок"
        );
        assert_eq!(extract_object_name("СоединитьСтроки (StrConcat)"), "СоединитьСтроки");
        assert_eq!(extract_object_name("Массив"), "Массив");
    }
}
