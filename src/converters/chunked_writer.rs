/*!
# Chunked Writer for BSL Syntax Documentation

Модуль для записи документации BSL в разбитые файлы, пригодные для
поисковых инструментов и загрузки по частям.

## Основные возможности
- Разбиение по категориям и жадное накопление элементов в файлы с лимитами
  по количеству элементов и размеру компактного JSON
- Индекс каждой категории с диапазонами и списками id
- Главный индекс `main_index.json` с итоговой статистикой
- Режим `optimized_split`: отбор приоритетных элементов с лимитами по категориям
- Проверка записанных файлов ([`validate_export`])

## Структура вывода

```text
out/
  main_index.json
  methods/
    methods_index.json
    methods_001.json
    methods_002.json
  objects/
    ...
```
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::context_converter::ContextItem;
use super::optimized_context_converter::OptimizedItem;
use crate::config::PipelineConfig;
use crate::core::{write_json_file, HelpParserError, HelpResult};
use crate::docs_integration::record::{Category, DocumentationRecord};

/// Порог строк для проверки экспорта
pub const MAX_LINES_PER_FILE: usize = 500;

/// Режим экспорта
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    /// Все элементы
    MaxSplit,
    /// Только приоритетные элементы с лимитами по категориям
    OptimizedSplit,
}

impl SplitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitMode::MaxSplit => "max_split",
            SplitMode::OptimizedSplit => "optimized_split",
        }
    }
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitMode {
    type Err = HelpParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "max" | "max_split" => Ok(SplitMode::MaxSplit),
            "optimized" | "optimized_split" => Ok(SplitMode::OptimizedSplit),
            other => Err(HelpParserError::InvalidInput(format!(
                "unknown split mode '{}'",
                other
            ))),
        }
    }
}

/// Настройки для разбиения файлов
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkSettings {
    /// Максимальный размер файла в килобайтах
    pub max_file_size_kb: usize,
    /// Максимальное количество элементов в файле
    pub max_items_per_file: usize,
    /// Режим экспорта
    pub mode: SplitMode,
    /// Префикс имен chunk-файлов
    #[serde(default)]
    pub file_prefix: String,
    #[serde(skip)]
    pub verbose: bool,
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self {
            max_file_size_kb: 50,
            max_items_per_file: 50,
            mode: SplitMode::MaxSplit,
            file_prefix: String::new(),
            verbose: false,
        }
    }
}

impl ChunkSettings {
    /// Настройки из конфигурации; в оптимизированном режиме файлы получают префикс `optimized_`
    pub fn from_config(config: &PipelineConfig, mode: SplitMode) -> Self {
        Self {
            max_file_size_kb: config.max_file_size_kb,
            max_items_per_file: config.max_items_per_file,
            mode,
            file_prefix: match mode {
                SplitMode::MaxSplit => String::new(),
                SplitMode::OptimizedSplit => "optimized_".to_string(),
            },
            verbose: config.verbose,
        }
    }

    fn max_bytes(&self) -> usize {
        self.max_file_size_kb * 1024
    }
}

/// Элемент, который можно разложить по chunk-файлам
pub trait ChunkItem: Serialize {
    fn item_id(&self) -> &str;
    fn item_category(&self) -> Category;

    /// Важность элемента для режима `optimized_split`
    fn priority_score(&self) -> u32;
}

/// Признаки элемента, из которых складывается приоритет
struct PriorityFeatures {
    category: Category,
    has_syntax: bool,
    has_parameters: bool,
    has_example: bool,
    methods: usize,
    content_chars: usize,
}

impl PriorityFeatures {
    fn score(&self) -> u32 {
        let mut score = 0;
        if matches!(self.category, Category::Methods | Category::Functions) {
            score += 100;
        }
        if self.has_syntax {
            score += 50;
        }
        if self.has_parameters {
            score += 30;
        }
        if self.has_example {
            score += 20;
        }
        score += self.methods as u32 * 10;
        if self.content_chars > 50 {
            score += 10;
        }
        score
    }
}

impl ChunkItem for DocumentationRecord {
    fn item_id(&self) -> &str {
        &self.id
    }

    fn item_category(&self) -> Category {
        self.category
    }

    fn priority_score(&self) -> u32 {
        PriorityFeatures {
            category: self.category,
            has_syntax: !self.syntax.is_empty() || !self.syntax_variants.is_empty(),
            has_parameters: !self.parameters.is_empty() || !self.parameters_by_variant.is_empty(),
            has_example: !self.example.is_empty(),
            methods: self.methods.len(),
            content_chars: self.description.chars().count(),
        }
        .score()
    }
}

impl ChunkItem for ContextItem {
    fn item_id(&self) -> &str {
        &self.id
    }

    fn item_category(&self) -> Category {
        self.category
    }

    fn priority_score(&self) -> u32 {
        let meta = &self.metadata;
        PriorityFeatures {
            category: self.category,
            has_syntax: !meta.syntax.is_empty() || !meta.syntax_variants.is_empty(),
            has_parameters: !meta.parameters.is_empty() || !meta.parameters_by_variant.is_empty(),
            has_example: !meta.example.is_empty(),
            methods: meta.methods.len(),
            content_chars: self.content.chars().count(),
        }
        .score()
    }
}

impl ChunkItem for OptimizedItem {
    fn item_id(&self) -> &str {
        &self.id
    }

    fn item_category(&self) -> Category {
        self.category
    }

    fn priority_score(&self) -> u32 {
        PriorityFeatures {
            category: self.category,
            has_syntax: !self.syntax.is_empty(),
            has_parameters: !self.parameters.is_empty(),
            has_example: !self.example.is_empty(),
            methods: 0,
            content_chars: self.description.chars().count(),
        }
        .score()
    }
}

/// Лимит элементов категории в режиме `optimized_split`
pub fn optimized_limit(category: Category) -> usize {
    match category {
        Category::Methods => 200,
        Category::Functions => 300,
        Category::Operators => 50,
        Category::Objects => 500,
        Category::Properties => 200,
    }
}

/// Chunk файла с элементами
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkFile<T> {
    pub items: Vec<T>,
    pub metadata: ChunkMetadata,
}

/// Метаданные chunk'а
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub category: Category,
    pub chunk: usize,
    pub total_chunks: usize,
    pub items_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Информация о категории в главном индексе
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub items_count: usize,
    pub chunks_count: usize,
    pub files: Vec<String>,
}

/// Главный индекс
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainIndex {
    pub total_items: usize,
    pub categories: BTreeMap<Category, CategoryInfo>,
    pub created_at: DateTime<Utc>,
    pub mode: SplitMode,
    pub settings: ChunkSettings,
}

/// Индекс категории
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryIndex {
    pub category: Category,
    pub total_items: usize,
    pub total_chunks: usize,
    pub chunks: Vec<ChunkInfo>,
    pub created_at: DateTime<Utc>,
}

/// Информация о chunk'е в индексе
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkInfo {
    pub chunk_number: usize,
    pub filename: String,
    pub items_count: usize,
    pub first_item_id: String,
    pub last_item_id: String,
    #[serde(default)]
    pub item_ids: Vec<String>,
    pub size_kb: f64,
}

pub fn category_index_filename(category: Category) -> String {
    format!("{}_index.json", category)
}

pub const MAIN_INDEX_FILENAME: &str = "main_index.json";

/// Writer для разбитых файлов синтаксиса
pub struct ChunkedSyntaxWriter<T: ChunkItem> {
    output_dir: PathBuf,
    settings: ChunkSettings,
    category_items: BTreeMap<Category, Vec<T>>,
}

impl<T: ChunkItem> ChunkedSyntaxWriter<T> {
    /// Создает новый writer
    pub fn new<P: AsRef<Path>>(output_dir: P, settings: ChunkSettings) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            settings,
            category_items: BTreeMap::new(),
        }
    }

    pub fn settings(&self) -> &ChunkSettings {
        &self.settings
    }

    /// Добавляет элемент в буфер его категории
    pub fn add_item(&mut self, item: T) {
        self.category_items
            .entry(item.item_category())
            .or_default()
            .push(item);
    }

    pub fn add_items<I: IntoIterator<Item = T>>(&mut self, items: I) {
        for item in items {
            self.add_item(item);
        }
    }

    pub fn total_items(&self) -> usize {
        self.category_items.values().map(Vec::len).sum()
    }

    /// Записывает все накопленные данные и возвращает главный индекс
    pub fn write_all(&self) -> HelpResult<MainIndex> {
        self.write_all_at(Utc::now())
    }

    pub fn write_all_at(&self, created_at: DateTime<Utc>) -> HelpResult<MainIndex> {
        info!(
            "Writing chunked syntax data to: {} ({})",
            self.output_dir.display(),
            self.settings.mode
        );

        let mut categories = BTreeMap::new();
        for category in Category::ALL {
            let items = match self.category_items.get(&category) {
                Some(items) if !items.is_empty() => items,
                _ => continue,
            };

            let selected = self.select_items(category, items);
            if selected.is_empty() {
                continue;
            }
            let info = self.write_category(category, &selected, created_at)?;
            categories.insert(category, info);
        }

        let main_index = MainIndex {
            total_items: categories.values().map(|c| c.items_count).sum(),
            categories,
            created_at,
            mode: self.settings.mode,
            settings: self.settings.clone(),
        };

        write_json_file(&self.output_dir.join(MAIN_INDEX_FILENAME), &main_index)?;

        let files: usize = main_index.categories.values().map(|c| c.chunks_count).sum();
        info!(
            "Main index written with {} total items in {} files",
            main_index.total_items, files
        );
        Ok(main_index)
    }

    /// Элементы категории, которые попадут в вывод, в исходном порядке
    fn select_items<'a>(&self, category: Category, items: &'a [T]) -> Vec<&'a T> {
        match self.settings.mode {
            SplitMode::MaxSplit => items.iter().collect(),
            SplitMode::OptimizedSplit => {
                let limit = optimized_limit(category);
                let mut ranked: Vec<(usize, u32)> = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| (i, item.priority_score()))
                    .collect();
                // стабильная сортировка: при равном приоритете раньше идет более ранний элемент
                ranked.sort_by(|a, b| b.1.cmp(&a.1));
                ranked.truncate(limit);

                let mut positions: Vec<usize> = ranked.into_iter().map(|(i, _)| i).collect();
                positions.sort_unstable();

                debug!(
                    "{}: selected {} of {} items",
                    category,
                    positions.len(),
                    items.len()
                );
                positions.into_iter().map(|i| &items[i]).collect()
            }
        }
    }

    /// Записывает все элементы категории
    fn write_category(
        &self,
        category: Category,
        items: &[&T],
        created_at: DateTime<Utc>,
    ) -> HelpResult<CategoryInfo> {
        let category_dir = self.output_dir.join(category.as_str());
        let mut chunks = Vec::new();
        let mut files = Vec::new();

        let chunked_items = self.chunk_items(items)?;
        let total_chunks = chunked_items.len();

        for (chunk_idx, chunk_items) in chunked_items.into_iter().enumerate() {
            let chunk_num = chunk_idx + 1;
            let filename = format!("{}{}_{:03}.json", self.settings.file_prefix, category, chunk_num);
            let filepath = category_dir.join(&filename);
            let item_ids: Vec<String> = chunk_items
                .iter()
                .map(|item| item.item_id().to_string())
                .collect();

            let chunk_file = ChunkFile {
                metadata: ChunkMetadata {
                    category,
                    chunk: chunk_num,
                    total_chunks,
                    items_count: chunk_items.len(),
                    created_at,
                },
                items: chunk_items,
            };

            let size = write_json_file(&filepath, &chunk_file)?;
            if self.settings.verbose {
                info!("Wrote {} ({} items)", filepath.display(), item_ids.len());
            }

            chunks.push(ChunkInfo {
                chunk_number: chunk_num,
                filename: filename.clone(),
                items_count: item_ids.len(),
                first_item_id: item_ids.first().cloned().unwrap_or_default(),
                last_item_id: item_ids.last().cloned().unwrap_or_default(),
                item_ids,
                size_kb: size as f64 / 1024.0,
            });
            files.push(filename);
        }

        let category_index = CategoryIndex {
            category,
            total_items: items.len(),
            total_chunks,
            chunks,
            created_at,
        };
        write_json_file(
            &category_dir.join(category_index_filename(category)),
            &category_index,
        )?;

        Ok(CategoryInfo {
            items_count: items.len(),
            chunks_count: files.len(),
            files,
        })
    }

    /// Разбивает элементы на chunk'и
    fn chunk_items<'a>(&self, items: &[&'a T]) -> HelpResult<Vec<Vec<&'a T>>> {
        let max_bytes = self.settings.max_bytes();
        let mut chunks = Vec::new();
        let mut current_chunk: Vec<&'a T> = Vec::new();
        let mut current_size = 0;

        for &item in items {
            // Размер элемента оцениваем по компактному JSON
            let item_size = serde_json::to_vec(item)?.len();
            if item_size > max_bytes {
                debug!(
                    "Item {} is {} bytes, larger than the {} KB limit; writing it alone",
                    item.item_id(),
                    item_size,
                    self.settings.max_file_size_kb
                );
            }

            if !current_chunk.is_empty()
                && (current_chunk.len() >= self.settings.max_items_per_file
                    || current_size + item_size > max_bytes)
            {
                chunks.push(std::mem::take(&mut current_chunk));
                current_size = 0;
            }

            current_chunk.push(item);
            current_size += item_size;
        }

        if !current_chunk.is_empty() {
            chunks.push(current_chunk);
        }

        Ok(chunks)
    }
}

/// Вид превышения лимита
#[derive(Debug, Clone, PartialEq)]
pub enum WarningKind {
    Size { size_kb: f64 },
    Lines { lines: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportWarning {
    /// Имя каталога категории
    pub category: String,
    pub path: PathBuf,
    pub kind: WarningKind,
}

/// Результат проверки экспорта
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportReport {
    pub total_files: usize,
    pub valid_files: usize,
    pub warnings: Vec<ExportWarning>,
}

impl ExportReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Предупреждения, сгруппированные по категориям
    pub fn grouped(&self) -> BTreeMap<&str, Vec<&ExportWarning>> {
        let mut groups: BTreeMap<&str, Vec<&ExportWarning>> = BTreeMap::new();
        for warning in &self.warnings {
            groups.entry(warning.category.as_str()).or_default().push(warning);
        }
        groups
    }
}

/// Проверяет записанные chunk-файлы на превышение размера и количества строк
pub fn validate_export<P: AsRef<Path>>(output_dir: P, max_file_size_kb: usize) -> HelpResult<ExportReport> {
    let output_dir = output_dir.as_ref();
    let mut report = ExportReport::default();

    for entry in WalkDir::new(output_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            HelpParserError::InvalidInput(format!("cannot walk {}: {}", output_dir.display(), e))
        })?;
        let name = entry.file_name().to_string_lossy();
        if !entry.file_type().is_file() || !name.ends_with(".json") || name.ends_with("_index.json")
        {
            continue;
        }

        let path = entry.path();
        let content = std::fs::read_to_string(path).map_err(|e| {
            HelpParserError::InvalidInput(format!("cannot read {}: {}", path.display(), e))
        })?;
        let size_kb = content.len() as f64 / 1024.0;
        let lines = content.lines().count();
        let category = path
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        report.total_files += 1;
        let kind = if size_kb > max_file_size_kb as f64 {
            WarningKind::Size { size_kb }
        } else if lines > MAX_LINES_PER_FILE {
            WarningKind::Lines { lines }
        } else {
            report.valid_files += 1;
            continue;
        };

        warn!("{} exceeds export limits: {:?}", path.display(), kind);
        report.warnings.push(ExportWarning {
            category,
            path: path.to_path_buf(),
            kind,
        });
    }

    info!(
        "Export validation: {} files, {} valid, {} warnings",
        report.total_files,
        report.valid_files,
        report.warnings.len()
    );
    Ok(report)
}
