/*!
# HBK Archive Parser

Парсер архивов документации 1С (.hbk файлы, ZIP-контейнер с HTML).

Основные возможности:
- Открытие архива и перечисление записей в порядке архива
- Декодирование содержимого (UTF-8, с откатом на Windows-1251)
- Анализ структуры архива: типы записей, категории, крупные файлы
- Кэширование содержимого файлов

## Использование

```rust,ignore
let mut parser = HbkArchiveParser::new("1C_Help.hbk");
parser.open_archive()?;
let structure = parser.analyze_structure(5)?;
let samples = parser.extract_sample_files(5)?;
```
*/

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::ZipArchive;

use super::extraction_rules::{HelpPage, RuleSet};
use super::record::LinkInfo;
use crate::core::{HelpParserError, HelpResult};

/// Файлы больше этого размера попадают в список крупных
const LARGE_FILE_THRESHOLD: u64 = 10 * 1024;
const LARGEST_FILES_LIMIT: usize = 10;

/// Вид записи архива
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// HTML-страница документации
    Html,
    /// Служебный файл: оглавление (.st), стили, скрипты, картинки, индексы
    Metadata,
    Other,
}

impl EntryKind {
    /// Классификация записи по пути и расширению
    pub fn classify(name: &str) -> Self {
        if name.ends_with('/') {
            return EntryKind::Other;
        }
        let file_name = name.rsplit('/').next().unwrap_or(name);
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match extension.as_deref() {
            Some("html") | Some("htm") => EntryKind::Html,
            Some("st") | Some("xml") | Some("json") | Some("css") | Some("js") | Some("png")
            | Some("jpg") | Some("jpeg") | Some("gif") | Some("bmp") | Some("ico")
            | Some("svg") => EntryKind::Metadata,
            None => EntryKind::Metadata,
            Some(_) => EntryKind::Other,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Html => write!(f, "html"),
            EntryKind::Metadata => write!(f, "metadata"),
            EntryKind::Other => write!(f, "other"),
        }
    }
}

/// Структура для хранения распарсенного HTML контента (образцы для просмотра)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtmlContent {
    pub title: String,
    pub syntax: String,
    pub description: String,
    pub example: String,
    pub links: Vec<LinkInfo>,
    pub filename: String,
}

/// Результат анализа архива
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveStructure {
    pub total_files: usize,
    pub html_files: usize,
    pub st_files: usize,
    pub entry_kinds: BTreeMap<EntryKind, usize>,
    /// Первые записи каждого вида
    pub samples: BTreeMap<EntryKind, Vec<String>>,
    pub file_types: BTreeMap<String, usize>,
    /// Количество записей по папке верхнего уровня
    pub categories: BTreeMap<String, usize>,
    pub largest_files: Vec<FileInfo>,
}

/// Информация о файле
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub compressed_size: u64,
}

/// Основной парсер HBK архивов
pub struct HbkArchiveParser {
    archive_path: PathBuf,
    archive: Option<ZipArchive<File>>,
    content_cache: HashMap<String, String>,
}

impl HbkArchiveParser {
    /// Создает новый парсер для HBK файла
    pub fn new<P: AsRef<Path>>(archive_path: P) -> Self {
        Self {
            archive_path: archive_path.as_ref().to_path_buf(),
            archive: None,
            content_cache: HashMap::new(),
        }
    }

    /// Открывает архив .hbk как ZIP
    pub fn open_archive(&mut self) -> HelpResult<()> {
        let file = File::open(&self.archive_path)
            .map_err(|e| HelpParserError::archive_open(&self.archive_path, e))?;
        let archive = ZipArchive::new(file).map_err(|e| {
            HelpParserError::archive_open(&self.archive_path, format!("not a valid ZIP archive: {}", e))
        })?;

        if archive.len() == 0 {
            return Err(HelpParserError::EmptyArchive(self.archive_path.clone()));
        }

        info!(
            "Opened archive {} ({} entries)",
            self.archive_path.display(),
            archive.len()
        );
        self.archive = Some(archive);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.archive.is_some()
    }

    fn archive_mut(&mut self) -> HelpResult<&mut ZipArchive<File>> {
        self.archive.as_mut().ok_or(HelpParserError::ArchiveNotOpened)
    }

    /// Возвращает список записей в порядке архива
    pub fn list_contents(&mut self) -> HelpResult<Vec<String>> {
        let archive = self.archive_mut()?;
        let mut names = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let file = archive.by_index_raw(i).map_err(|e| HelpParserError::EntryParse {
                entry: format!("#{}", i),
                reason: e.to_string(),
            })?;
            names.push(file.name().to_string());
        }
        Ok(names)
    }

    /// HTML-страницы в порядке архива
    pub fn html_entries(&mut self) -> HelpResult<Vec<String>> {
        Ok(self
            .list_contents()?
            .into_iter()
            .filter(|name| EntryKind::classify(name) == EntryKind::Html)
            .collect())
    }

    /// Извлекает содержимое файла из архива с кэшированием
    pub fn extract_file_content(&mut self, filename: &str) -> HelpResult<String> {
        if let Some(cached) = self.content_cache.get(filename) {
            return Ok(cached.clone());
        }

        let bytes = {
            let archive = self.archive_mut()?;
            let mut entry = archive
                .by_name(filename)
                .map_err(|e| HelpParserError::EntryParse {
                    entry: filename.to_string(),
                    reason: e.to_string(),
                })?;

            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut bytes)
                .map_err(|e| HelpParserError::EntryParse {
                    entry: filename.to_string(),
                    reason: e.to_string(),
                })?;
            bytes
        };

        let content = decode_help_text(&bytes);
        self.content_cache
            .insert(filename.to_string(), content.clone());
        Ok(content)
    }

    /// Анализирует структуру архива
    pub fn analyze_structure(&mut self, samples_per_kind: usize) -> HelpResult<ArchiveStructure> {
        let archive = self.archive_mut()?;

        let mut structure = ArchiveStructure {
            total_files: archive.len(),
            html_files: 0,
            st_files: 0,
            entry_kinds: BTreeMap::new(),
            samples: BTreeMap::new(),
            file_types: BTreeMap::new(),
            categories: BTreeMap::new(),
            largest_files: Vec::new(),
        };

        for i in 0..archive.len() {
            let file = archive.by_index_raw(i).map_err(|e| HelpParserError::EntryParse {
                entry: format!("#{}", i),
                reason: e.to_string(),
            })?;
            let filename = file.name().to_string();

            let kind = EntryKind::classify(&filename);
            *structure.entry_kinds.entry(kind).or_insert(0) += 1;
            let samples = structure.samples.entry(kind).or_default();
            if samples.len() < samples_per_kind {
                samples.push(filename.clone());
            }

            let ext = Path::new(&filename)
                .extension()
                .and_then(|s| s.to_str())
                .unwrap_or("")
                .to_lowercase();
            if ext == "html" || ext == "htm" {
                structure.html_files += 1;
            } else if ext == "st" {
                structure.st_files += 1;
            }
            *structure.file_types.entry(ext).or_insert(0) += 1;

            if let Some(category) = filename.split('/').next() {
                *structure
                    .categories
                    .entry(category.to_string())
                    .or_insert(0) += 1;
            }

            if file.size() > LARGE_FILE_THRESHOLD {
                structure.largest_files.push(FileInfo {
                    name: filename,
                    size: file.size(),
                    compressed_size: file.compressed_size(),
                });
            }
        }

        structure
            .largest_files
            .sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.name.cmp(&b.name)));
        structure.largest_files.truncate(LARGEST_FILES_LIMIT);

        info!(
            "Archive analyzed: {} total files, {} HTML files, {} .st files",
            structure.total_files, structure.html_files, structure.st_files
        );
        Ok(structure)
    }

    /// Извлекает и разбирает первые `count` HTML-страниц
    pub fn extract_sample_files(&mut self, count: usize) -> HelpResult<Vec<HtmlContent>> {
        let rules = RuleSet::standard();
        let mut samples = Vec::new();

        for filename in self.html_entries()?.into_iter().take(count) {
            let html = match self.extract_file_content(&filename) {
                Ok(html) => html,
                Err(e) => {
                    debug!("Skipping sample {}: {}", filename, e);
                    continue;
                }
            };
            samples.push(parse_html_content(&rules, &html, &filename));
        }

        Ok(samples)
    }

    pub fn cache_size(&self) -> usize {
        self.content_cache.len()
    }
}

/// Краткий разбор страницы для просмотра образцов
pub fn parse_html_content(rules: &RuleSet, html: &str, filename: &str) -> HtmlContent {
    let draft = rules.apply(&HelpPage::parse(html, filename));
    HtmlContent {
        title: draft.title.unwrap_or_default(),
        syntax: draft.syntax.unwrap_or_default(),
        description: draft.description.unwrap_or_default(),
        example: draft.example.unwrap_or_default(),
        links: draft.links,
        filename: filename.to_string(),
    }
}

/// Декодирует текст справки: UTF-8, иначе Windows-1251
pub fn decode_help_text(bytes: &[u8]) -> String {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (cow, _, _) = encoding_rs::WINDOWS_1251.decode(bytes);
            cow.into_owned()
        }
    };
    match text.strip_prefix('\u{FEFF}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}
