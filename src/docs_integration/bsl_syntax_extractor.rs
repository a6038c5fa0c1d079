/*!
# BSL Syntax Extractor

Извлекатель документации BSL из архива справки 1С.

Для каждой HTML-страницы архива (в порядке архива, не больше `max_files`)
применяет набор правил [`RuleSet`] и строит [`DocumentationRecord`].
Ошибки отдельных страниц не прерывают прогон: они считаются в
[`RunSummary`] и выводятся одной строкой в конце.

## Использование

```rust,ignore
let mut extractor = BslSyntaxExtractor::new("1C_Help.hbk");
let outcome = extractor.extract_records(Some(1000))?;
println!("{}", outcome.summary);
```
*/

use std::path::Path;
use tracing::{debug, info};

use super::extraction_rules::{HelpPage, RuleSet};
use super::hbk_parser::HbkArchiveParser;
use super::record::{Category, DocumentationRecord, RecordDraft};
use crate::core::{HelpResult, RecoveredKind, RunSummary};

/// Результат разбора одной страницы
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// Страница без видимого текста
    Blank,
    /// Ни одно правило не нашло заголовок
    MissingTitle,
    Draft(RecordDraft),
}

/// Записи и сводка одного прогона
#[derive(Debug, Clone, Default)]
pub struct ExtractionOutcome {
    pub records: Vec<DocumentationRecord>,
    pub summary: RunSummary,
}

/// Извлекатель синтаксиса BSL
pub struct BslSyntaxExtractor {
    parser: HbkArchiveParser,
    rules: RuleSet,
}

impl BslSyntaxExtractor {
    pub fn new<P: AsRef<Path>>(archive_path: P) -> Self {
        Self::with_rules(archive_path, RuleSet::standard())
    }

    pub fn with_rules<P: AsRef<Path>>(archive_path: P, rules: RuleSet) -> Self {
        Self {
            parser: HbkArchiveParser::new(archive_path),
            rules,
        }
    }

    pub fn extract_records(&mut self, max_files: Option<usize>) -> HelpResult<ExtractionOutcome> {
        self.extract_records_with_progress(max_files, |_, _, _| {})
    }

    /// Извлекает записи; `progress(processed, total, filename)` вызывается после каждой страницы
    pub fn extract_records_with_progress<F>(
        &mut self,
        max_files: Option<usize>,
        mut progress: F,
    ) -> HelpResult<ExtractionOutcome>
    where
        F: FnMut(usize, usize, &str),
    {
        if !self.parser.is_open() {
            self.parser.open_archive()?;
        }

        let mut html_files = self.parser.html_entries()?;
        if let Some(max) = max_files {
            html_files.truncate(max);
        }
        let total = html_files.len();
        info!("Processing {} HTML files", total);

        let mut outcome = ExtractionOutcome::default();

        for (i, filename) in html_files.iter().enumerate() {
            outcome.summary.entries_seen += 1;

            if let Err(e) = self.process_entry(filename, &mut outcome) {
                if !e.is_recoverable() {
                    return Err(e);
                }
                debug!("Failed to extract {}: {}", filename, e);
                outcome.summary.record(RecoveredKind::EntryParseError);
            }

            progress(i + 1, total, filename);
        }

        outcome.summary.records_produced = outcome.records.len();
        debug!("Content cache holds {} entries", self.parser.cache_size());
        info!("Extraction finished: {}", outcome.summary);
        Ok(outcome)
    }

    fn process_entry(&mut self, filename: &str, outcome: &mut ExtractionOutcome) -> HelpResult<()> {
        let html = self.parser.extract_file_content(filename)?;

        let draft = match self.extract_syntax_info(&html, filename) {
            PageOutcome::Blank => {
                debug!("Skipping empty page {}", filename);
                outcome.summary.record(RecoveredKind::EmptyPage);
                return Ok(());
            }
            PageOutcome::MissingTitle => {
                debug!("Skipping {}: no title", filename);
                outcome.summary.record(RecoveredKind::MissingTitle);
                return Ok(());
            }
            PageOutcome::Draft(draft) => draft,
        };

        for field in draft.missing_fields() {
            outcome.summary.record_missing_field(field);
        }
        for _ in 0..draft.nameless_parameters {
            outcome.summary.record_missing_field("parameter_name");
        }

        let category = categorize_entry(filename, draft.title.as_deref().unwrap_or(""));
        let id = format!("{}_{}", category, outcome.records.len());
        let record = DocumentationRecord::from_draft(id, category, draft)?;
        debug!("{} -> {} ({})", filename, record.id, record.title);
        outcome.records.push(record);
        Ok(())
    }

    /// Разбирает одну страницу набором правил
    pub fn extract_syntax_info(&self, html: &str, filename: &str) -> PageOutcome {
        let page = HelpPage::parse(html, filename);
        if page.is_blank() {
            return PageOutcome::Blank;
        }
        let draft = self.rules.apply(&page);
        if draft.title.as_deref().map(str::trim).unwrap_or("").is_empty() {
            return PageOutcome::MissingTitle;
        }
        PageOutcome::Draft(draft)
    }
}

/// Категория по пути записи, затем по ключевым словам заголовка
pub fn categorize_entry(filename: &str, title: &str) -> Category {
    if filename.contains("Global context/methods/") {
        return Category::Functions;
    }
    if filename.contains("/methods/") {
        return Category::Methods;
    }
    if filename.contains("/properties/") {
        return Category::Properties;
    }
    if filename.starts_with("objects/") || filename.contains("/objects/") {
        return Category::Objects;
    }

    let title_lower = title.to_lowercase();
    if title.contains("Функция") || title_lower.contains("function") {
        Category::Functions
    } else if title.contains("Оператор") || title_lower.contains("operator") {
        Category::Operators
    } else if title.contains("Метод") || title_lower.contains("method") {
        Category::Methods
    } else if title.contains("Свойство") || title_lower.contains("property") {
        Category::Properties
    } else {
        Category::Objects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HelpParserError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_categorize_by_path() {
        assert_eq!(
            categorize_entry("Global context/methods/catalog4/Message.html", "Сообщить"),
            Category::Functions
        );
        assert_eq!(
            categorize_entry("objects/catalog1/Array/methods/Add.html", "Добавить"),
            Category::Methods
        );
        assert_eq!(
            categorize_entry("objects/catalog1/Array/properties/Count.html", "Количество"),
            Category::Properties
        );
        assert_eq!(categorize_entry("objects/Table.html", "Таблица"), Category::Objects);
    }

    #[test]
    fn test_categorize_by_title_keywords() {
        assert_eq!(categorize_entry("lang/If.html", "Оператор Если"), Category::Operators);
        assert_eq!(categorize_entry("lang/Str.html", "Функция Строка"), Category::Functions);
        assert_eq!(categorize_entry("lang/m.html", "Метод Записать"), Category::Methods);
        assert_eq!(categorize_entry("lang/p.html", "Свойство Имя"), Category::Properties);
        assert_eq!(categorize_entry("lang/x.html", "Прочее"), Category::Objects);
    }

    #[test]
    fn test_extract_syntax_info_outcomes() {
        let extractor = BslSyntaxExtractor::new("unused.hbk");

        assert_eq!(
            extractor.extract_syntax_info("<html><body>\n</body></html>", "a.html"),
            PageOutcome::Blank
        );
        assert_eq!(
            extractor.extract_syntax_info("<html><body><p>текст</p></body></html>", "a.html"),
            PageOutcome::MissingTitle
        );
        match extractor.extract_syntax_info("<html><body><h1>Таблица</h1></body></html>", "a.html")
        {
            PageOutcome::Draft(draft) => assert_eq!(draft.title.as_deref(), Some("Таблица")),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_missing_archive_is_fatal() {
        let mut extractor = BslSyntaxExtractor::new("definitely/missing.hbk");
        assert!(matches!(
            extractor.extract_records(None),
            Err(HelpParserError::ArchiveOpen { .. })
        ));
    }
}
