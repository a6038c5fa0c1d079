/*!
# Converters

Проекции записей документации в выходные форматы:

- [`ContextConverter`]: полный контекст для LLM (Markdown на элемент, текст, поисковый индекс, резюме)
- [`OptimizedContextConverter`]: компактные элементы с усечением и поисковой картой
- [`ChunkedSyntaxWriter`]: разбиение по категориям на файлы ограниченного размера

Все конвертеры только читают записи; повторный запуск на тех же записях
дает тот же результат с точностью до времени генерации.
*/

pub mod chunked_writer;
pub mod context_converter;
pub mod optimized_context_converter;
pub mod search_index;

pub use chunked_writer::{
    validate_export, ChunkItem, ChunkSettings, ChunkedSyntaxWriter, ExportReport, ExportWarning,
    MainIndex, SplitMode,
};
pub use context_converter::{ContextConverter, ContextDocument, ContextItem, ContextItemMetadata};
pub use optimized_context_converter::{
    OptimizedContextConverter, OptimizedDocument, OptimizedItem, OptimizedParameter,
};
pub use search_index::{tokenize, SearchIndexBuilder, SearchMap};

/// Схлопывает пробельные символы; `<` и `>` в тексте справки остаются как есть
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Убирает хвостовые пробелы строк, сохраняя переводы строк (для примеров кода)
pub fn normalize_lines(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .to_string()
}

/// Обрезает текст до `max_chars` символов, добавляя `...` при обрезке
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", text[..byte_idx].trim_end()),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clean_text_keeps_placeholders() {
        assert_eq!(clean_text("  Добавляет\n  элемент\tв конец  "), "Добавляет элемент в конец");
        assert_eq!(
            clean_text("Если значение <Условие>\n истинно"),
            "Если значение <Условие> истинно"
        );
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_normalize_lines_keeps_comparisons() {
        assert_eq!(
            normalize_lines("\nЕсли А < 10 И Б > 5 Тогда   \n    Сообщить(А);\n"),
            "Если А < 10 И Б > 5 Тогда\n    Сообщить(А);"
        );
    }

    #[test]
    fn test_truncate_chars_is_char_safe() {
        assert_eq!(truncate_chars("Массив", 10), "Массив");
        assert_eq!(truncate_chars("Массив", 6), "Массив");
        assert_eq!(truncate_chars("Массив значений", 6), "Массив...");
        assert_eq!(truncate_chars("абв", 0), "...");
    }
}
