//! Модуль для форматирования и вывода результатов

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::{self, Write};
use std::str::FromStr;

use crate::search::IndexedItem;

/// Формат вывода результатов
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "table" => Ok(OutputFormat::Table),
            _ => Err(anyhow::anyhow!("Unknown output format: {}", s)),
        }
    }
}

/// Результат поиска для JSON-вывода
#[derive(Debug, Serialize)]
struct SearchHit<'a> {
    id: &'a str,
    title: &'a str,
    category: &'a str,
    syntax: &'a str,
    availability: &'a [String],
    version: &'a str,
}

/// Writer для вывода результатов
pub struct OutputWriter {
    writer: Box<dyn Write>,
    format: OutputFormat,
}

impl OutputWriter {
    /// Создает writer для stdout
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(Box::new(io::stdout()), format)
    }

    pub fn new(writer: Box<dyn Write>, format: OutputFormat) -> Self {
        Self { writer, format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Записывает сериализуемый объект как JSON
    pub fn write_object<T: Serialize + ?Sized>(&mut self, obj: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(obj)?;
        writeln!(self.writer, "{}", json)?;
        Ok(())
    }

    /// Записывает строку
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{}", line)?;
        Ok(())
    }

    /// Записывает заголовок
    pub fn write_header(&mut self, header: &str) -> Result<()> {
        match self.format {
            OutputFormat::Json => {}
            _ => {
                writeln!(self.writer, "\n{}", header.bold().blue())?;
                writeln!(self.writer, "{}", "=".repeat(header.chars().count()).blue())?;
            }
        }
        Ok(())
    }

    /// Записывает таблицу
    pub fn write_table(&mut self, headers: &[&str], rows: &[Vec<String>]) -> Result<()> {
        // Ширина колонок в символах, а не в байтах
        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in rows {
            for (i, cell) in row.iter().enumerate().take(widths.len()) {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let render = |cells: Vec<String>| -> String {
            cells
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    let pad = widths[i].saturating_sub(cell.chars().count());
                    format!("{}{}", cell, " ".repeat(pad))
                })
                .collect::<Vec<_>>()
                .join(" │ ")
        };

        let header_cells = headers.iter().map(|h| h.to_string()).collect();
        writeln!(self.writer, "{}", render(header_cells).as_str().bold())?;
        let separator: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
        writeln!(self.writer, "{}", separator.join("─┼─"))?;
        for row in rows {
            let mut cells: Vec<String> = row.iter().take(widths.len()).cloned().collect();
            cells.resize(widths.len(), String::new());
            writeln!(self.writer, "{}", render(cells))?;
        }
        Ok(())
    }

    /// Выводит найденные элементы
    pub fn write_items(&mut self, items: &[&IndexedItem]) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let hits: Vec<SearchHit> = items
                    .iter()
                    .map(|item| SearchHit {
                        id: &item.id,
                        title: &item.title,
                        category: item.category.as_str(),
                        syntax: &item.syntax,
                        availability: &item.availability,
                        version: &item.version,
                    })
                    .collect();
                self.write_object(&hits)?;
            }
            OutputFormat::Table => {
                let rows: Vec<Vec<String>> = items
                    .iter()
                    .map(|item| {
                        vec![
                            item.id.clone(),
                            item.title.clone(),
                            item.category.to_string(),
                            item.version.clone(),
                        ]
                    })
                    .collect();
                self.write_table(&["id", "title", "category", "version"], &rows)?;
            }
            OutputFormat::Text => {
                for item in items {
                    writeln!(
                        self.writer,
                        "  • {} {} {}",
                        item.title.bold(),
                        format!("[{}]", item.category).dimmed(),
                        item.id.dimmed()
                    )?;
                    if !item.syntax.is_empty() {
                        writeln!(self.writer, "      {}", item.syntax.cyan())?;
                    }
                    if !item.availability.is_empty() {
                        writeln!(self.writer, "      {}", item.availability.join(", ").dimmed())?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Завершает запись и сбрасывает буфер
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs_integration::record::Category;
    use std::sync::{Arc, Mutex};

    /// Writer, буфер которого можно прочитать после записи
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn item() -> IndexedItem {
        IndexedItem {
            id: "functions_0".to_string(),
            title: "Сообщить".to_string(),
            category: Category::Functions,
            syntax: "Сообщить(<Текст>)".to_string(),
            description: String::new(),
            availability: vec!["Сервер".to_string()],
            version: "8.0".to_string(),
        }
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("sarif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_write_items_json() {
        let buffer = SharedBuffer::default();
        let mut writer = OutputWriter::new(Box::new(buffer.clone()), OutputFormat::Json);
        let item = item();
        writer.write_items(&[&item]).unwrap();

        let value: serde_json::Value = serde_json::from_str(&buffer.text()).unwrap();
        assert_eq!(value[0]["id"], "functions_0");
        assert_eq!(value[0]["category"], "functions");
    }

    #[test]
    fn test_write_table_pads_cyrillic_by_chars() {
        colored::control::set_override(false);
        let buffer = SharedBuffer::default();
        let mut writer = OutputWriter::new(Box::new(buffer.clone()), OutputFormat::Table);
        writer
            .write_table(
                &["id", "title"],
                &[vec!["functions_0".to_string(), "Сообщить".to_string()]],
            )
            .unwrap();

        let text = buffer.text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id          │ title   ");
        assert_eq!(lines[2], "functions_0 │ Сообщить");
    }
}
