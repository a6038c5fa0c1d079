//! Консольная обвязка бинарника: логирование, статусные сообщения,
//! аргументы командной строки, вывод результатов и прогресс извлечения.

use anyhow::{ensure, Result};
use colored::{ColoredString, Colorize};
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::core::RunSummary;

pub mod args;
pub mod output;
pub mod progress;

pub use args::{ArchiveArgs, LimitArgs};
pub use output::{OutputFormat, OutputWriter};
pub use progress::ProgressReporter;

/// Инициализирует систему логирования; `RUST_LOG` имеет приоритет над уровнем по умолчанию
pub fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Вид консольного сообщения
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Warning,
    Error,
    Info,
}

impl Status {
    fn paint(self, message: &str) -> (ColoredString, ColoredString) {
        match self {
            Status::Success => ("✅".green(), message.green()),
            Status::Warning => ("⚠️".yellow(), message.yellow()),
            Status::Error => ("❌".red(), message.red()),
            Status::Info => ("ℹ️".blue(), message.normal()),
        }
    }
}

/// Печатает сообщение с маркером; ошибки уходят в stderr
pub fn print_status(status: Status, message: &str) {
    let (marker, text) = status.paint(message);
    match status {
        Status::Error => eprintln!("{} {}", marker, text),
        _ => println!("{} {}", marker, text),
    }
}

pub fn print_success(message: &str) {
    print_status(Status::Success, message);
}

pub fn print_warning(message: &str) {
    print_status(Status::Warning, message);
}

pub fn print_error(message: &str) {
    print_status(Status::Error, message);
}

pub fn print_info(message: &str) {
    print_status(Status::Info, message);
}

/// Баннер команды `auto`
pub fn print_banner(title: &str, subtitle: &str) {
    let version = format!("v{}", crate::VERSION);
    println!("{} {}", title.bold().blue(), version.dimmed());
    println!("{}", subtitle.dimmed());
    println!("{}", "─".repeat(title.chars().count() + version.len() + 1).dimmed());
}

/// Итоговая строка прогона; пропуски выделяются цветом
pub fn print_run_summary(summary: &RunSummary) {
    let status = if summary.skipped() > 0 {
        Status::Warning
    } else {
        Status::Success
    };
    print_status(status, &summary.to_string());
}

/// Выводит записанный файл с размером
pub fn print_written(path: &Path, size: u64) {
    println!(
        "   {} {} ({})",
        "→".dimmed(),
        path.display(),
        format_file_size(size).dimmed()
    );
}

/// Требует существования входного файла или директории
pub fn require_path(path: &Path, what: &str) -> Result<()> {
    ensure!(path.exists(), "{} not found: {}", what, path.display());
    Ok(())
}

/// Размер в байтах для консоли: `812 B`, `12.40 KB`
pub fn format_file_size(size: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if size < 1024 {
        return format!("{} B", size);
    }
    let mut value = size as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

pub fn format_duration(duration: Duration) -> String {
    match duration.as_secs() {
        0 => format!("{}ms", duration.as_millis()),
        secs @ 1..=59 => format!("{}.{:03}s", secs, duration.subsec_millis()),
        secs => format!("{}m {}s", secs / 60, secs % 60),
    }
}
