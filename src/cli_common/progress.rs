//! Модуль для отображения прогресса выполнения

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;

use super::format_duration;

/// Репортер прогресса извлечения поверх `indicatif`
pub struct ProgressReporter {
    bar: ProgressBar,
    message: String,
    start_time: Instant,
}

impl ProgressReporter {
    /// Прогресс-бар; до первого обновления длина неизвестна
    pub fn new(message: impl Into<String>) -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(bar_style());
        let message = message.into();
        bar.set_message(message.clone());
        Self {
            bar,
            message,
            start_time: Instant::now(),
        }
    }

    /// Скрытый репортер для тихого режима и тестов
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            message: String::new(),
            start_time: Instant::now(),
        }
    }

    /// Спиннер для операций без известного объема
    pub fn spinner(message: impl Into<String>) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            bar.set_style(style);
        }
        let message = message.into();
        bar.set_message(message.clone());
        Self {
            bar,
            message,
            start_time: Instant::now(),
        }
    }

    /// Обновляет позицию: вызывается колбэком извлечения `(processed, total, filename)`
    pub fn update(&self, processed: usize, total: usize, current: &str) {
        if self.bar.length() != Some(total as u64) {
            self.bar.set_length(total as u64);
        }
        self.bar.set_position(processed as u64);
        self.bar.set_message(format!("{} {}", self.message, current));
    }

    pub fn tick(&self) {
        self.bar.tick();
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Завершает с сообщением
    pub fn finish_with_message(&self, message: &str) {
        self.bar.finish_and_clear();
        if !self.bar.is_hidden() {
            println!(
                "{} {} ({}) in {}",
                "✅".green(),
                message.green(),
                self.bar.position(),
                format_duration(self.start_time.elapsed())
            );
        }
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.cyan} [{bar:40.green/blue}] {pos}/{len} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}
