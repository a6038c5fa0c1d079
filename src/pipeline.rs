/*!
# Pipeline Launcher

Единый запускатель полного конвейера:
архив → записи → контекст → оптимизированный контекст → разбиение.

Выходные файлы в `output_dir`:

| файл | содержимое |
|---|---|
| `bsl_syntax.json` | набор записей извлечения |
| `1c_context.json` / `1c_context.txt` | полный контекст (JSON и текст) |
| `1c_search_index.json`, `1c_summary.json` | поисковый индекс и резюме |
| `1c_context_optimized.json` | оптимизированный контекст |
| `max_split/`, `optimized_split/` | разбитые по категориям файлы |
*/

use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::PipelineConfig;
use crate::converters::{
    validate_export, ChunkItem, ChunkSettings, ChunkedSyntaxWriter, ContextConverter, ExportReport,
    MainIndex, OptimizedContextConverter, SplitMode,
};
use crate::core::{write_json_file, write_text_file, HelpResult, RunSummary};
use crate::docs_integration::{BslSyntaxExtractor, RecordSet};

pub const RECORDS_FILE: &str = "bsl_syntax.json";
pub const CONTEXT_JSON_FILE: &str = "1c_context.json";
pub const CONTEXT_TEXT_FILE: &str = "1c_context.txt";
pub const SEARCH_INDEX_FILE: &str = "1c_search_index.json";
pub const SUMMARY_FILE: &str = "1c_summary.json";
pub const OPTIMIZED_FILE: &str = "1c_context_optimized.json";
pub const MAX_SPLIT_DIR: &str = "max_split";
pub const OPTIMIZED_SPLIT_DIR: &str = "optimized_split";

/// Этапы конвейера после извлечения
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineComponents {
    pub records: bool,
    pub context: bool,
    pub optimized: bool,
    pub max_split: bool,
    pub optimized_split: bool,
}

impl Default for PipelineComponents {
    fn default() -> Self {
        Self {
            records: true,
            context: true,
            optimized: true,
            max_split: true,
            optimized_split: true,
        }
    }
}

/// Итог запуска
#[derive(Debug, Clone, Default)]
pub struct PipelineResult {
    pub summary: RunSummary,
    pub records_count: usize,
    /// Записанные файлы и их размер в байтах
    pub files: Vec<(PathBuf, u64)>,
    pub max_split: Option<MainIndex>,
    pub optimized_split: Option<MainIndex>,
    pub export_reports: Vec<ExportReport>,
}

/// Запускатель конвейера
pub struct PipelineLauncher {
    archive_path: PathBuf,
    output_dir: PathBuf,
    config: PipelineConfig,
    components: PipelineComponents,
}

impl PipelineLauncher {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        archive_path: P,
        output_dir: Q,
        config: PipelineConfig,
    ) -> Self {
        Self {
            archive_path: archive_path.as_ref().to_path_buf(),
            output_dir: output_dir.as_ref().to_path_buf(),
            config,
            components: PipelineComponents::default(),
        }
    }

    /// Устанавливает этапы для запуска
    pub fn with_components(mut self, components: PipelineComponents) -> Self {
        self.components = components;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn run(&self) -> HelpResult<PipelineResult> {
        self.run_with_progress(|_, _, _| {})
    }

    /// Запускает конвейер; ошибки записи прерывают запуск
    pub fn run_with_progress<F>(&self, progress: F) -> HelpResult<PipelineResult>
    where
        F: FnMut(usize, usize, &str),
    {
        info!(
            "Running pipeline: {} -> {}",
            self.archive_path.display(),
            self.output_dir.display()
        );

        let mut extractor = BslSyntaxExtractor::new(&self.archive_path);
        let outcome = extractor.extract_records_with_progress(self.config.max_files, progress)?;
        let record_set = RecordSet::new(
            self.config.source_label.clone(),
            outcome.records,
            outcome.summary.clone(),
        );

        let mut result = PipelineResult {
            summary: outcome.summary,
            records_count: record_set.records.len(),
            ..PipelineResult::default()
        };
        let records = &record_set.records;

        if self.components.records {
            self.write_json(RECORDS_FILE, &record_set, &mut result)?;
        }

        let context = ContextConverter::new(&self.config);
        let context_doc = (self.components.context || self.components.max_split)
            .then(|| context.convert(records));
        if let Some(doc) = context_doc.as_ref().filter(|_| self.components.context) {
            self.write_json(CONTEXT_JSON_FILE, doc, &mut result)?;

            let path = self.output_dir.join(CONTEXT_TEXT_FILE);
            let size = write_text_file(&path, &context.render_text(doc))?;
            result.files.push((path, size));

            let index = context.build_search_index_document(doc);
            self.write_json(SEARCH_INDEX_FILE, &index, &mut result)?;
            let summary = context.build_summary(doc);
            self.write_json(SUMMARY_FILE, &summary, &mut result)?;
        }

        let optimized_doc = (self.components.optimized || self.components.optimized_split)
            .then(|| OptimizedContextConverter::new(&self.config).convert(records));
        if let Some(doc) = optimized_doc.as_ref().filter(|_| self.components.optimized) {
            self.write_json(OPTIMIZED_FILE, doc, &mut result)?;
        }

        // разбиение пишет уже сконвертированные элементы, а не сырые записи
        if let Some(doc) = context_doc.filter(|_| self.components.max_split) {
            result.max_split = Some(self.split(
                doc.context_items,
                SplitMode::MaxSplit,
                MAX_SPLIT_DIR,
                &mut result,
            )?);
        }
        if let Some(doc) = optimized_doc.filter(|_| self.components.optimized_split) {
            result.optimized_split = Some(self.split(
                doc.items,
                SplitMode::OptimizedSplit,
                OPTIMIZED_SPLIT_DIR,
                &mut result,
            )?);
        }

        info!(
            "Pipeline finished: {} records, {} files",
            result.records_count,
            result.files.len()
        );
        Ok(result)
    }

    fn write_json<T: serde::Serialize>(
        &self,
        filename: &str,
        value: &T,
        result: &mut PipelineResult,
    ) -> HelpResult<()> {
        let path = self.output_dir.join(filename);
        let size = write_json_file(&path, value)?;
        result.files.push((path, size));
        Ok(())
    }

    fn split<T: ChunkItem>(
        &self,
        items: Vec<T>,
        mode: SplitMode,
        dir_name: &str,
        result: &mut PipelineResult,
    ) -> HelpResult<MainIndex> {
        let dir = self.output_dir.join(dir_name);
        let mut writer = ChunkedSyntaxWriter::new(&dir, ChunkSettings::from_config(&self.config, mode));
        writer.add_items(items);
        let main_index = writer.write_all()?;
        result
            .export_reports
            .push(validate_export(&dir, self.config.max_file_size_kb)?);
        Ok(main_index)
    }
}
