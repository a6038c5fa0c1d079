/*!
# 1C Help Parser CLI

Command-line interface for extracting 1C:Enterprise help archives into
JSON context, chunked split output and searching the result.
*/

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use onec_help_parser::cli_common::{
    self, ArchiveArgs, LimitArgs, OutputFormat, OutputWriter, ProgressReporter,
};
use onec_help_parser::converters::{
    validate_export, ChunkItem, ChunkSettings, ChunkedSyntaxWriter, ContextConverter,
    ExportReport, MainIndex, OptimizedContextConverter, SplitMode,
};
use onec_help_parser::core::{write_json_file, write_text_file};
use onec_help_parser::docs_integration::{
    ArchiveStructure, Category, ChunkedDocsLoader, DocsIntegration, HbkArchiveParser,
    HtmlContent, RecordSet,
};
use onec_help_parser::search::{ContextIndex, IndexedItem};
use onec_help_parser::{PipelineConfig, PipelineLauncher};

#[derive(Parser)]
#[command(
    name = "onec-help-parser",
    version = env!("CARGO_PKG_VERSION"),
    about = "Extracts 1C:Enterprise help archives into JSON context for search and LLM pipelines"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a TOML or YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the structure of a help archive
    Analyze {
        #[command(flatten)]
        archive: ArchiveArgs,

        /// Number of sample entries per kind (and sample pages to parse)
        #[arg(long, default_value = "5")]
        samples: usize,

        /// Save the analysis as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract documentation records from a help archive
    Extract {
        #[command(flatten)]
        archive: ArchiveArgs,

        /// Output file for extracted records
        #[arg(short, long, default_value = "data/bsl_syntax.json")]
        output: PathBuf,
    },

    /// Convert extracted records into context formats
    Convert {
        /// Extracted records (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "context")]
        format: ConvertFormat,

        /// Output file (default depends on format)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        limits: LimitArgs,
    },

    /// Convert extracted records and split the items into chunk files by category
    Split {
        /// Extracted records (JSON); converted to context items (max) or optimized items before splitting
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory (default depends on mode)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Split mode
        #[arg(short, long, value_enum, default_value = "max")]
        mode: SplitArg,

        #[command(flatten)]
        limits: LimitArgs,

        /// Validate written files against the size and line limits
        #[arg(long)]
        validate: bool,
    },

    /// Search generated context (JSON document or chunked directory)
    Search {
        /// Optimized/context/records JSON or a split directory with main_index.json
        path: PathBuf,

        /// Keyword to look up
        #[arg(short, long)]
        keyword: Option<String>,

        /// Substring to find in title, syntax or description
        #[arg(short, long)]
        pattern: Option<String>,

        /// Filter by category
        #[arg(long)]
        category: Option<String>,

        /// Filter by availability tag (exact, case-insensitive)
        #[arg(long)]
        availability: Option<String>,

        /// Filter by version fragment
        #[arg(long)]
        version: Option<String>,

        /// Show a single item by id
        #[arg(long)]
        id: Option<String>,

        /// Run the built-in example queries
        #[arg(long)]
        examples: bool,

        /// Maximum results per query
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// Output format (text, json, table)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check the archive and configuration without writing anything
    Check {
        #[command(flatten)]
        archive: ArchiveArgs,
    },

    /// Run the full pipeline: extract, context, optimized context, split
    Auto {
        #[command(flatten)]
        archive: ArchiveArgs,

        /// Output directory
        #[arg(short, long, default_value = "data")]
        output: PathBuf,

        #[command(flatten)]
        limits: LimitArgs,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConvertFormat {
    Context,
    Optimized,
    Text,
    SearchIndex,
    Summary,
}

impl ConvertFormat {
    fn default_output(&self) -> &'static str {
        match self {
            ConvertFormat::Context => "data/1c_context.json",
            ConvertFormat::Optimized => "data/1c_context_optimized.json",
            ConvertFormat::Text => "data/1c_context.txt",
            ConvertFormat::SearchIndex => "data/1c_search_index.json",
            ConvertFormat::Summary => "data/1c_summary.json",
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SplitArg {
    Max,
    Optimized,
}

impl From<SplitArg> for SplitMode {
    fn from(arg: SplitArg) -> Self {
        match arg {
            SplitArg::Max => SplitMode::MaxSplit,
            SplitArg::Optimized => SplitMode::OptimizedSplit,
        }
    }
}

/// Отчет команды `analyze`
#[derive(Serialize)]
struct AnalysisReport<'a> {
    archive: &'a Path,
    structure: &'a ArchiveStructure,
    sample_pages: &'a [HtmlContent],
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli_common::init_logging(cli.verbose) {
        eprintln!("{}", e);
    }

    if let Err(e) = run(cli) {
        cli_common::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load_from_file(path)?,
        None => PipelineConfig::default(),
    };
    if cli.verbose {
        config.verbose = true;
    }

    match cli.command {
        Commands::Analyze {
            archive,
            samples,
            output,
        } => analyze(&archive.archive, samples, output.as_deref()),
        Commands::Extract { archive, output } => {
            archive.apply_to(&mut config);
            config.validate()?;
            extract(&archive.archive, &output, &config)
        }
        Commands::Convert {
            input,
            format,
            output,
            limits,
        } => {
            limits.apply_to(&mut config);
            config.validate()?;
            let output = output.unwrap_or_else(|| PathBuf::from(format.default_output()));
            convert(&input, format, &output, &config)
        }
        Commands::Split {
            input,
            output,
            mode,
            limits,
            validate,
        } => {
            limits.apply_to(&mut config);
            config.validate()?;
            let mode = SplitMode::from(mode);
            let output = output.unwrap_or_else(|| match mode {
                SplitMode::MaxSplit => PathBuf::from("data/max_split"),
                SplitMode::OptimizedSplit => PathBuf::from("data/optimized_split"),
            });
            split(&input, &output, mode, validate, &config)
        }
        Commands::Search {
            path,
            keyword,
            pattern,
            category,
            availability,
            version,
            id,
            examples,
            limit,
            format,
        } => {
            let format: OutputFormat = format.parse()?;
            let query = SearchQuery {
                keyword,
                pattern,
                category,
                availability,
                version,
                id,
                examples,
                limit,
            };
            if path.is_dir() {
                search_chunks(&path, &query, format)
            } else {
                search(&path, &query, format)
            }
        }
        Commands::Check { archive } => {
            archive.apply_to(&mut config);
            check(&archive.archive, &config)
        }
        Commands::Auto {
            archive,
            output,
            limits,
        } => {
            archive.apply_to(&mut config);
            limits.apply_to(&mut config);
            config.validate()?;
            auto(&archive.archive, &output, config)
        }
    }
}

fn analyze(archive: &Path, samples: usize, output: Option<&Path>) -> Result<()> {
    cli_common::require_path(archive, "Archive")?;
    cli_common::print_info(&format!("Analyzing {}", archive.display()));

    let spinner = ProgressReporter::spinner("Reading archive");
    let mut parser = HbkArchiveParser::new(archive);
    parser.open_archive()?;
    spinner.tick();
    let structure = parser.analyze_structure(samples)?;
    spinner.tick();
    let sample_pages = parser.extract_sample_files(samples)?;
    spinner.finish_with_message("Archive analyzed");

    let mut out = OutputWriter::stdout(OutputFormat::Text);
    out.write_header("Archive structure")?;
    out.write_line(&format!("Total entries: {}", structure.total_files))?;
    out.write_line(&format!("HTML pages:    {}", structure.html_files))?;
    out.write_line(&format!(".st files:     {}", structure.st_files))?;

    let kind_rows: Vec<Vec<String>> = structure
        .entry_kinds
        .iter()
        .map(|(kind, count)| {
            let sample = structure
                .samples
                .get(kind)
                .and_then(|s| s.first())
                .cloned()
                .unwrap_or_default();
            vec![kind.to_string(), count.to_string(), sample]
        })
        .collect();
    out.write_header("Entry kinds")?;
    out.write_table(&["kind", "count", "first entry"], &kind_rows)?;

    let mut categories: Vec<(&String, &usize)> = structure.categories.iter().collect();
    categories.sort_by(|a, b| b.1.cmp(a.1));
    let category_rows: Vec<Vec<String>> = categories
        .iter()
        .take(10)
        .map(|(name, count)| vec![name.to_string(), count.to_string()])
        .collect();
    out.write_header("Top-level folders")?;
    out.write_table(&["folder", "entries"], &category_rows)?;

    if !structure.largest_files.is_empty() {
        let rows: Vec<Vec<String>> = structure
            .largest_files
            .iter()
            .map(|f| {
                vec![
                    f.name.clone(),
                    cli_common::format_file_size(f.size),
                    cli_common::format_file_size(f.compressed_size),
                ]
            })
            .collect();
        out.write_header("Largest files")?;
        out.write_table(&["name", "size", "compressed"], &rows)?;
    }

    if !sample_pages.is_empty() {
        out.write_header("Sample pages")?;
        for page in &sample_pages {
            out.write_line(&format!("  • {} ({})", page.title.as_str().bold(), page.filename.as_str().dimmed()))?;
            if !page.syntax.is_empty() {
                out.write_line(&format!("      {}", page.syntax.as_str().cyan()))?;
            }
        }
    }
    out.flush()?;

    if let Some(output) = output {
        let report = AnalysisReport {
            archive,
            structure: &structure,
            sample_pages: &sample_pages,
        };
        let size = write_json_file(output, &report)?;
        cli_common::print_written(output, size);
    }
    Ok(())
}

fn extract(archive: &Path, output: &Path, config: &PipelineConfig) -> Result<()> {
    cli_common::require_path(archive, "Archive")?;
    let start = Instant::now();

    let progress = ProgressReporter::new("Extracting");
    let mut docs = DocsIntegration::new();
    let summary = docs
        .load_documentation_with_progress(archive, config, |done, total, name| {
            progress.update(done, total, name)
        })
        .with_context(|| format!("Failed to extract {}", archive.display()))?
        .clone();
    progress.finish_with_message("Extraction finished");

    cli_common::print_run_summary(&summary);
    if let Some(stats) = docs.get_statistics() {
        println!("{}", stats);
    }

    let size = docs.save_record_set(output)?;
    cli_common::print_written(output, size);
    info!("Extract took {}", cli_common::format_duration(start.elapsed()));
    Ok(())
}

fn load_records(input: &Path) -> Result<RecordSet> {
    cli_common::require_path(input, "Records file")?;
    let mut docs = DocsIntegration::new();
    docs.load_record_set(input)
        .with_context(|| format!("Failed to load records from {}", input.display()))?;
    docs.record_set()
        .cloned()
        .context("Records file contains no record set")
}

fn convert(input: &Path, format: ConvertFormat, output: &Path, config: &PipelineConfig) -> Result<()> {
    let set = load_records(input)?;
    let records = &set.records;

    let size = match format {
        ConvertFormat::Optimized => {
            let doc = OptimizedContextConverter::new(config).convert(records);
            cli_common::print_info(&format!(
                "{} items, {} search keys",
                doc.items.len(),
                doc.search.len()
            ));
            write_json_file(output, &doc)?
        }
        ConvertFormat::Context => {
            let doc = ContextConverter::new(config).convert(records);
            write_json_file(output, &doc)?
        }
        ConvertFormat::Text => {
            let converter = ContextConverter::new(config);
            let doc = converter.convert(records);
            write_text_file(output, &converter.render_text(&doc))?
        }
        ConvertFormat::SearchIndex => {
            let converter = ContextConverter::new(config);
            let doc = converter.convert(records);
            write_json_file(output, &converter.build_search_index_document(&doc))?
        }
        ConvertFormat::Summary => {
            let converter = ContextConverter::new(config);
            let doc = converter.convert(records);
            write_json_file(output, &converter.build_summary(&doc))?
        }
    };

    cli_common::print_success(&format!("Converted {} records", records.len()));
    cli_common::print_written(output, size);
    Ok(())
}

fn split(
    input: &Path,
    output: &Path,
    mode: SplitMode,
    validate: bool,
    config: &PipelineConfig,
) -> Result<()> {
    let set = load_records(input)?;
    let total = set.records.len();

    let settings = ChunkSettings::from_config(config, mode);
    let main_index = match mode {
        SplitMode::MaxSplit => {
            let doc = ContextConverter::new(config).convert(&set.records);
            write_chunks(output, settings, doc.context_items)?
        }
        SplitMode::OptimizedSplit => {
            let doc = OptimizedContextConverter::new(config).convert(&set.records);
            write_chunks(output, settings, doc.items)?
        }
    };

    cli_common::print_success(&format!(
        "{}: {} of {} records written to {}",
        mode,
        main_index.total_items,
        total,
        output.display()
    ));
    for (category, info) in &main_index.categories {
        println!(
            "   {:<12} {:>6} items in {} files",
            category.as_str(),
            info.items_count,
            info.chunks_count
        );
    }

    if validate {
        let report = validate_export(output, config.max_file_size_kb)?;
        print_export_report(&report);
    }
    Ok(())
}

fn write_chunks<T: ChunkItem>(output: &Path, settings: ChunkSettings, items: Vec<T>) -> Result<MainIndex> {
    let mut writer = ChunkedSyntaxWriter::new(output, settings);
    writer.add_items(items);
    Ok(writer.write_all()?)
}

fn print_export_report(report: &ExportReport) {
    if report.is_clean() {
        cli_common::print_success(&format!("All {} files within limits", report.total_files));
        return;
    }
    cli_common::print_warning(&format!(
        "{} of {} files exceed limits",
        report.warnings.len(),
        report.total_files
    ));
    for (category, warnings) in report.grouped() {
        println!("   {} ({})", category.bold(), warnings.len());
        for warning in warnings.iter().take(5) {
            println!("      {} {:?}", warning.path.display(), warning.kind);
        }
    }
}

struct SearchQuery {
    keyword: Option<String>,
    pattern: Option<String>,
    category: Option<String>,
    availability: Option<String>,
    version: Option<String>,
    id: Option<String>,
    examples: bool,
    limit: usize,
}

/// Примеры запросов для демонстрации
const EXAMPLE_KEYWORDS: &[&str] = &["сообщить", "массив", "строка", "запрос"];
const EXAMPLE_AVAILABILITY: &[&str] = &["Сервер", "Тонкий клиент"];

fn search(path: &Path, query: &SearchQuery, format: OutputFormat) -> Result<()> {
    cli_common::require_path(path, "Context file")?;
    let index = ContextIndex::load_from_file(path)?;
    let mut out = OutputWriter::stdout(format);

    if let Some(id) = &query.id {
        match index.find_by_id(id) {
            Some(item) => out.write_items(&[item])?,
            None => cli_common::print_warning(&format!("No item with id {}", id)),
        }
    }

    let mut print = |title: String, items: Vec<&IndexedItem>| -> Result<()> {
        out.write_header(&format!("{} ({} found)", title, items.len()))?;
        let shown: Vec<&IndexedItem> = items.into_iter().take(query.limit).collect();
        out.write_items(&shown)
    };

    if let Some(keyword) = &query.keyword {
        print(format!("Keyword '{}'", keyword), index.search_by_keyword(keyword))?;
    }
    if let Some(pattern) = &query.pattern {
        print(format!("Pattern '{}'", pattern), index.find_by_pattern(pattern))?;
    }
    if let Some(category) = &query.category {
        let category: Category = category.parse()?;
        print(format!("Category {}", category), index.search_by_category(category))?;
    }
    if let Some(tag) = &query.availability {
        print(format!("Availability '{}'", tag), index.search_by_availability(tag))?;
    }
    if let Some(version) = &query.version {
        print(format!("Version '{}'", version), index.search_by_version(version))?;
    }

    if query.examples {
        for keyword in EXAMPLE_KEYWORDS {
            print(format!("Keyword '{}'", keyword), index.search_by_keyword(keyword))?;
        }
        for tag in EXAMPLE_AVAILABILITY {
            print(format!("Availability '{}'", tag), index.search_by_availability(tag))?;
        }
        for (category, _) in index.category_counts() {
            print(format!("Category {}", category), index.search_by_category(category))?;
        }
    }

    let nothing_requested = query.id.is_none()
        && query.keyword.is_none()
        && query.pattern.is_none()
        && query.category.is_none()
        && query.availability.is_none()
        && query.version.is_none()
        && !query.examples;
    if nothing_requested {
        let rows: Vec<Vec<String>> = index
            .category_counts()
            .into_iter()
            .map(|(category, count)| vec![category.to_string(), count.to_string()])
            .collect();
        out.write_header(&format!("{} items loaded", index.len()))?;
        out.write_table(&["category", "items"], &rows)?;
    }
    out.flush()
}

fn search_chunks(dir: &Path, query: &SearchQuery, format: OutputFormat) -> Result<()> {
    let mut loader = ChunkedDocsLoader::new(dir);
    loader.load_index()?;
    let mut out = OutputWriter::stdout(format);

    if let Some(id) = &query.id {
        match loader.get_item(id)? {
            Some(item) => out.write_object(&item)?,
            None => cli_common::print_warning(&format!("No item with id {}", id)),
        }
    }

    if let Some(category) = &query.category {
        let category: Category = category.parse()?;
        let items = loader.get_category_items(category)?;
        out.write_header(&format!("Category {} ({} items)", category, items.len()))?;
        let shown: Vec<_> = items.into_iter().take(query.limit).collect();
        out.write_object(&shown)?;
    }

    if query.id.is_none() && query.category.is_none() {
        let stats = loader.get_statistics()?;
        let rows: Vec<Vec<String>> = stats
            .categories
            .iter()
            .map(|(category, s)| {
                vec![
                    category.to_string(),
                    s.items_count.to_string(),
                    s.files_count.to_string(),
                ]
            })
            .collect();
        out.write_header(&format!("{} items ({})", stats.total_items, stats.mode))?;
        out.write_table(&["category", "items", "files"], &rows)?;
    }
    out.flush()
}

fn check(archive: &Path, config: &PipelineConfig) -> Result<()> {
    config.validate()?;
    cli_common::print_success("Configuration is valid");

    cli_common::require_path(archive, "Archive")?;
    let mut parser = HbkArchiveParser::new(archive);
    parser
        .open_archive()
        .with_context(|| format!("Cannot open {}", archive.display()))?;
    let entries = parser.list_contents()?.len();
    let html = parser.html_entries()?.len();
    let planned = config.max_files.map_or(html, |max| max.min(html));

    cli_common::print_success(&format!(
        "Archive {} opened: {} entries, {} HTML pages ({} would be processed)",
        archive.display(),
        entries,
        html,
        planned
    ));
    if html == 0 {
        cli_common::print_warning("Archive contains no HTML pages");
    }
    Ok(())
}

fn auto(archive: &Path, output: &Path, config: PipelineConfig) -> Result<()> {
    cli_common::require_path(archive, "Archive")?;
    cli_common::print_banner(
        "onec-help-parser",
        "Full pipeline: extract, context, optimized context, split",
    );
    let start = Instant::now();

    let progress = ProgressReporter::new("Extracting");
    let launcher = PipelineLauncher::new(archive, output, config);
    let result = launcher
        .run_with_progress(|done, total, name| progress.update(done, total, name))
        .with_context(|| format!("Pipeline failed for {}", archive.display()))?;
    progress.finish_with_message("Extraction finished");

    cli_common::print_run_summary(&result.summary);
    for (path, size) in &result.files {
        cli_common::print_written(path, *size);
    }
    for (name, index) in [
        ("max_split", &result.max_split),
        ("optimized_split", &result.optimized_split),
    ] {
        if let Some(index) = index {
            let files: usize = index.categories.values().map(|c| c.chunks_count).sum();
            println!(
                "   {} {}: {} items in {} files",
                "→".dimmed(),
                name,
                index.total_items,
                files
            );
        }
    }
    for report in &result.export_reports {
        print_export_report(report);
    }

    cli_common::print_success(&format!(
        "Pipeline finished in {}",
        cli_common::format_duration(start.elapsed())
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_convert_and_split() {
        let cli = Cli::try_parse_from([
            "onec-help-parser",
            "convert",
            "--input",
            "records.json",
            "--format",
            "search-index",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Convert {
                format: ConvertFormat::SearchIndex,
                ..
            }
        ));

        let cli = Cli::try_parse_from([
            "onec-help-parser",
            "--verbose",
            "split",
            "--input",
            "records.json",
            "--mode",
            "optimized",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Split {
                mode: SplitArg::Optimized,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_search_pattern() {
        let cli = Cli::try_parse_from([
            "onec-help-parser",
            "search",
            "data/1c_context_optimized.json",
            "-p",
            "<Значение>",
        ])
        .unwrap();
        match cli.command {
            Commands::Search { pattern, keyword, .. } => {
                assert_eq!(pattern.as_deref(), Some("<Значение>"));
                assert!(keyword.is_none());
            }
            _ => panic!("expected search"),
        }
    }
}
