/*!
# 1C Help Parser

Extracts structured documentation (objects, methods, properties, functions,
operators) from 1C:Enterprise help archives (`.hbk` / `.zip` containers of
HTML pages) and converts it into JSON artifacts for search tools and LLM
context pipelines.

## Architecture

```text
onec-help-parser
├── Docs integration - archive reading, extraction rules, records
├── Converters       - context, optimized context, chunked split
├── Search           - keyword and filter search over generated context
├── Pipeline         - full run from archive to split output
└── CLI common       - logging, console output, progress
```

Data flows in one direction: archive → records → context → chunk files.
Every stage after extraction only reads records and never mutates them.

## Usage

### CLI
```bash
# Inspect the archive layout
onec-help-parser analyze --archive shcntx_ru.hbk

# Full pipeline into ./data
onec-help-parser auto --archive shcntx_ru.hbk --output data

# Search the optimized context
onec-help-parser search data/1c_context_optimized.json --keyword сообщить
```

### Library
```rust,ignore
use onec_help_parser::{BslSyntaxExtractor, OptimizedContextConverter, PipelineConfig};

let config = PipelineConfig::default();
let mut extractor = BslSyntaxExtractor::new("shcntx_ru.hbk");
let outcome = extractor.extract_records(config.max_files)?;
let doc = OptimizedContextConverter::new(&config).convert(&outcome.records);
println!("{} items, {}", doc.items.len(), outcome.summary);
```
*/

pub mod cli_common;
pub mod config;
pub mod converters;
pub mod core;
pub mod docs_integration;
pub mod pipeline;
pub mod search;

pub use config::PipelineConfig;
pub use converters::{
    ChunkSettings, ChunkedSyntaxWriter, ContextConverter, ContextDocument,
    OptimizedContextConverter, OptimizedDocument, SplitMode,
};
pub use core::{HelpParserError, HelpResult, RecoveredKind, RunSummary};
pub use docs_integration::{
    BslSyntaxExtractor, Category, ChunkedDocsLoader, DocsIntegration, DocumentationRecord,
    HbkArchiveParser, RecordSet, RuleSet,
};
pub use pipeline::{PipelineComponents, PipelineLauncher, PipelineResult};
pub use search::ContextIndex;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
