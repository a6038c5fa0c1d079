/*!
# Error System for the Help Parser

Fatal errors are returned as [`HelpParserError`]; recoverable per-entry
problems are aggregated into a [`RunSummary`] and reported once at the end of
a run.
*/

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type HelpResult<T> = Result<T, HelpParserError>;

/// Errors that abort a pipeline stage
#[derive(Error, Debug)]
pub enum HelpParserError {
    #[error("Failed to open archive {path}: {reason}")]
    ArchiveOpen { path: PathBuf, reason: String },

    #[error("Archive {0} contains no entries")]
    EmptyArchive(PathBuf),

    #[error("Archive is not opened")]
    ArchiveNotOpened,

    #[error("Failed to parse entry {entry}: {reason}")]
    EntryParse { entry: String, reason: String },

    #[error("Failed to write {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HelpParserError {
    pub fn archive_open(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Self::ArchiveOpen {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn output_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::OutputWrite {
            path: path.into(),
            source,
        }
    }

    /// Whether the error is scoped to a single archive entry
    pub fn is_recoverable(&self) -> bool {
        matches!(self, HelpParserError::EntryParse { .. })
    }
}

/// Kinds of recovered failures counted during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveredKind {
    EntryParseError,
    MissingTitle,
    EmptyPage,
    MissingFieldWarning,
}

impl fmt::Display for RecoveredKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveredKind::EntryParseError => write!(f, "entry parse errors"),
            RecoveredKind::MissingTitle => write!(f, "entries without title"),
            RecoveredKind::EmptyPage => write!(f, "empty pages"),
            RecoveredKind::MissingFieldWarning => write!(f, "defaulted fields"),
        }
    }
}

/// End-of-run aggregate of everything that was recovered instead of raised
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub entries_seen: usize,
    pub records_produced: usize,
    pub counts: BTreeMap<RecoveredKind, usize>,
    /// Defaulted optional fields, keyed by field name
    pub missing_fields: BTreeMap<String, usize>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: RecoveredKind) {
        *self.counts.entry(kind).or_insert(0) += 1;
    }

    pub fn record_missing_field(&mut self, field: &str) {
        self.record(RecoveredKind::MissingFieldWarning);
        *self.missing_fields.entry(field.to_string()).or_insert(0) += 1;
    }

    pub fn count(&self, kind: RecoveredKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Entries that did not yield a record
    pub fn skipped(&self) -> usize {
        self.count(RecoveredKind::EntryParseError)
            + self.count(RecoveredKind::MissingTitle)
            + self.count(RecoveredKind::EmptyPage)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries processed, {} records produced",
            self.entries_seen, self.records_produced
        )?;
        for (kind, count) in &self.counts {
            write!(f, ", {} {}", count, kind)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_and_skipped() {
        let mut summary = RunSummary::new();
        summary.entries_seen = 4;
        summary.record(RecoveredKind::MissingTitle);
        summary.record(RecoveredKind::EmptyPage);
        summary.record_missing_field("syntax");
        summary.record_missing_field("syntax");

        assert_eq!(summary.skipped(), 2);
        assert_eq!(summary.count(RecoveredKind::MissingFieldWarning), 2);
        assert_eq!(summary.missing_fields["syntax"], 2);
    }

    #[test]
    fn test_entry_parse_is_recoverable() {
        let err = HelpParserError::EntryParse {
            entry: "objects/a.html".to_string(),
            reason: "bad bytes".to_string(),
        };
        assert!(err.is_recoverable());
        assert!(!HelpParserError::ArchiveNotOpened.is_recoverable());
    }
}
