/*!
# Core Module

Core functionality shared by every pipeline stage: error types, the
end-of-run summary, and file helpers.
*/

pub mod errors;
pub mod fs_utils;

pub use errors::{HelpParserError, HelpResult, RecoveredKind, RunSummary};
pub use fs_utils::{read_json_file, read_text_file, write_json_file, write_text_file};
