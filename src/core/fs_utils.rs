//! File system utility helpers (BOM-aware readers, JSON writers)
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

use super::errors::{HelpParserError, HelpResult};

/// Read a UTF-8 text file, stripping UTF-8 BOM if present.
pub fn read_text_file(path: &Path) -> std::io::Result<String> {
    let mut content = fs::read_to_string(path)?;
    if content.starts_with('\u{FEFF}') {
        content = content.trim_start_matches('\u{FEFF}').to_string();
    }
    Ok(content)
}

/// Read and deserialize a JSON file.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> HelpResult<T> {
    let content = read_text_file(path).map_err(|e| {
        HelpParserError::InvalidInput(format!("cannot read {}: {}", path.display(), e))
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Create the parent directory of `path` if it does not exist.
pub fn ensure_parent_dir(path: &Path) -> HelpResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| HelpParserError::output_write(parent, e))?;
        }
    }
    Ok(())
}

/// Pretty-print `value` as JSON into `path`, returning the written size in bytes.
pub fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> HelpResult<u64> {
    let json = serde_json::to_string_pretty(value)?;
    write_text_file(path, &json)
}

/// Write text into `path`, creating parent directories.
pub fn write_text_file(path: &Path, content: &str) -> HelpResult<u64> {
    ensure_parent_dir(path)?;
    fs::write(path, content).map_err(|e| HelpParserError::output_write(path, e))?;
    Ok(content.len() as u64)
}
