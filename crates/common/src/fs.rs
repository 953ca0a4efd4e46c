//! JSON file helpers
//!
//! Documents are written pretty-printed with four-space indentation and
//! sorted keys so that files under version control diff cleanly.

use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::{Error, Result};

/// Load the JSON document stored at `path`.
///
/// A file holding only whitespace loads as `Value::Null`; callers decide
/// whether an empty document is acceptable (see [`is_empty_json`]).
pub fn load_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            Error::NotFound(format!("File {} not found", path.display()))
        }
        _ => Error::Io(e),
    })?;

    if content.trim().is_empty() {
        return Ok(Value::Null);
    }

    Ok(serde_json::from_str(&content)?)
}

/// Serialize `content` to `path`, replacing the file if it exists.
///
/// The document is written to a sibling temporary file first and renamed
/// over `path`, so readers never observe a half-written file.
pub fn save_json<T: Serialize>(content: &T, path: &Path) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    // Round-trip through Value so object keys come out sorted.
    serde_json::to_value(content)?.serialize(&mut ser)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Io(std::io::Error::other(format!(
            "{} has no file name",
            path.display()
        ))))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    std::fs::write(&tmp_path, buf)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Whether a loaded document carries no content (`null`, `{}` or `[]`).
pub fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
