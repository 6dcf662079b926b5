//! Input Loading - Fail Fast Before Work
//!
//! Every command checks its paths here before anything is parsed.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{what} file not found: '{}'", .path.display())]
    NotFound { what: &'static str, path: PathBuf },

    #[error("{what} file '{}' must have a .{expected} extension", .path.display())]
    BadExtension {
        what: &'static str,
        path: PathBuf,
        expected: &'static str,
    },

    #[error("failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {format} file '{}': {message}", .path.display())]
    Parse {
        path: PathBuf,
        format: DataFormat,
        message: String,
    },

    #[error("resume data in '{}' must be a mapping at the top level, found {found}", .path.display())]
    NotAMapping { path: PathBuf, found: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Yaml,
    Json,
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataFormat::Yaml => f.write_str("YAML"),
            DataFormat::Json => f.write_str("JSON"),
        }
    }
}

/// Ensure `path` names an existing regular file.
pub fn require_file(path: &Path, what: &'static str) -> Result<(), LoadError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(LoadError::NotFound {
            what,
            path: path.to_path_buf(),
        })
    }
}

/// Ensure `path` ends in `.{expected}`, ignoring case.
pub fn require_extension(
    path: &Path,
    what: &'static str,
    expected: &'static str,
) -> Result<(), LoadError> {
    let matches = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case(expected));

    if matches {
        Ok(())
    } else {
        Err(LoadError::BadExtension {
            what,
            path: path.to_path_buf(),
            expected,
        })
    }
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Decode a YAML document. JSON is valid YAML, so `.json` data files load here too.
pub fn load_yaml(path: &Path) -> Result<Value, LoadError> {
    let content = read(path)?;
    let value: Value = serde_yaml::from_str(&content).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        format: DataFormat::Yaml,
        message: e.to_string(),
    })?;
    tracing::debug!(op = "loader::load_yaml", path = %path.display(), "loaded YAML document");
    Ok(value)
}

pub fn load_json(path: &Path) -> Result<Value, LoadError> {
    let content = read(path)?;
    let value: Value = serde_json::from_str(&content).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        format: DataFormat::Json,
        message: e.to_string(),
    })?;
    tracing::debug!(op = "loader::load_json", path = %path.display(), "loaded JSON document");
    Ok(value)
}

/// Load resume data for rendering; the top level has to be a mapping.
pub fn load_resume(path: &Path) -> Result<serde_json::Map<String, Value>, LoadError> {
    match load_yaml(path)? {
        Value::Object(map) => Ok(map),
        other => Err(LoadError::NotAMapping {
            path: path.to_path_buf(),
            found: value_kind(&other),
        }),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "an empty document",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
