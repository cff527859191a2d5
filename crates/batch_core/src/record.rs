use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One parsed `source_path,target` line of the mapping file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRecord {
    pub source_path: PathBuf,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Commas are not escapable, so anything but exactly two fields is rejected.
    #[error("expected 2 comma-separated fields, found {found}")]
    FieldCount { found: usize },
    #[error("empty {field} field")]
    EmptyField { field: &'static str },
    #[error("cannot derive a job name from source path {0:?}")]
    NoJobName(PathBuf),
    /// Two sources with the same file name would write to the same artifact.
    #[error("output path {0:?} is already claimed by an earlier record")]
    DuplicateOutput(PathBuf),
}

/// What to do with a mapping line that fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MalformedPolicy {
    /// Drop the line with a warning.
    #[default]
    Skip,
    /// Abort loading.
    Reject,
}

/// Parses one mapping line. Blank lines yield `Ok(None)`.
pub fn parse_record(line: &str) -> Result<Option<MappingRecord>, RecordError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split(',').collect();
    let [source, target] = fields.as_slice() else {
        return Err(RecordError::FieldCount {
            found: fields.len(),
        });
    };

    let (source, target) = (source.trim(), target.trim());
    if source.is_empty() {
        return Err(RecordError::EmptyField { field: "source" });
    }
    if target.is_empty() {
        return Err(RecordError::EmptyField { field: "target" });
    }

    Ok(Some(MappingRecord {
        source_path: PathBuf::from(source),
        target: target.to_string(),
    }))
}
