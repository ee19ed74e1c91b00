//! JSONL record loading for the batch evaluators
//!
//! One JSON object per line, blank lines skipped. Any malformed line aborts
//! the whole load with its file and line number; an input without a single
//! record is reported separately so callers can tell "bad data" from "no data".

use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading a JSONL dataset
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}:{line}: {source}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("no records loaded from {}", path.display())]
    Empty { path: PathBuf },
}

/// Load every record of a JSONL file
pub fn load_records<T, P>(path: P) -> Result<Vec<T>, LoadError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_records(BufReader::new(file), path)
}

/// Parse JSONL records from any buffered reader
///
/// `origin` is only used to label errors.
pub fn parse_records<T, R>(reader: R, origin: &Path) -> Result<Vec<T>, LoadError>
where
    T: DeserializeOwned,
    R: BufRead,
{
    let mut records = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| LoadError::Io {
            path: origin.to_path_buf(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let record = serde_json::from_str(trimmed).map_err(|source| LoadError::Parse {
            path: origin.to_path_buf(),
            line: idx + 1,
            source,
        })?;
        records.push(record);
    }

    if records.is_empty() {
        return Err(LoadError::Empty {
            path: origin.to_path_buf(),
        });
    }

    tracing::debug!(path = %origin.display(), count = records.len(), "loaded JSONL records");
    Ok(records)
}
