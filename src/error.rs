//! Module defining the errors which are exposed to the users of the crate

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid CSV, either in the flight input or in a reference table
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input header lacks columns the parser depends on
    #[error("input is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// A single row could not be turned into a flight, e.g., an unknown airport code.
    /// The row is skipped, the pipeline continues.
    #[error("row {row}, {field} = {value:?}: {message}")]
    RowParse {
        row: u64,
        field: &'static str,
        value: String,
        message: String,
    },

    /// The backing file of the cache could not be opened or written
    #[error("cache file {}: {source}", path.display())]
    CacheIo {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An entry that cannot be represented as a single `key_value` line
    #[error("invalid cache entry {key:?}: {message}")]
    InvalidCacheEntry { key: String, message: String },

    /// A cached payload that no longer decodes into an observation
    #[error("cached observation for key {key} does not decode: {source}")]
    CacheDecode {
        key: String,
        source: serde_json::Error,
    },

    /// The weather provider failed to answer. Terminates the pipeline.
    #[error("weather fetch for {location} at {timestamp} failed: {message}")]
    Fetch {
        location: String,
        timestamp: i64,
        message: String,
    },

    /// Inconsistent airline/airport reference tables
    #[error("reference data: {0}")]
    Reference(String),

    #[error("input path {} does not exist", .0.display())]
    InputNotFound(PathBuf),

    /// Two inputs map onto the same file below the output directory
    #[error(
        "inputs {} and {} would both be written to {}",
        .first.display(),
        .second.display(),
        .relative.display()
    )]
    OutputCollision {
        relative: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("failed to scan input directory: {0}")]
    Walk(#[from] walkdir::Error),
}

impl Error {
    /// Fatal errors stop the whole run; all others only affect a single row or file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Fetch { .. } | Error::CacheDecode { .. })
    }
}

pub(crate) fn row_error(
    row: u64,
    field: &'static str,
    value: impl Into<String>,
    message: impl Into<String>,
) -> Error {
    Error::RowParse {
        row,
        field,
        value: value.into(),
        message: message.into(),
    }
}

pub(crate) fn cache_io_error(path: &Path, source: std::io::Error) -> Error {
    Error::CacheIo {
        path: path.to_path_buf(),
        source,
    }
}

pub(crate) fn fetch_error(
    location: impl Into<String>,
    timestamp: i64,
    message: impl std::fmt::Display,
) -> Error {
    Error::Fetch {
        location: location.into(),
        timestamp,
        message: message.to_string(),
    }
}
