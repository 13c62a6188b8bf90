//! Error types for the ingestion tool
//!
//! Messages are user-facing: the binary logs them verbatim before exiting.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Error type for ingestion runs
///
/// See [`IngestError::is_fatal`] for which variants end a run.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// `--create-config` was asked to overwrite an existing file
    #[error("Configuration file '{}' already exists. Use a different path (with --config-file) or delete it to create a new default config.", .0.display())]
    ConfigExists(PathBuf),

    /// Config file is not valid TOML or misses keys
    #[error("Failed to parse configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Config template could not be rendered
    #[error("Failed to render configuration file: {0}")]
    ConfigRender(#[from] toml::ser::Error),

    /// Latest mode was requested but no file matched
    #[error("No telegram files found to process")]
    NoFiles,

    /// Candidate file could not be stat'ed for ordering
    #[error("Cannot read metadata of '{}': {source}", path.display())]
    FileMetadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Row reader could not be constructed for a file
    #[error("File '{}' could not be opened for reading: {source}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A row failed to parse; the rest of its file is abandoned
    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    /// Destination rejected a request
    #[error("InfluxDB returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Watermark query answered with something unusable
    #[error("Unexpected query response: {0}")]
    QueryResponse(String),

    /// Every watermark query attempt failed
    #[error("All {attempts} attempts failed to query the last data point from InfluxDB - giving up: {last_error}")]
    WatermarkExhausted { attempts: u32, last_error: String },

    /// Batch write for one file failed
    #[error("Failed to write '{}' to InfluxDB: {source}", file.display())]
    Write {
        file: PathBuf,
        #[source]
        source: Box<IngestError>,
    },

    /// HTTP request failed
    #[error("Network request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// File system operation failed
    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a malformed row error from a record-level error
    pub fn malformed_row(line: u64, reason: impl ToString) -> Self {
        Self::MalformedRow {
            line,
            reason: reason.to_string(),
        }
    }

    /// Create a write error for `file`
    pub fn write(file: impl Into<PathBuf>, source: IngestError) -> Self {
        Self::Write {
            file: file.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error ends the whole run
    ///
    /// Setup and row errors only cost the current file.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            IngestError::FileOpen { .. } | IngestError::MalformedRow { .. }
        )
    }
}
