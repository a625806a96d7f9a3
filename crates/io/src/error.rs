use std::path::PathBuf;

use conseil_recon::ReconError;
use thiserror::Error;

/// Failure reading a roster or subject source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot open workbook {path}: {message}")]
    Workbook { path: PathBuf, message: String },
    #[error("workbook {path} contains no sheets")]
    EmptyWorkbook { path: PathBuf },
    #[error("{path}: missing column '{column}'")]
    MissingColumn { path: PathBuf, column: String },
    #[error(transparent)]
    Table(#[from] ReconError),
}

/// Failure writing, reading or checking bulletin JSON.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("no bulletins to save")]
    Empty,
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a JSON array of bulletins")]
    NotAnArray,
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a whole directory run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid source directory: {}", .0.join(", "))]
    InvalidDirectory(Vec<String>),
    #[error("no student found in roster")]
    EmptyRoster,
    #[error("student not found: {0}")]
    StudentNotFound(String),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Serialize(#[from] SerializeError),
}
