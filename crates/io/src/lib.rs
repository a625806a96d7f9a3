// File I/O - roster workbook, subject tables, bulletin JSON

pub mod csv;
pub mod directory;
pub mod error;
pub mod json;
pub mod pipeline;
pub mod xlsx;

pub use error::{PipelineError, SerializeError, SourceError};

/// Roster workbook expected in every source directory.
pub const ROSTER_FILE_NAME: &str = "source.xlsx";
