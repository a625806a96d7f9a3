use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("layout parse error: {0}")]
    ConfigParse(String),
    /// Layout validation error (blank column name, bad delimiter).
    #[error("layout validation error: {0}")]
    ConfigValidation(String),
    /// Missing required column in a source table.
    #[error("source '{source_name}': missing column '{column}'")]
    MissingColumn { source_name: String, column: String },
    /// Malformed delimited text.
    #[error("source '{source_name}': {message}")]
    Csv { source_name: String, message: String },
}
