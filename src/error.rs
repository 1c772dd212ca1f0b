use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum RetrieverError {
    #[error("invalid SRA accession: {0}")]
    InvalidAccession(String),

    #[error("invalid maximum prefetch size: {0} (expected e.g. 70G)")]
    InvalidMaxSize(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("identifier log not found: {0}")]
    MissingIdentifierLog(PathBuf),

    #[error("failed to read identifier log: {0}")]
    IdentifierLog(String),

    #[error("spreadsheet read failed: {0}")]
    Spreadsheet(String),

    #[error("sheet {0} not found in workbook")]
    MissingSheet(String),

    #[error("column {column} not found in {source_name}")]
    MissingColumn { column: String, source_name: String },

    #[error("history query failed: {0}")]
    History(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("failed to run {program}: {message}")]
    Toolkit { program: String, message: String },

    #[error("failed to write error log: {0}")]
    ErrorLog(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
