use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CcvalError {
    #[error("invalid MSI identifier: {0}")]
    InvalidMsi(String),

    #[error("missing recipe file ccval.json in current directory")]
    MissingConfig,

    #[error("failed to read recipe file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON recipe: {0}")]
    ConfigParse(String),

    #[error("invalid recipe: {0}")]
    InvalidRecipe(String),

    #[error("failed to read annual means file at {0}")]
    AnnualRead(PathBuf),

    #[error("failed to parse annual means JSON: {0}")]
    AnnualParse(String),

    #[error("invalid annual means layout: {0}")]
    InvalidAnnualMap(String),

    #[error("failed to read variable records at {0}")]
    RecordsRead(PathBuf),

    #[error("failed to parse variable records JSON: {0}")]
    RecordsParse(String),

    #[error("invalid file name pattern: {0}")]
    InvalidPattern(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
