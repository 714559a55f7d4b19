use std::path::PathBuf;
use thiserror::Error;

/// Fatal conditions. Anything that should only be reported to the operator
/// goes into `RunReport` instead.
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("no parameterization registered for {0}; run `register` first")]
    MissingRun(String),
    #[error("workspace metadata not found; run `init` first")]
    MissingWorkspace,
    #[error("required table not found: {0}")]
    MissingTable(PathBuf),
    #[error("column '{column}' not found in {table}")]
    MissingColumn { table: String, column: String },
    #[error("duplicate key '{key}' in reference table {table}")]
    DuplicateKey { table: String, key: String },
    #[error("invalid value '{value}' for {field} in {table}")]
    InvalidValue {
        table: String,
        field: String,
        value: String,
    },
    #[error("row for {found} cannot be written to partition {expected}")]
    PartitionMismatch { expected: String, found: String },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ParamResult<T> = Result<T, ParamError>;

/// Per-horizon numeric failure; the horizon is skipped and the run continues.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HorizonError {
    #[error("horizon {horizon}: field {field} is missing")]
    MissingField { horizon: String, field: &'static str },
    #[error("horizon {horizon}: cannot parse {field} value '{value}'")]
    Malformed {
        horizon: String,
        field: &'static str,
        value: String,
    },
}
