//! Error types for the reconciler.

use thiserror::Error;

/// Result type alias for reconciler operations
pub type Result<T> = std::result::Result<T, ReconError>;

/// Errors that can occur while loading input or running a reconciliation.
///
/// A person with nothing to match is never an error; it just produces
/// unmatched output.
#[derive(Error, Debug)]
pub enum ReconError {
    /// Failed to open, read, or write a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Config file is not valid TOML or has the wrong shape
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A config value is out of range
    #[error("invalid config value for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// The same transaction ID appears twice on one side
    #[error("duplicate transaction ID {id} on {side} side")]
    DuplicateTxId { side: &'static str, id: u32 },

    /// Input file header lacks a column the normalizer needs
    #[error("{source_name} file is missing required column `{column}`")]
    MissingColumn {
        source_name: &'static str,
        column: String,
    },

    /// An unmatched transaction has no original row to report
    #[error("no source row for {source_name} transaction {id}")]
    MissingSourceRow { source_name: &'static str, id: u32 },

    /// Invalid input record
    #[error("invalid record at row {row}: {message}")]
    InvalidRecord { row: usize, message: String },
}
