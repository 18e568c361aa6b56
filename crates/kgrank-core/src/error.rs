use thiserror::Error;

use crate::Triple;

/// Errors raised while building triple indices and datasets.
#[derive(Error, Debug)]
pub enum Error {
    /// A triple references an id outside the declared table range.
    #[error("Invalid triple {triple}: ids must be < {n_entity} entities and < {n_relation} relations")]
    InvalidTriple {
        triple: Triple,
        n_entity: usize,
        n_relation: usize,
    },

    /// Id table is not a dense, duplicate-free mapping.
    #[error("Malformed id table: {0}")]
    MalformedTable(String),

    /// Subsampling weight requested for a prefix never seen in training.
    #[error("No training frequency recorded for {0}")]
    MissingFrequency(Triple),

    /// A triple set required for the operation is empty.
    #[error("Empty triple set: {0}")]
    EmptyTripleSet(&'static str),

    /// A source record could not be interpreted.
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    /// A label is missing from its id table.
    #[error("Unknown label: {0}")]
    UnknownLabel(String),

    /// Parameters rejected before any work was done.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for kgrank-core operations.
pub type Result<T> = std::result::Result<T, Error>;
