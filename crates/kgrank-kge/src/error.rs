use thiserror::Error;

/// Errors raised by sampling, streaming and evaluation.
#[derive(Error, Debug)]
pub enum Error {
    /// Error from index or dataset construction.
    #[error(transparent)]
    Core(#[from] kgrank_core::Error),

    /// The true answer was absent or duplicated in a ranked candidate list.
    ///
    /// Candidate sets cover the full id range, so this indicates a logic bug.
    #[error("Rank invariant violated: answer {answer} found {occurrences} times among candidates")]
    RankInvariant { answer: u32, occurrences: usize },

    /// A scoring model returned the wrong number of scores.
    #[error("Scoring model returned {got} scores for {expected} candidates")]
    ScoreLength { expected: usize, got: usize },

    /// A prefetch worker stopped producing batches.
    #[error("Prefetch worker {worker} for {mode} stopped")]
    WorkerStopped {
        worker: usize,
        mode: kgrank_core::CorruptionMode,
    },

    /// Parameters rejected before any work was done.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failure reported by an external scoring model.
    #[error("Model error: {0}")]
    Model(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for kgrank-kge operations.
pub type Result<T> = std::result::Result<T, Error>;
