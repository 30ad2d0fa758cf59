use thiserror::Error;

pub type SimResult<T> = Result<T, SimError>;

/// Errors raised by the simulation engine and its table front end
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("change type `{change_type}` needs {requested} targets but only {available} eligible candidates remain")]
    InsufficientPool {
        change_type: String,
        requested: usize,
        available: usize,
    },

    #[error("{lemma} does not have enough occurrences ({primary}: {primary_count}, {secondary}: {secondary_count})")]
    InsufficientOccurrence {
        lemma: String,
        primary: String,
        primary_count: usize,
        secondary: String,
        secondary_count: usize,
    },

    /// Raised inside the selector's retry loop only; never surfaced to callers.
    #[error("drew duplicate targets {lemmas:?}")]
    DuplicateTarget { lemmas: Vec<String> },

    #[error("malformed row {row}: missing `{field}`")]
    MalformedRow { row: usize, field: &'static str },

    #[error("distribution plan for {lemma} has already been computed")]
    PlanAlreadyComputed { lemma: String },

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv failure: {0}")]
    Csv(#[from] csv::Error),

    #[error("json failure: {0}")]
    Json(#[from] serde_json::Error),
}
