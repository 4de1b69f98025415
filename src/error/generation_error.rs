//! Run-level error types.

use super::EvolutionError;
use thiserror::Error;

/// Errors that abort a generation run.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Distribution weights do not sum to 1.0 (got {sum})")]
    InvalidDistribution { sum: f64 },
    #[error("Corpus cannot supply {requested} nodes ({available} eligible)")]
    InsufficientCorpus { requested: usize, available: usize },
    #[error("Node index {index} out of range for store of {len} nodes")]
    NodeIndexOutOfRange { index: usize, len: usize },
    #[error("No usable rows produced: every generation failed or was filtered out")]
    EmptyTestset,
    #[error("Evolution error: {0}")]
    Evolution(Box<EvolutionError>),
}

impl From<EvolutionError> for GenerationError {
    fn from(value: EvolutionError) -> Self {
        GenerationError::Evolution(Box::new(value))
    }
}
