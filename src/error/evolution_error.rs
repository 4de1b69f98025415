use thiserror::Error;

use crate::llm::LlmError;

/// Task-level errors raised while evolving one node context.
#[derive(Debug, Error)]
pub enum EvolutionError {
    #[error("Evolution '{0}' used before configure")]
    NotConfigured(&'static str),
    #[error("Model error: {0}")]
    Model(#[from] LlmError),
    #[error("Filter error: {0}")]
    Filter(String),
    #[error("Execution error: {0}")]
    Execution(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evolution_error_display() {
        assert_eq!(
            EvolutionError::NotConfigured("simple").to_string(),
            "Evolution 'simple' used before configure"
        );
        assert_eq!(
            EvolutionError::Filter("bad verdict".into()).to_string(),
            "Filter error: bad verdict"
        );
        assert_eq!(
            EvolutionError::Execution("boom".into()).to_string(),
            "Execution error: boom"
        );
    }

    #[test]
    fn test_evolution_error_from_llm_error() {
        let err: EvolutionError = LlmError::Timeout.into();
        assert!(matches!(err, EvolutionError::Model(_)));
        assert!(err.to_string().contains("Timeout"));
    }
}
