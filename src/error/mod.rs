//! Error types for testset generation.
//!
//! - [`EvolutionError`] — Errors raised while evolving a single node context.
//! - [`GenerationError`] — Top-level errors for planning, executing, and
//!   aggregating a generation run.

pub mod evolution_error;
pub mod generation_error;

pub use evolution_error::EvolutionError;
pub use generation_error::GenerationError;

/// Convenience alias for run-level results.
pub type GenerationResult<T> = Result<T, GenerationError>;
/// Convenience alias for task-level results.
pub type EvolutionResult<T> = Result<T, EvolutionError>;
