//! # Synthset — Synthetic Testset Generation
//!
//! `synthset` builds labeled evaluation datasets (question, ground
//! truth, supporting contexts) from a corpus of document nodes by
//! applying weighted "evolution" strategies to randomly sampled nodes:
//!
//! - **Weighted scheduling**: a target row count is deterministically
//!   partitioned across strategies, with weighted-random backfill for
//!   integer-rounding shortfall.
//! - **Bounded concurrency**: tasks run in fixed-size execution units,
//!   one unit at a time, capping outstanding model calls regardless of
//!   dataset size.
//! - **Tolerant aggregation**: failed or filtered generations drop
//!   their row (or abort the run in fail-fast mode); a run that
//!   produces nothing fails loudly.
//! - **Built-in evolutions**: simple, reasoning, and multi-context
//!   question generation over any [`GenerationModel`] backend.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use synthset::{
//!     Distribution, InMemoryDocumentStore, OpenAiConfig, OpenAiModel, RunConfig,
//!     TestsetGenerator,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let model = Arc::new(OpenAiModel::new(OpenAiConfig {
//!         api_key: "sk-...".into(),
//!         base_url: "https://api.openai.com/v1".into(),
//!         model: "gpt-4o".into(),
//!         org_id: None,
//!     }));
//!     let store = Arc::new(InMemoryDocumentStore::new(load_nodes()));
//!     let generator = TestsetGenerator::new(model.clone(), model, store);
//!     let dataset = generator
//!         .generate(100, &Distribution::default_mix(), &RunConfig::default())
//!         .await
//!         .unwrap();
//!     println!("{} rows generated", dataset.len());
//! }
//! # fn load_nodes() -> Vec<synthset::DocumentNode> { Vec::new() }
//! ```

pub mod config;
pub mod dataset;
pub mod docstore;
pub mod error;
pub mod evolutions;
pub mod executor;
pub mod filters;
pub mod generator;
pub mod llm;
pub mod scheduler;
pub mod telemetry;

pub use crate::config::RunConfig;
pub use crate::dataset::{DataRow, TestDataset};
pub use crate::docstore::{DocumentNode, DocumentStore, InMemoryDocumentStore, NodeContext};
pub use crate::error::{EvolutionError, GenerationError};
pub use crate::evolutions::{
    Distribution, Evolution, EvolutionDeps, MultiContextEvolution, ReasoningEvolution,
    SimpleEvolution,
};
pub use crate::executor::ExecutionUnit;
pub use crate::filters::{
    CriticEvolutionFilter, CriticNodeFilter, CriticQuestionFilter, EvolutionFilter, NodeFilter,
    NodeVerdict, QuestionFilter,
};
pub use crate::generator::TestsetGenerator;
pub use crate::llm::{
    CompletionRequest, CompletionResponse, GenerationModel, LlmError, OpenAiConfig, OpenAiModel,
};
pub use crate::scheduler::{
    partition_batches, plan_assignments, validate_distribution, TaskAssignment,
};
pub use crate::telemetry::{GenerationEvent, TelemetrySink, TracingTelemetry};
