//! Evolution strategies.
//!
//! An [`Evolution`] turns one sampled [`NodeContext`] into a generated
//! question/answer row, or into no row at all when a quality filter
//! rejects the intermediate artifacts. Strategies are configured once
//! per run with explicit dependencies and are read-only afterwards, so
//! a single instance can back many concurrent tasks.

pub mod multi_context;
pub mod reasoning;
pub mod simple;

pub use multi_context::MultiContextEvolution;
pub use reasoning::ReasoningEvolution;
pub use simple::SimpleEvolution;

use async_trait::async_trait;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::config::{with_retry, RunConfig};
use crate::dataset::DataRow;
use crate::docstore::{DocumentStore, NodeContext};
use crate::error::EvolutionError;
use crate::filters::{EvolutionFilter, NodeFilter, QuestionFilter};
use crate::llm::{CompletionRequest, GenerationModel};

/// Shared collaborators injected into an evolution once per run.
#[derive(Clone)]
pub struct EvolutionDeps {
    pub generator_model: Arc<dyn GenerationModel>,
    pub docstore: Arc<dyn DocumentStore>,
    pub node_filter: Arc<dyn NodeFilter>,
    pub question_filter: Arc<dyn QuestionFilter>,
    /// Present only for composite evolutions.
    pub evolution_filter: Option<Arc<dyn EvolutionFilter>>,
    pub run_config: RunConfig,
}

/// A named strategy that evolves a node context into a generated row.
///
/// Implementations are shared behind `Arc` and invoked concurrently
/// once configured.
#[async_trait]
pub trait Evolution: Send + Sync {
    /// Stable strategy name, used for task identifiers and telemetry.
    fn name(&self) -> &str;

    /// Composite evolutions additionally require an evolution filter
    /// before accepting an evolved question.
    fn is_composite(&self) -> bool {
        false
    }

    /// Natural language the strategy's prompts are written in.
    fn language(&self) -> &str {
        "english"
    }

    /// Inject shared collaborators. Idempotent: the first call wins and
    /// later calls are no-ops, so a strategy instance can be reused
    /// across runs.
    fn configure(&self, deps: EvolutionDeps);

    /// Evolve one node context into a row. `Ok(None)` means the
    /// generation was filtered out and produces no row.
    async fn evolve(&self, context: NodeContext) -> Result<Option<DataRow>, EvolutionError>;
}

/// One-shot dependency cell backing the built-in evolutions.
pub(crate) struct DepsCell(OnceLock<EvolutionDeps>);

impl DepsCell {
    pub(crate) fn new() -> Self {
        Self(OnceLock::new())
    }

    pub(crate) fn set(&self, deps: EvolutionDeps) {
        let _ = self.0.set(deps);
    }

    pub(crate) fn get(&self, owner: &'static str) -> Result<&EvolutionDeps, EvolutionError> {
        self.0.get().ok_or(EvolutionError::NotConfigured(owner))
    }
}

/// An ordered strategy/weight mix.
///
/// Iteration order is the caller's insertion order; the scheduler
/// relies on it for deterministic partitioning.
#[derive(Clone, Default)]
pub struct Distribution {
    entries: Vec<(Arc<dyn Evolution>, f64)>,
}

impl Distribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, evolution: Arc<dyn Evolution>, weight: f64) -> Self {
        self.entries.push((evolution, weight));
        self
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (Arc<dyn Evolution>, f64)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(evolution, _)| evolution.name().to_string())
            .collect()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, weight)| *weight).collect()
    }

    /// The stock mix: simple 0.5, reasoning 0.25, multi-context 0.25.
    pub fn default_mix() -> Self {
        Self::new()
            .push(Arc::new(SimpleEvolution::new()), 0.5)
            .push(Arc::new(ReasoningEvolution::new()), 0.25)
            .push(Arc::new(MultiContextEvolution::new()), 0.25)
    }
}

const SEED_QUESTION_PROMPT: &str = "Write one exam question that can be fully answered from the \
given context. Anchor the question on the keyphrase when one is provided. Reply with the \
question only.";

const ANSWER_PROMPT: &str = "Answer the question strictly from the given context. If the context \
is insufficient, answer with the closest grounded statement it supports. Reply with the answer \
only.";

/// Generate and vet a seed question for the root node. Returns `None`
/// when the node or the question fails its filter.
pub(crate) async fn seed_question(
    deps: &EvolutionDeps,
    context: &NodeContext,
) -> Result<Option<String>, EvolutionError> {
    let verdict = deps.node_filter.filter(&context.root).await?;
    if !verdict.pass {
        debug!(
            node = %context.root.id,
            score = verdict.score,
            "root node rejected by node filter"
        );
        return Ok(None);
    }

    let keyphrase = context.root.keyphrases.first().cloned().unwrap_or_default();
    let prompt = format!(
        "{SEED_QUESTION_PROMPT}\n\nkeyphrase: {keyphrase}\ncontext:\n{}",
        context.root.content
    );
    let response = with_retry(&deps.run_config, || {
        deps.generator_model
            .complete(CompletionRequest::new(prompt.clone()))
    })
    .await?;
    let question = response.content.trim().to_string();
    if question.is_empty() {
        return Ok(None);
    }

    if !deps.question_filter.filter(&question).await? {
        debug!(%question, "seed question rejected by question filter");
        return Ok(None);
    }
    Ok(Some(question))
}

/// Ground-truth answer for `question` over the accumulated context.
pub(crate) async fn generate_answer(
    deps: &EvolutionDeps,
    question: &str,
    context: &NodeContext,
) -> Result<String, EvolutionError> {
    let prompt = format!(
        "{ANSWER_PROMPT}\n\nquestion: {question}\ncontext:\n{}",
        context.combined_text()
    );
    let response = with_retry(&deps.run_config, || {
        deps.generator_model
            .complete(CompletionRequest::new(prompt.clone()))
    })
    .await?;
    Ok(response.content.trim().to_string())
}
