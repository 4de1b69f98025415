//! The reasoning evolution: rewrites a seed question so answering it
//! requires multi-step inference over the same context.

use async_trait::async_trait;
use tracing::debug;

use super::{generate_answer, seed_question, DepsCell, Evolution, EvolutionDeps};
use crate::config::with_retry;
use crate::dataset::DataRow;
use crate::docstore::NodeContext;
use crate::error::EvolutionError;
use crate::llm::CompletionRequest;

const REWRITE_PROMPT: &str = "Rewrite the question so that answering it requires multi-step \
reasoning over the context: the answer must combine at least two separate statements. Keep the \
rewrite self-contained and no more than twenty-five words. Reply with the rewritten question \
only.";

pub struct ReasoningEvolution {
    deps: DepsCell,
}

impl ReasoningEvolution {
    pub fn new() -> Self {
        Self {
            deps: DepsCell::new(),
        }
    }
}

impl Default for ReasoningEvolution {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Evolution for ReasoningEvolution {
    fn name(&self) -> &str {
        "reasoning"
    }

    fn is_composite(&self) -> bool {
        true
    }

    fn configure(&self, deps: EvolutionDeps) {
        self.deps.set(deps);
    }

    async fn evolve(&self, context: NodeContext) -> Result<Option<DataRow>, EvolutionError> {
        let deps = self.deps.get("reasoning")?;

        let Some(seed) = seed_question(deps, &context).await? else {
            return Ok(None);
        };

        let prompt = format!(
            "{REWRITE_PROMPT}\n\nquestion: {seed}\ncontext:\n{}",
            context.root.content
        );
        let response = with_retry(&deps.run_config, || {
            deps.generator_model
                .complete(CompletionRequest::new(prompt.clone()))
        })
        .await?;
        let evolved = response.content.trim().to_string();
        if evolved.is_empty() {
            return Ok(None);
        }

        let filter = deps
            .evolution_filter
            .as_ref()
            .ok_or(EvolutionError::NotConfigured("reasoning"))?;
        if !filter.filter(&seed, &evolved).await? {
            debug!(%seed, %evolved, "evolved question rejected, dropping row");
            return Ok(None);
        }

        let ground_truth = generate_answer(deps, &evolved, &context).await?;
        Ok(Some(DataRow {
            question: evolved,
            contexts: context.context_texts(),
            ground_truth,
            evolution_type: self.name().to_string(),
        }))
    }
}
