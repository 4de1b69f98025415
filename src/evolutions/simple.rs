//! The simple evolution: one seed question per node, answered directly.

use async_trait::async_trait;

use super::{generate_answer, seed_question, DepsCell, Evolution, EvolutionDeps};
use crate::dataset::DataRow;
use crate::docstore::NodeContext;
use crate::error::EvolutionError;

pub struct SimpleEvolution {
    deps: DepsCell,
}

impl SimpleEvolution {
    pub fn new() -> Self {
        Self {
            deps: DepsCell::new(),
        }
    }
}

impl Default for SimpleEvolution {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Evolution for SimpleEvolution {
    fn name(&self) -> &str {
        "simple"
    }

    fn configure(&self, deps: EvolutionDeps) {
        self.deps.set(deps);
    }

    async fn evolve(&self, context: NodeContext) -> Result<Option<DataRow>, EvolutionError> {
        let deps = self.deps.get("simple")?;

        let Some(question) = seed_question(deps, &context).await? else {
            return Ok(None);
        };
        let ground_truth = generate_answer(deps, &question, &context).await?;

        Ok(Some(DataRow {
            question,
            contexts: context.context_texts(),
            ground_truth,
            evolution_type: self.name().to_string(),
        }))
    }
}
