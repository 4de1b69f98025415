//! Quality filters applied around question generation.
//!
//! Filters are critic-model collaborators: they score a candidate node,
//! question, or evolved rewrite, and the evolutions drop the row when a
//! filter rejects. Filter verdicts are advisory on content quality only;
//! they never affect scheduling.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{with_retry, RunConfig};
use crate::docstore::DocumentNode;
use crate::error::EvolutionError;
use crate::llm::{CompletionRequest, GenerationModel};

/// Verdict for a candidate root node.
#[derive(Debug, Clone, Copy)]
pub struct NodeVerdict {
    pub score: f64,
    pub pass: bool,
}

/// Scores whether a node is deep enough to generate from.
#[async_trait]
pub trait NodeFilter: Send + Sync {
    async fn filter(&self, node: &DocumentNode) -> Result<NodeVerdict, EvolutionError>;
}

/// Accepts or rejects a generated question.
#[async_trait]
pub trait QuestionFilter: Send + Sync {
    async fn filter(&self, question: &str) -> Result<bool, EvolutionError>;
}

/// Accepts or rejects an evolved rewrite of a seed question.
#[async_trait]
pub trait EvolutionFilter: Send + Sync {
    async fn filter(
        &self,
        seed_question: &str,
        evolved_question: &str,
    ) -> Result<bool, EvolutionError>;
}

const NODE_FILTER_PROMPT: &str = "Rate how suitable the following document chunk is as the basis \
for generating an exam question. Consider depth of information, coherence, and self-containment. \
Reply with a single score between 0 and 5.";

const QUESTION_FILTER_PROMPT: &str = "Determine whether the following question is clear, \
specific, and answerable from supporting documentation alone. Reply with 'yes' or 'no'.";

const EVOLUTION_FILTER_PROMPT: &str = "Compare the seed question with its evolved rewrite and \
decide whether the rewrite is a genuinely deeper question about the same subject. Reply with \
'yes' or 'no'.";

/// Default score a node must reach to pass [`CriticNodeFilter`].
pub const DEFAULT_NODE_SCORE_THRESHOLD: f64 = 1.5;

/// Critic-model node filter: scores chunk depth on a 0-5 scale.
pub struct CriticNodeFilter {
    model: Arc<dyn GenerationModel>,
    threshold: f64,
    run_config: RunConfig,
}

impl CriticNodeFilter {
    pub fn new(model: Arc<dyn GenerationModel>, run_config: RunConfig) -> Self {
        Self {
            model,
            threshold: DEFAULT_NODE_SCORE_THRESHOLD,
            run_config,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

#[async_trait]
impl NodeFilter for CriticNodeFilter {
    async fn filter(&self, node: &DocumentNode) -> Result<NodeVerdict, EvolutionError> {
        let prompt = format!("{NODE_FILTER_PROMPT}\n\nchunk:\n{}", node.content);
        let response = with_retry(&self.run_config, || {
            self.model.complete(CompletionRequest::new(prompt.clone()))
        })
        .await?;
        let score = parse_score(&response.content).ok_or_else(|| {
            EvolutionError::Filter(format!("unparseable node score: {}", response.content))
        })?;
        Ok(NodeVerdict {
            score,
            pass: score >= self.threshold,
        })
    }
}

/// Critic-model question filter.
pub struct CriticQuestionFilter {
    model: Arc<dyn GenerationModel>,
    run_config: RunConfig,
}

impl CriticQuestionFilter {
    pub fn new(model: Arc<dyn GenerationModel>, run_config: RunConfig) -> Self {
        Self { model, run_config }
    }
}

#[async_trait]
impl QuestionFilter for CriticQuestionFilter {
    async fn filter(&self, question: &str) -> Result<bool, EvolutionError> {
        let prompt = format!("{QUESTION_FILTER_PROMPT}\n\nquestion: {question}");
        let response = with_retry(&self.run_config, || {
            self.model.complete(CompletionRequest::new(prompt.clone()))
        })
        .await?;
        parse_verdict(&response.content).ok_or_else(|| {
            EvolutionError::Filter(format!("unparseable question verdict: {}", response.content))
        })
    }
}

/// Critic-model evolution filter for composite evolutions.
pub struct CriticEvolutionFilter {
    model: Arc<dyn GenerationModel>,
    run_config: RunConfig,
}

impl CriticEvolutionFilter {
    pub fn new(model: Arc<dyn GenerationModel>, run_config: RunConfig) -> Self {
        Self { model, run_config }
    }
}

#[async_trait]
impl EvolutionFilter for CriticEvolutionFilter {
    async fn filter(
        &self,
        seed_question: &str,
        evolved_question: &str,
    ) -> Result<bool, EvolutionError> {
        let prompt = format!(
            "{EVOLUTION_FILTER_PROMPT}\n\nseed: {seed_question}\nrewrite: {evolved_question}"
        );
        let response = with_retry(&self.run_config, || {
            self.model.complete(CompletionRequest::new(prompt.clone()))
        })
        .await?;
        parse_verdict(&response.content).ok_or_else(|| {
            EvolutionError::Filter(format!("unparseable evolution verdict: {}", response.content))
        })
    }
}

/// First numeric token in the critic's reply.
fn parse_score(text: &str) -> Option<f64> {
    text.split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .filter(|token| !token.is_empty())
        .find_map(|token| token.parse().ok())
}

fn parse_verdict(text: &str) -> Option<bool> {
    let lower = text.trim().to_lowercase();
    if lower.starts_with("yes") || lower.starts_with('1') {
        Some(true)
    } else if lower.starts_with("no") || lower.starts_with('0') {
        Some(false)
    } else {
        None
    }
}
