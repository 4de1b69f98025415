use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::node::{DocumentNode, NodeContext};
use crate::error::GenerationError;

/// Source of document nodes for a generation run.
///
/// `sample` must return exactly `count` contexts or fail; the scheduler
/// relies on the deterministic count to plan assignments.
pub trait DocumentStore: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Direct lookup by index.
    fn get(&self, index: usize) -> Option<DocumentNode>;

    /// Add pre-chunked nodes to the store.
    fn add_nodes(&self, nodes: Vec<DocumentNode>);

    /// Randomly sample `count` distinct nodes, each wrapped in a fresh
    /// [`NodeContext`]. With a `score_threshold`, only nodes whose score
    /// meets the threshold are eligible; unscored nodes are excluded.
    fn sample(
        &self,
        count: usize,
        score_threshold: Option<f64>,
    ) -> Result<Vec<NodeContext>, GenerationError>;

    /// Nearest stored neighbors of `node` by embedding cosine
    /// similarity, excluding the node itself. Empty when `node` or the
    /// store carries no embeddings.
    fn similar(&self, node: &DocumentNode, top_k: usize) -> Vec<DocumentNode>;
}

/// In-memory node store with seeded random sampling.
pub struct InMemoryDocumentStore {
    nodes: RwLock<Vec<DocumentNode>>,
    rng: Mutex<StdRng>,
}

impl InMemoryDocumentStore {
    pub fn new(nodes: Vec<DocumentNode>) -> Self {
        Self {
            nodes: RwLock::new(nodes),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Store whose sampling order is reproducible for the given seed.
    pub fn with_seed(nodes: Vec<DocumentNode>, seed: u64) -> Self {
        Self {
            nodes: RwLock::new(nodes),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn len(&self) -> usize {
        self.nodes.read().len()
    }

    fn get(&self, index: usize) -> Option<DocumentNode> {
        self.nodes.read().get(index).cloned()
    }

    fn add_nodes(&self, nodes: Vec<DocumentNode>) {
        self.nodes.write().extend(nodes);
    }

    fn sample(
        &self,
        count: usize,
        score_threshold: Option<f64>,
    ) -> Result<Vec<NodeContext>, GenerationError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let nodes = self.nodes.read();
        let eligible: Vec<usize> = nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| match (score_threshold, node.score) {
                (Some(threshold), Some(score)) => score >= threshold,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .map(|(index, _)| index)
            .collect();

        if eligible.len() < count {
            return Err(GenerationError::InsufficientCorpus {
                requested: count,
                available: eligible.len(),
            });
        }

        let mut rng = self.rng.lock();
        let picked = rand::seq::index::sample(&mut *rng, eligible.len(), count);
        Ok(picked
            .iter()
            .map(|i| NodeContext::new(nodes[eligible[i]].clone()))
            .collect())
    }

    fn similar(&self, node: &DocumentNode, top_k: usize) -> Vec<DocumentNode> {
        let Some(query) = node.embedding.as_deref() else {
            return Vec::new();
        };
        let nodes = self.nodes.read();
        let mut scored: Vec<(f32, &DocumentNode)> = nodes
            .iter()
            .filter(|candidate| candidate.id != node.id)
            .filter_map(|candidate| {
                candidate
                    .embedding
                    .as_deref()
                    .map(|embedding| (cosine_similarity(query, embedding), candidate))
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored
            .into_iter()
            .take(top_k)
            .map(|(_, candidate)| candidate.clone())
            .collect()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
