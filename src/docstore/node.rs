use serde::{Deserialize, Serialize};

/// A chunked piece of a source document, with the extraction artifacts
/// generation prompts rely on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentNode {
    pub id: String,
    pub content: String,
    /// Keyphrases extracted upstream, best first.
    #[serde(default)]
    pub keyphrases: Vec<String>,
    /// Embedding vector for similarity lookups.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    /// Corpus-quality score assigned by an external scorer, consulted
    /// by score-filtered sampling.
    #[serde(default)]
    pub score: Option<f64>,
}

impl DocumentNode {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            keyphrases: Vec::new(),
            embedding: None,
            score: None,
        }
    }

    pub fn with_keyphrases(mut self, keyphrases: Vec<String>) -> Self {
        self.keyphrases = keyphrases;
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }
}

/// A root node plus the supporting nodes accumulated while evolving a
/// question. Exclusively owned by the task it was assigned to; never
/// shared between tasks.
#[derive(Debug, Clone)]
pub struct NodeContext {
    pub root: DocumentNode,
    nodes: Vec<DocumentNode>,
}

impl NodeContext {
    pub fn new(root: DocumentNode) -> Self {
        let nodes = vec![root.clone()];
        Self { root, nodes }
    }

    /// Append a supporting node.
    pub fn push(&mut self, node: DocumentNode) {
        self.nodes.push(node);
    }

    pub fn nodes(&self) -> &[DocumentNode] {
        &self.nodes
    }

    /// Text of each supporting node, in accumulation order.
    pub fn context_texts(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.content.clone()).collect()
    }

    /// All supporting text joined into one prompt-ready block.
    pub fn combined_text(&self) -> String {
        self.context_texts().join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_starts_with_root() {
        let context = NodeContext::new(DocumentNode::new("n1", "alpha"));
        assert_eq!(context.nodes().len(), 1);
        assert_eq!(context.combined_text(), "alpha");
    }

    #[test]
    fn test_push_accumulates_in_order() {
        let mut context = NodeContext::new(DocumentNode::new("n1", "alpha"));
        context.push(DocumentNode::new("n2", "beta"));
        assert_eq!(context.context_texts(), vec!["alpha", "beta"]);
        assert_eq!(context.combined_text(), "alpha\n\nbeta");
        assert_eq!(context.root.id, "n1");
    }

    #[test]
    fn test_node_builders() {
        let node = DocumentNode::new("n1", "text")
            .with_keyphrases(vec!["kp".into()])
            .with_embedding(vec![1.0, 0.0])
            .with_score(4.5);
        assert_eq!(node.keyphrases, vec!["kp"]);
        assert_eq!(node.embedding.as_deref(), Some(&[1.0, 0.0][..]));
        assert_eq!(node.score, Some(4.5));
    }
}
