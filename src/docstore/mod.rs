//! Document nodes and the node store.
//!
//! The store supplies randomized, deterministic-count samples of node
//! contexts to the scheduler and neighbor lookups to the multi-context
//! evolution. Chunking, keyphrase extraction, and embedding computation
//! happen upstream; the store only holds their results.

pub mod node;
pub mod store;

pub use node::{DocumentNode, NodeContext};
pub use store::{DocumentStore, InMemoryDocumentStore};
