//! Knowledge retrieval
//!
//! A flat in-memory vector index over pre-normalized embeddings, built once
//! offline and loaded read-only. Queries are embedded with a query prefix and
//! matched by inner product; results are formatted as a numbered context
//! block for LLM prompts.

pub mod embeddings;
pub mod knowledge_loader;
pub mod retriever;
pub mod vector_store;

pub use embeddings::{Embedder, EmbeddingConfig, HashEmbedder};
pub use knowledge_loader::{build_snapshot, load_snapshot, KnowledgeSnapshot, SnapshotEntry};
pub use retriever::{Retriever, RetrieverConfig};
pub use vector_store::{Document, FlatIndex, SearchHit};

use thiserror::Error;

/// Retrieval errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}
