//! Text embeddings
//!
//! The real embedding model runs offline when the knowledge snapshot is
//! built; at runtime only query embedding is needed, behind the `Embedder`
//! port so the agent never depends on a specific model.

use cafe_agent_config::constants::rag;

use crate::RagError;

/// Embedding configuration
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Embedding dimension
    pub embedding_dim: usize,
    /// Normalize embeddings to unit length
    pub normalize: bool,
    /// Prefix prepended to queries
    pub query_prefix: String,
    /// Prefix prepended to passages
    pub passage_prefix: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            embedding_dim: rag::EMBEDDING_DIM,
            normalize: true,
            query_prefix: rag::QUERY_PREFIX.to_string(),
            passage_prefix: rag::PASSAGE_PREFIX.to_string(),
        }
    }
}

/// Embedding port
///
/// Implementations must produce unit-length vectors when asked to normalize,
/// since the index scores by inner product.
pub trait Embedder: Send + Sync {
    /// Embed raw text
    fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;

    /// Embedding dimension
    fn dim(&self) -> usize;

    /// Embed a search query (query prefix applied)
    fn embed_query(&self, query: &str) -> Result<Vec<f32>, RagError> {
        self.embed(&format!("{}{}", self.config().query_prefix, query))
    }

    /// Embed a knowledge passage (passage prefix applied)
    fn embed_passage(&self, passage: &str) -> Result<Vec<f32>, RagError> {
        self.embed(&format!("{}{}", self.config().passage_prefix, passage))
    }

    /// Embedding configuration
    fn config(&self) -> &EmbeddingConfig;
}

/// Deterministic hash-based embedder
///
/// Used for tests and offline snapshot builds where the real model is not
/// available. Identical texts always produce identical unit vectors.
pub struct HashEmbedder {
    config: EmbeddingConfig,
}

impl HashEmbedder {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self { config }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(EmbeddingConfig::default())
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut embedding = vec![0.0f32; self.config.embedding_dim];

        for (i, word) in text.to_lowercase().split_whitespace().enumerate() {
            let mut hash: usize = 5381;
            for b in word.bytes() {
                hash = hash.wrapping_mul(33).wrapping_add(b as usize);
            }
            let idx = (hash + i) % self.config.embedding_dim;
            embedding[idx] += 1.0;
        }

        if self.config.normalize {
            let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                for v in &mut embedding {
                    *v /= norm;
                }
            }
        }

        Ok(embedding)
    }

    fn dim(&self) -> usize {
        self.config.embedding_dim
    }

    fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_embedder_normalized() {
        let embedder = HashEmbedder::default();
        let embedding = embedder.embed("seven signature blends").unwrap();

        assert_eq!(embedding.len(), 384);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_hash_embedder_deterministic() {
        let embedder = HashEmbedder::default();
        let a = embedder.embed("bold coffee").unwrap();
        let b = embedder.embed("bold coffee").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_query_prefix_changes_embedding() {
        let embedder = HashEmbedder::default();
        let raw = embedder.embed("delivery schedule").unwrap();
        let query = embedder.embed_query("delivery schedule").unwrap();
        assert_ne!(raw, query);
    }
}
