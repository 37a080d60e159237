//! Retriever
//!
//! Embeds the query with the query prefix, runs a top-k inner-product search
//! against the flat index, and formats the hits as a numbered context block.

use std::sync::Arc;

use cafe_agent_config::constants::rag;

use crate::embeddings::Embedder;
use crate::vector_store::{FlatIndex, SearchHit};
use crate::RagError;

/// Retriever configuration
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Default number of chunks to return
    pub top_k: usize,
    /// Minimum similarity score
    pub min_score: f32,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            top_k: rag::DEFAULT_TOP_K,
            min_score: rag::MIN_SCORE,
        }
    }
}

/// Query-side retrieval over a read-only index
pub struct Retriever {
    index: FlatIndex,
    embedder: Arc<dyn Embedder>,
    config: RetrieverConfig,
}

impl Retriever {
    pub fn new(index: FlatIndex, embedder: Arc<dyn Embedder>, config: RetrieverConfig) -> Self {
        Self {
            index,
            embedder,
            config,
        }
    }

    /// Number of indexed documents
    pub fn document_count(&self) -> usize {
        self.index.len()
    }

    /// Retrieve the top-k most similar chunks for a query
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, RagError> {
        let query_embedding = self.embedder.embed_query(query)?;
        let hits = self.index.search(&query_embedding, k.max(1))?;

        Ok(hits
            .into_iter()
            .filter(|h| h.score >= self.config.min_score)
            .collect())
    }

    /// Retrieve using the configured default top-k
    pub fn retrieve_default(&self, query: &str) -> Result<Vec<SearchHit>, RagError> {
        self.retrieve(query, self.config.top_k)
    }

    /// Format hits as a numbered context block for LLM prompts
    pub fn format_context(&self, hits: &[SearchHit]) -> String {
        if hits.is_empty() {
            return String::new();
        }

        let mut parts = Vec::with_capacity(hits.len());
        for (i, hit) in hits.iter().enumerate() {
            let source = hit.document.source.as_deref().unwrap_or("knowledge base");
            parts.push(format!("[{} - {}]\n{}", i + 1, source, hit.document.content));
        }
        parts.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashEmbedder;
    use crate::knowledge_loader::build_snapshot;
    use crate::vector_store::Document;

    fn test_retriever() -> Retriever {
        let embedder = Arc::new(HashEmbedder::default());
        let docs = vec![
            Document::new("1", "We offer seven signature blends from bold to balanced")
                .with_source("blends.md"),
            Document::new("2", "Commercial espresso machines, grinders, and setup help")
                .with_source("equipment.md"),
            Document::new("3", "Barista training programs for your whole team")
                .with_source("training.md"),
        ];
        let index = build_snapshot(docs, embedder.as_ref())
            .unwrap()
            .into_index()
            .unwrap();
        Retriever::new(index, embedder, RetrieverConfig::default())
    }

    #[test]
    fn test_retrieve_finds_matching_chunk() {
        let retriever = test_retriever();
        let hits = retriever.retrieve("what espresso machines do you offer", 2).unwrap();
        assert!(!hits.is_empty());
        assert!(hits.len() <= 2);
    }

    #[test]
    fn test_format_context_numbers_chunks() {
        let retriever = test_retriever();
        let hits = retriever.retrieve("signature blends", 2).unwrap();
        let context = retriever.format_context(&hits);
        assert!(context.starts_with("[1 - "));
    }

    #[test]
    fn test_format_context_empty() {
        let retriever = test_retriever();
        assert_eq!(retriever.format_context(&[]), "");
    }

    #[test]
    fn test_retrieve_idempotent() {
        let retriever = test_retriever();
        let a = retriever.retrieve_default("training programs").unwrap();
        let b = retriever.retrieve_default("training programs").unwrap();
        let ids_a: Vec<_> = a.iter().map(|h| h.document.id.clone()).collect();
        let ids_b: Vec<_> = b.iter().map(|h| h.document.id.clone()).collect();
        assert_eq!(ids_a, ids_b);
    }
}
