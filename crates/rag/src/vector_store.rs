//! Flat in-memory vector index
//!
//! Inner-product similarity over pre-normalized vectors. The index is built
//! once offline and loaded read-only; there is no eviction or incremental
//! update path.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::RagError;

/// Knowledge-base document chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique id
    pub id: String,
    /// Chunk text
    pub content: String,
    /// Source file or page
    #[serde(default)]
    pub source: Option<String>,
    /// Category/type
    #[serde(default)]
    pub category: Option<String>,
    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            source: None,
            category: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// A scored search hit
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Inner-product similarity score
    pub score: f32,
    /// Matched document
    pub document: Document,
}

/// Flat vector index
pub struct FlatIndex {
    dim: usize,
    vectors: Vec<Vec<f32>>,
    documents: Vec<Document>,
}

impl FlatIndex {
    /// Create an empty index for the given dimension
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            vectors: Vec::new(),
            documents: Vec::new(),
        }
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Embedding dimension
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Add a document with its pre-computed embedding
    pub fn add(&mut self, document: Document, embedding: Vec<f32>) -> Result<(), RagError> {
        if embedding.len() != self.dim {
            return Err(RagError::Index(format!(
                "Embedding dimension mismatch: {} != {}",
                embedding.len(),
                self.dim
            )));
        }
        self.vectors.push(embedding);
        self.documents.push(document);
        Ok(())
    }

    /// Top-k search by inner product
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>, RagError> {
        if query.len() != self.dim {
            return Err(RagError::Index(format!(
                "Query dimension mismatch: {} != {}",
                query.len(),
                self.dim
            )));
        }
        if top_k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f32, usize)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let score: f32 = v.iter().zip(query.iter()).map(|(a, b)| a * b).sum();
                (score, i)
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, i)| SearchHit {
                score,
                document: self.documents[i].clone(),
            })
            .collect())
    }
}
