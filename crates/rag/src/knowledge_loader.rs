//! Knowledge snapshot loading
//!
//! The knowledge base is chunked and embedded offline; the resulting snapshot
//! (documents + embeddings) is stored as JSON and loaded read-only at startup.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::embeddings::Embedder;
use crate::vector_store::{Document, FlatIndex};
use crate::RagError;

/// One document with its pre-computed embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub document: Document,
    pub embedding: Vec<f32>,
}

/// Serialized knowledge base
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSnapshot {
    /// Embedding dimension of all entries
    pub embedding_dim: usize,
    pub entries: Vec<SnapshotEntry>,
}

impl KnowledgeSnapshot {
    /// Build a `FlatIndex` from this snapshot
    pub fn into_index(self) -> Result<FlatIndex, RagError> {
        let mut index = FlatIndex::new(self.embedding_dim);
        for entry in self.entries {
            index.add(entry.document, entry.embedding)?;
        }
        Ok(index)
    }

    /// Write the snapshot to disk
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RagError> {
        let json = serde_json::to_string(self).map_err(|e| RagError::Snapshot(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| RagError::Snapshot(e.to_string()))
    }
}

/// Load a snapshot file into a ready-to-query index
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<FlatIndex, RagError> {
    let raw = std::fs::read_to_string(path.as_ref())
        .map_err(|e| RagError::Snapshot(format!("{}: {}", path.as_ref().display(), e)))?;
    let snapshot: KnowledgeSnapshot =
        serde_json::from_str(&raw).map_err(|e| RagError::Snapshot(e.to_string()))?;
    let count = snapshot.entries.len();
    let index = snapshot.into_index()?;
    tracing::info!(documents = count, "Knowledge snapshot loaded");
    Ok(index)
}

/// Embed documents with the passage prefix and assemble a snapshot
///
/// This is the offline build path; the runtime never re-embeds passages.
pub fn build_snapshot(
    documents: Vec<Document>,
    embedder: &dyn Embedder,
) -> Result<KnowledgeSnapshot, RagError> {
    let mut entries = Vec::with_capacity(documents.len());
    for document in documents {
        let embedding = embedder.embed_passage(&document.content)?;
        entries.push(SnapshotEntry {
            document,
            embedding,
        });
    }
    Ok(KnowledgeSnapshot {
        embedding_dim: embedder.dim(),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashEmbedder;

    #[test]
    fn test_build_and_round_trip() {
        let embedder = HashEmbedder::default();
        let docs = vec![
            Document::new("1", "We offer seven signature blends").with_source("blends.md"),
            Document::new("2", "Commercial espresso machines and grinders"),
        ];

        let snapshot = build_snapshot(docs, &embedder).unwrap();
        assert_eq!(snapshot.entries.len(), 2);
        assert_eq!(snapshot.embedding_dim, embedder.dim());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        snapshot.save(&path).unwrap();

        let index = load_snapshot(&path).unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_missing_snapshot_errors() {
        assert!(load_snapshot("no/such/file.json").is_err());
    }
}
