use crate::embeddings::{cosine_similarity, HashEmbedder};
use crate::error::Result;
use crate::templates::render_chunk;
use serde::Serialize;
use sheet_context_chunker::Chunk;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

/// Cached embedding of one chunk, valid while the fingerprint matches
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingRecord {
    pub chunk_id: String,
    pub fingerprint: String,
    pub vector: Arc<[f32]>,
    pub created_at: SystemTime,
}

/// Chunk id -> embedding record, recomputed only on fingerprint change
#[derive(Debug, Default)]
pub struct EmbeddingStore {
    embedder: HashEmbedder,
    records: HashMap<String, EmbeddingRecord>,
}

impl EmbeddingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dimension(dimension: usize) -> Result<Self> {
        Ok(Self {
            embedder: HashEmbedder::new(dimension)?,
            records: HashMap::new(),
        })
    }

    pub const fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Embedding for a chunk.
    ///
    /// A record with the same id and fingerprint is returned as the very
    /// same allocation unless `force_refresh` is set.
    pub fn embed(&mut self, chunk: &Chunk, force_refresh: bool) -> Arc<[f32]> {
        if !force_refresh {
            if let Some(record) = self.records.get(&chunk.id) {
                if record.fingerprint == chunk.fingerprint {
                    return Arc::clone(&record.vector);
                }
            }
        }

        let vector: Arc<[f32]> = self.embedder.embed(&render_chunk(chunk)).into();
        log::debug!("Embedded {} ({} dims)", chunk.id, vector.len());

        self.records.insert(
            chunk.id.clone(),
            EmbeddingRecord {
                chunk_id: chunk.id.clone(),
                fingerprint: chunk.fingerprint.clone(),
                vector: Arc::clone(&vector),
                created_at: SystemTime::now(),
            },
        );
        vector
    }

    /// Embed free text with the same embedder used for chunks
    pub fn embed_query(&self, text: &str) -> Vec<f32> {
        self.embedder.embed(text)
    }

    /// Top `top_n` chunk ids by cosine similarity to `query`.
    ///
    /// Sorted by descending similarity; ties keep input order.
    pub fn similar_to(&mut self, query: &str, chunks: &[&Chunk], top_n: usize) -> Vec<(String, f32)> {
        let query_vector = self.embed_query(query);
        let mut scored: Vec<(String, f32)> = chunks
            .iter()
            .map(|chunk| {
                let vector = self.embed(chunk, false);
                (chunk.id.clone(), cosine_similarity(&query_vector, &vector))
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_n);
        scored
    }

    pub fn get(&self, id: &str) -> Option<&EmbeddingRecord> {
        self.records.get(id)
    }

    /// Drop records whose id fails `keep`; returns how many were dropped
    pub fn retain_ids<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let before = self.records.len();
        self.records.retain(|id, _| keep(id));
        let pruned = before - self.records.len();
        if pruned > 0 {
            log::debug!("Pruned {pruned} orphaned embeddings");
        }
        pruned
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
