//! In-memory vector store with cosine search and JSON persistence.
//!
//! The store is a map of id to record, searched by brute-force cosine
//! similarity. It has no index and no ANN structure; every search touches
//! every record, which is the right trade-off for the few-thousand-record
//! stores agents accumulate locally.
//!
//! Persistence is a whole-file JSON overwrite of the map. Loading from a
//! missing file is a no-op, so a fresh process starts empty and the first
//! `persist` creates the file.

use crate::agent::Agent;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One stored prompt and its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorRecord {
    #[serde(default)]
    pub id: String,
    pub prompt: String,
    pub embedding: Vec<f64>,
    /// Similarity to the query of the search that produced this record.
    /// Transient; never persisted.
    #[serde(skip)]
    pub similarity: f64,
}

impl VectorRecord {
    pub fn new(prompt: impl Into<String>, embedding: Vec<f64>) -> Self {
        Self {
            id: String::new(),
            prompt: prompt.into(),
            embedding,
            similarity: 0.0,
        }
    }
}

/// Cosine similarity of two vectors.
///
/// Mismatched dimensions or a zero-magnitude side yield 0.0 rather than an
/// error: such records simply never match.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Map of record id to [`VectorRecord`], serialized transparently so the
/// persisted file is the map itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryVectorStore {
    records: HashMap<String, VectorRecord>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert or replace a record. An empty id gets a generated UUID.
    /// Returns the record as stored.
    pub fn save(&mut self, mut record: VectorRecord) -> VectorRecord {
        if record.id.is_empty() {
            record.id = uuid::Uuid::new_v4().to_string();
        }
        self.records.insert(record.id.clone(), record.clone());
        record
    }

    pub fn get(&self, id: &str) -> Option<&VectorRecord> {
        self.records.get(id)
    }

    /// All records, in no particular order.
    pub fn get_all(&self) -> Vec<VectorRecord> {
        self.records.values().cloned().collect()
    }

    /// Records whose cosine similarity to `embedding` meets `threshold`.
    ///
    /// Each returned record carries its similarity. No ordering guarantee.
    pub fn search_similarities(&self, embedding: &[f64], threshold: f64) -> Vec<VectorRecord> {
        self.records
            .values()
            .filter_map(|record| {
                let similarity = cosine_similarity(&record.embedding, embedding);
                if similarity >= threshold {
                    let mut found = record.clone();
                    found.similarity = similarity;
                    Some(found)
                } else {
                    None
                }
            })
            .collect()
    }

    /// The `n` most similar records at or above `threshold`, ordered by
    /// descending similarity.
    pub fn search_top_n(&self, embedding: &[f64], threshold: f64, n: usize) -> Vec<VectorRecord> {
        let mut found = self.search_similarities(embedding, threshold);
        found.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        found.truncate(n);
        found
    }

    /// Write the whole store to `path` as JSON, replacing the file.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(&self)?;
        std::fs::write(path.as_ref(), json)
            .map_err(|e| Error::other(format!("failed to write vector store: {e}")))?;
        tracing::debug!(records = self.records.len(), path = %path.as_ref().display(), "persisted vector store");
        Ok(())
    }

    /// Replace the store's contents from a JSON file.
    ///
    /// A missing file is a no-op: the store keeps its current contents.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(());
        }

        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::other(format!("failed to read vector store: {e}")))?;
        let loaded: MemoryVectorStore = serde_json::from_str(&json)?;
        self.records = loaded.records;
        Ok(())
    }

    /// Drop every record and persist the now-empty store to `path`.
    pub fn reset(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.records.clear();
        self.persist(path)
    }
}

impl Agent {
    pub fn store(&self) -> &MemoryVectorStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut MemoryVectorStore {
        &mut self.store
    }

    /// Compute an embedding for `text` with the configured embedding model.
    pub async fn create_embedding(&self, text: &str) -> Result<Vec<f64>> {
        let model = self
            .config
            .embedding_model
            .as_deref()
            .ok_or_else(|| Error::config("embedding_model is required for vector memory"))?;
        self.backend.embed(model, text).await
    }

    /// Store a pre-computed embedding. An empty `id` gets a generated UUID.
    pub fn save_embedding(
        &mut self,
        text: impl Into<String>,
        embedding: Vec<f64>,
        id: impl Into<String>,
    ) -> VectorRecord {
        let mut record = VectorRecord::new(text, embedding);
        record.id = id.into();
        self.store.save(record)
    }

    /// Embed and store each chunk in turn.
    ///
    /// Stops at the first embedding failure; chunks already stored stay in
    /// the store.
    pub async fn save_embeddings_from_chunks(&mut self, chunks: &[String]) -> Result<()> {
        for chunk in chunks {
            let embedding = self.create_embedding(chunk).await?;
            self.store.save(VectorRecord::new(chunk.clone(), embedding));
        }
        tracing::debug!(agent = %self.name, chunks = chunks.len(), "saved embeddings from chunks");
        Ok(())
    }

    /// Embed `text` and return the prompts of all records meeting `threshold`.
    pub async fn search_similarities_with_text(
        &self,
        text: &str,
        threshold: f64,
    ) -> Result<Vec<String>> {
        let embedding = self.create_embedding(text).await?;
        Ok(self
            .store
            .search_similarities(&embedding, threshold)
            .into_iter()
            .map(|record| record.prompt)
            .collect())
    }

    /// Embed `text` and return the prompts of the `n` best records meeting
    /// `threshold`, most similar first.
    pub async fn search_top_n_with_text(
        &self,
        text: &str,
        threshold: f64,
        n: usize,
    ) -> Result<Vec<String>> {
        let embedding = self.create_embedding(text).await?;
        Ok(self
            .store
            .search_top_n(&embedding, threshold, n)
            .into_iter()
            .map(|record| record.prompt)
            .collect())
    }

    fn store_path(&self) -> Result<PathBuf> {
        self.config
            .store_path
            .clone()
            .ok_or_else(|| Error::config("store_path is required for persistence"))
    }

    /// Persist the store to the configured `store_path`.
    pub fn persist_store(&self) -> Result<()> {
        let path = self.store_path()?;
        self.store.persist(path)
    }

    /// Load the store from the configured `store_path` (no-op when absent).
    pub fn load_store(&mut self) -> Result<()> {
        let path = self.store_path()?;
        self.store.load(path)
    }

    /// Clear the store and persist the empty state to `store_path`.
    pub fn reset_store(&mut self) -> Result<()> {
        let path = self.store_path()?;
        self.store.reset(path)
    }
}
