//! k-nearest-neighbor retrieval over the persisted index pair.

use std::sync::Arc;

use coderag_llm::EmbeddingService;
use serde::Serialize;

use crate::chunker::CodeChunk;
use crate::error::Result;
use crate::flat::FlatIndex;
use crate::store::IndexStore;

/// A retrieved chunk with its raw squared-L2 distance (lower is closer).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    #[serde(flatten)]
    pub chunk: CodeChunk,
    pub score: f32,
}

pub struct CodeRetriever {
    store: Arc<IndexStore>,
    embedder: Arc<EmbeddingService>,
}

impl CodeRetriever {
    #[must_use]
    pub fn new(store: Arc<IndexStore>, embedder: Arc<EmbeddingService>) -> Self {
        Self { store, embedder }
    }

    /// The `k` chunks closest to `query`, closest first.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotBuilt`](crate::IndexError::NotBuilt) before
    /// any successful ingest, or an error if the artifacts cannot be read.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<QueryResult>> {
        let store = Arc::clone(&self.store);
        let loaded = tokio::task::spawn_blocking(move || store.load()).await??;

        let query_vector = self.embedder.embed(query).await;
        let results = rank(&loaded.index, &loaded.records, &query_vector, k)?;

        tracing::debug!(
            k,
            indexed = loaded.records.len(),
            returned = results.len(),
            "retrieval complete"
        );
        Ok(results)
    }
}

/// Search `index` and attach the metadata record at each returned position.
/// Positions with no matching record are dropped.
///
/// # Errors
///
/// Returns an error if `query` does not match the index dimension.
pub fn rank(
    index: &FlatIndex,
    records: &[CodeChunk],
    query: &[f32],
    k: usize,
) -> Result<Vec<QueryResult>> {
    let neighbors = index.search(query, k)?;
    Ok(neighbors
        .into_iter()
        .filter_map(|n| {
            let Some(record) = records.get(n.position) else {
                tracing::warn!(position = n.position, "index position without metadata, dropped");
                return None;
            };
            Some(QueryResult {
                chunk: record.clone(),
                score: n.distance,
            })
        })
        .collect())
}
