use std::sync::Arc;

use ragdesk_llm::EmbedFn;

use crate::document::{Chunk, DocumentError};
use crate::vector_store::{ScoredVectorPoint, VectorStore};

/// A chunk returned by a similarity query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Chunks ordered from most to least similar.
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    pub chunks: Vec<ScoredChunk>,
}

impl RetrievalResult {
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(|c| c.chunk.content.as_str())
    }
}

/// A built, read-only collection of embedded chunks.
///
/// Built by [`crate::IngestionPipeline::build_index`]; to change the contents,
/// build a new one. Each index owns its store collection exclusively, so
/// rebuilding never alters an index that is still in use. The collection is
/// deleted when the index is dropped, or explicitly with [`Index::discard`].
pub struct Index {
    store: Arc<dyn VectorStore>,
    collection: String,
    embed_fn: Arc<EmbedFn>,
    chunk_count: usize,
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("collection", &self.collection)
            .field("chunk_count", &self.chunk_count)
            .finish_non_exhaustive()
    }
}

impl Index {
    pub(crate) fn new(
        store: Arc<dyn VectorStore>,
        collection: String,
        embed_fn: Arc<EmbedFn>,
        chunk_count: usize,
    ) -> Self {
        Self {
            store,
            collection,
            embed_fn,
            chunk_count,
        }
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunk_count == 0
    }

    /// Delete the backing collection now instead of on drop.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the deletion.
    pub async fn discard(mut self) -> Result<(), DocumentError> {
        let collection = std::mem::take(&mut self.collection);
        if self.chunk_count > 0 {
            self.store.delete_collection(&collection).await?;
            tracing::debug!(collection = %collection, "index discarded");
        }
        Ok(())
    }

    /// Embed `text` and return up to `k` nearest chunks.
    ///
    /// An empty index or `k == 0` returns an empty result without embedding.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or the store search fails.
    pub async fn query(&self, text: &str, k: usize) -> Result<RetrievalResult, DocumentError> {
        if self.is_empty() || k == 0 {
            return Ok(RetrievalResult::default());
        }
        let vector = (self.embed_fn)(text).await?;
        let points = self
            .store
            .search(&self.collection, vector, k as u64)
            .await?;
        let chunks: Vec<ScoredChunk> = points.into_iter().filter_map(scored_chunk).collect();
        tracing::debug!(k, returned = chunks.len(), "index query");
        Ok(RetrievalResult { chunks })
    }
}

impl Drop for Index {
    fn drop(&mut self) {
        if self.chunk_count == 0 || self.collection.is_empty() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(collection = %self.collection, "no runtime, collection left in store");
            return;
        };
        let store = Arc::clone(&self.store);
        let collection = std::mem::take(&mut self.collection);
        handle.spawn(async move {
            if let Err(e) = store.delete_collection(&collection).await {
                tracing::warn!(collection = %collection, error = %e, "failed to delete index collection");
            }
        });
    }
}

fn scored_chunk(point: ScoredVectorPoint) -> Option<ScoredChunk> {
    let content = point.payload.get("content")?.as_str()?.to_owned();
    let source = point
        .payload
        .get("source")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_owned();
    let as_usize = |key: &str| {
        point
            .payload
            .get(key)
            .and_then(serde_json::Value::as_u64)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or_default()
    };
    Some(ScoredChunk {
        chunk: Chunk {
            content,
            source,
            chunk_index: as_usize("chunk_index"),
            start: as_usize("start"),
        },
        score: point.score,
    })
}
