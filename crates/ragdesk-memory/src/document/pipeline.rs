use std::collections::HashMap;
use std::sync::Arc;

use ragdesk_llm::EmbedFn;
use serde_json::json;
use uuid::Uuid;

use super::{Chunk, Document, DocumentError, TextSplitter};
use crate::index::Index;
use crate::vector_store::{VectorPoint, VectorStore};

/// Split, embed and store documents. Every build gets its own collection named
/// `{collection}-{uuid}`.
pub struct IngestionPipeline {
    splitter: TextSplitter,
    store: Arc<dyn VectorStore>,
    collection: String,
    embed_fn: Arc<EmbedFn>,
}

impl IngestionPipeline {
    pub fn new(
        splitter: TextSplitter,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        embed_fn: EmbedFn,
    ) -> Self {
        Self {
            splitter,
            store,
            collection: collection.into(),
            embed_fn: Arc::new(embed_fn),
        }
    }

    #[must_use]
    pub fn splitter(&self) -> &TextSplitter {
        &self.splitter
    }

    /// Build a fresh index: split every document, embed chunks one at a time and
    /// upsert them into a new collection.
    ///
    /// Indexes built earlier keep their own collections and are unaffected, whether
    /// this build succeeds or fails. Documents with only whitespace contribute no
    /// chunks. With no chunks at all the returned index is empty and no collection
    /// is created.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or storage fails. Nothing is retried; a
    /// partially written collection is removed.
    pub async fn build_index(&self, documents: &[Document]) -> Result<Index, DocumentError> {
        let chunks: Vec<Chunk> = documents
            .iter()
            .filter(|doc| !doc.text().trim().is_empty())
            .flat_map(|doc| self.splitter.split(doc))
            .collect();
        tracing::debug!(
            documents = documents.len(),
            chunks = chunks.len(),
            "split documents"
        );

        if chunks.is_empty() {
            return Ok(self.index(String::new(), 0));
        }

        let collection = format!("{}-{}", self.collection, Uuid::new_v4().simple());
        match self.fill(&collection, &chunks).await {
            Ok(count) => {
                tracing::info!(collection = %collection, chunks = count, "index built");
                Ok(self.index(collection, count))
            }
            Err(e) => {
                if let Err(cleanup) = self.store.delete_collection(&collection).await {
                    tracing::warn!(collection = %collection, error = %cleanup, "failed to remove partial collection");
                }
                Err(e)
            }
        }
    }

    async fn fill(&self, collection: &str, chunks: &[Chunk]) -> Result<usize, DocumentError> {
        let mut points = Vec::with_capacity(chunks.len());
        for (seq, chunk) in chunks.iter().enumerate() {
            let vector = (self.embed_fn)(&chunk.content).await?;
            if seq == 0 {
                self.store
                    .ensure_collection(collection, vector.len() as u64)
                    .await?;
            }
            points.push(VectorPoint {
                id: format!("chunk-{seq:06}"),
                vector,
                payload: chunk_payload(chunk),
            });
        }

        let count = points.len();
        self.store.upsert(collection, points).await?;
        Ok(count)
    }

    fn index(&self, collection: String, chunk_count: usize) -> Index {
        Index::new(
            Arc::clone(&self.store),
            collection,
            Arc::clone(&self.embed_fn),
            chunk_count,
        )
    }
}

fn chunk_payload(chunk: &Chunk) -> HashMap<String, serde_json::Value> {
    HashMap::from([
        ("source".into(), json!(chunk.source)),
        ("chunk_index".into(), json!(chunk.chunk_index)),
        ("start".into(), json!(chunk.start)),
        ("content".into(), json!(chunk.content)),
    ])
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ragdesk_llm::{EmbedFuture, LlmError};

    use super::*;
    use crate::document::{DocumentKind, Page, SplitterConfig};
    use crate::in_memory_store::InMemoryVectorStore;

    fn make_document(source: &str, content: &str) -> Document {
        Document {
            source: source.into(),
            kind: DocumentKind::Txt,
            pages: vec![Page {
                number: 1,
                text: content.into(),
                tables: vec![],
            }],
        }
    }

    fn counting_embed(calls: Arc<AtomicUsize>) -> EmbedFn {
        Box::new(move |text: &str| -> EmbedFuture {
            calls.fetch_add(1, Ordering::SeqCst);
            #[allow(clippy::cast_precision_loss)]
            let v = vec![text.len() as f32, 1.0];
            Box::pin(async move { Ok(v) })
        })
    }

    fn error_embed() -> EmbedFn {
        Box::new(|_text: &str| -> EmbedFuture {
            Box::pin(async move { Err(LlmError::Other("mock embed error".into())) })
        })
    }

    /// Second and later vectors have a different dimension, so the upsert fails.
    fn mismatched_embed() -> EmbedFn {
        let calls = AtomicUsize::new(0);
        Box::new(move |_text: &str| -> EmbedFuture {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            let v = if n == 0 { vec![1.0, 0.0] } else { vec![1.0, 0.0, 0.0] };
            Box::pin(async move { Ok(v) })
        })
    }

    fn pipeline(store: Arc<dyn VectorStore>, embed: EmbedFn) -> IngestionPipeline {
        let splitter = TextSplitter::new(SplitterConfig::new(20, 5)).unwrap();
        IngestionPipeline::new(splitter, store, "docs", embed)
    }

    #[tokio::test]
    async fn build_index_embeds_every_chunk() {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let p = pipeline(Arc::clone(&store), counting_embed(Arc::clone(&calls)));

        let docs = [
            make_document("a.txt", "alpha beta gamma delta epsilon zeta"),
            make_document("b.txt", "short"),
        ];
        let index = p.build_index(&docs).await.unwrap();

        let expected: usize = docs.iter().map(|d| p.splitter().split(d).len()).sum();
        assert_eq!(index.chunk_count(), expected);
        assert_eq!(calls.load(Ordering::SeqCst), expected);
        assert!(index.collection().starts_with("docs-"));
        assert_eq!(store.count(index.collection()).await.unwrap() as usize, expected);
    }

    fn sources(result: &crate::RetrievalResult) -> Vec<&str> {
        result.chunks.iter().map(|c| c.chunk.source.as_str()).collect()
    }

    #[tokio::test]
    async fn rebuild_leaves_earlier_index_intact() {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let p = pipeline(Arc::clone(&store), counting_embed(calls));

        let old = p
            .build_index(&[make_document("a.txt", &"word ".repeat(40))])
            .await
            .unwrap();
        let old_count = old.chunk_count();
        let new = p
            .build_index(&[make_document("b.txt", "tiny")])
            .await
            .unwrap();

        assert_ne!(old.collection(), new.collection());
        assert_eq!(new.chunk_count(), 1);
        assert_eq!(store.count(new.collection()).await.unwrap(), 1);
        assert_eq!(
            store.count(old.collection()).await.unwrap() as usize,
            old_count
        );

        let result = old.query("word", 4).await.unwrap();
        assert_eq!(result.len(), 4);
        assert!(sources(&result).iter().all(|s| *s == "a.txt"));
        assert_eq!(sources(&new.query("tiny", 4).await.unwrap()), ["b.txt"]);
    }

    #[tokio::test]
    async fn failed_rebuild_keeps_earlier_index_queryable() {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let good = pipeline(Arc::clone(&store), counting_embed(calls));
        let old = good
            .build_index(&[make_document("a.txt", &"word ".repeat(40))])
            .await
            .unwrap();

        let failing = pipeline(Arc::clone(&store), error_embed());
        assert!(
            failing
                .build_index(&[make_document("b.txt", "other text")])
                .await
                .is_err()
        );

        let result = old.query("word", 4).await.unwrap();
        assert_eq!(result.len(), 4);
        assert!(sources(&result).iter().all(|s| *s == "a.txt"));
    }

    #[tokio::test]
    async fn failed_upsert_removes_partial_collection() {
        let store = Arc::new(InMemoryVectorStore::new());
        let p = pipeline(
            Arc::clone(&store) as Arc<dyn VectorStore>,
            mismatched_embed(),
        );
        let err = p
            .build_index(&[make_document("a.txt", &"word ".repeat(40))])
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Storage(_)));
        assert_eq!(store.collection_names().len(), 0);
    }

    #[tokio::test]
    async fn discard_deletes_collection() {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let p = pipeline(Arc::clone(&store), counting_embed(calls));
        let index = p
            .build_index(&[make_document("a.txt", "some content here")])
            .await
            .unwrap();
        let name = index.collection().to_owned();
        assert!(store.collection_exists(&name).await.unwrap());

        index.discard().await.unwrap();
        assert!(!store.collection_exists(&name).await.unwrap());
    }

    #[tokio::test]
    async fn whitespace_documents_yield_empty_index() {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let p = pipeline(Arc::clone(&store), counting_embed(Arc::clone(&calls)));

        let index = p
            .build_index(&[make_document("e.txt", "  \n ")])
            .await
            .unwrap();
        assert!(index.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(index.collection().is_empty());

        let result = index.query("anything", 4).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn embedding_error_propagates() {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let p = pipeline(store, error_embed());
        let err = p
            .build_index(&[make_document("a.txt", "some content here")])
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Embedding(_)));
    }

    #[test]
    fn payload_carries_chunk_fields() {
        let chunk = Chunk {
            content: "text".into(),
            source: "a.txt".into(),
            chunk_index: 2,
            start: 30,
        };
        let payload = chunk_payload(&chunk);
        assert_eq!(payload["source"], "a.txt");
        assert_eq!(payload["chunk_index"], 2);
        assert_eq!(payload["start"], 30);
        assert_eq!(payload["content"], "text");
    }
}
