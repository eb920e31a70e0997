//! Document extraction, chunking and vector retrieval.

pub mod document;
pub mod in_memory_store;
pub mod index;
#[cfg(feature = "qdrant")]
pub mod qdrant_ops;
pub mod retriever;
pub mod vector_store;

pub use document::{
    Chunk, Document, DocumentError, DocumentKind, DocumentLoader, ExtractReport, Extracted,
    Extractor, IngestionPipeline, KeyValues, Page, SplitterConfig, Table, TextSplitter,
    UnsupportedPolicy,
};
pub use in_memory_store::InMemoryVectorStore;
pub use index::{Index, RetrievalResult, ScoredChunk};
#[cfg(feature = "qdrant")]
pub use qdrant_ops::QdrantOps;
pub use retriever::{RetrievalConfig, Retriever};
pub use vector_store::{ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError};
