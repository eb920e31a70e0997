#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("file too large: {0} bytes")]
    FileTooLarge(u64),

    #[error("failed to extract {source_path}: {message}")]
    Extraction {
        source_path: String,
        message: String,
    },

    #[error("invalid splitter config: chunk_size={chunk_size}, chunk_overlap={chunk_overlap}")]
    InvalidSplitter {
        chunk_size: usize,
        chunk_overlap: usize,
    },

    #[error("embedding failed: {0}")]
    Embedding(#[from] ragdesk_llm::LlmError),

    #[error("storage error: {0}")]
    Storage(#[from] crate::vector_store::VectorStoreError),
}

impl DocumentError {
    pub(crate) fn extraction(path: &std::path::Path, message: impl std::fmt::Display) -> Self {
        Self::Extraction {
            source_path: path.display().to_string(),
            message: message.to_string(),
        }
    }
}
