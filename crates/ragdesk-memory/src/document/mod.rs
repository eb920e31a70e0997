pub mod error;
pub mod extract;
pub mod extractor;
pub mod loader;
pub mod pipeline;
pub mod splitter;
pub mod types;

pub use error::DocumentError;
pub use extract::{detect_tables, extract_key_values};
pub use extractor::{ExtractReport, Extracted, Extractor, UnsupportedPolicy};
pub use loader::TextLoader;
pub use pipeline::IngestionPipeline;
pub use splitter::{SplitterConfig, TextSplitter};
pub use types::{Chunk, Document, DocumentKind, KeyValues, Page, Table};

#[cfg(feature = "docx")]
pub use loader::DocxLoader;
#[cfg(feature = "pdf")]
pub use loader::PdfLoader;

/// Default maximum file size: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

pub trait DocumentLoader: Send + Sync {
    fn load(
        &self,
        path: &std::path::Path,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Document, DocumentError>> + Send + '_>,
    >;

    fn supported_extensions(&self) -> &[&str];
}

/// Reject files over `max_size` before reading them.
pub(crate) async fn check_file_size(
    path: &std::path::Path,
    max_size: u64,
) -> Result<(), DocumentError> {
    let meta = tokio::fs::metadata(path).await?;
    if meta.len() > max_size {
        return Err(DocumentError::FileTooLarge(meta.len()));
    }
    Ok(())
}
