use std::path::Path;
use std::pin::Pin;

use super::super::extract::detect_tables;
use super::super::{
    DEFAULT_MAX_FILE_SIZE, Document, DocumentError, DocumentKind, DocumentLoader, Page,
    check_file_size,
};

pub struct PdfLoader {
    pub max_file_size: u64,
}

impl Default for PdfLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl DocumentLoader for PdfLoader {
    fn load(
        &self,
        path: &Path,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Document, DocumentError>> + Send + '_>>
    {
        let path = path.to_path_buf();
        let max_size = self.max_file_size;
        Box::pin(async move {
            check_file_size(&path, max_size).await?;
            let bytes = tokio::fs::read(&path).await?;

            let err_path = path.clone();
            let texts = tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text_from_mem_by_pages(&bytes)
                    .map_err(|e| DocumentError::extraction(&err_path, e))
            })
            .await
            .map_err(|e| DocumentError::Io(std::io::Error::other(e)))??;

            let pages = pages_from_texts(texts);
            tracing::debug!(source = %path.display(), pages = pages.len(), "pdf parsed");

            Ok(Document {
                source: path.display().to_string(),
                kind: DocumentKind::Pdf,
                pages,
            })
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }
}

fn pages_from_texts(texts: Vec<String>) -> Vec<Page> {
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| Page {
            number: i + 1,
            tables: detect_tables(&text),
            text,
        })
        .collect()
}
