use std::path::{Path, PathBuf};

use super::extract::extract_key_values;
use super::{
    DEFAULT_MAX_FILE_SIZE, Document, DocumentError, DocumentKind, DocumentLoader, KeyValues,
    Table, TextLoader,
};

/// What to do with a file whose extension no loader handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnsupportedPolicy {
    /// Log a warning and move on.
    #[default]
    Skip,
    /// Report [`DocumentError::UnsupportedFormat`].
    Fail,
}

/// A loaded document plus the structure mined from it.
#[derive(Debug, Clone)]
pub struct Extracted {
    pub document: Document,
    pub key_values: KeyValues,
}

impl Extracted {
    #[must_use]
    pub fn tables(&self) -> Vec<&Table> {
        self.document.tables()
    }
}

/// Outcome of a directory scan. Failures are per file and never abort the scan.
#[derive(Debug, Default)]
pub struct ExtractReport {
    pub extracted: Vec<Extracted>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, DocumentError)>,
}

/// Dispatches files to the loader for their [`DocumentKind`].
pub struct Extractor {
    text: TextLoader,
    #[cfg(feature = "pdf")]
    pdf: super::PdfLoader,
    #[cfg(feature = "docx")]
    docx: super::DocxLoader,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::with_max_file_size(DEFAULT_MAX_FILE_SIZE)
    }
}

impl Extractor {
    #[must_use]
    pub fn with_max_file_size(max_file_size: u64) -> Self {
        Self {
            text: TextLoader { max_file_size },
            #[cfg(feature = "pdf")]
            pdf: super::PdfLoader { max_file_size },
            #[cfg(feature = "docx")]
            docx: super::DocxLoader { max_file_size },
        }
    }

    fn loader_for(&self, kind: DocumentKind) -> Option<&dyn DocumentLoader> {
        match kind {
            DocumentKind::Txt => Some(&self.text),
            #[cfg(feature = "pdf")]
            DocumentKind::Pdf => Some(&self.pdf),
            #[cfg(feature = "docx")]
            DocumentKind::Docx => Some(&self.docx),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    /// Load a single file.
    ///
    /// # Errors
    ///
    /// Returns the loader error, or [`DocumentError::UnsupportedFormat`] under
    /// [`UnsupportedPolicy::Fail`].
    pub async fn load(
        &self,
        path: &Path,
        policy: UnsupportedPolicy,
    ) -> Result<Option<Document>, DocumentError> {
        let loader = DocumentKind::from_path(path)
            .ok()
            .and_then(|kind| self.loader_for(kind));
        let Some(loader) = loader else {
            return match policy {
                UnsupportedPolicy::Skip => {
                    tracing::warn!(path = %path.display(), "skipping unsupported file");
                    Ok(None)
                }
                UnsupportedPolicy::Fail => Err(DocumentError::UnsupportedFormat(
                    path.display().to_string(),
                )),
            };
        };
        loader.load(path).await.map(Some)
    }

    /// Load a file and mine its key-value pairs.
    ///
    /// # Errors
    ///
    /// See [`Extractor::load`].
    pub async fn extract(
        &self,
        path: &Path,
        policy: UnsupportedPolicy,
    ) -> Result<Option<Extracted>, DocumentError> {
        let Some(document) = self.load(path, policy).await? else {
            return Ok(None);
        };
        let key_values = extract_key_values(&document.text());
        tracing::info!(
            source = %document.source,
            kind = %document.kind,
            pages = document.pages.len(),
            tables = document.tables().len(),
            key_values = key_values.len(),
            "extracted document"
        );
        Ok(Some(Extracted {
            document,
            key_values,
        }))
    }

    /// Extract every regular file directly under `dir`, in file-name order, one at a time.
    ///
    /// # Errors
    ///
    /// Returns an error only if the directory itself cannot be read.
    pub async fn extract_dir(
        &self,
        dir: &Path,
        policy: UnsupportedPolicy,
    ) -> Result<ExtractReport, DocumentError> {
        let files = list_files(dir).await?;
        let mut report = ExtractReport::default();

        for path in files {
            match self.extract(&path, policy).await {
                Ok(Some(extracted)) => report.extracted.push(extracted),
                Ok(None) => report.skipped.push(path),
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "extraction failed");
                    report.failed.push((path, e));
                }
            }
        }

        tracing::info!(
            dir = %dir.display(),
            extracted = report.extracted.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "directory scan complete"
        );
        Ok(report)
    }

    /// Load several files, skipping unsupported ones per `policy`.
    ///
    /// # Errors
    ///
    /// Stops at the first load failure.
    pub async fn load_all(
        &self,
        paths: &[PathBuf],
        policy: UnsupportedPolicy,
    ) -> Result<Vec<Document>, DocumentError> {
        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(doc) = self.load(path, policy).await? {
                documents.push(doc);
            }
        }
        Ok(documents)
    }
}

async fn list_files(dir: &Path) -> Result<Vec<PathBuf>, DocumentError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
