use std::path::Path;
use std::pin::Pin;

use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, RunChild, TableCellContent, TableChild,
    TableRowChild,
};

use super::super::{
    DEFAULT_MAX_FILE_SIZE, Document, DocumentError, DocumentKind, DocumentLoader, Page, Table,
    check_file_size,
};

pub struct DocxLoader {
    pub max_file_size: u64,
}

impl Default for DocxLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl DocumentLoader for DocxLoader {
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
            let page = tokio::task::spawn_blocking(move || parse_docx(&bytes, &err_path))
                .await
                .map_err(|e| DocumentError::Io(std::io::Error::other(e)))??;

            Ok(Document {
                source: path.display().to_string(),
                kind: DocumentKind::Docx,
                pages: vec![page],
            })
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["docx"]
    }
}

/// Paragraphs become lines; table rows are rendered tab-separated in place so
/// their text stays searchable, and are also returned as [`Table`]s.
fn parse_docx(bytes: &[u8], path: &Path) -> Result<Page, DocumentError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| DocumentError::extraction(path, e))?;

    let mut lines = Vec::new();
    let mut tables = Vec::new();

    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => lines.push(paragraph_text(p)),
            DocumentChild::Table(t) => {
                let mut rows = Vec::new();
                for row in &t.rows {
                    #[allow(irrefutable_let_patterns)]
                    let TableChild::TableRow(row) = row else {
                        continue;
                    };
                    #[allow(irrefutable_let_patterns)]
                    let cells: Vec<String> = row
                        .cells
                        .iter()
                        .filter_map(|cell| {
                            if let TableRowChild::TableCell(cell) = cell {
                                Some(cell_text(&cell.children))
                            } else {
                                None
                            }
                        })
                        .collect();
                    lines.push(cells.join("\t"));
                    rows.push(cells);
                }
                if !rows.is_empty() {
                    tables.push(Table::new(rows));
                }
            }
            _ => {}
        }
    }

    Ok(Page {
        number: 1,
        text: lines.join("\n"),
        tables,
    })
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for rc in &run.children {
                if let RunChild::Text(t) = rc {
                    text.push_str(&t.text);
                }
            }
        }
    }
    text
}

fn cell_text(contents: &[TableCellContent]) -> String {
    contents
        .iter()
        .filter_map(|c| match c {
            TableCellContent::Paragraph(p) => Some(paragraph_text(p)),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_owned()
}
