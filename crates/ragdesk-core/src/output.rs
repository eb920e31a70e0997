//! On-disk artifacts: per-document extraction results and generated reports.
//!
//! Layout under the output root:
//!
//! ```text
//! key_values/{base}_key_values.json
//! text/{base}_text.txt
//! tables/{base}_table_{i}.csv
//! {stem}.txt, {stem}.md
//! market_research_report.md
//! ```
//!
//! `{base}` is the file stem. When several documents in one batch share a stem,
//! each gets `{stem}_{ext}` instead. Every write replaces the previous file and
//! stale `{base}_table_{i}.csv` files are removed, so re-running on the same input
//! produces byte-identical output.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use ragdesk_memory::{Extracted, Table};
use serde::Serialize;

use crate::error::CoreError;

/// Paths written for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub key_values: PathBuf,
    pub text: PathBuf,
    pub tables: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct OutputWriter {
    root: PathBuf,
}

impl OutputWriter {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write key-values, full text and tables for one extracted document, named by
    /// its file stem.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or file cannot be written.
    pub async fn write_extracted(&self, extracted: &Extracted) -> Result<ArtifactPaths, CoreError> {
        self.write_extracted_as(extracted, &base_name(&extracted.document.source))
            .await
    }

    /// Write every document in `batch` under a distinct base name.
    ///
    /// One result per document, in order. A failed write does not stop the rest.
    pub async fn write_batch(&self, batch: &[Extracted]) -> Vec<Result<ArtifactPaths, CoreError>> {
        let sources: Vec<&str> = batch.iter().map(|e| e.document.source.as_str()).collect();
        let bases = unique_base_names(&sources);
        let mut results = Vec::with_capacity(batch.len());
        for (extracted, base) in batch.iter().zip(&bases) {
            let result = self.write_extracted_as(extracted, base).await;
            if let Err(e) = &result {
                tracing::error!(source = %extracted.document.source, error = %e, "failed to write artifacts");
            }
            results.push(result);
        }
        results
    }

    async fn write_extracted_as(
        &self,
        extracted: &Extracted,
        base: &str,
    ) -> Result<ArtifactPaths, CoreError> {
        let kv_dir = self.root.join("key_values");
        let text_dir = self.root.join("text");
        let table_dir = self.root.join("tables");
        for dir in [&kv_dir, &text_dir, &table_dir] {
            tokio::fs::create_dir_all(dir).await?;
        }

        let key_values = kv_dir.join(format!("{base}_key_values.json"));
        tokio::fs::write(&key_values, to_pretty_json(&extracted.key_values)?).await?;

        let text = text_dir.join(format!("{base}_text.txt"));
        tokio::fs::write(&text, extracted.document.text()).await?;

        remove_stale_tables(&table_dir, base).await?;
        let mut tables = Vec::new();
        for (i, table) in extracted
            .tables()
            .into_iter()
            .filter(|t| !t.headers().is_empty())
            .enumerate()
        {
            let path = table_dir.join(format!("{base}_table_{}.csv", i + 1));
            tokio::fs::write(&path, table_to_csv(table)?).await?;
            tables.push(path);
        }

        tracing::info!(
            source = %extracted.document.source,
            key_values = extracted.key_values.len(),
            tables = tables.len(),
            "wrote extraction artifacts"
        );
        Ok(ArtifactPaths {
            key_values,
            text,
            tables,
        })
    }

    /// Write the extractive/abstractive summary pair as `{stem}.txt` and `{stem}.md`.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be written.
    pub async fn write_summary(
        &self,
        stem: &str,
        extractive: &str,
        abstractive: &str,
    ) -> Result<(PathBuf, PathBuf), CoreError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let txt = self.root.join(format!("{stem}.txt"));
        tokio::fs::write(
            &txt,
            format!(
                "=== Extractive Summary ===\n\n{extractive}\n\n=== Abstractive Summary ===\n\n{abstractive}"
            ),
        )
        .await?;

        let md = self.root.join(format!("{stem}.md"));
        tokio::fs::write(
            &md,
            format!(
                "# Document Summary\n\n## Extractive Summary\n\n{extractive}\n\n## Abstractive Summary\n\n{abstractive}"
            ),
        )
        .await?;

        tracing::info!(txt = %txt.display(), md = %md.display(), "wrote summary");
        Ok((txt, md))
    }

    /// Write a markdown report verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn write_report(&self, file_name: &str, content: &str) -> Result<PathBuf, CoreError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(file_name);
        tokio::fs::write(&path, content).await?;
        tracing::info!(path = %path.display(), "wrote report");
        Ok(path)
    }
}

/// File name without its last extension: `a/report.v2.pdf` -> `report.v2`.
fn base_name(source: &str) -> String {
    let path = Path::new(source);
    path.file_stem()
        .or_else(|| path.file_name())
        .map_or_else(|| source.to_owned(), |s| s.to_string_lossy().into_owned())
}

/// Stems, disambiguated with the extension where two sources share one, then with
/// a numeric suffix if that still collides.
fn unique_base_names(sources: &[&str]) -> Vec<String> {
    let stems: Vec<String> = sources.iter().map(|s| base_name(s)).collect();
    let mut stem_counts: HashMap<&str, usize> = HashMap::new();
    for stem in &stems {
        *stem_counts.entry(stem.as_str()).or_default() += 1;
    }

    let mut taken = HashSet::new();
    let mut bases = Vec::with_capacity(sources.len());
    for (source, stem) in sources.iter().zip(&stems) {
        let mut base = stem.clone();
        if stem_counts[stem.as_str()] > 1
            && let Some(ext) = Path::new(source).extension()
        {
            base = format!("{stem}_{}", ext.to_string_lossy());
        }
        let mut candidate = base.clone();
        let mut n = 2;
        while !taken.insert(candidate.clone()) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        bases.push(candidate);
    }
    bases
}

async fn remove_stale_tables(table_dir: &Path, base: &str) -> Result<(), CoreError> {
    let prefix = format!("{base}_table_");
    let mut entries = tokio::fs::read_dir(table_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(index) = name
            .to_str()
            .and_then(|n| n.strip_prefix(&prefix))
            .and_then(|rest| rest.strip_suffix(".csv"))
        else {
            continue;
        };
        if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) {
            tokio::fs::remove_file(entry.path()).await?;
        }
    }
    Ok(())
}

fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

fn table_to_csv(table: &Table) -> Result<Vec<u8>, CoreError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.headers())?;
    for record in table.records() {
        writer.write_record(&record)?;
    }
    writer
        .into_inner()
        .map_err(|e| CoreError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use ragdesk_memory::{Document, DocumentKind, KeyValues, Page};

    use super::*;

    fn extracted() -> Extracted {
        let table = Table::new(vec![
            vec!["Item".into(), "Qty".into()],
            vec!["Bolts".into(), "12".into()],
            vec!["Nuts, hex".into(), "7".into()],
        ]);
        let mut key_values = KeyValues::new();
        key_values.insert("Invoice".into(), "INV-7".into());
        key_values.insert("Total".into(), "19".into());
        Extracted {
            document: Document {
                source: "in/invoice.2024.pdf".into(),
                kind: DocumentKind::Pdf,
                pages: vec![
                    Page {
                        number: 1,
                        text: "Invoice: INV-7".into(),
                        tables: vec![table],
                    },
                    Page {
                        number: 2,
                        text: "Total: 19".into(),
                        tables: vec![Table::default()],
                    },
                ],
            },
            key_values,
        }
    }

    #[test]
    fn base_name_strips_last_extension() {
        assert_eq!(base_name("docs/report.v2.pdf"), "report.v2");
        assert_eq!(base_name("plain"), "plain");
        assert_eq!(base_name("dir/notes.txt"), "notes");
    }

    #[tokio::test]
    async fn writes_documented_layout() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path());
        let paths = writer.write_extracted(&extracted()).await.unwrap();

        assert_eq!(
            paths.key_values,
            dir.path().join("key_values/invoice.2024_key_values.json")
        );
        assert_eq!(paths.text, dir.path().join("text/invoice.2024_text.txt"));
        assert_eq!(
            paths.tables,
            vec![dir.path().join("tables/invoice.2024_table_1.csv")]
        );

        let json = std::fs::read_to_string(&paths.key_values).unwrap();
        assert_eq!(
            json,
            "{\n    \"Invoice\": \"INV-7\",\n    \"Total\": \"19\"\n}"
        );
        let text = std::fs::read_to_string(&paths.text).unwrap();
        assert_eq!(text, "Invoice: INV-7\nTotal: 19\n");
        let csv = std::fs::read_to_string(&paths.tables[0]).unwrap();
        assert_eq!(csv, "Item,Qty\nBolts,12\n\"Nuts, hex\",7\n");
    }

    #[tokio::test]
    async fn rewriting_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path());
        let first = writer.write_extracted(&extracted()).await.unwrap();
        let before: Vec<Vec<u8>> = [&first.key_values, &first.text, &first.tables[0]]
            .iter()
            .map(|p| std::fs::read(p).unwrap())
            .collect();

        let second = writer.write_extracted(&extracted()).await.unwrap();
        assert_eq!(first, second);
        let after: Vec<Vec<u8>> = [&second.key_values, &second.text, &second.tables[0]]
            .iter()
            .map(|p| std::fs::read(p).unwrap())
            .collect();
        assert_eq!(before, after);
    }

    fn plain(source: &str, text: &str) -> Extracted {
        Extracted {
            document: Document {
                source: source.into(),
                kind: DocumentKind::Txt,
                pages: vec![Page {
                    number: 1,
                    text: text.into(),
                    tables: vec![],
                }],
            },
            key_values: KeyValues::new(),
        }
    }

    #[test]
    fn unique_base_names_only_change_colliding_stems() {
        let bases = unique_base_names(&[
            "in/report.pdf",
            "in/report.txt",
            "in/notes.txt",
            "in/report_pdf.md",
        ]);
        assert_eq!(bases, ["report_pdf", "report_txt", "notes", "report_pdf_2"]);
    }

    #[tokio::test]
    async fn same_stem_documents_do_not_overwrite_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let mut pdf = extracted();
        pdf.document.source = "in/report.pdf".into();
        let txt = plain("in/report.txt", "plain text body");

        let results = OutputWriter::new(dir.path())
            .write_batch(&[pdf, txt])
            .await;
        let pdf_paths = results[0].as_ref().unwrap();
        let txt_paths = results[1].as_ref().unwrap();

        assert_eq!(pdf_paths.text, dir.path().join("text/report_pdf_text.txt"));
        assert_eq!(txt_paths.text, dir.path().join("text/report_txt_text.txt"));
        assert_eq!(
            std::fs::read_to_string(&txt_paths.text).unwrap(),
            "plain text body\n"
        );
        assert_eq!(
            std::fs::read_to_string(&pdf_paths.text).unwrap(),
            "Invoice: INV-7\nTotal: 19\n"
        );
        assert_eq!(
            pdf_paths.tables,
            vec![dir.path().join("tables/report_pdf_table_1.csv")]
        );
        assert!(txt_paths.tables.is_empty());
    }

    #[tokio::test]
    async fn failed_write_does_not_stop_batch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("text/broken_text.txt")).unwrap();

        let results = OutputWriter::new(dir.path())
            .write_batch(&[plain("broken.txt", "a"), plain("fine.txt", "b")])
            .await;
        assert!(results[0].is_err());
        let fine = results[1].as_ref().unwrap();
        assert_eq!(std::fs::read_to_string(&fine.text).unwrap(), "b\n");
    }

    #[tokio::test]
    async fn stale_tables_from_earlier_run_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let tables = dir.path().join("tables");
        std::fs::create_dir_all(&tables).unwrap();
        for name in [
            "invoice.2024_table_1.csv",
            "invoice.2024_table_2.csv",
            "invoice.2024_table_notes.csv",
            "other_table_1.csv",
        ] {
            std::fs::write(tables.join(name), "old").unwrap();
        }

        let paths = OutputWriter::new(dir.path())
            .write_extracted(&extracted())
            .await
            .unwrap();
        assert_eq!(paths.tables, vec![tables.join("invoice.2024_table_1.csv")]);
        assert!(!tables.join("invoice.2024_table_2.csv").exists());
        assert!(tables.join("invoice.2024_table_notes.csv").exists());
        assert!(tables.join("other_table_1.csv").exists());
        assert_ne!(
            std::fs::read_to_string(tables.join("invoice.2024_table_1.csv")).unwrap(),
            "old"
        );
    }

    #[tokio::test]
    async fn empty_key_values_write_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let mut ex = extracted();
        ex.key_values = KeyValues::new();
        let paths = OutputWriter::new(dir.path())
            .write_extracted(&ex)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(paths.key_values).unwrap(), "{}");
    }

    #[tokio::test]
    async fn summary_files_have_both_sections() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path().join("nested"));
        let (txt, md) = writer
            .write_summary("summary_output", "EXT", "ABS")
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(txt).unwrap(),
            "=== Extractive Summary ===\n\nEXT\n\n=== Abstractive Summary ===\n\nABS"
        );
        assert_eq!(
            std::fs::read_to_string(md).unwrap(),
            "# Document Summary\n\n## Extractive Summary\n\nEXT\n\n## Abstractive Summary\n\nABS"
        );
    }

    #[tokio::test]
    async fn report_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path());
        let path = writer
            .write_report("market_research_report.md", "# Report\n\nbody")
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("market_research_report.md"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "# Report\n\nbody");
    }
}
