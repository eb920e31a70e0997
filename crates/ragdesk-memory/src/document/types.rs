use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::DocumentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Docx,
    Txt,
}

impl DocumentKind {
    /// Detect the kind from the file extension (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::UnsupportedFormat`] for unknown or missing extensions.
    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "txt" | "md" | "markdown" => Ok(Self::Txt),
            _ => Err(DocumentError::UnsupportedFormat(path.display().to_string())),
        }
    }

    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            Self::Txt => "text/plain",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
        })
    }
}

/// Two-dimensional grid of string cells. Row 0 is the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    #[must_use]
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        self.rows.first().map_or(&[], Vec::as_slice)
    }

    /// Data rows, each padded or truncated to the header width.
    #[must_use]
    pub fn records(&self) -> Vec<Vec<String>> {
        let width = self.headers().len();
        self.rows
            .iter()
            .skip(1)
            .map(|row| {
                let mut record: Vec<String> = row.iter().take(width).cloned().collect();
                record.resize(width, String::new());
                record
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    pub text: String,
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone)]
pub struct Document {
    pub source: String,
    pub kind: DocumentKind,
    pub pages: Vec<Page>,
}

impl Document {
    /// Page text in page order, each page followed by a newline.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.pages.iter().map(|p| p.text.len() + 1).sum());
        for page in &self.pages {
            out.push_str(&page.text);
            out.push('\n');
        }
        out
    }

    #[must_use]
    pub fn tables(&self) -> Vec<&Table> {
        self.pages.iter().flat_map(|p| p.tables.iter()).collect()
    }
}

/// Ordered key/value mapping with last-write-wins on duplicate keys.
///
/// A key keeps the position of its first insertion; only the value is replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValues {
    entries: Vec<(String, String)>,
    slots: HashMap<String, usize>,
}

impl KeyValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, value: String) {
        if let Some(&slot) = self.slots.get(&key) {
            self.entries[slot].1 = value;
        } else {
            self.slots.insert(key.clone(), self.entries.len());
            self.entries.push((key, value));
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.slots
            .get(key)
            .map(|&slot| self.entries[slot].1.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Serialize for KeyValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// A contiguous slice of a source text, bounded by the splitter's chunk size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    pub source: String,
    pub chunk_index: usize,
    /// Offset of the first character within the source text, in chars.
    pub start: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| (*c).to_owned()).collect()
    }

    #[test]
    fn kind_from_extension() {
        assert_eq!(
            DocumentKind::from_path(Path::new("a/Report.PDF")).unwrap(),
            DocumentKind::Pdf
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("notes.docx")).unwrap(),
            DocumentKind::Docx
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("readme.md")).unwrap(),
            DocumentKind::Txt
        );
        assert!(matches!(
            DocumentKind::from_path(Path::new("sheet.xlsx")),
            Err(DocumentError::UnsupportedFormat(_))
        ));
        assert!(DocumentKind::from_path(Path::new("Makefile")).is_err());
    }

    #[test]
    fn table_records_use_header_width() {
        let table = Table::new(vec![
            row(&["Name", "Age", "City"]),
            row(&["Alice", "30", "Oslo"]),
            row(&["Bob", "41"]),
            row(&["Eve", "22", "Rome", "extra"]),
        ]);
        assert_eq!(table.headers(), row(&["Name", "Age", "City"]).as_slice());
        let records = table.records();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.len() == 3));
        assert_eq!(records[1], row(&["Bob", "41", ""]));
        assert_eq!(records[2], row(&["Eve", "22", "Rome"]));
    }

    #[test]
    fn header_only_table_has_no_records() {
        let table = Table::new(vec![row(&["A", "B"])]);
        assert_eq!(table.headers().len(), 2);
        assert!(table.records().is_empty());
    }

    #[test]
    fn empty_table_has_no_headers() {
        let table = Table::default();
        assert!(table.headers().is_empty());
        assert!(table.records().is_empty());
    }

    #[test]
    fn document_text_separates_pages() {
        let doc = Document {
            source: "x.pdf".into(),
            kind: DocumentKind::Pdf,
            pages: vec![
                Page {
                    number: 1,
                    text: "one".into(),
                    tables: vec![],
                },
                Page {
                    number: 2,
                    text: "two".into(),
                    tables: vec![],
                },
            ],
        };
        assert_eq!(doc.text(), "one\ntwo\n");
    }

    #[test]
    fn key_values_last_write_wins_keeps_position() {
        let mut kv = KeyValues::new();
        kv.insert("a".into(), "1".into());
        kv.insert("b".into(), "2".into());
        kv.insert("a".into(), "3".into());
        assert_eq!(kv.len(), 2);
        assert_eq!(kv.get("a"), Some("3"));
        let keys: Vec<_> = kv.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn key_values_serialize_as_object() {
        let mut kv = KeyValues::new();
        kv.insert("Name".into(), "Alice".into());
        let json = serde_json::to_string(&kv).unwrap();
        assert_eq!(json, r#"{"Name":"Alice"}"#);
    }
}
