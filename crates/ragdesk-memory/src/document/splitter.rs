use super::DocumentError;
use super::types::{Chunk, Document};

#[derive(Debug, Clone)]
pub struct SplitterConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Break points in priority order. A hard character cut is the final fallback.
    pub separators: Vec<String>,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separators: default_separators(),
        }
    }
}

impl SplitterConfig {
    #[must_use]
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: default_separators(),
        }
    }
}

fn default_separators() -> Vec<String> {
    vec!["\n\n".into(), "\n".into(), " ".into()]
}

/// Recursive-separator character splitter with a fixed overlap.
///
/// Every chunk after the first starts with the last `chunk_overlap` characters of
/// its predecessor, so dropping that prefix and concatenating the chunks yields
/// the original text.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: SplitterConfig,
    separators: Vec<Vec<char>>,
}

impl TextSplitter {
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidSplitter`] when `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(config: SplitterConfig) -> Result<Self, DocumentError> {
        if config.chunk_size == 0 || config.chunk_overlap >= config.chunk_size {
            return Err(DocumentError::InvalidSplitter {
                chunk_size: config.chunk_size,
                chunk_overlap: config.chunk_overlap,
            });
        }
        let separators = config
            .separators
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.chars().collect())
            .collect();
        Ok(Self { config, separators })
    }

    #[must_use]
    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    #[must_use]
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        self.split_text(&document.text(), &document.source)
    }

    #[must_use]
    pub fn split_text(&self, text: &str, source: &str) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = if chars.len() - start <= size {
                chars.len()
            } else {
                self.find_break(&chars, start + overlap, start + size)
                    .unwrap_or(start + size)
            };

            chunks.push(Chunk {
                content: chars[start..end].iter().collect(),
                source: source.to_owned(),
                chunk_index: chunks.len(),
                start,
            });

            if end == chars.len() {
                break;
            }
            start = end - overlap;
        }
        chunks
    }

    /// Largest `end` in `(lo, hi]` such that some separator ends exactly at `end`,
    /// trying separators in priority order.
    fn find_break(&self, chars: &[char], lo: usize, hi: usize) -> Option<usize> {
        let window_start = hi - self.config.chunk_size;
        self.separators.iter().find_map(|sep| {
            (lo + 1..=hi).rev().find(|&end| {
                end >= window_start + sep.len() && chars[end - sep.len()..end] == sep[..]
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn splitter(size: usize, overlap: usize) -> TextSplitter {
        TextSplitter::new(SplitterConfig::new(size, overlap)).unwrap()
    }

    fn reconstruct(chunks: &[Chunk], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(&chunk.content);
            } else {
                out.extend(chunk.content.chars().skip(overlap));
            }
        }
        out
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(matches!(
            TextSplitter::new(SplitterConfig::new(0, 0)),
            Err(DocumentError::InvalidSplitter { .. })
        ));
        assert!(TextSplitter::new(SplitterConfig::new(10, 10)).is_err());
        assert!(TextSplitter::new(SplitterConfig::new(10, 11)).is_err());
        assert!(TextSplitter::new(SplitterConfig::new(10, 9)).is_ok());
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(splitter(10, 2).split_text("", "s").is_empty());
    }

    #[test]
    fn short_text_single_chunk() {
        let chunks = splitter(100, 20).split_text("hello world", "s");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "hello world");
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[0].source, "s");
    }

    #[test]
    fn exact_length_single_chunk() {
        let chunks = splitter(5, 1).split_text("abcde", "s");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn hard_cut_with_overlap() {
        let text = "ABCDEFGHIJKLMNO";
        let chunks = splitter(10, 3).split_text(text, "s");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "ABCDEFGHIJ");
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[1].content, "HIJKLMNO");
        assert_eq!(chunks[1].start, 7);
        assert_eq!(reconstruct(&chunks, 3), text);
    }

    #[test]
    fn prefers_paragraph_break() {
        let text = "aaaa bbbb\n\ncccc dddd eeee";
        let chunks = splitter(16, 2).split_text(text, "s");
        assert_eq!(chunks[0].content, "aaaa bbbb\n\n");
        assert_eq!(reconstruct(&chunks, 2), text);
    }

    #[test]
    fn falls_back_to_space() {
        let text = "alpha beta gamma delta";
        let chunks = splitter(12, 0).split_text(text, "s");
        assert_eq!(chunks[0].content, "alpha beta ");
        assert_eq!(reconstruct(&chunks, 0), text);
    }

    #[test]
    fn multibyte_text_is_char_based() {
        let text = "日本語のテキストを分割する";
        let chunks = splitter(5, 2).split_text(text, "s");
        assert!(chunks.iter().all(|c| c.content.chars().count() <= 5));
        assert_eq!(reconstruct(&chunks, 2), text);
    }

    #[test]
    fn indices_are_sequential() {
        let text = "word ".repeat(200);
        let chunks = splitter(50, 10).split_text(&text, "s");
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
        }
    }

    proptest! {
        #[test]
        fn reconstruction_is_lossless(
            text in "[a-c \n]{0,400}",
            size in 1usize..60,
            overlap_frac in 0.0f64..1.0,
        ) {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
            let overlap = ((size as f64) * overlap_frac) as usize;
            let overlap = overlap.min(size - 1);
            let chunks = splitter(size, overlap).split_text(&text, "p");

            prop_assert_eq!(reconstruct(&chunks, overlap), text.clone());
            for c in &chunks {
                prop_assert!(c.content.chars().count() <= size);
            }
            for pair in chunks.windows(2) {
                prop_assert!(pair[1].start > pair[0].start);
                let prev: Vec<char> = pair[0].content.chars().collect();
                let tail: String = prev[prev.len() - overlap..].iter().collect();
                prop_assert!(pair[1].content.starts_with(&tail));
            }
            if text.is_empty() {
                prop_assert!(chunks.is_empty());
            }
            if !text.is_empty() && text.chars().count() <= size {
                prop_assert_eq!(chunks.len(), 1);
            }
        }
    }
}
