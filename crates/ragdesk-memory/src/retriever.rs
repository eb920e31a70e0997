use crate::document::DocumentError;
use crate::index::{Index, RetrievalResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

/// Plain top-k similarity retrieval: no score threshold, no deduplication.
#[derive(Debug, Clone, Copy, Default)]
pub struct Retriever {
    config: RetrievalConfig,
}

impl Retriever {
    #[must_use]
    pub fn new(config: RetrievalConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn top_k(&self) -> usize {
        self.config.top_k
    }

    /// # Errors
    ///
    /// Returns an error if the index query fails.
    pub async fn retrieve(
        &self,
        index: &Index,
        query: &str,
    ) -> Result<RetrievalResult, DocumentError> {
        index.query(query, self.config.top_k).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_top_k_is_four() {
        assert_eq!(Retriever::default().top_k(), 4);
        assert_eq!(Retriever::new(RetrievalConfig { top_k: 7 }).top_k(), 7);
    }
}
