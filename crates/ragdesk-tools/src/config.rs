use serde::{Deserialize, Serialize};

fn default_search_endpoint() -> String {
    "https://google.serper.dev/search".into()
}

fn default_timeout() -> u64 {
    10
}

fn default_max_results() -> usize {
    1
}

fn default_max_body_bytes() -> usize {
    1_048_576
}

fn default_max_paragraphs() -> usize {
    3
}

fn default_max_chars() -> usize {
    1000
}

/// Top-level configuration for the research tools.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub article: ArticleConfig,
}

/// Serper-compatible web search endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Organic results whose articles are fetched per query.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            timeout: default_timeout(),
            max_results: default_max_results(),
        }
    }
}

/// Article fetch limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArticleConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default = "default_max_paragraphs")]
    pub max_paragraphs: usize,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for ArticleConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            max_body_bytes: default_max_body_bytes(),
            max_paragraphs: default_max_paragraphs(),
            max_chars: default_max_chars(),
        }
    }
}
