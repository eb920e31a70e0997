use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::article::ArticleFetcher;
use crate::config::ToolsConfig;
use crate::executor::{ToolDef, ToolError, ToolExecutor, ToolOutput, extract_fenced_blocks};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    link: String,
}

/// Web search via a Serper-compatible endpoint, followed by an article fetch
/// for each top result.
#[derive(Clone)]
pub struct WebSearch {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout_secs: u64,
    max_results: usize,
    fetcher: ArticleFetcher,
}

impl std::fmt::Debug for WebSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSearch")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl WebSearch {
    #[must_use]
    pub fn new(config: &ToolsConfig, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.search.timeout))
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: config.search.endpoint.clone(),
            api_key,
            timeout_secs: config.search.timeout,
            max_results: config.search.max_results,
            fetcher: ArticleFetcher::new(&config.article),
        }
    }

    #[cfg(test)]
    fn with_fetcher(mut self, fetcher: ArticleFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Return the links of the top organic results for `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the request fails.
    pub async fn top_links(&self, query: &str) -> Result<Vec<String>, ToolError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ToolError::MissingApiKey { tool: "web search" })?;

        let resp = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", api_key)
            .json(&json!({ "q": query }))
            .send()
            .await
            .map_err(|e| ToolError::from_reqwest(&e, self.timeout_secs))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::error!(status = %status, "web search request failed");
            return Err(ToolError::Http(format!("HTTP {status}")));
        }

        let body: SearchResponse = resp
            .json()
            .await
            .map_err(|e| ToolError::InvalidResponse(e.to_string()))?;

        Ok(body
            .organic
            .into_iter()
            .map(|r| r.link)
            .filter(|link| !link.trim().is_empty())
            .take(self.max_results)
            .collect())
    }

    /// Search, fetch each top article and render them as
    /// `Article {i}: {url}\n{content}` blocks.
    ///
    /// A failed article fetch is rendered in place of its content.
    ///
    /// # Errors
    ///
    /// Returns an error if the search request itself fails.
    pub async fn search(&self, query: &str) -> Result<String, ToolError> {
        let links = self.top_links(query).await?;
        if links.is_empty() {
            return Ok("No results found.".to_owned());
        }

        let mut out = String::new();
        for (i, url) in links.iter().enumerate() {
            let content = match self.fetcher.fetch(url).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(url, error = %e, "article fetch failed");
                    format!("Error fetching article: {e}")
                }
            };
            out.push_str(&format!("Article {}: {url}\n{content}\n\n", i + 1));
        }
        Ok(out.trim().to_owned())
    }
}

impl ToolExecutor for WebSearch {
    async fn execute(&self, response: &str) -> Result<Option<ToolOutput>, ToolError> {
        let blocks = extract_fenced_blocks(response, "search");
        if blocks.is_empty() {
            return Ok(None);
        }

        let mut outputs = Vec::with_capacity(blocks.len());
        for query in &blocks {
            let text = match self.search(query).await {
                Ok(text) => text,
                Err(e) => format!("Search failed: {e}"),
            };
            outputs.push(format!("Results for {query:?}:\n{text}"));
        }

        #[allow(clippy::cast_possible_truncation)]
        let blocks_executed = blocks.len() as u32;
        Ok(Some(ToolOutput {
            tool_name: "web-search".to_owned(),
            summary: outputs.join("\n\n"),
            blocks_executed,
        }))
    }

    fn tool_definitions(&self) -> Vec<ToolDef> {
        vec![ToolDef {
            id: "web_search",
            description: "Search the web and read the top article for a query.",
            fence: "search",
        }]
    }
}
