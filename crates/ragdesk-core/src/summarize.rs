use ragdesk_llm::{LlmProvider, Message};
use ragdesk_memory::TextSplitter;

use crate::error::CoreError;
use crate::prompt;

/// Map and combine templates for one summarization pass. Both take `{text}`.
#[derive(Debug, Clone, Copy)]
pub struct PromptPair {
    pub map: &'static str,
    pub combine: &'static str,
}

pub const EXTRACTIVE: PromptPair = PromptPair {
    map: "Summarize the following text concisely:\n{text}\nCONCISE SUMMARY:",
    combine: "Combine the following summaries into a comprehensive summary:\n{text}\nCOMPREHENSIVE SUMMARY:",
};

pub const ABSTRACTIVE: PromptPair = PromptPair {
    map: "Rewrite the main ideas of the following text in your own words:\n{text}\nABSTRACTIVE SUMMARY:",
    combine: "Combine the following summaries into a single fluent summary written in your own words:\n{text}\nCOMPREHENSIVE SUMMARY:",
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub extractive: String,
    pub abstractive: String,
}

/// Map-reduce summarizer: one model call per chunk, then one call to merge the partials.
pub struct Summarizer<P> {
    provider: P,
    splitter: TextSplitter,
}

impl<P: LlmProvider> Summarizer<P> {
    #[must_use]
    pub fn new(provider: P, splitter: TextSplitter) -> Self {
        Self { provider, splitter }
    }

    /// Run the extractive pass, then the abstractive pass, over the same chunks.
    ///
    /// Blank input yields an empty summary without calling the model.
    ///
    /// # Errors
    ///
    /// Returns the first model error; nothing is retried.
    pub async fn summarize(&self, text: &str, source: &str) -> Result<Summary, CoreError> {
        let chunks: Vec<String> = self
            .splitter
            .split_text(text, source)
            .into_iter()
            .map(|c| c.content)
            .collect();
        if chunks.iter().all(|c| c.trim().is_empty()) {
            tracing::warn!(source, "nothing to summarize");
            return Ok(Summary::default());
        }
        tracing::info!(source, chunks = chunks.len(), "summarizing");

        tracing::info!("extractive pass");
        let extractive = self.map_reduce(&chunks, EXTRACTIVE).await?;
        tracing::info!("abstractive pass");
        let abstractive = self.map_reduce(&chunks, ABSTRACTIVE).await?;

        Ok(Summary {
            extractive,
            abstractive,
        })
    }

    /// # Errors
    ///
    /// Returns the first model error.
    pub async fn map_reduce(
        &self,
        chunks: &[String],
        prompts: PromptPair,
    ) -> Result<String, CoreError> {
        let mut partials = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let prompt = prompt::fill(prompts.map, &[("text", chunk.as_str())]);
            partials.push(self.complete(prompt).await?);
        }
        tracing::debug!(partials = partials.len(), "map step done");

        let joined = partials.join("\n\n");
        let prompt = prompt::fill(prompts.combine, &[("text", joined.as_str())]);
        self.complete(prompt).await
    }

    async fn complete(&self, prompt: String) -> Result<String, CoreError> {
        let reply = self.provider.chat(&[Message::user(prompt)]).await?;
        Ok(reply.trim().to_owned())
    }
}
