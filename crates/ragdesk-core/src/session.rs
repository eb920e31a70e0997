use std::fmt::Write as _;

use ragdesk_llm::{LlmProvider, Message};
use ragdesk_memory::{Index, RetrievalResult};

use crate::answer::{Answer, AnswerSynthesizer};
use crate::channel::Channel;
use crate::error::CoreError;

/// One user's conversation over one knowledge base.
///
/// Starts without an index; [`ChatSession::rebuild`] swaps in a freshly built one.
pub struct ChatSession<P> {
    synthesizer: AnswerSynthesizer<P>,
    index: Option<Index>,
    history: Vec<Message>,
}

impl<P: LlmProvider> ChatSession<P> {
    #[must_use]
    pub fn new(synthesizer: AnswerSynthesizer<P>) -> Self {
        Self {
            synthesizer,
            index: None,
            history: Vec::new(),
        }
    }

    /// Replace the knowledge base. History from the previous one is discarded.
    pub fn rebuild(&mut self, index: Index) {
        tracing::info!(chunks = index.chunk_count(), "knowledge base replaced");
        self.index = Some(index);
        self.history.clear();
    }

    #[must_use]
    pub fn index(&self) -> Option<&Index> {
        self.index.as_ref()
    }

    #[must_use]
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Answer `query`. Failures are turned into an `Error: ...` reply so the session
    /// keeps going.
    pub async fn ask(&mut self, query: &str) -> Answer {
        self.history.push(Message::user(query));
        let answer = match self.synthesizer.answer(self.index.as_ref(), query).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!("failed to answer: {e:#}");
                Answer {
                    text: format!("Error: {e}"),
                    retrieval: RetrievalResult::default(),
                }
            }
        };
        self.history.push(Message::assistant(answer.text.as_str()));
        answer
    }

    /// End the session and delete the knowledge base's backing collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector store rejects the deletion.
    pub async fn close(self) -> Result<(), CoreError> {
        if let Some(index) = self.index {
            index.discard().await?;
        }
        Ok(())
    }

    /// Read questions from `channel` until it returns `None`, replying with the answer
    /// and the chunks it was drawn from.
    ///
    /// # Errors
    ///
    /// Returns an error only if the channel itself fails.
    pub async fn run_chat<C: Channel>(&mut self, channel: &mut C) -> Result<(), CoreError> {
        while let Some(message) = channel.recv().await? {
            let query = message.text.trim();
            if query.is_empty() {
                continue;
            }
            channel.send_status("Thinking...").await?;
            let answer = self.ask(query).await;
            channel.send(&render_answer(&answer)).await?;
        }
        Ok(())
    }
}

/// Answer text followed by each source chunk under a `--- Chunk i ---` header.
#[must_use]
pub fn render_answer(answer: &Answer) -> String {
    let mut out = format!("Answer: {}", answer.text);
    if !answer.retrieval.is_empty() {
        out.push_str("\n\nSources:");
        for (i, scored) in answer.retrieval.chunks.iter().enumerate() {
            let _ = write!(
                out,
                "\n--- Chunk {} ---\n{}",
                i + 1,
                scored.chunk.content.trim_end()
            );
        }
    }
    out
}
