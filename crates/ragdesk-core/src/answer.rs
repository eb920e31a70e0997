use ragdesk_llm::{LlmProvider, Message};
use ragdesk_memory::{Index, RetrievalResult, Retriever};

use crate::error::CoreError;
use crate::prompt;

/// Reply used when a question arrives before any document has been indexed.
pub const NO_KNOWLEDGE_BASE: &str = "No knowledge base found.";

pub const ANSWER_PROMPT: &str = "You are a helpful assistant. Use the following pieces of context to answer the question.
If the answer is not contained in the context, say \"I don't know\".

Context:
{context}

Question: {question}
Answer:";

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    /// The chunks the answer was grounded on, most similar first.
    pub retrieval: RetrievalResult,
}

impl Answer {
    #[must_use]
    pub fn no_knowledge_base() -> Self {
        Self {
            text: NO_KNOWLEDGE_BASE.to_owned(),
            retrieval: RetrievalResult::default(),
        }
    }
}

/// Retrieve context for a question and ask the model to answer from it.
#[derive(Debug, Clone)]
pub struct AnswerSynthesizer<P> {
    provider: P,
    retriever: Retriever,
}

impl<P: LlmProvider> AnswerSynthesizer<P> {
    #[must_use]
    pub fn new(provider: P, retriever: Retriever) -> Self {
        Self {
            provider,
            retriever,
        }
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// # Errors
    ///
    /// Returns [`CoreError::EmptyKnowledgeBase`] when `index` is absent or empty, before
    /// any provider call. Retrieval and model failures propagate unchanged.
    pub async fn try_answer(
        &self,
        index: Option<&Index>,
        question: &str,
    ) -> Result<Answer, CoreError> {
        let Some(index) = index.filter(|i| !i.is_empty()) else {
            return Err(CoreError::EmptyKnowledgeBase);
        };

        let retrieval = self.retriever.retrieve(index, question).await?;
        let context = retrieval.texts().collect::<Vec<_>>().join("\n\n");
        let prompt = prompt::fill(
            ANSWER_PROMPT,
            &[("context", context.as_str()), ("question", question)],
        );
        tracing::debug!(chunks = retrieval.len(), "answering with retrieved context");

        let text = self.provider.chat(&[Message::user(prompt)]).await?;
        Ok(Answer { text, retrieval })
    }

    /// Like [`Self::try_answer`], but a missing knowledge base yields
    /// [`NO_KNOWLEDGE_BASE`] instead of an error.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or the model call fails.
    pub async fn answer(&self, index: Option<&Index>, question: &str) -> Result<Answer, CoreError> {
        match self.try_answer(index, question).await {
            Err(CoreError::EmptyKnowledgeBase) => Ok(Answer::no_knowledge_base()),
            other => other,
        }
    }
}
