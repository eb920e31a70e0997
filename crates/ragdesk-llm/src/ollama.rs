use ollama_rs::Ollama;
use ollama_rs::generation::chat::ChatMessage;
use ollama_rs::generation::chat::request::ChatMessageRequest;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};

use crate::error::LlmError;
use crate::provider::{LlmProvider, Message, Role};

/// Local Ollama backend. Serves both chat and embeddings.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Ollama,
    model: String,
    embedding_model: String,
}

impl OllamaProvider {
    #[must_use]
    pub fn new(base_url: &str, model: String, embedding_model: String) -> Self {
        let (host, port) = split_base_url(base_url);
        Self {
            client: Ollama::new(host, port),
            model,
            embedding_model,
        }
    }
}

impl LlmProvider for OllamaProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        let history = messages.iter().map(to_ollama).collect();
        let reply = self
            .client
            .send_chat_messages(ChatMessageRequest::new(self.model.clone(), history))
            .await
            .map_err(|e| LlmError::Other(format!("ollama chat: {e}")))?;
        tracing::debug!(model = %self.model, chars = reply.message.content.len(), "ollama reply");
        Ok(reply.message.content)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let request =
            GenerateEmbeddingsRequest::new(self.embedding_model.clone(), EmbeddingsInput::from(text));
        let mut vectors = self
            .client
            .generate_embeddings(request)
            .await
            .map_err(|e| LlmError::Other(format!("ollama embeddings: {e}")))?
            .embeddings;
        if vectors.is_empty() {
            return Err(LlmError::EmptyResponse {
                provider: "ollama".into(),
            });
        }
        Ok(vectors.swap_remove(0))
    }

    fn supports_embeddings(&self) -> bool {
        true
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "ollama"
    }
}

const DEFAULT_PORT: u16 = 11434;

fn to_ollama(msg: &Message) -> ChatMessage {
    let build = match msg.role {
        Role::System => ChatMessage::system,
        Role::Assistant => ChatMessage::assistant,
        Role::User => ChatMessage::user,
    };
    build(msg.content.clone())
}

/// `ollama-rs` takes host and port separately.
fn split_base_url(base_url: &str) -> (String, u16) {
    let trimmed = base_url.trim_end_matches('/');
    trimmed
        .rsplit_once(':')
        .and_then(|(host, port)| Some((host.to_owned(), port.parse().ok()?)))
        .unwrap_or_else(|| (trimmed.to_owned(), DEFAULT_PORT))
}
