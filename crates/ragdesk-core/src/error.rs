use ragdesk_llm::LlmError;
use ragdesk_memory::DocumentError;
use ragdesk_tools::ToolError;

use crate::channel::ChannelError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("no knowledge base has been built")]
    EmptyKnowledgeBase,

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    #[error("tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
}
