//! Configuration, question answering, chat session, summaries and research reports.

pub mod answer;
pub mod bootstrap;
pub mod channel;
pub mod config;
pub mod error;
pub mod output;
pub mod prompt;
pub mod research;
pub mod session;
pub mod summarize;
pub mod vault;

pub use answer::{Answer, AnswerSynthesizer, NO_KNOWLEDGE_BASE};
pub use channel::{Channel, ChannelError, ChannelMessage};
pub use config::Config;
pub use error::CoreError;
pub use output::{ArtifactPaths, OutputWriter};
pub use research::{MarketResearch, ResearchReport};
pub use session::ChatSession;
pub use summarize::{Summarizer, Summary};
