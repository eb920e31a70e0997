use std::fmt;

use crate::calculator::CalcError;

/// Structured result from tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub tool_name: String,
    pub summary: String,
    pub blocks_executed: u32,
}

impl fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary)
    }
}

/// How a tool is described to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolDef {
    pub id: &'static str,
    pub description: &'static str,
    /// Fenced-block language tag that invokes the tool.
    pub fence: &'static str,
}

impl fmt::Display for ToolDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "- {}: {} Invoke with a ```{} block.",
            self.id, self.description, self.fence
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("request blocked: {reason}")]
    Blocked { reason: String },

    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("response too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("missing API key for {tool}")]
    MissingApiKey { tool: &'static str },

    #[error(transparent)]
    Calc(#[from] CalcError),
}

impl ToolError {
    pub(crate) fn from_reqwest(e: &reqwest::Error, timeout_secs: u64) -> Self {
        if e.is_timeout() {
            Self::Timeout { timeout_secs }
        } else {
            Self::Http(e.to_string())
        }
    }
}

pub trait ToolExecutor: Send + Sync {
    /// Run every tool block this executor recognises in `response`.
    /// Returns `None` when there is nothing to run.
    fn execute(
        &self,
        response: &str,
    ) -> impl Future<Output = Result<Option<ToolOutput>, ToolError>> + Send;

    fn tool_definitions(&self) -> Vec<ToolDef> {
        vec![]
    }
}

/// Extract fenced code blocks with the given language marker from text.
///
/// Searches for `` ```{lang} `` … `` ``` `` pairs, returning trimmed content.
#[must_use]
pub fn extract_fenced_blocks<'a>(text: &'a str, lang: &str) -> Vec<&'a str> {
    let marker = format!("```{lang}");
    let marker_len = marker.len();
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(&marker) {
        let after = &rest[start + marker_len..];
        // ```calculator must not match ```calc
        if after.starts_with(|c: char| c.is_alphanumeric()) {
            rest = after;
            continue;
        }
        if let Some(end) = after.find("```") {
            blocks.push(after[..end].trim());
            rest = &after[end + 3..];
        } else {
            break;
        }
    }

    blocks
}
