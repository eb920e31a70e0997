//! Three-stage market research workflow: research, analysis, report.
//!
//! Each stage is a function of the previous stage's text and the topic. The first two
//! stages may call tools through fenced blocks in their replies; the report stage is a
//! single model call.

use std::path::PathBuf;

use ragdesk_llm::{LlmProvider, Message};
use ragdesk_tools::{Calculator, CompositeExecutor, ToolExecutor, ToolOutput, WebSearch};

use crate::config::ResearchConfig;
use crate::error::CoreError;
use crate::output::OutputWriter;
use crate::prompt;

pub const RESEARCH_PROMPT: &str = r#"You are a highly skilled Market Research Specialist tasked with gathering accurate, up-to-date insights about "{input}" and its industry.

You have access to these tools:
{tools}

Important instructions:
- Use tools whenever recent or factual information is needed.
- Do NOT guess or hallucinate facts.
- Always cite the source if applicable.

Initial search results:
{search_results}

Your research should include the following sections:

1. Company Overview and History
2. Market Size and Growth Estimates
3. Top 3 Competitors and Market Shares
4. Current Industry Trends (2-3 trends shaping the industry)
5. Main Product/Service Offerings
6. Recent News or Developments (last 6 months)

When you have gathered enough information, respond with a structured report that contains no tool blocks."#;

pub const ANALYSIS_PROMPT: &str = "You are a professional Business Analyst tasked with interpreting structured market research data.

Analyze the following market research content:

{input}

You have access to the following tool:
{tools}
Use it only for valid numerical expressions (e.g., 100 * 5 + 2). Do not use it for text-based or non-numerical input.

When you are done, respond with your analysis and no tool blocks.";

pub const REPORT_PROMPT: &str = "You are a Professional Report Writer specializing in market research reports.

Based on the following analysis:
{input}

Create a concise market research report on {topic} with these sections:

1. Executive Summary (brief)
2. Table of Contents (optional)
3. Company Overview (short)
4. Industry Analysis (summarized)
5. Competitive Landscape (top competitors)
6. SWOT Analysis (concise)
7. Growth Opportunities (key opportunities)
8. Strategic Recommendations (2-3 recommendations)
9. Conclusion (brief)

Format the report in professional Markdown with appropriate headers and bullet points. Keep the report under 1000 tokens.";

/// Section headings the report prompt asks for, in order.
pub const REPORT_SECTIONS: [&str; 9] = [
    "Executive Summary",
    "Table of Contents",
    "Company Overview",
    "Industry Analysis",
    "Competitive Landscape",
    "SWOT Analysis",
    "Growth Opportunities",
    "Strategic Recommendations",
    "Conclusion",
];

#[derive(Debug, Clone)]
pub struct ResearchReport {
    pub topic: String,
    pub research: String,
    pub analysis: String,
    pub report: String,
}

pub struct MarketResearch<P> {
    provider: P,
    search: WebSearch,
    calculator: Calculator,
    config: ResearchConfig,
}

impl<P: LlmProvider> MarketResearch<P> {
    #[must_use]
    pub fn new(provider: P, search: WebSearch, config: ResearchConfig) -> Self {
        Self {
            provider,
            search,
            calculator: Calculator,
            config,
        }
    }

    /// Run research, analysis and report in order.
    ///
    /// # Errors
    ///
    /// Returns the first model error. Search failures are not errors.
    pub async fn run(&self, topic: &str) -> Result<ResearchReport, CoreError> {
        tracing::info!(topic, "stage 1/3: research");
        let research = self.research(topic).await?;
        tracing::info!(topic, chars = research.chars().count(), "stage 2/3: analysis");
        let analysis = self.analyze(&research).await?;
        tracing::info!(topic, "stage 3/3: report");
        let report = self.write_report(&analysis, topic).await?;

        Ok(ResearchReport {
            topic: topic.to_owned(),
            research,
            analysis,
            report,
        })
    }

    /// [`Self::run`], then write the report under `writer` as the configured file name.
    ///
    /// # Errors
    ///
    /// Returns an error if any stage fails or the file cannot be written.
    pub async fn run_to_file(
        &self,
        topic: &str,
        writer: &OutputWriter,
    ) -> Result<(ResearchReport, PathBuf), CoreError> {
        let report = self.run(topic).await?;
        let path = writer
            .write_report(&self.config.report_file, &report.report)
            .await?;
        Ok((report, path))
    }

    /// Gather raw findings with web search and the calculator available.
    ///
    /// # Errors
    ///
    /// Returns an error if the model call fails.
    pub async fn research(&self, topic: &str) -> Result<String, CoreError> {
        let query = format!("Market research report on {topic}");
        let search_results = match self.search.search(&query).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "initial search failed");
                format!("[Error searching articles]: {e}")
            }
        };

        let executor = CompositeExecutor::new(self.calculator, self.search.clone());
        let tools = render_tools(&executor);
        let prompt = prompt::fill(
            RESEARCH_PROMPT,
            &[
                ("input", query.as_str()),
                ("tools", tools.as_str()),
                ("search_results", search_results.as_str()),
            ],
        );
        run_tool_loop(&self.provider, &executor, prompt, self.config.max_iterations).await
    }

    /// Interpret the research text, truncated to the configured number of characters.
    ///
    /// # Errors
    ///
    /// Returns an error if the model call fails.
    pub async fn analyze(&self, research: &str) -> Result<String, CoreError> {
        let input = truncate_chars(research, self.config.analysis_input_chars);
        if input.len() < research.len() {
            tracing::debug!(
                limit = self.config.analysis_input_chars,
                "research text truncated for analysis"
            );
        }
        let tools = render_tools(&self.calculator);
        let prompt = prompt::fill(ANALYSIS_PROMPT, &[("input", input), ("tools", tools.as_str())]);
        run_tool_loop(
            &self.provider,
            &self.calculator,
            prompt,
            self.config.max_iterations,
        )
        .await
    }

    /// Turn the analysis into the final markdown report.
    ///
    /// # Errors
    ///
    /// Returns an error if the model call fails.
    pub async fn write_report(&self, analysis: &str, topic: &str) -> Result<String, CoreError> {
        let prompt = prompt::fill(REPORT_PROMPT, &[("input", analysis), ("topic", topic)]);
        let report = self.provider.chat(&[Message::user(prompt)]).await?;

        let missing = missing_sections(&report);
        if !missing.is_empty() {
            tracing::warn!(?missing, "report is missing requested sections");
        }
        Ok(report)
    }
}

/// Ask the model, run any tool blocks in its reply and feed the results back, until a
/// reply contains no tool blocks or `max_iterations` replies have been produced.
///
/// When the limit is hit, the last reply is returned as the stage output.
///
/// # Errors
///
/// Returns an error if a model call fails. Tool errors are reported back to the model.
pub async fn run_tool_loop<P: LlmProvider, E: ToolExecutor>(
    provider: &P,
    executor: &E,
    prompt: String,
    max_iterations: usize,
) -> Result<String, CoreError> {
    let mut messages = vec![Message::user(prompt)];
    let mut last = String::new();

    for iteration in 0..max_iterations {
        let response = provider.chat(&messages).await?;
        let feedback = match executor.execute(&response).await {
            Ok(None) => return Ok(response),
            Ok(Some(output)) => {
                tracing::debug!(
                    iteration,
                    tool = %output.tool_name,
                    blocks = output.blocks_executed,
                    "tool executed"
                );
                format_tool_output(&output)
            }
            Err(e) => {
                tracing::warn!(iteration, error = %e, "tool execution failed");
                format!("[tool error] {e}")
            }
        };
        messages.push(Message::assistant(response.as_str()));
        messages.push(Message::user(feedback));
        last = response;
    }

    tracing::warn!(max_iterations, "tool loop stopped at iteration limit");
    Ok(last)
}

fn format_tool_output(output: &ToolOutput) -> String {
    format!(
        "[tool output: {}]\n```\n{}\n```\nContinue, or give your final answer without tool blocks.",
        output.tool_name, output.summary
    )
}

fn render_tools<E: ToolExecutor>(executor: &E) -> String {
    executor
        .tool_definitions()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Requested sections whose title does not appear anywhere in `report` (case-insensitive).
#[must_use]
pub fn missing_sections(report: &str) -> Vec<&'static str> {
    let lower = report.to_lowercase();
    REPORT_SECTIONS
        .iter()
        .copied()
        .filter(|s| !lower.contains(&s.to_lowercase()))
        .collect()
}

/// Longest prefix of `s` with at most `max_chars` characters.
#[must_use]
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use ragdesk_llm::Role;
    use ragdesk_llm::mock::MockProvider;
    use ragdesk_tools::ToolsConfig;

    use super::*;

    fn workflow(mock: &MockProvider) -> MarketResearch<MockProvider> {
        let search = WebSearch::new(&ToolsConfig::default(), None);
        MarketResearch::new(mock.clone(), search, ResearchConfig::default())
    }

    fn full_report() -> String {
        REPORT_SECTIONS
            .iter()
            .map(|s| format!("## {s}\ntext"))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn missing_sections_are_listed_in_order() {
        assert!(missing_sections(&full_report()).is_empty());
        let partial = "# Executive summary\n## SWOT analysis\n";
        let missing = missing_sections(partial);
        assert_eq!(missing.len(), 7);
        assert_eq!(missing[0], "Table of Contents");
        assert!(!missing.contains(&"SWOT Analysis"));
    }

    #[tokio::test]
    async fn tool_loop_returns_first_reply_without_tools() {
        let mock = MockProvider::with_responses(vec!["plain answer".into()]);
        let out = run_tool_loop(&mock, &Calculator, "p".into(), 5)
            .await
            .unwrap();
        assert_eq!(out, "plain answer");
        assert_eq!(mock.chat_calls(), 1);
    }

    #[tokio::test]
    async fn tool_loop_feeds_calculator_results_back() {
        let mock = MockProvider::with_responses(vec![
            "Let me compute.\n```calc\n100 * 5 + 2\n```".into(),
            "Total is 502.".into(),
        ]);
        let out = run_tool_loop(&mock, &Calculator, "p".into(), 5)
            .await
            .unwrap();
        assert_eq!(out, "Total is 502.");

        let second_call = &mock.prompts()[1];
        assert_eq!(second_call.len(), 3);
        assert_eq!(second_call[1].role, Role::Assistant);
        assert!(second_call[2].content.contains("[tool output: calculator]"));
        assert!(second_call[2].content.contains("100 * 5 + 2 = 502"));
    }

    #[tokio::test]
    async fn tool_loop_reports_rejected_expressions() {
        let mock = MockProvider::with_responses(vec![
            "```calc\n__import__('os')\n```".into(),
            "done".into(),
        ]);
        run_tool_loop(&mock, &Calculator, "p".into(), 5)
            .await
            .unwrap();
        let feedback = &mock.prompts()[1][2].content;
        assert!(feedback.contains("__import__('os'): error:"));
    }

    #[tokio::test]
    async fn tool_loop_stops_at_limit_with_last_reply() {
        let mut mock = MockProvider::default();
        mock.default_response = "```calc\n1 + 1\n```".into();
        let out = run_tool_loop(&mock, &Calculator, "p".into(), 3)
            .await
            .unwrap();
        assert_eq!(mock.chat_calls(), 3);
        assert!(out.contains("1 + 1"));
    }

    #[tokio::test]
    async fn research_embeds_search_failure_and_continues() {
        let mock = MockProvider::with_responses(vec!["findings".into()]);
        let research = workflow(&mock).research("Acme Motors").await.unwrap();
        assert_eq!(research, "findings");

        let prompt = &mock.prompts()[0][0].content;
        assert!(prompt.contains("\"Market research report on Acme Motors\""));
        assert!(prompt.contains("[Error searching articles]: missing API key"));
        assert!(prompt.contains("- calculator:"));
        assert!(prompt.contains("- web_search:"));
    }

    #[tokio::test]
    async fn research_search_block_failure_is_fed_back() {
        let mock = MockProvider::with_responses(vec![
            "```search\nAcme market share\n```".into(),
            "findings".into(),
        ]);
        workflow(&mock).research("Acme").await.unwrap();
        let feedback = &mock.prompts()[1][2].content;
        assert!(feedback.contains("[tool output: web-search]"));
        assert!(feedback.contains("Search failed:"));
    }

    #[tokio::test]
    async fn analysis_input_is_truncated() {
        let mock = MockProvider::with_responses(vec!["analysis".into()]);
        let mut wf = workflow(&mock);
        wf.config.analysis_input_chars = 10;
        let long = format!("{}{}", "a".repeat(10), "TAIL");
        wf.analyze(&long).await.unwrap();

        let prompt = &mock.prompts()[0][0].content;
        assert!(prompt.contains(&"a".repeat(10)));
        assert!(!prompt.contains("TAIL"));
        assert!(prompt.contains("- calculator:"));
        assert!(!prompt.contains("web_search"));
    }

    #[tokio::test]
    async fn run_chains_stages_and_writes_file() {
        let mock = MockProvider::with_responses(vec![
            "RESEARCH".into(),
            "ANALYSIS".into(),
            full_report(),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path());
        let (report, path) = workflow(&mock)
            .run_to_file("Acme", &writer)
            .await
            .unwrap();

        assert_eq!(report.research, "RESEARCH");
        assert_eq!(report.analysis, "ANALYSIS");
        assert_eq!(path, dir.path().join("market_research_report.md"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), full_report());

        let prompts = mock.prompts();
        assert!(prompts[1][0].content.contains("RESEARCH"));
        assert!(prompts[2][0].content.contains("Based on the following analysis:\nANALYSIS"));
        assert!(prompts[2][0].content.contains("market research report on Acme"));
    }

    #[tokio::test]
    async fn model_failure_aborts_workflow() {
        let mock = MockProvider::failing();
        let err = workflow(&mock).run("Acme").await.unwrap_err();
        assert!(matches!(err, CoreError::Llm(_)));
    }
}
