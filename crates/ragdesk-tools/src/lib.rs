//! Tools the research workflow can invoke from model output.

pub mod article;
pub mod calculator;
pub mod composite;
pub mod config;
pub mod executor;
pub mod search;

pub use article::ArticleFetcher;
pub use calculator::{CalcError, Calculator, evaluate};
pub use composite::CompositeExecutor;
pub use config::{ArticleConfig, SearchConfig, ToolsConfig};
pub use executor::{ToolDef, ToolError, ToolExecutor, ToolOutput, extract_fenced_blocks};
pub use search::WebSearch;
