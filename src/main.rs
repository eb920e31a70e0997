mod channel;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use ragdesk_core::bootstrap::{
    AppBuilder, create_chat_provider, create_embedding_provider, resolve_config_path,
};
use ragdesk_core::session::render_answer;
use ragdesk_memory::{Document, Extractor, Index, UnsupportedPolicy};
use tracing_subscriber::EnvFilter;

use crate::channel::CliChannel;

/// Extract documents, chat with them, summarize them, or write a market research report.
#[derive(Parser)]
#[command(name = "ragdesk", version, about)]
struct Cli {
    /// Path to the TOML config (falls back to `RAGDESK_CONFIG`, then `config/default.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write key-values, text and tables for every document in a directory
    Extract {
        #[arg(default_value = "pdfs")]
        input_dir: PathBuf,
        /// Fail on files with unsupported extensions instead of skipping them
        #[arg(long)]
        strict: bool,
    },
    /// Index a directory and answer questions interactively
    Chat {
        #[arg(default_value = "knowledge_base")]
        knowledge_base: PathBuf,
    },
    /// Index a directory and answer one question
    Ask {
        question: String,
        #[arg(long, default_value = "knowledge_base")]
        knowledge_base: PathBuf,
    },
    /// Write extractive and abstractive summaries of one document
    Summarize {
        file: PathBuf,
        /// Output file stem (default from `[summary] file_stem`)
        #[arg(long)]
        stem: Option<String>,
    },
    /// Run the research, analysis and report stages for a company or market
    Research { topic: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_subscriber();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());
    let app = AppBuilder::new(config_path.clone())
        .await
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    match cli.command {
        Commands::Extract { input_dir, strict } => run_extract(&app, &input_dir, strict).await,
        Commands::Chat { knowledge_base } => run_chat(&app, &knowledge_base).await,
        Commands::Ask {
            question,
            knowledge_base,
        } => run_ask(&app, &knowledge_base, &question).await,
        Commands::Summarize { file, stem } => run_summarize(&app, &file, stem).await,
        Commands::Research { topic } => run_research(&app, &topic).await,
    }
}

fn init_subscriber() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_extract(app: &AppBuilder, input_dir: &Path, strict: bool) -> anyhow::Result<()> {
    let policy = if strict {
        UnsupportedPolicy::Fail
    } else {
        UnsupportedPolicy::Skip
    };
    let report = Extractor::default()
        .extract_dir(input_dir, policy)
        .await
        .with_context(|| format!("failed to read {}", input_dir.display()))?;

    let writer = app.output_writer();
    let mut written = 0;
    let mut write_failed = 0;
    for (extracted, result) in report
        .extracted
        .iter()
        .zip(writer.write_batch(&report.extracted).await)
    {
        match result {
            Ok(_) => {
                written += 1;
                println!("Finished: {}", extracted.document.source);
            }
            Err(e) => {
                write_failed += 1;
                eprintln!("Failed to write: {}: {e}", extracted.document.source);
            }
        }
    }
    for (path, e) in &report.failed {
        eprintln!("Failed: {}: {e}", path.display());
    }

    let failed = report.failed.len() + write_failed;
    println!(
        "{written} extracted, {} skipped, {failed} failed -> {}",
        report.skipped.len(),
        writer.root().display()
    );
    if strict && failed > 0 {
        bail!("{failed} file(s) failed");
    }
    Ok(())
}

async fn load_documents(dir: &Path) -> anyhow::Result<Vec<Document>> {
    let report = Extractor::default()
        .extract_dir(dir, UnsupportedPolicy::Skip)
        .await
        .with_context(|| format!("failed to read knowledge base {}", dir.display()))?;
    for (path, e) in &report.failed {
        tracing::warn!(path = %path.display(), "not indexed: {e}");
    }
    Ok(report.extracted.into_iter().map(|e| e.document).collect())
}

async fn build_index(app: &AppBuilder, dir: &Path) -> anyhow::Result<Index> {
    let documents = load_documents(dir).await?;
    let embedder = create_embedding_provider(app.config())?;
    let pipeline = app.build_pipeline(&embedder)?;
    let index = pipeline
        .build_index(&documents)
        .await
        .context("failed to build the knowledge base index")?;
    tracing::info!(
        documents = documents.len(),
        chunks = index.chunk_count(),
        "knowledge base ready"
    );
    Ok(index)
}

async fn run_chat(app: &AppBuilder, dir: &Path) -> anyhow::Result<()> {
    let index = build_index(app, dir).await?;
    let mut session = app.build_session(create_chat_provider(app.config())?);
    session.rebuild(index);

    println!("Ready. Ask questions (type 'exit' to quit).");
    let mut channel = CliChannel::stdio();
    session.run_chat(&mut channel).await?;
    println!("Exiting chat.");
    session.close().await?;
    Ok(())
}

async fn run_ask(app: &AppBuilder, dir: &Path, question: &str) -> anyhow::Result<()> {
    let index = build_index(app, dir).await?;
    let mut session = app.build_session(create_chat_provider(app.config())?);
    session.rebuild(index);
    let answer = session.ask(question).await;
    println!("{}", render_answer(&answer));
    session.close().await?;
    Ok(())
}

async fn run_summarize(app: &AppBuilder, file: &Path, stem: Option<String>) -> anyhow::Result<()> {
    let document = Extractor::default()
        .load(file, UnsupportedPolicy::Fail)
        .await
        .with_context(|| format!("failed to load {}", file.display()))?
        .with_context(|| format!("unsupported file {}", file.display()))?;

    let summarizer = app.build_summarizer(create_chat_provider(app.config())?)?;
    let summary = summarizer
        .summarize(&document.text(), &document.source)
        .await
        .context("summarization failed")?;

    let stem = stem.unwrap_or_else(|| app.config().summary.file_stem.clone());
    let (txt, md) = app
        .output_writer()
        .write_summary(&stem, &summary.extractive, &summary.abstractive)
        .await?;
    println!("Summaries saved to {} and {}", txt.display(), md.display());
    Ok(())
}

async fn run_research(app: &AppBuilder, topic: &str) -> anyhow::Result<()> {
    let research = app.build_research(create_chat_provider(app.config())?);
    let (_, path) = research
        .run_to_file(topic, &app.output_writer())
        .await
        .with_context(|| format!("market research for {topic} failed"))?;
    println!("Report saved as {}", path.display());
    Ok(())
}
