//! Wiring from [`Config`] to concrete providers, stores and workflows.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use ragdesk_llm::any::AnyProvider;
use ragdesk_llm::ollama::OllamaProvider;
use ragdesk_llm::openai::OpenAiProvider;
use ragdesk_memory::{
    InMemoryVectorStore, IngestionPipeline, RetrievalConfig, Retriever, SplitterConfig,
    TextSplitter, VectorStore,
};
use ragdesk_tools::WebSearch;

use crate::answer::AnswerSynthesizer;
use crate::config::{Config, ProviderKind, VectorBackend};
use crate::output::OutputWriter;
use crate::research::MarketResearch;
use crate::session::ChatSession;
use crate::summarize::Summarizer;
use crate::vault::{EnvVaultProvider, Secret};

/// Loaded configuration plus the factories every subcommand needs.
pub struct AppBuilder {
    config: Config,
    config_path: PathBuf,
}

impl AppBuilder {
    /// Load config from `config_path`, resolve secrets from the environment and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be parsed or fails validation.
    pub async fn new(config_path: PathBuf) -> anyhow::Result<Self> {
        let mut config = Config::load(&config_path)?;
        config.resolve_secrets(&EnvVaultProvider).await?;
        config.validate()?;
        tracing::debug!(path = %config_path.display(), "configuration loaded");
        Ok(Self {
            config,
            config_path,
        })
    }

    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            config_path: PathBuf::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    #[must_use]
    pub fn output_writer(&self) -> OutputWriter {
        OutputWriter::new(&self.config.output.dir)
    }

    #[must_use]
    pub fn retriever(&self) -> Retriever {
        Retriever::new(RetrievalConfig {
            top_k: self.config.retrieval.top_k,
        })
    }

    /// # Errors
    ///
    /// Returns an error if the chunking settings are invalid.
    pub fn build_pipeline(&self, embedder: &AnyProvider) -> anyhow::Result<IngestionPipeline> {
        let splitter = TextSplitter::new(SplitterConfig::new(
            self.config.chunking.chunk_size,
            self.config.chunking.chunk_overlap,
        ))
        .context("invalid chunking settings")?;
        let store = create_vector_store(&self.config)?;
        Ok(IngestionPipeline::new(
            splitter,
            store,
            self.config.memory.collection.clone(),
            embedder.embed_fn(),
        ))
    }

    #[must_use]
    pub fn build_session(&self, provider: AnyProvider) -> ChatSession<AnyProvider> {
        ChatSession::new(AnswerSynthesizer::new(provider, self.retriever()))
    }

    /// # Errors
    ///
    /// Returns an error if the summary splitter settings are invalid.
    pub fn build_summarizer(&self, provider: AnyProvider) -> anyhow::Result<Summarizer<AnyProvider>> {
        let splitter = TextSplitter::new(SplitterConfig::new(
            self.config.summary.chunk_size,
            self.config.summary.chunk_overlap,
        ))
        .context("invalid summary splitter settings")?;
        Ok(Summarizer::new(provider, splitter))
    }

    #[must_use]
    pub fn build_research(&self, provider: AnyProvider) -> MarketResearch<AnyProvider> {
        let api_key = self
            .config
            .secrets
            .serper_api_key
            .as_ref()
            .map(|s| s.expose().to_owned());
        if api_key.is_none() {
            tracing::warn!("RAGDESK_SERPER_API_KEY is not set; web search will report errors");
        }
        let search = WebSearch::new(&self.config.tools, api_key);
        MarketResearch::new(provider, search, self.config.research.clone())
    }
}

/// Priority: `--config` argument > `RAGDESK_CONFIG` env > `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli: Option<&Path>) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("RAGDESK_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

fn exposed(secret: Option<&Secret>, name: &str) -> String {
    secret.map_or_else(
        || {
            tracing::warn!("{name} is not set; requests will likely be rejected");
            String::new()
        },
        |s| s.expose().to_owned(),
    )
}

/// Chat model backend from `[llm]`.
///
/// # Errors
///
/// Returns an error if the provider cannot be constructed.
pub fn create_chat_provider(config: &Config) -> anyhow::Result<AnyProvider> {
    let llm = &config.llm;
    let provider = match llm.provider {
        ProviderKind::OpenAi => {
            let key = exposed(config.secrets.llm_api_key.as_ref(), "RAGDESK_LLM_API_KEY");
            AnyProvider::OpenAi(
                OpenAiProvider::new(
                    key,
                    llm.base_url.clone(),
                    llm.model.clone(),
                    llm.max_tokens,
                    None,
                )
                .with_temperature(llm.temperature),
            )
        }
        ProviderKind::Ollama => AnyProvider::Ollama(OllamaProvider::new(
            &llm.base_url,
            llm.model.clone(),
            config.embedding.model.clone(),
        )),
    };
    tracing::info!(provider = llm.provider.as_str(), model = %llm.model, "chat provider ready");
    Ok(provider)
}

/// Embedding backend from `[embedding]`.
///
/// # Errors
///
/// Returns an error if the provider cannot be constructed.
pub fn create_embedding_provider(config: &Config) -> anyhow::Result<AnyProvider> {
    let emb = &config.embedding;
    let provider = match emb.provider {
        ProviderKind::OpenAi => {
            let key = exposed(
                config.secrets.embedding_api_key.as_ref(),
                "RAGDESK_EMBEDDING_API_KEY",
            );
            AnyProvider::OpenAi(OpenAiProvider::new(
                key,
                emb.base_url.clone(),
                config.llm.model.clone(),
                config.llm.max_tokens,
                Some(emb.model.clone()),
            ))
        }
        ProviderKind::Ollama => AnyProvider::Ollama(OllamaProvider::new(
            &emb.base_url,
            config.llm.model.clone(),
            emb.model.clone(),
        )),
    };
    tracing::info!(provider = emb.provider.as_str(), model = %emb.model, "embedding provider ready");
    Ok(provider)
}

/// Vector store from `[memory]`.
///
/// # Errors
///
/// Returns an error if Qdrant is selected but unavailable in this build or its client
/// cannot be created.
pub fn create_vector_store(config: &Config) -> anyhow::Result<Arc<dyn VectorStore>> {
    match config.memory.backend {
        VectorBackend::Memory => Ok(Arc::new(InMemoryVectorStore::new())),
        #[cfg(feature = "qdrant")]
        VectorBackend::Qdrant => {
            let ops = ragdesk_memory::QdrantOps::new(&config.memory.qdrant_url)
                .context("failed to create Qdrant client")?;
            Ok(Arc::new(ops))
        }
        #[cfg(not(feature = "qdrant"))]
        VectorBackend::Qdrant => {
            anyhow::bail!("memory.backend = \"qdrant\" requires building with the `qdrant` feature")
        }
    }
}

#[cfg(test)]
mod tests {
    use ragdesk_llm::LlmProvider;
    use serial_test::serial;

    use super::*;

    #[test]
    fn resolve_config_path_prefers_cli() {
        let path = resolve_config_path(Some(Path::new("custom.toml")));
        assert_eq!(path, PathBuf::from("custom.toml"));
    }

    #[test]
    #[serial]
    fn resolve_config_path_env_then_default() {
        unsafe { std::env::set_var("RAGDESK_CONFIG", "/etc/ragdesk.toml") };
        assert_eq!(resolve_config_path(None), PathBuf::from("/etc/ragdesk.toml"));
        unsafe { std::env::remove_var("RAGDESK_CONFIG") };
        assert_eq!(
            resolve_config_path(None),
            PathBuf::from("config/default.toml")
        );
    }

    #[test]
    fn chat_provider_defaults_to_openai_compatible() {
        let config = Config::default();
        let provider = create_chat_provider(&config).unwrap();
        assert!(matches!(provider, AnyProvider::OpenAi(_)));
        assert!(!provider.supports_embeddings());
    }

    #[test]
    fn embedding_provider_supports_embeddings() {
        let mut config = Config::default();
        config.secrets.embedding_api_key = Some(Secret::new("k"));
        let provider = create_embedding_provider(&config).unwrap();
        assert!(provider.supports_embeddings());

        config.embedding.provider = ProviderKind::Ollama;
        let provider = create_embedding_provider(&config).unwrap();
        assert!(matches!(provider, AnyProvider::Ollama(_)));
    }

    #[test]
    fn ollama_chat_provider() {
        let mut config = Config::default();
        config.llm.provider = ProviderKind::Ollama;
        config.llm.base_url = "http://localhost:11434".into();
        let provider = create_chat_provider(&config).unwrap();
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn memory_backend_by_default() {
        assert!(create_vector_store(&Config::default()).is_ok());
    }

    #[cfg(not(feature = "qdrant"))]
    #[test]
    fn qdrant_without_feature_errors() {
        let mut config = Config::default();
        config.memory.backend = VectorBackend::Qdrant;
        let err = create_vector_store(&config).err().unwrap();
        assert!(err.to_string().contains("qdrant"));
    }

    #[test]
    fn invalid_chunking_is_reported() {
        let mut config = Config::default();
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        let app = AppBuilder::from_config(config);
        let embedder = AnyProvider::Mock(ragdesk_llm::mock::MockProvider::default());
        let err = app.build_pipeline(&embedder).err().unwrap();
        assert!(err.to_string().contains("invalid chunking settings"));
    }

    #[test]
    fn retriever_uses_configured_top_k() {
        let mut config = Config::default();
        config.retrieval.top_k = 7;
        assert_eq!(AppBuilder::from_config(config).retriever().top_k(), 7);
    }

    #[tokio::test]
    #[serial]
    async fn new_reads_secrets_from_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        unsafe { std::env::set_var("RAGDESK_LLM_API_KEY", "gsk-env") };
        let app = AppBuilder::new(path.clone()).await.unwrap();
        unsafe { std::env::remove_var("RAGDESK_LLM_API_KEY") };

        assert_eq!(app.config_path(), path);
        assert_eq!(
            app.config().secrets.llm_api_key.as_ref().map(Secret::expose),
            Some("gsk-env")
        );
    }
}
