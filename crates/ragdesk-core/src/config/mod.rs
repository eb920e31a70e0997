mod env;
mod types;


pub use types::*;

use std::path::Path;

use anyhow::{Context, bail};

use crate::vault::{Secret, VaultProvider};

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Resolve API keys through the vault. Missing keys stay `None`; nothing is validated here.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault backend fails.
    pub async fn resolve_secrets(&mut self, vault: &dyn VaultProvider) -> anyhow::Result<()> {
        if let Some(val) = vault.get_secret("RAGDESK_LLM_API_KEY").await? {
            self.secrets.llm_api_key = Some(Secret::new(val));
        }
        if let Some(val) = vault.get_secret("RAGDESK_EMBEDDING_API_KEY").await? {
            self.secrets.embedding_api_key = Some(Secret::new(val));
        }
        if let Some(val) = vault.get_secret("RAGDESK_SERPER_API_KEY").await? {
            self.secrets.serper_api_key = Some(Secret::new(val));
        }
        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.chunking.chunk_size == 0 {
            bail!("chunking.chunk_size must be greater than 0");
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            bail!(
                "chunking.chunk_overlap ({}) must be less than chunking.chunk_size ({})",
                self.chunking.chunk_overlap,
                self.chunking.chunk_size
            );
        }
        if self.summary.chunk_size == 0 || self.summary.chunk_overlap >= self.summary.chunk_size {
            bail!(
                "summary.chunk_overlap ({}) must be less than a non-zero summary.chunk_size ({})",
                self.summary.chunk_overlap,
                self.summary.chunk_size
            );
        }
        if self.retrieval.top_k == 0 {
            bail!("retrieval.top_k must be greater than 0");
        }
        if self.research.max_iterations == 0 {
            bail!("research.max_iterations must be greater than 0");
        }
        Ok(())
    }
}
