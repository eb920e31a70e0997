use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_providers();
        self.apply_env_overrides_pipeline();
    }

    fn apply_env_overrides_providers(&mut self) {
        if let Ok(v) = std::env::var("RAGDESK_LLM_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.llm.provider = kind;
            } else {
                tracing::warn!("ignoring invalid RAGDESK_LLM_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("RAGDESK_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("RAGDESK_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("RAGDESK_EMBEDDING_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.embedding.provider = kind;
            } else {
                tracing::warn!("ignoring invalid RAGDESK_EMBEDDING_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("RAGDESK_EMBEDDING_BASE_URL") {
            self.embedding.base_url = v;
        }
        if let Ok(v) = std::env::var("RAGDESK_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
    }

    fn apply_env_overrides_pipeline(&mut self) {
        if let Ok(v) = std::env::var("RAGDESK_CHUNK_SIZE")
            && let Ok(size) = v.parse::<usize>()
        {
            self.chunking.chunk_size = size;
        }
        if let Ok(v) = std::env::var("RAGDESK_CHUNK_OVERLAP")
            && let Ok(overlap) = v.parse::<usize>()
        {
            self.chunking.chunk_overlap = overlap;
        }
        if let Ok(v) = std::env::var("RAGDESK_RETRIEVAL_TOP_K")
            && let Ok(k) = v.parse::<usize>()
        {
            self.retrieval.top_k = k;
        }
        if let Ok(v) = std::env::var("RAGDESK_OUTPUT_DIR") {
            self.output.dir = v;
        }
        if let Ok(v) = std::env::var("RAGDESK_QDRANT_URL") {
            self.memory.qdrant_url = v;
        }
        if let Ok(v) = std::env::var("RAGDESK_SEARCH_TIMEOUT")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.tools.search.timeout = secs;
            self.tools.article.timeout = secs;
        }
    }
}
