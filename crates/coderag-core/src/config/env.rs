use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("CODERAG_DATA_DIR") {
            self.index.data_dir = v.into();
        }
        if let Ok(v) = std::env::var("CODERAG_TOP_K") {
            if let Ok(k) = v.parse::<usize>() {
                self.index.top_k = k;
            } else {
                tracing::warn!("ignoring invalid CODERAG_TOP_K value: {v}");
            }
        }
        if let Ok(v) = std::env::var("CODERAG_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var("CODERAG_EMBEDDING_MAX_TOKENS") {
            if let Ok(n) = v.parse::<usize>() {
                self.embedding.max_tokens = n;
            } else {
                tracing::warn!("ignoring invalid CODERAG_EMBEDDING_MAX_TOKENS value: {v}");
            }
        }
        if let Ok(v) = std::env::var("CODERAG_LLM_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.llm.provider = kind;
            } else {
                tracing::warn!("ignoring invalid CODERAG_LLM_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("CODERAG_LLM_MODEL") {
            self.llm.model = Some(v);
        }
        if let Ok(v) = std::env::var("CODERAG_LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("CODERAG_LLM_TIMEOUT_SECS") {
            match v.parse::<u64>() {
                Ok(secs) if secs > 0 => self.llm.timeout_secs = secs,
                _ => tracing::warn!("ignoring invalid CODERAG_LLM_TIMEOUT_SECS value: {v}"),
            }
        }
    }
}
