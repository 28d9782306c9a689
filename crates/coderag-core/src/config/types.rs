use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::secret::ApiKey;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_top_k() -> usize {
    6
}

fn default_metadata_max_chars() -> usize {
    2000
}

fn default_display_max_chars() -> usize {
    1600
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Directory holding `vectors.idx` and `metadata.json`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_metadata_max_chars")]
    pub metadata_max_chars: usize,
    /// Match content returned to callers is cut to this many characters.
    #[serde(default = "default_display_max_chars")]
    pub display_max_chars: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            top_k: default_top_k(),
            metadata_max_chars: default_metadata_max_chars(),
            display_max_chars: default_display_max_chars(),
        }
    }
}

fn default_embedding_model() -> String {
    coderag_llm::embed::DEFAULT_MODEL.to_owned()
}

fn default_max_tokens() -> usize {
    512
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl From<&EmbeddingConfig> for coderag_llm::EmbeddingConfig {
    fn from(c: &EmbeddingConfig) -> Self {
        Self {
            model: c.model.clone(),
            max_tokens: c.max_tokens,
        }
    }
}

/// Remote answer-generation backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    OpenAi,
    /// Always answer with the local summary.
    None,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    /// Provider default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Provider default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ResolvedSecrets {
    pub gemini_api_key: Option<ApiKey>,
    pub openai_api_key: Option<ApiKey>,
}
