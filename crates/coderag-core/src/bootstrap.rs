//! Wiring from [`Config`] to runtime components.

use std::path::{Path, PathBuf};
use std::time::Duration;

use coderag_llm::any::AnyProvider;
use coderag_llm::gemini::{self, GeminiProvider};
use coderag_llm::http::client_with_timeout;
use coderag_llm::openai::{self, OpenAiProvider};

use crate::config::{Config, ProviderKind};

pub const CONFIG_ENV: &str = "CODERAG_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Priority: CLI `--config` > `CODERAG_CONFIG` env > `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli: Option<&Path>) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(CONFIG_ENV)
        && !path.trim().is_empty()
    {
        return PathBuf::from(path);
    }
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

#[must_use]
pub fn llm_timeout(config: &Config) -> Duration {
    Duration::from_secs(config.llm.timeout_secs)
}

/// Remote provider for answer synthesis, or `None` when disabled or the key is missing.
#[must_use]
pub fn create_provider(config: &Config) -> Option<AnyProvider> {
    let client = || client_with_timeout(llm_timeout(config));
    match config.llm.provider {
        ProviderKind::None => {
            tracing::info!("answer generation disabled, using local summaries");
            None
        }
        ProviderKind::Gemini => {
            let Some(key) = &config.secrets.gemini_api_key else {
                tracing::info!("GEMINI_API_KEY not set, using local summaries");
                return None;
            };
            let provider = GeminiProvider::new(
                key.expose().to_owned(),
                config
                    .llm
                    .base_url
                    .clone()
                    .unwrap_or_else(|| gemini::DEFAULT_BASE_URL.to_owned()),
                config
                    .llm
                    .model
                    .clone()
                    .unwrap_or_else(|| gemini::DEFAULT_MODEL.to_owned()),
            )
            .with_client(client());
            tracing::info!(provider = "gemini", "remote answer generation enabled");
            Some(AnyProvider::Gemini(provider))
        }
        ProviderKind::OpenAi => {
            let Some(key) = &config.secrets.openai_api_key else {
                tracing::info!("OPENAI_API_KEY not set, using local summaries");
                return None;
            };
            let provider = OpenAiProvider::new(
                key.expose().to_owned(),
                config
                    .llm
                    .base_url
                    .clone()
                    .unwrap_or_else(|| openai::DEFAULT_BASE_URL.to_owned()),
                config
                    .llm
                    .model
                    .clone()
                    .unwrap_or_else(|| openai::DEFAULT_MODEL.to_owned()),
            )
            .with_client(client());
            tracing::info!(provider = "openai", "remote answer generation enabled");
            Some(AnyProvider::OpenAi(provider))
        }
    }
}

#[cfg(test)]
mod tests {
    use coderag_llm::LlmProvider;
    use serial_test::serial;

    use super::*;
    use crate::secret::{ApiKey, GEMINI_KEY_VAR, OPENAI_KEY_VAR};

    #[test]
    #[serial]
    fn cli_path_wins() {
        unsafe { std::env::set_var(CONFIG_ENV, "/from/env.toml") };
        let p = resolve_config_path(Some(Path::new("/from/cli.toml")));
        unsafe { std::env::remove_var(CONFIG_ENV) };
        assert_eq!(p, PathBuf::from("/from/cli.toml"));
    }

    #[test]
    #[serial]
    fn env_path_then_default() {
        unsafe { std::env::set_var(CONFIG_ENV, "/from/env.toml") };
        assert_eq!(resolve_config_path(None), PathBuf::from("/from/env.toml"));
        unsafe { std::env::remove_var(CONFIG_ENV) };
        assert_eq!(resolve_config_path(None), PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn provider_none_disables_remote() {
        let mut config = Config::default();
        config.llm.provider = ProviderKind::None;
        config.secrets.gemini_api_key = Some(ApiKey::new(GEMINI_KEY_VAR, "k"));
        assert!(create_provider(&config).is_none());
    }

    #[test]
    fn missing_key_disables_remote() {
        let config = Config::default();
        assert!(create_provider(&config).is_none());
    }

    #[test]
    fn gemini_key_enables_gemini() {
        let mut config = Config::default();
        config.secrets.gemini_api_key = Some(ApiKey::new(GEMINI_KEY_VAR, "k"));
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "gemini");
    }

    #[test]
    fn openai_selected_by_kind() {
        let mut config = Config::default();
        config.llm.provider = ProviderKind::OpenAi;
        config.secrets.gemini_api_key = Some(ApiKey::new(GEMINI_KEY_VAR, "g"));
        assert!(create_provider(&config).is_none());
        config.secrets.openai_api_key = Some(ApiKey::new(OPENAI_KEY_VAR, "o"));
        assert_eq!(create_provider(&config).unwrap().name(), "openai");
    }
}
