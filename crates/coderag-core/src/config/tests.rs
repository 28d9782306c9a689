use std::io::Write;
use std::path::Path;

use serial_test::serial;

use super::*;

const ENV_KEYS: [&str; 10] = [
    "CODERAG_DATA_DIR",
    "CODERAG_TOP_K",
    "CODERAG_EMBEDDING_MODEL",
    "CODERAG_EMBEDDING_MAX_TOKENS",
    "CODERAG_LLM_PROVIDER",
    "CODERAG_LLM_MODEL",
    "CODERAG_LLM_BASE_URL",
    "CODERAG_LLM_TIMEOUT_SECS",
    "GEMINI_API_KEY",
    "OPENAI_API_KEY",
];

fn clear_env() {
    for key in ENV_KEYS {
        unsafe { std::env::remove_var(key) };
    }
}

fn set_env(key: &str, value: &str) {
    unsafe { std::env::set_var(key, value) };
}

#[test]
#[serial]
fn missing_file_yields_defaults() {
    clear_env();
    let config = Config::load(Path::new("/nonexistent/coderag.toml")).unwrap();
    assert_eq!(config.index.data_dir, Path::new("data"));
    assert_eq!(config.index.top_k, 6);
    assert_eq!(config.index.metadata_max_chars, 2000);
    assert_eq!(config.index.display_max_chars, 1600);
    assert_eq!(config.embedding.max_tokens, 512);
    assert_eq!(config.llm.provider, ProviderKind::Gemini);
    assert_eq!(config.llm.timeout_secs, 60);
    assert!(config.secrets.gemini_api_key.is_none());
}

#[test]
#[serial]
fn partial_file_fills_remaining_defaults() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[index]
data_dir = "/var/lib/coderag"
top_k = 3

[llm]
provider = "openai"
model = "gpt-test"
"#
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.index.data_dir, Path::new("/var/lib/coderag"));
    assert_eq!(config.index.top_k, 3);
    assert_eq!(config.index.display_max_chars, 1600);
    assert_eq!(config.llm.provider, ProviderKind::OpenAi);
    assert_eq!(config.llm.model.as_deref(), Some("gpt-test"));
    assert!(config.llm.base_url.is_none());
}

#[test]
#[serial]
fn invalid_toml_is_an_error() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[index\ntop_k = ").unwrap();
    assert!(Config::load(file.path()).is_err());
}

#[test]
#[serial]
fn env_overrides_file_values() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[index]\ntop_k = 3\n").unwrap();

    set_env("CODERAG_TOP_K", "9");
    set_env("CODERAG_DATA_DIR", "/tmp/idx");
    set_env("CODERAG_LLM_PROVIDER", "none");
    set_env("CODERAG_LLM_TIMEOUT_SECS", "5");
    set_env("CODERAG_EMBEDDING_MODEL", "org/encoder");
    let config = Config::load(file.path()).unwrap();
    clear_env();

    assert_eq!(config.index.top_k, 9);
    assert_eq!(config.index.data_dir, Path::new("/tmp/idx"));
    assert_eq!(config.llm.provider, ProviderKind::None);
    assert_eq!(config.llm.timeout_secs, 5);
    assert_eq!(config.embedding.model, "org/encoder");
}

#[test]
#[serial]
fn invalid_env_values_ignored() {
    clear_env();
    set_env("CODERAG_TOP_K", "many");
    set_env("CODERAG_LLM_PROVIDER", "skynet");
    set_env("CODERAG_LLM_TIMEOUT_SECS", "0");
    let config = Config::load(Path::new("/nonexistent/coderag.toml")).unwrap();
    clear_env();

    assert_eq!(config.index.top_k, 6);
    assert_eq!(config.llm.provider, ProviderKind::Gemini);
    assert_eq!(config.llm.timeout_secs, 60);
}

#[test]
#[serial]
fn api_keys_read_from_env_and_blank_is_unset() {
    clear_env();
    set_env("GEMINI_API_KEY", "g-key");
    set_env("OPENAI_API_KEY", "   ");
    let config = Config::load(Path::new("/nonexistent/coderag.toml")).unwrap();
    clear_env();

    assert_eq!(
        config.secrets.gemini_api_key.as_ref().map(crate::secret::ApiKey::expose),
        Some("g-key")
    );
    assert!(config.secrets.openai_api_key.is_none());
    assert!(!format!("{:?}", config.secrets).contains("g-key"));
}

#[test]
fn provider_kind_round_trips_names() {
    for kind in [ProviderKind::Gemini, ProviderKind::OpenAi, ProviderKind::None] {
        let parsed: ProviderKind =
            serde_json::from_value(serde_json::Value::String(kind.to_string())).unwrap();
        assert_eq!(parsed, kind);
    }
}

#[test]
fn shipped_default_config_matches_defaults() {
    let shipped: Config =
        toml::from_str(include_str!("../../../../config/default.toml")).unwrap();
    let defaults = Config::default();
    assert_eq!(shipped.index.data_dir, defaults.index.data_dir);
    assert_eq!(shipped.index.top_k, defaults.index.top_k);
    assert_eq!(shipped.index.display_max_chars, defaults.index.display_max_chars);
    assert_eq!(shipped.embedding.model, defaults.embedding.model);
    assert_eq!(shipped.llm.provider, defaults.llm.provider);
    assert_eq!(shipped.llm.timeout_secs, defaults.llm.timeout_secs);
}

#[test]
#[serial]
fn zero_timeout_in_file_is_rejected() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[llm]\ntimeout_secs = 0\n").unwrap();
    let err = Config::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("llm.timeout_secs"));
}

#[test]
#[serial]
fn zero_timeout_in_file_overridden_by_env_is_accepted() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[llm]\ntimeout_secs = 0\n").unwrap();
    set_env("CODERAG_LLM_TIMEOUT_SECS", "15");
    let config = Config::load(file.path());
    clear_env();
    assert_eq!(config.unwrap().llm.timeout_secs, 15);
}
