mod env;
mod types;

#[cfg(test)]
mod tests;

pub use types::*;

use std::path::Path;

use anyhow::Context;

use crate::secret::{ApiKey, GEMINI_KEY_VAR, OPENAI_KEY_VAR};

impl Config {
    /// Read `path` if it exists (defaults otherwise), then apply `CODERAG_*`
    /// overrides and pick up provider API keys from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str::<Self>(&content)
                .with_context(|| format!("invalid config in {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Self::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("cannot read {}", path.display()));
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        config.resolve_secrets();
        Ok(config)
    }

    /// Reject values that would silently disable a component.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.llm.timeout_secs == 0 {
            anyhow::bail!("llm.timeout_secs must be greater than 0");
        }
        Ok(())
    }

    pub fn resolve_secrets(&mut self) {
        self.secrets.gemini_api_key = ApiKey::from_env(GEMINI_KEY_VAR);
        self.secrets.openai_api_key = ApiKey::from_env(OPENAI_KEY_VAR);
    }
}
