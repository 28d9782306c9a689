//! Provider API keys, kept out of logs and config dumps.

use std::fmt;

pub const GEMINI_KEY_VAR: &str = "GEMINI_API_KEY";
pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";

/// An API key plus the environment variable it came from. Formatting shows
/// only the variable name.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    source: &'static str,
    value: String,
}

impl ApiKey {
    pub fn new(source: &'static str, value: impl Into<String>) -> Self {
        Self {
            source,
            value: value.into(),
        }
    }

    /// Read `var` from the environment. Unset and blank values are `None`.
    #[must_use]
    pub fn from_env(var: &'static str) -> Option<Self> {
        let value = std::env::var(var).ok()?;
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(Self::new(var, value))
        }
    }

    /// Environment variable the key was read from.
    #[must_use]
    pub fn source(&self) -> &'static str {
        self.source
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({}=<redacted>)", self.source)
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.source)
    }
}
