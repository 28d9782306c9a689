//! Scripted answer provider for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::error::LlmError;
use crate::provider::LlmProvider;

const CANNED_ANSWER: &str = "mock answer";

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail,
}

/// Replays queued replies in order, then repeats a fixed reply. Every prompt
/// received is recorded and shared between clones.
#[derive(Debug, Clone)]
pub struct MockProvider {
    script: Arc<Mutex<VecDeque<Reply>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    then: Reply,
    delay: Duration,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            script: Arc::default(),
            prompts: Arc::default(),
            then: Reply::Text(CANNED_ANSWER.to_owned()),
            delay: Duration::ZERO,
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            script: Arc::new(Mutex::new(responses.into_iter().map(Reply::Text).collect())),
            ..Self::default()
        }
    }

    /// Every call fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            then: Reply::Fail,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    /// Prompts received so far, oldest first.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next_reply(&self) -> Reply {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| self.then.clone())
    }
}

impl LlmProvider for MockProvider {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_owned());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.next_reply() {
            Reply::Text(text) => Ok(text),
            Reply::Fail => Err(LlmError::Other("mock provider failure".into())),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queued_replies_then_canned() {
        let mock = MockProvider::with_responses(vec!["one".into(), "two".into()]);
        assert_eq!(mock.generate("a").await.unwrap(), "one");
        assert_eq!(mock.generate("b").await.unwrap(), "two");
        assert_eq!(mock.generate("c").await.unwrap(), CANNED_ANSWER);
        assert_eq!(mock.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn failing_always_errors_and_clones_share_log() {
        let mock = MockProvider::failing();
        let clone = mock.clone();
        assert!(clone.generate("x").await.is_err());
        assert_eq!(mock.prompts(), vec!["x"]);
    }
}
