//! Answer synthesis over retrieved matches, with a local fallback when the
//! remote model is unavailable.

use std::fmt::Write;
use std::time::Duration;

use coderag_index::retriever::QueryResult;
use coderag_llm::LlmProvider;
use coderag_llm::any::AnyProvider;
use coderag_llm::http::DEFAULT_TIMEOUT;

pub const INSTRUCTIONS: &str = "You are a senior software engineer. Answer succinctly in natural language. \
Cite file paths and line ranges when useful. If unsure, say so.";

pub const NO_MATCHES_MESSAGE: &str =
    "I couldn't find relevant code in the index yet. Try ingesting the repository first.";

const LOCAL_HEADER: &str = "Here's what I found based on a semantic scan of the codebase:\n\n";
const LOCAL_MAX_MATCHES: usize = 5;
const BLOCK_SEPARATOR: &str = "\n\n---\n\n";
const ELLIPSIS: &str = "\n...";

/// Synthesized answer, tagged with the path that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Remote(String),
    Local(String),
}

impl Answer {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Remote(t) | Self::Local(t) => t,
        }
    }

    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Remote(t) | Self::Local(t) => t,
        }
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

pub struct AnswerSynthesizer<P: LlmProvider = AnyProvider> {
    provider: Option<P>,
    timeout: Duration,
}

impl<P: LlmProvider> AnswerSynthesizer<P> {
    /// `None` means no remote model is configured; every answer is local.
    #[must_use]
    pub fn new(provider: Option<P>) -> Self {
        Self {
            provider,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn local_only() -> Self {
        Self::new(None)
    }

    /// Upper bound on one remote call, on top of the HTTP client timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn provider_name(&self) -> Option<&'static str> {
        self.provider.as_ref().map(LlmProvider::name)
    }

    /// Answer `question` from `matches`. Never fails and never returns an empty string.
    pub async fn synthesize(&self, question: &str, matches: &[QueryResult]) -> String {
        self.synthesize_detailed(question, matches)
            .await
            .into_text()
    }

    pub async fn synthesize_detailed(&self, question: &str, matches: &[QueryResult]) -> Answer {
        if let Some(provider) = &self.provider {
            let prompt = build_prompt(question, matches);
            match tokio::time::timeout(self.timeout, provider.generate(&prompt)).await {
                Ok(Ok(text)) if !text.trim().is_empty() => return Answer::Remote(text),
                Ok(Ok(_)) => {
                    tracing::warn!(
                        provider = provider.name(),
                        "empty answer, falling back to local summary"
                    );
                }
                Ok(Err(e)) => {
                    tracing::error!(
                        provider = provider.name(),
                        "answer generation failed: {e}. Falling back to local summary"
                    );
                }
                Err(_) => {
                    tracing::error!(
                        provider = provider.name(),
                        timeout_secs = self.timeout.as_secs_f64(),
                        "answer generation timed out. Falling back to local summary"
                    );
                }
            }
        }
        Answer::Local(local_answer(matches))
    }
}

/// Header line plus content for one match.
#[must_use]
pub fn context_block(m: &QueryResult) -> String {
    format!(
        "File: {} (lines {}-{})\n\n{}",
        m.chunk.file, m.chunk.start_line, m.chunk.end_line, m.chunk.content
    )
}

#[must_use]
pub fn build_prompt(question: &str, matches: &[QueryResult]) -> String {
    let blocks: Vec<String> = matches.iter().map(context_block).collect();
    format!(
        "{INSTRUCTIONS}\n\n\
         Question: {question}\n\n\
         Relevant code context (each block has a file path header):\n\n\
         {}\n\n\
         Please answer with a brief explanation first, then bullet points with file references.",
        blocks.join(BLOCK_SEPARATOR)
    )
}

/// Bullet list of the top matches, or a hint to ingest when there are none.
#[must_use]
pub fn local_answer(matches: &[QueryResult]) -> String {
    if matches.is_empty() {
        return NO_MATCHES_MESSAGE.to_owned();
    }
    let mut out = String::from(LOCAL_HEADER);
    for (i, m) in matches.iter().take(LOCAL_MAX_MATCHES).enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(
            out,
            "- `{}` lines {}-{}: looks related based on semantic similarity.",
            m.chunk.file, m.chunk.start_line, m.chunk.end_line
        );
    }
    out
}

/// Cut each match's content to `max_chars` characters plus an ellipsis marker.
pub fn truncate_for_display(matches: &mut [QueryResult], max_chars: usize) {
    for m in matches {
        if let Some((idx, _)) = m.chunk.content.char_indices().nth(max_chars) {
            m.chunk.content.truncate(idx);
            m.chunk.content.push_str(ELLIPSIS);
        }
    }
}
