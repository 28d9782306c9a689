use crate::error::LlmError;
use crate::gemini::GeminiProvider;
#[cfg(feature = "mock")]
use crate::mock::MockProvider;
use crate::openai::OpenAiProvider;
use crate::provider::LlmProvider;

/// Closed set of answer-generation backends selectable from config.
#[derive(Debug, Clone)]
pub enum AnyProvider {
    Gemini(GeminiProvider),
    OpenAi(OpenAiProvider),
    #[cfg(feature = "mock")]
    Mock(MockProvider),
}

impl LlmProvider for AnyProvider {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        match self {
            Self::Gemini(p) => p.generate(prompt).await,
            Self::OpenAi(p) => p.generate(prompt).await,
            #[cfg(feature = "mock")]
            Self::Mock(p) => p.generate(prompt).await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Gemini(p) => p.name(),
            Self::OpenAi(p) => p.name(),
            #[cfg(feature = "mock")]
            Self::Mock(p) => p.name(),
        }
    }
}
