//! Embedding and answer-generation backends.
//!
//! [`embed::EmbeddingService`] maps text into a fixed 384-dimensional unit
//! vector space, using a local BERT encoder when the `candle` feature is
//! enabled and the weights can be loaded, and a deterministic hash-derived
//! vector otherwise. The provider modules wrap remote text-generation APIs
//! behind [`LlmProvider`].

pub mod any;
pub mod embed;
pub mod error;
pub mod gemini;
pub mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod openai;
pub mod provider;

pub use embed::{EMBEDDING_DIM, EmbedMode, EmbedOutcome, EmbeddingConfig, EmbeddingService};
pub use error::{LlmError, Result};
pub use provider::LlmProvider;
