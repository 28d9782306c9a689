//! Configuration, answer synthesis, and the ingest/query service.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod secret;
pub mod service;
pub mod synthesizer;

pub use error::CoreError;
pub use service::{CodeRag, QueryResponse, StatusReport};
pub use synthesizer::{Answer, AnswerSynthesizer};
