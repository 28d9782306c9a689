//! Text embedding with a one-time encoder initialization and a sticky,
//! deterministic fallback.
//!
//! The service starts uninitialized. The first caller of [`EmbeddingService::embed`]
//! (or [`EmbeddingService::init`]) attempts to load the primary encoder; concurrent
//! first callers wait on the same attempt. Whatever it settles on is kept for the
//! lifetime of the service.

#[cfg(feature = "candle")]
mod bert;

#[cfg(feature = "candle")]
use std::sync::Arc;

use tokio::sync::OnceCell;

/// Dimension of every vector produced by the service, in either mode.
pub const EMBEDDING_DIM: usize = 384;

const NORM_EPSILON: f32 = 1e-8;

pub const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingConfig {
    /// `HuggingFace` repository id of the BERT encoder.
    pub model: String,
    /// Inputs longer than this many tokens are truncated.
    pub max_tokens: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_owned(),
            max_tokens: 512,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedMode {
    Primary,
    Fallback,
}

impl EmbedMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for EmbedMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vector produced for one text, tagged with the path that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbedOutcome {
    Primary(Vec<f32>),
    Fallback(Vec<f32>),
}

impl EmbedOutcome {
    #[must_use]
    pub fn vector(&self) -> &[f32] {
        match self {
            Self::Primary(v) | Self::Fallback(v) => v,
        }
    }

    #[must_use]
    pub fn into_vector(self) -> Vec<f32> {
        match self {
            Self::Primary(v) | Self::Fallback(v) => v,
        }
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

enum Encoder {
    #[cfg(feature = "candle")]
    Bert(Arc<bert::EmbedModel>),
    Hash,
}

impl Encoder {
    fn mode(&self) -> EmbedMode {
        match self {
            #[cfg(feature = "candle")]
            Self::Bert(_) => EmbedMode::Primary,
            Self::Hash => EmbedMode::Fallback,
        }
    }
}

pub struct EmbeddingService {
    config: EmbeddingConfig,
    encoder: OnceCell<Encoder>,
}

impl std::fmt::Debug for EmbeddingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingService")
            .field("config", &self.config)
            .field("mode", &self.mode())
            .finish()
    }
}

impl EmbeddingService {
    #[must_use]
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            encoder: OnceCell::new(),
        }
    }

    /// A service already settled in fallback mode. Never touches the network
    /// or the model cache.
    #[must_use]
    pub fn hash_only() -> Self {
        Self {
            config: EmbeddingConfig::default(),
            encoder: OnceCell::new_with(Some(Encoder::Hash)),
        }
    }

    /// Current mode, or `None` while the encoder has not been initialized.
    #[must_use]
    pub fn mode(&self) -> Option<EmbedMode> {
        self.encoder.get().map(Encoder::mode)
    }

    /// Run the one-time initialization if it has not happened yet.
    pub async fn init(&self) -> EmbedMode {
        self.encoder().await.mode()
    }

    /// Embed `text` into a unit vector of [`EMBEDDING_DIM`] components.
    pub async fn embed(&self, text: &str) -> Vec<f32> {
        self.embed_detailed(text).await.into_vector()
    }

    /// Like [`embed`](Self::embed) but reports which path produced the vector.
    pub async fn embed_detailed(&self, text: &str) -> EmbedOutcome {
        match self.encoder().await {
            #[cfg(feature = "candle")]
            Encoder::Bert(model) => {
                let model = Arc::clone(model);
                let owned = text.to_owned();
                match tokio::task::spawn_blocking(move || model.embed_sync(&owned)).await {
                    Ok(Ok(v)) if v.len() == EMBEDDING_DIM => EmbedOutcome::Primary(v),
                    Ok(Ok(v)) => {
                        tracing::warn!(
                            dim = v.len(),
                            "encoder returned unexpected dimension, using hash embedding"
                        );
                        EmbedOutcome::Fallback(hash_embedding(text))
                    }
                    Ok(Err(e)) => {
                        tracing::warn!("encoder inference failed, using hash embedding: {e}");
                        EmbedOutcome::Fallback(hash_embedding(text))
                    }
                    Err(e) => {
                        tracing::warn!("embedding task panicked, using hash embedding: {e}");
                        EmbedOutcome::Fallback(hash_embedding(text))
                    }
                }
            }
            Encoder::Hash => EmbedOutcome::Fallback(hash_embedding(text)),
        }
    }

    async fn encoder(&self) -> &Encoder {
        self.encoder
            .get_or_init(|| load_encoder(&self.config))
            .await
    }
}

#[cfg(feature = "candle")]
async fn load_encoder(config: &EmbeddingConfig) -> Encoder {
    let repo = config.model.clone();
    let max_tokens = config.max_tokens;
    let loaded = tokio::task::spawn_blocking(move || {
        let device = bert::select_device();
        let model = bert::EmbedModel::load(&repo, max_tokens, &device)?;
        let sample = model.embed_sync("dimension check")?;
        if sample.len() != EMBEDDING_DIM {
            return Err(crate::LlmError::DimensionMismatch {
                expected: EMBEDDING_DIM,
                actual: sample.len(),
            });
        }
        Ok(model)
    })
    .await;

    match loaded {
        Ok(Ok(model)) => {
            tracing::info!(model = %config.model, "embedding encoder loaded");
            Encoder::Bert(Arc::new(model))
        }
        Ok(Err(e)) => {
            tracing::warn!(model = %config.model, "encoder unavailable, using hash embeddings: {e}");
            Encoder::Hash
        }
        Err(e) => {
            tracing::warn!("encoder load task failed, using hash embeddings: {e}");
            Encoder::Hash
        }
    }
}

#[cfg(not(feature = "candle"))]
#[allow(clippy::unused_async)]
async fn load_encoder(config: &EmbeddingConfig) -> Encoder {
    tracing::warn!(
        model = %config.model,
        "built without the candle feature, using hash embeddings"
    );
    Encoder::Hash
}

/// Deterministic embedding derived from the text alone.
///
/// The blake3 extended output of the text is read as [`EMBEDDING_DIM`]
/// little-endian words, each mapped into `[0, 1)`, then normalized.
#[must_use]
pub fn hash_embedding(text: &str) -> Vec<f32> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(text.as_bytes());
    let mut bytes = [0u8; EMBEDDING_DIM * 4];
    hasher.finalize_xof().fill(&mut bytes);

    #[allow(clippy::cast_precision_loss)]
    let v = bytes
        .chunks_exact(4)
        .map(|b| {
            let word = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
            (word >> 8) as f32 / (1u32 << 24) as f32
        })
        .collect();
    l2_normalize(v)
}

/// Divide by the euclidean norm plus a small epsilon.
#[must_use]
pub fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm + NORM_EPSILON;
    for x in &mut v {
        *x /= denom;
    }
    v
}
