//! The ingest/query facade shared by every entry point.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use coderag_index::indexer::{CodeIndexer, IndexerConfig, IngestReport};
use coderag_index::retriever::{CodeRetriever, QueryResult};
use coderag_index::store::{IndexStats, IndexStore};
use coderag_llm::any::AnyProvider;
use coderag_llm::{EmbedMode, EmbeddingService, LlmProvider};
use serde::Serialize;

use crate::bootstrap::{create_provider, llm_timeout};
use crate::config::Config;
use crate::error::Result;
use crate::synthesizer::{AnswerSynthesizer, truncate_for_display};

/// Answer plus the matches it was built from, content cut for display.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub matches: Vec<QueryResult>,
}

/// Health report for the `status` command.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub data_dir: PathBuf,
    /// `None` until an ingest has succeeded.
    pub index: Option<IndexStats>,
    /// `None` until the embedding encoder has been initialized in this process.
    pub embedding_mode: Option<&'static str>,
    /// Remote answer backend, `None` when answers are always local.
    pub answer_provider: Option<&'static str>,
    pub default_top_k: usize,
}

pub struct CodeRag<P: LlmProvider = AnyProvider> {
    store: Arc<IndexStore>,
    embedder: Arc<EmbeddingService>,
    indexer: CodeIndexer,
    retriever: CodeRetriever,
    synthesizer: AnswerSynthesizer<P>,
    top_k: usize,
    display_max_chars: usize,
}

impl CodeRag<AnyProvider> {
    /// Build the service from configuration. The embedding model loads lazily
    /// on first use.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let embedder = Arc::new(EmbeddingService::new((&config.embedding).into()));
        let synthesizer =
            AnswerSynthesizer::new(create_provider(config)).with_timeout(llm_timeout(config));
        Self::with_parts(config, embedder, synthesizer)
    }
}

impl<P: LlmProvider> CodeRag<P> {
    #[must_use]
    pub fn with_parts(
        config: &Config,
        embedder: Arc<EmbeddingService>,
        synthesizer: AnswerSynthesizer<P>,
    ) -> Self {
        let store = Arc::new(IndexStore::new(&config.index.data_dir));
        let indexer = CodeIndexer::new(
            Arc::clone(&store),
            Arc::clone(&embedder),
            IndexerConfig {
                metadata_max_chars: config.index.metadata_max_chars,
            },
        );
        let retriever = CodeRetriever::new(Arc::clone(&store), Arc::clone(&embedder));
        Self {
            store,
            embedder,
            indexer,
            retriever,
            synthesizer,
            top_k: config.index.top_k,
            display_max_chars: config.index.display_max_chars,
        }
    }

    #[must_use]
    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Replace the index with the contents of `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is unreadable or the index cannot be written.
    pub async fn ingest(&self, root: &Path) -> Result<IngestReport> {
        Ok(self.indexer.ingest(root).await?)
    }

    /// Retrieve the `k` closest chunks (default from config) and answer from them.
    ///
    /// The answer is synthesized from full chunk content; returned matches are
    /// cut to the display limit afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexNotReady`](crate::CoreError::IndexNotReady)
    /// before any successful ingest.
    pub async fn query(&self, question: &str, k: Option<usize>) -> Result<QueryResponse> {
        let k = k.unwrap_or(self.top_k);
        let mut matches = self.retriever.search(question, k).await?;
        let answer = self.synthesizer.synthesize(question, &matches).await;
        truncate_for_display(&mut matches, self.display_max_chars);
        Ok(QueryResponse { answer, matches })
    }

    /// Index stats plus the embedding and answer backends in use.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata exists but cannot be read.
    pub async fn status(&self) -> Result<StatusReport> {
        let store = Arc::clone(&self.store);
        let index = tokio::task::spawn_blocking(move || store.stats()).await??;
        Ok(StatusReport {
            data_dir: self.store.dir().to_path_buf(),
            index,
            embedding_mode: self.embedder.mode().map(EmbedMode::as_str),
            answer_provider: self.synthesizer.provider_name(),
            default_top_k: self.top_k,
        })
    }
}
