//! Ingest orchestrator: select → chunk → embed → replace the persisted pair.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use coderag_llm::{EMBEDDING_DIM, EmbeddingService};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::chunker::{CodeChunk, extract_chunks};
use crate::error::{IndexError, Result};
use crate::flat::FlatIndex;
use crate::languages::detect_language;
use crate::selector::{SelectedFile, select_files};
use crate::store::IndexStore;

/// Indexer configuration.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Chunk content kept in metadata (and embedded), in characters.
    pub metadata_max_chars: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            metadata_max_chars: 2000,
        }
    }
}

/// Summary of an ingest run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Chunks persisted.
    pub chunk_count: usize,
    /// Distinct files that contributed at least one chunk.
    pub file_count: usize,
    /// Files that passed selection.
    pub files_scanned: usize,
    /// Selected files that were unreadable, unparsable, or had no grammar.
    pub files_skipped: usize,
    /// Chunks whose vector came from the fallback embedding.
    pub fallback_embeddings: usize,
    pub duration_ms: u64,
}

/// Builds the index for a source tree. At most one ingest runs at a time per indexer.
pub struct CodeIndexer {
    store: Arc<IndexStore>,
    embedder: Arc<EmbeddingService>,
    config: IndexerConfig,
    ingest_lock: Mutex<()>,
}

impl CodeIndexer {
    #[must_use]
    pub fn new(
        store: Arc<IndexStore>,
        embedder: Arc<EmbeddingService>,
        config: IndexerConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
            ingest_lock: Mutex::new(()),
        }
    }

    /// Index every eligible file under `root`, replacing the previous index.
    ///
    /// An ingest that produces no chunks deletes the previous index and
    /// reports zero counts.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::SourceUnreadable`] if `root` is not a readable
    /// directory, or an error if the index artifacts cannot be written.
    pub async fn ingest(&self, root: &Path) -> Result<IngestReport> {
        let _guard = self.ingest_lock.lock().await;
        let start = std::time::Instant::now();

        ensure_readable_dir(root).await?;

        let root_owned = root.to_path_buf();
        let max_chars = self.config.metadata_max_chars;
        let extraction =
            tokio::task::spawn_blocking(move || extract_tree(&root_owned, max_chars)).await?;

        let mut report = IngestReport {
            files_scanned: extraction.files_scanned,
            files_skipped: extraction.files_skipped,
            ..IngestReport::default()
        };

        if extraction.chunks.is_empty() {
            let store = Arc::clone(&self.store);
            tokio::task::spawn_blocking(move || store.clear()).await??;
            tracing::info!(
                files_scanned = report.files_scanned,
                "no chunks extracted, previous index cleared"
            );
            report.duration_ms = elapsed_ms(start);
            return Ok(report);
        }

        let total = extraction.chunks.len();
        tracing::info!(chunks = total, "embedding chunks");

        let mut index = FlatIndex::with_capacity(EMBEDDING_DIM, total);
        for (i, chunk) in extraction.chunks.iter().enumerate() {
            let outcome = self.embedder.embed_detailed(&chunk.content).await;
            if outcome.is_fallback() {
                report.fallback_embeddings += 1;
            }
            index.add(outcome.vector())?;
            if (i + 1) % 500 == 0 {
                tracing::info!(progress = format_args!("{}/{total}", i + 1), "embedding");
            }
        }

        report.chunk_count = total;
        report.file_count = extraction
            .chunks
            .iter()
            .map(|c| c.file.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        let store = Arc::clone(&self.store);
        let records = extraction.chunks;
        let generation =
            tokio::task::spawn_blocking(move || store.replace(&index, &records)).await??;

        report.duration_ms = elapsed_ms(start);
        tracing::info!(
            %generation,
            chunks = report.chunk_count,
            files = report.file_count,
            skipped = report.files_skipped,
            duration_ms = report.duration_ms,
            "ingestion complete"
        );
        Ok(report)
    }
}

struct Extraction {
    chunks: Vec<CodeChunk>,
    files_scanned: usize,
    files_skipped: usize,
}

fn extract_tree(root: &Path, max_chars: usize) -> Extraction {
    let files = select_files(root);
    let mut extraction = Extraction {
        chunks: Vec::new(),
        files_scanned: files.len(),
        files_skipped: 0,
    };

    for file in &files {
        match chunk_one(file, max_chars) {
            Ok(chunks) => {
                tracing::debug!(file = %file.rel_path, chunks = chunks.len());
                extraction.chunks.extend(chunks);
            }
            Err(e) => {
                tracing::warn!(file = %file.rel_path, "skipping file: {e}");
                extraction.files_skipped += 1;
            }
        }
    }
    extraction
}

fn chunk_one(file: &SelectedFile, max_chars: usize) -> Result<Vec<CodeChunk>> {
    let lang = detect_language(&file.abs_path).ok_or(IndexError::UnsupportedLanguage)?;
    let bytes = std::fs::read(&file.abs_path)?;
    let source = String::from_utf8_lossy(&bytes);
    let fragments = extract_chunks(&source, lang)?;
    Ok(fragments
        .into_iter()
        .map(|f| CodeChunk::from_fragment(&file.rel_path, lang, f, max_chars))
        .collect())
}

async fn ensure_readable_dir(root: &Path) -> Result<()> {
    let unreadable = |source| IndexError::SourceUnreadable {
        path: root.to_path_buf(),
        source,
    };
    let meta = tokio::fs::metadata(root).await.map_err(unreadable)?;
    if !meta.is_dir() {
        return Err(unreadable(std::io::Error::new(
            std::io::ErrorKind::NotADirectory,
            "not a directory",
        )));
    }
    tokio::fs::read_dir(root).await.map_err(unreadable)?;
    Ok(())
}

fn elapsed_ms(start: std::time::Instant) -> u64 {
    start.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}
