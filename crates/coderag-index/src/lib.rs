//! Ingestion and retrieval pipeline over a source tree.
//!
//! Files are selected by [`selector`], split into declaration-level chunks by
//! tree-sitter in [`chunker`], embedded, and persisted by [`store`] as a flat
//! vector index paired position-by-position with a chunk metadata list.
//! [`retriever`] answers k-nearest-neighbor queries against the persisted pair.

pub mod chunker;
pub mod error;
pub mod flat;
pub mod indexer;
pub mod languages;
pub mod retriever;
pub mod selector;
pub mod store;

pub use chunker::CodeChunk;
pub use error::{IndexError, Result};
