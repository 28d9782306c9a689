//! Persisted index pair: `vectors.idx` and `metadata.json`.
//!
//! Position `i` in the vector index corresponds to record `i` in the
//! metadata list. Both artifacts carry the same generation id. Writers
//! (`replace`, `clear`) hold an exclusive lock on `.lock` in the data
//! directory, so writers in different processes never interleave. A new pair
//! is written to temporary files and renamed into place under the store's
//! write guard, so in-process readers never see a mixed pair; readers in
//! other processes detect a mixed pair by comparing generations and retry.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chunker::CodeChunk;
use crate::error::{IndexError, Result};
use crate::flat::FlatIndex;

pub const VECTORS_FILE: &str = "vectors.idx";
pub const METADATA_FILE: &str = "metadata.json";
/// Advisory lock file shared by every writer of one data directory. Holds no data.
pub const LOCK_FILE: &str = ".lock";

const TMP_MARKER: &str = ".tmp-";

const LOAD_RETRIES: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// A loaded, consistent index pair.
#[derive(Debug, Clone)]
pub struct LoadedIndex {
    pub index: FlatIndex,
    pub records: Vec<CodeChunk>,
    pub generation: Uuid,
}

/// Summary of the persisted pair, read from metadata only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub chunk_count: usize,
    pub file_count: usize,
    pub dimension: usize,
    pub generation: Uuid,
}

#[derive(Serialize, Deserialize)]
struct MetadataFile {
    generation: Uuid,
    dimension: usize,
    records: Vec<CodeChunk>,
}

#[derive(Debug)]
pub struct IndexStore {
    dir: PathBuf,
    guard: RwLock<()>,
}

impl IndexStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            guard: RwLock::new(()),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn vectors_path(&self) -> PathBuf {
        self.dir.join(VECTORS_FILE)
    }

    #[must_use]
    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    /// Atomically replace the persisted pair with `index` and `records`.
    ///
    /// Blocks while another writer, in this process or another, holds the
    /// directory lock. Temporary files left by an interrupted writer are
    /// removed first.
    ///
    /// # Errors
    ///
    /// Returns an error if the lengths differ or the artifacts cannot be written.
    /// A failure before the swap leaves the previous pair in place. If the swap
    /// fails after the vectors were moved, both artifacts are removed so the
    /// store reads as not built instead of holding a mixed pair.
    pub fn replace(&self, index: &FlatIndex, records: &[CodeChunk]) -> Result<Uuid> {
        if index.len() != records.len() {
            return Err(IndexError::Inconsistent(format!(
                "{} vectors but {} metadata records",
                index.len(),
                records.len()
            )));
        }

        fs::create_dir_all(&self.dir)?;
        let _lock = DirLock::acquire(&self.dir)?;
        sweep_stale_temps(&self.dir);

        let generation = Uuid::new_v4();
        let vectors_tmp = self.dir.join(format!("{VECTORS_FILE}{TMP_MARKER}{generation}"));
        let metadata_tmp = self.dir.join(format!("{METADATA_FILE}{TMP_MARKER}{generation}"));

        let staged = stage_pair(&vectors_tmp, &metadata_tmp, index, records, generation);
        if let Err(e) = staged {
            remove_if_exists(&vectors_tmp);
            remove_if_exists(&metadata_tmp);
            return Err(e);
        }

        let _guard = self
            .guard
            .write()
            .map_err(|_| IndexError::Other("index store lock poisoned".into()))?;
        if let Err(e) = fs::rename(&vectors_tmp, self.vectors_path()) {
            remove_if_exists(&vectors_tmp);
            remove_if_exists(&metadata_tmp);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&metadata_tmp, self.metadata_path()) {
            tracing::error!(%generation, "metadata swap failed, removing index pair: {e}");
            remove_if_exists(&metadata_tmp);
            remove_if_exists(&self.vectors_path());
            remove_if_exists(&self.metadata_path());
            return Err(e.into());
        }

        tracing::debug!(%generation, chunks = records.len(), "index pair replaced");
        Ok(generation)
    }

    /// Load the persisted pair.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotBuilt`] when either artifact is missing,
    /// [`IndexError::Inconsistent`] if the pair keeps disagreeing after retries,
    /// or a decode error for corrupt artifacts.
    pub fn load(&self) -> Result<LoadedIndex> {
        let _guard = self
            .guard
            .read()
            .map_err(|_| IndexError::Other("index store lock poisoned".into()))?;

        let mut attempt = 0;
        loop {
            match self.read_pair() {
                Err(IndexError::Inconsistent(reason)) if attempt < LOAD_RETRIES => {
                    attempt += 1;
                    tracing::debug!(attempt, "index pair mid-swap ({reason}), retrying");
                    std::thread::sleep(RETRY_BACKOFF * attempt);
                }
                other => return other,
            }
        }
    }

    /// Delete both artifacts. Missing files are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing artifact cannot be removed.
    pub fn clear(&self) -> Result<()> {
        if !self.dir.is_dir() {
            return Ok(());
        }
        let _lock = DirLock::acquire(&self.dir)?;
        let _guard = self
            .guard
            .write()
            .map_err(|_| IndexError::Other("index store lock poisoned".into()))?;
        for path in [self.metadata_path(), self.vectors_path()] {
            match fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "removed index artifact"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Stats of the persisted pair, or `None` if nothing is built.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata exists but cannot be read.
    pub fn stats(&self) -> Result<Option<IndexStats>> {
        let _guard = self
            .guard
            .read()
            .map_err(|_| IndexError::Other("index store lock poisoned".into()))?;
        if !self.vectors_path().exists() {
            return Ok(None);
        }
        let meta = match self.read_metadata() {
            Ok(m) => m,
            Err(IndexError::NotBuilt) => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut files: Vec<&str> = meta.records.iter().map(|r| r.file.as_str()).collect();
        files.sort_unstable();
        files.dedup();
        Ok(Some(IndexStats {
            chunk_count: meta.records.len(),
            file_count: files.len(),
            dimension: meta.dimension,
            generation: meta.generation,
        }))
    }

    fn read_pair(&self) -> Result<LoadedIndex> {
        let file = open_artifact(&self.vectors_path())?;
        let (index, generation) = FlatIndex::read_from(&mut BufReader::new(file))?;
        let meta = self.read_metadata()?;

        if generation != meta.generation {
            return Err(IndexError::Inconsistent(format!(
                "vector generation {generation} != metadata generation {}",
                meta.generation
            )));
        }
        if index.len() != meta.records.len() || index.dim() != meta.dimension {
            return Err(IndexError::Inconsistent(format!(
                "{} vectors of dim {} vs {} records of dim {}",
                index.len(),
                index.dim(),
                meta.records.len(),
                meta.dimension
            )));
        }

        Ok(LoadedIndex {
            index,
            records: meta.records,
            generation,
        })
    }

    fn read_metadata(&self) -> Result<MetadataFile> {
        let file = open_artifact(&self.metadata_path())?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

/// Exclusive advisory lock on a data directory, released on drop.
struct DirLock(File);

impl DirLock {
    fn acquire(dir: &Path) -> Result<Self> {
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(dir.join(LOCK_FILE))?;
        file.lock()?;
        Ok(Self(file))
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        if let Err(e) = self.0.unlock() {
            tracing::warn!("failed to release index lock: {e}");
        }
    }
}

/// Remove `*.tmp-*` artifacts from writers that never finished.
/// Only safe while holding the directory lock.
fn sweep_stale_temps(dir: &Path) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let stale = [VECTORS_FILE, METADATA_FILE]
            .iter()
            .any(|artifact| name.starts_with(&format!("{artifact}{TMP_MARKER}")));
        if stale {
            tracing::debug!(file = %name, "removing stale temporary artifact");
            remove_if_exists(&entry.path());
        }
    }
}

fn open_artifact(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IndexError::NotBuilt
        } else {
            IndexError::Io(e)
        }
    })
}

fn stage_pair(
    vectors_tmp: &Path,
    metadata_tmp: &Path,
    index: &FlatIndex,
    records: &[CodeChunk],
    generation: Uuid,
) -> Result<()> {
    let mut w = BufWriter::new(File::create(vectors_tmp)?);
    index.write_to(&mut w, generation)?;
    let file = w.into_inner().map_err(|e| IndexError::Io(e.into_error()))?;
    file.sync_all()?;

    let meta = MetadataFile {
        generation,
        dimension: index.dim(),
        records: records.to_vec(),
    };
    let mut w = BufWriter::new(File::create(metadata_tmp)?);
    serde_json::to_writer_pretty(&mut w, &meta)?;
    w.flush()?;
    let file = w.into_inner().map_err(|e| IndexError::Io(e.into_error()))?;
    file.sync_all()?;
    Ok(())
}

fn remove_if_exists(path: &Path) {
    if let Err(e) = fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %path.display(), "failed to remove temporary artifact: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(file: &str, line: usize) -> CodeChunk {
        CodeChunk {
            file: file.into(),
            start_line: line,
            end_line: line + 1,
            content: format!("def f{line}(): pass"),
            language: Some("python".into()),
            kind: Some("function_definition".into()),
            name: Some(format!("f{line}")),
        }
    }

    fn sample(n: usize) -> (FlatIndex, Vec<CodeChunk>) {
        let mut index = FlatIndex::new(3);
        let mut records = Vec::new();
        for i in 0..n {
            #[allow(clippy::cast_precision_loss)]
            index.add(&[i as f32, 0.0, 1.0]).unwrap();
            records.push(chunk(if i % 2 == 0 { "a.py" } else { "b.py" }, i + 1));
        }
        (index, records)
    }

    #[test]
    fn load_before_build_is_not_built() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("data"));
        assert!(matches!(store.load(), Err(IndexError::NotBuilt)));
        assert!(store.stats().unwrap().is_none());
    }

    #[test]
    fn replace_then_load_keeps_pairing() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        let (index, records) = sample(4);
        let generation = store.replace(&index, &records).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.generation, generation);
        assert_eq!(loaded.index.len(), loaded.records.len());
        assert_eq!(loaded.records, records);
        assert_eq!(loaded.index, index);
    }

    #[test]
    fn fresh_store_reopens_persisted_pair() {
        let dir = tempfile::tempdir().unwrap();
        let (index, records) = sample(2);
        IndexStore::new(dir.path()).replace(&index, &records).unwrap();

        let reopened = IndexStore::new(dir.path());
        assert_eq!(reopened.load().unwrap().records.len(), 2);
    }

    #[test]
    fn replace_leaves_only_two_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        let (index, records) = sample(3);
        store.replace(&index, &records).unwrap();
        store.replace(&index, &records).unwrap();

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, [LOCK_FILE, METADATA_FILE, VECTORS_FILE]);
    }

    #[test]
    fn replace_sweeps_temporaries_from_interrupted_writers() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        let stale_vectors = dir.path().join(format!("{VECTORS_FILE}{TMP_MARKER}{}", Uuid::new_v4()));
        let stale_meta = dir.path().join(format!("{METADATA_FILE}{TMP_MARKER}{}", Uuid::new_v4()));
        fs::write(&stale_vectors, b"partial").unwrap();
        fs::write(&stale_meta, b"{").unwrap();
        let unrelated = dir.path().join("notes.txt");
        fs::write(&unrelated, b"keep").unwrap();

        let (index, records) = sample(2);
        store.replace(&index, &records).unwrap();

        assert!(!stale_vectors.exists());
        assert!(!stale_meta.exists());
        assert!(unrelated.exists());
        assert_eq!(store.load().unwrap().records.len(), 2);
    }

    #[test]
    fn concurrent_writers_on_separate_handles_never_mix_the_pair() {
        let dir = tempfile::tempdir().unwrap();
        let (index_a, records_a) = sample(3);
        let (index_b, records_b) = sample(5);

        for round in 0..50 {
            let a = IndexStore::new(dir.path());
            let b = IndexStore::new(dir.path());
            let (gen_a, gen_b) = std::thread::scope(|s| {
                let ta = s.spawn(|| a.replace(&index_a, &records_a).unwrap());
                let tb = s.spawn(|| b.replace(&index_b, &records_b).unwrap());
                (ta.join().unwrap(), tb.join().unwrap())
            });

            let loaded = IndexStore::new(dir.path())
                .load()
                .unwrap_or_else(|e| panic!("round {round}: {e}"));
            assert!(loaded.generation == gen_a || loaded.generation == gen_b);
            assert_eq!(loaded.index.len(), loaded.records.len());
        }

        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .contains(TMP_MARKER)
            })
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn failed_metadata_swap_leaves_store_not_built() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        let (index, records) = sample(2);
        store.replace(&index, &records).unwrap();

        // A non-empty directory at the metadata path makes the second rename fail.
        fs::remove_file(store.metadata_path()).unwrap();
        fs::create_dir(store.metadata_path()).unwrap();
        fs::write(store.metadata_path().join("occupied"), b"x").unwrap();

        assert!(store.replace(&index, &records).is_err());
        assert!(!store.vectors_path().exists());
        assert!(matches!(store.load(), Err(IndexError::NotBuilt)));
        assert!(store.stats().unwrap().is_none());
        let temps = fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .contains(TMP_MARKER)
            })
            .count();
        assert_eq!(temps, 0);
    }

    #[test]
    fn clear_on_missing_dir_does_not_create_it() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("never-built"));
        store.clear().unwrap();
        assert!(!store.dir().exists());
    }

    #[test]
    fn mismatched_lengths_rejected_without_touching_old_pair() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        let (index, records) = sample(2);
        let old = store.replace(&index, &records).unwrap();

        let err = store.replace(&index, &records[..1]).unwrap_err();
        assert!(matches!(err, IndexError::Inconsistent(_)));
        assert_eq!(store.load().unwrap().generation, old);
    }

    #[test]
    fn mixed_generations_reported_as_inconsistent() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        let (index, records) = sample(2);
        store.replace(&index, &records).unwrap();
        let stale_meta = fs::read(store.metadata_path()).unwrap();
        store.replace(&index, &records).unwrap();
        fs::write(store.metadata_path(), stale_meta).unwrap();

        assert!(matches!(store.load(), Err(IndexError::Inconsistent(_))));
    }

    #[test]
    fn missing_half_of_pair_is_not_built() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        let (index, records) = sample(2);
        store.replace(&index, &records).unwrap();
        fs::remove_file(store.vectors_path()).unwrap();
        assert!(matches!(store.load(), Err(IndexError::NotBuilt)));
    }

    #[test]
    fn clear_removes_both_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        let (index, records) = sample(1);
        store.replace(&index, &records).unwrap();

        store.clear().unwrap();
        assert!(!store.vectors_path().exists());
        assert!(!store.metadata_path().exists());
        store.clear().unwrap();
        assert!(matches!(store.load(), Err(IndexError::NotBuilt)));
    }

    #[test]
    fn stats_count_chunks_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        let (index, records) = sample(5);
        let generation = store.replace(&index, &records).unwrap();

        let stats = store.stats().unwrap().unwrap();
        assert_eq!(stats.chunk_count, 5);
        assert_eq!(stats.file_count, 2);
        assert_eq!(stats.dimension, 3);
        assert_eq!(stats.generation, generation);
    }

    #[test]
    fn corrupt_metadata_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        let (index, records) = sample(1);
        store.replace(&index, &records).unwrap();
        fs::write(store.metadata_path(), "{ not json").unwrap();
        assert!(matches!(store.load(), Err(IndexError::Json(_))));
    }
}
