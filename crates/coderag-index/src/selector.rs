//! Source file selection: directory exclusions, asset blocklist, source allowlist.

use std::path::{Component, Path, PathBuf};

/// Directory names that exclude every file beneath them.
pub const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "dist",
    "build",
    "__pycache__",
    ".idea",
    ".vscode",
];

/// Binary or generated assets. Checked against the lowercased file name so
/// compound suffixes like `.min.js` match.
pub const BLOCKED_SUFFIXES: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".bmp", ".svg", ".ico", ".lock", ".map", ".pdf", ".zip",
    ".min.js",
];

/// Source extensions eligible for indexing.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "tsx", "jsx", "java", "go", "cpp", "cc", "cxx", "c", "rb", "php", "rs", "cs",
];

/// A file picked for ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub abs_path: PathBuf,
    /// Path relative to the ingestion root.
    pub rel_path: String,
}

/// Recursively list eligible files under `root`, sorted by relative path.
///
/// Unreadable entries are skipped. Symlinks are not followed.
#[must_use]
pub fn select_files(root: &Path) -> Vec<SelectedFile> {
    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_some_and(|ft| ft.is_dir())
                || !is_excluded_dir(&entry.file_name().to_string_lossy())
        })
        .build();

    let mut files: Vec<SelectedFile> = walker
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::debug!("skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|e| e.file_type().is_some_and(|ft| ft.is_file()))
        .filter_map(|e| {
            let rel = e.path().strip_prefix(root).unwrap_or(e.path());
            if !is_eligible(rel) {
                return None;
            }
            let rel_path = rel.to_string_lossy().replace('\\', "/");
            Some(SelectedFile {
                rel_path,
                abs_path: e.into_path(),
            })
        })
        .collect();

    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    tracing::debug!(count = files.len(), root = %root.display(), "files selected");
    files
}

/// Apply the three filters to a path relative to the ingestion root.
#[must_use]
pub fn is_eligible(rel_path: &Path) -> bool {
    let in_excluded_dir = rel_path.components().any(|c| match c {
        Component::Normal(seg) => is_excluded_dir(&seg.to_string_lossy()),
        _ => false,
    });
    if in_excluded_dir {
        return false;
    }

    let Some(name) = rel_path.file_name().map(|n| n.to_string_lossy().to_lowercase()) else {
        return false;
    };
    if BLOCKED_SUFFIXES.iter().any(|s| name.ends_with(s)) {
        return false;
    }

    rel_path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        })
}

fn is_excluded_dir(name: &str) -> bool {
    EXCLUDED_DIRS.contains(&name)
}
