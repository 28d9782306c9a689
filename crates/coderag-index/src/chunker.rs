//! Declaration-level chunk extraction via tree-sitter.
//!
//! Every node whose kind is listed for the language becomes a chunk,
//! including nodes nested inside other chunk-worthy nodes, so a class and
//! each of its methods are all independently searchable.

use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Parser};

use crate::error::{IndexError, Result};
use crate::languages::Lang;

/// One span of declaration source, before it is attached to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFragment {
    /// 1-based, inclusive.
    pub start_line: usize,
    /// 1-based, inclusive.
    pub end_line: usize,
    pub content: String,
    pub kind: &'static str,
    pub name: Option<String>,
}

/// A chunk as persisted in the index metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeChunk {
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CodeChunk {
    /// Attach a fragment to its file, keeping at most `max_chars` characters of content.
    #[must_use]
    pub fn from_fragment(
        file: &str,
        lang: Lang,
        fragment: ChunkFragment,
        max_chars: usize,
    ) -> Self {
        Self {
            file: file.to_owned(),
            start_line: fragment.start_line,
            end_line: fragment.end_line,
            content: truncate_chars(&fragment.content, max_chars).to_owned(),
            language: Some(lang.id().to_owned()),
            kind: Some(fragment.kind.to_owned()),
            name: fragment.name,
        }
    }
}

/// Extract declaration chunks from `source`.
///
/// A language whose grammar is not compiled in yields no chunks.
///
/// # Errors
///
/// Returns [`IndexError::Parse`] if the grammar cannot be loaded into the
/// parser or parsing does not produce a tree.
pub fn extract_chunks(source: &str, lang: Lang) -> Result<Vec<ChunkFragment>> {
    let Some(grammar) = lang.grammar() else {
        tracing::warn!(language = %lang, "grammar not available, skipping");
        return Ok(Vec::new());
    };

    let mut parser = Parser::new();
    parser
        .set_language(&grammar)
        .map_err(|e| IndexError::Parse(format!("set_language failed: {e}")))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| IndexError::Parse(format!("no syntax tree produced for {lang}")))?;

    let kinds = lang.chunk_node_kinds();
    let mut chunks = Vec::new();
    let mut cursor = tree.root_node().walk();

    // Pre-order walk, so an enclosing declaration precedes the ones inside it.
    loop {
        let node = cursor.node();
        if kinds.contains(&node.kind())
            && let Some(fragment) = fragment_for(&node, source)
        {
            chunks.push(fragment);
        }

        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return Ok(chunks);
            }
        }
    }
}

fn fragment_for(node: &Node, source: &str) -> Option<ChunkFragment> {
    let content = source.get(node.byte_range())?.trim();
    if content.is_empty() {
        return None;
    }
    Some(ChunkFragment {
        start_line: node.start_position().row + 1,
        end_line: node.end_position().row + 1,
        content: content.to_owned(),
        kind: node.kind(),
        name: node
            .child_by_field_name("name")
            .and_then(|n| source.get(n.byte_range()))
            .map(str::to_owned),
    })
}

/// Longest prefix of `s` with at most `max_chars` characters.
#[must_use]
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
