//! Extension-to-grammar table and the chunk-worthy node kinds per grammar.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Language with a tree-sitter grammar in the chunking table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lang {
    Python,
    JavaScript,
    Java,
    Cpp,
    CSharp,
}

impl Lang {
    /// Grammar name stored in chunk metadata.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::CSharp => "c_sharp",
        }
    }

    /// Get the tree-sitter grammar. Returns `None` if the
    /// corresponding feature is not enabled.
    #[must_use]
    pub fn grammar(self) -> Option<tree_sitter::Language> {
        match self {
            #[cfg(feature = "lang-python")]
            Self::Python => Some(tree_sitter_python::LANGUAGE.into()),
            #[cfg(feature = "lang-js")]
            Self::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
            #[cfg(feature = "lang-java")]
            Self::Java => Some(tree_sitter_java::LANGUAGE.into()),
            #[cfg(feature = "lang-cpp")]
            Self::Cpp => Some(tree_sitter_cpp::LANGUAGE.into()),
            #[cfg(feature = "lang-csharp")]
            Self::CSharp => Some(tree_sitter_c_sharp::LANGUAGE.into()),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    /// Declaration-level node kinds that become chunks.
    #[must_use]
    pub fn chunk_node_kinds(self) -> &'static [&'static str] {
        match self {
            Self::Python => &["function_definition", "class_definition"],
            Self::JavaScript => &[
                "function_declaration",
                "arrow_function",
                "class_declaration",
                "method_definition",
            ],
            Self::Java => &[
                "method_declaration",
                "class_declaration",
                "interface_declaration",
            ],
            Self::Cpp => &["function_definition", "class_specifier", "struct_specifier"],
            Self::CSharp => &[
                "method_declaration",
                "class_declaration",
                "interface_declaration",
                "struct_declaration",
            ],
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Detect the grammar from a file extension. Extensions the selector accepts
/// but this table does not list (`.ts`, `.go`, `.rs`, ...) return `None`.
#[must_use]
pub fn detect_language(path: &Path) -> Option<Lang> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "py" => Some(Lang::Python),
        "js" => Some(Lang::JavaScript),
        "java" => Some(Lang::Java),
        "cpp" | "cxx" | "cc" | "c" => Some(Lang::Cpp),
        "cs" => Some(Lang::CSharp),
        _ => None,
    }
}
