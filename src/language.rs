//! Per-language source conventions: file extensions, comment syntax,
//! declaration patterns and body delimitation.
//!
//! The extractor does not build a full semantic model of any language. It
//! only needs enough structure to find function declarations, their line
//! spans and the comments near them, so everything here is line-oriented
//! configuration.

use std::path::Path;

/// A supported source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Go,
    Rust,
    Python,
    TypeScript,
    JavaScript,
    Java,
    C,
    Cpp,
}

/// Comment syntax for a language.
#[derive(Debug, Clone)]
pub struct CommentStyle {
    pub line_prefixes: &'static [&'static str],
    pub block_start: Option<&'static str>,
    pub block_end: Option<&'static str>,
    /// Decorative prefix on block-comment continuation lines (`* ...`).
    pub block_line_prefix: Option<&'static str>,
}

impl Language {
    pub fn comment_style(&self) -> CommentStyle {
        match self {
            Language::Rust => CommentStyle {
                line_prefixes: &["///", "//!", "//"],
                block_start: Some("/*"),
                block_end: Some("*/"),
                block_line_prefix: Some("*"),
            },
            Language::Python => CommentStyle {
                line_prefixes: &["#"],
                block_start: Some("\"\"\""),
                block_end: Some("\"\"\""),
                block_line_prefix: None,
            },
            Language::Go
            | Language::TypeScript
            | Language::JavaScript
            | Language::Java
            | Language::C
            | Language::Cpp => CommentStyle {
                line_prefixes: &["//"],
                block_start: Some("/*"),
                block_end: Some("*/"),
                block_line_prefix: Some("*"),
            },
        }
    }

    /// Regex matching the first line of a function or method declaration.
    /// Capture group 1 is the declaration name.
    pub fn declaration_pattern(&self) -> &'static str {
        match self {
            Language::Go => r"^\s*func\s+(?:\([^)]*\)\s*)?(\w+)(?:\[[^\]]*\])?\s*\(",
            Language::Rust => {
                r#"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?fn\s+(\w+)"#
            }
            Language::Python => r"^\s*(?:async\s+)?def\s+(\w+)",
            Language::TypeScript | Language::JavaScript => {
                r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(\w+)"
            }
            Language::Java => {
                r"^\s*(?:public|private|protected)?\s*(?:static\s+)?(?:\w+\s+)+(\w+)\s*\("
            }
            Language::C | Language::Cpp => r"^\s*(?:\w+\s+)+(\w+)\s*\(",
        }
    }

    /// Regex matching a package/unit declaration, if the language has one.
    /// Capture group 1 is the package name. Languages without a package
    /// clause fall back to the file stem.
    pub fn package_pattern(&self) -> Option<&'static str> {
        match self {
            Language::Go => Some(r"^package\s+(\w+)"),
            Language::Java => Some(r"^\s*package\s+([\w.]+)\s*;"),
            _ => None,
        }
    }

    /// Whether function bodies are delimited by indentation rather than
    /// braces.
    pub fn uses_indented_bodies(&self) -> bool {
        matches!(self, Language::Python)
    }

    /// Whether backtick strings exist and may span multiple lines (Go raw
    /// strings, JS/TS template literals). The span scanner must not count
    /// braces inside them.
    pub fn has_backtick_strings(&self) -> bool {
        matches!(
            self,
            Language::Go | Language::TypeScript | Language::JavaScript
        )
    }

    /// Whether a single quote opens a full string literal. Everywhere else
    /// it is a character literal (or a Rust lifetime) and is handled with
    /// lookahead instead.
    pub fn single_quote_strings(&self) -> bool {
        matches!(
            self,
            Language::TypeScript | Language::JavaScript | Language::Python
        )
    }

    pub fn extensions(&self) -> &[&str] {
        match self {
            Language::Go => &["go"],
            Language::Rust => &["rs"],
            Language::Python => &["py", "pyi"],
            Language::TypeScript => &["ts", "tsx"],
            Language::JavaScript => &["js", "jsx", "mjs"],
            Language::Java => &["java"],
            Language::C => &["c", "h"],
            Language::Cpp => &["cpp", "cc", "cxx", "hpp", "hh", "hxx"],
        }
    }

}

const ALL_LANGUAGES: [Language; 8] = [
    Language::Go,
    Language::Rust,
    Language::Python,
    Language::TypeScript,
    Language::JavaScript,
    Language::Java,
    Language::C,
    Language::Cpp,
];

/// Detect the source language from a file path's extension.
pub fn detect_language(path: &Path) -> Option<Language> {
    let ext = path.extension()?.to_str()?;

    ALL_LANGUAGES
        .into_iter()
        .find(|lang| lang.extensions().contains(&ext))
}

/// Check whether a file would be picked up when expanding a directory.
pub fn is_supported_file(path: &Path) -> bool {
    detect_language(path).is_some()
}
