//! Source analysis - structured facts extracted with tree-sitter
//!
//! Facts are a compact description of a file (declarations, imports and the
//! leading doc comment). Summarizing facts instead of raw text keeps prompts
//! small; any failure here is recovered by summarizing the raw text instead.

pub mod language;
mod python;
mod rust;

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;
use tree_sitter::{Node, Parser, Tree};

pub use language::Language;

/// Kind of a top-level or nested declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Class,
    Function,
    Struct,
    Enum,
    Trait,
    Union,
    TypeAlias,
    Module,
    Const,
    Static,
    Macro,
    Impl,
}

impl DeclKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeclKind::Class => "class",
            DeclKind::Function => "fn",
            DeclKind::Struct => "struct",
            DeclKind::Enum => "enum",
            DeclKind::Trait => "trait",
            DeclKind::Union => "union",
            DeclKind::TypeAlias => "type",
            DeclKind::Module => "mod",
            DeclKind::Const => "const",
            DeclKind::Static => "static",
            DeclKind::Macro => "macro",
            DeclKind::Impl => "impl",
        }
    }

    /// Classes and type definitions
    pub fn is_type(self) -> bool {
        matches!(
            self,
            DeclKind::Class
                | DeclKind::Struct
                | DeclKind::Enum
                | DeclKind::Trait
                | DeclKind::Union
                | DeclKind::TypeAlias
        )
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: DeclKind,
    pub name: String,
}

impl Declaration {
    pub fn new(kind: DeclKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// Structured description of one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFacts {
    pub language: Language,
    /// In document order
    pub declarations: Vec<Declaration>,
    pub imports: BTreeSet<String>,
    pub leading_doc: Option<String>,
}

impl FileFacts {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            declarations: Vec::new(),
            imports: BTreeSet::new(),
            leading_doc: None,
        }
    }

    pub fn names_where(&self, pred: impl Fn(DeclKind) -> bool) -> Vec<&str> {
        self.declarations
            .iter()
            .filter(|d| pred(d.kind))
            .map(|d| d.name.as_str())
            .collect()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("no analyzer for {0}")]
    Unsupported(Language),

    #[error("syntax errors in {0} source")]
    Syntax(Language),

    #[error("parser unavailable: {0}")]
    Parser(String),
}

/// Extract facts from source text
pub fn analyze(text: &str, language: Language) -> Result<FileFacts, ParseFailure> {
    let grammar = match language {
        Language::Python => tree_sitter_python::language(),
        Language::Rust => tree_sitter_rust::language(),
        other => return Err(ParseFailure::Unsupported(other)),
    };

    let tree = parse(text, &grammar)?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(ParseFailure::Syntax(language));
    }

    let source = text.as_bytes();
    let mut facts = FileFacts::new(language);
    match language {
        Language::Python => python::collect(root, source, &mut facts),
        _ => rust::collect(root, source, &mut facts),
    }
    Ok(facts)
}

fn parse(text: &str, grammar: &tree_sitter::Language) -> Result<Tree, ParseFailure> {
    let mut parser = Parser::new();
    parser
        .set_language(grammar)
        .map_err(|e| ParseFailure::Parser(e.to_string()))?;
    parser
        .parse(text, None)
        .ok_or_else(|| ParseFailure::Parser("parse cancelled".to_string()))
}

/// Visit every node below `root` in document (pre-)order
pub(crate) fn walk_preorder<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>)) {
    let mut cursor = root.walk();
    loop {
        visit(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

pub(crate) fn node_text<'s>(node: Node<'_>, source: &'s [u8]) -> Option<&'s str> {
    node.utf8_text(source).ok()
}

pub(crate) fn field_text(node: Node<'_>, field: &str, source: &[u8]) -> Option<String> {
    node.child_by_field_name(field)
        .and_then(|n| node_text(n, source))
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
}
