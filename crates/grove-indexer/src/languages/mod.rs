//! Per-language syntax rules

pub mod go;
pub mod javascript;
pub mod python;
pub mod rust;
pub mod typescript;

use grove_core::{ByteRange, ImportedName, Language, SymbolKind};
use tree_sitter::Node;

use crate::nodes::NodeRole;

/// How a name-binding construct treats its targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    /// Always declares (`let`, `const`, `var`).
    Declare,
    /// Declares unless the name is already bound in the same scope (Python `=`, Go `:=`).
    DeclareOrWrite,
    /// Never declares (`x = 1` in JavaScript, augmented assignment).
    Write,
}

/// Local binding introduced by an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub name: String,
    pub name_range: ByteRange,
    pub range: ByteRange,
}

/// One imported item of an import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub module: String,
    pub imported: ImportedName,
    pub name_range: Option<ByteRange>,
    pub binding: Option<ImportBinding>,
}

/// What a CST node means to the extractor.
#[derive(Debug)]
pub enum Construct<'t> {
    /// Named function or method. Opens a function scope over the node.
    Function {
        name: Option<Node<'t>>,
        params: Vec<Node<'t>>,
        kind: SymbolKind,
    },
    /// Anonymous function, closure or comprehension.
    Lambda { params: Vec<Node<'t>> },
    /// Class-like declaration with a body scope; bases resolve in the outer scope.
    Class {
        name: Node<'t>,
        kind: SymbolKind,
        bases: Vec<Node<'t>>,
    },
    /// Named type without a scope of its own.
    TypeDecl { name: Node<'t>, kind: SymbolKind },
    /// Named module or namespace body.
    Namespace { name: Node<'t>, kind: SymbolKind },
    /// Rust `impl`: `outer` nodes resolve in the enclosing scope.
    ImplBlock { outer: Vec<Node<'t>> },
    /// Variable binding; `whole` makes the node itself the symbol's extent
    /// when exactly one name is bound.
    Binding {
        targets: Vec<Node<'t>>,
        mode: BindMode,
        kind: SymbolKind,
        whole: bool,
    },
    Import(Vec<ImportSpec>),
    /// Subtree holds no declarations or references.
    Skip,
    Other,
}

/// Syntax rules of one language.
pub trait LanguageSpec: Send + Sync {
    fn language(&self) -> Language;

    fn construct<'t>(&self, node: Node<'t>, src: &[u8]) -> Construct<'t>;

    /// Whether an identifier-like node refers to a binding.
    fn is_reference(&self, node: Node<'_>, src: &[u8]) -> bool;

    /// Whether `node` is the callee of a call.
    fn is_callee(&self, node: Node<'_>) -> bool {
        let Some(parent) = node.parent() else { return false };
        let field = match parent.kind() {
            "call" | "call_expression" => "function",
            "new_expression" => "constructor",
            _ => return false,
        };
        is_field(parent, field, node)
    }

    /// Name bound by an `export default` statement.
    fn default_export(&self, _node: Node<'_>, _src: &[u8]) -> Option<String> {
        None
    }

    /// Module that provides `name` implicitly (builtins, prelude, globals).
    fn builtin_module(&self, name: &str) -> Option<&'static str>;

    fn comment_prefix(&self) -> &'static str {
        "//"
    }

    fn block_kinds(&self) -> &'static [&'static str];

    /// Decorators or attributes attached to a declaration.
    fn attributes(&self, _node: Node<'_>) -> Vec<ByteRange> {
        Vec::new()
    }

    /// Full removable statement around a declaration node.
    fn statement_extent(&self, node: Node<'_>) -> ByteRange {
        range_of(node)
    }

    /// Map a CST node to its role in the node model.
    fn classify(&self, node: Node<'_>, src: &[u8]) -> NodeRole {
        if node.is_error() || node.is_missing() {
            return NodeRole::Error;
        }
        if node.kind().contains("comment") {
            return NodeRole::Comment;
        }
        match self.construct(node, src) {
            Construct::Function { .. } => NodeRole::Function,
            Construct::Lambda { .. } => NodeRole::Scope,
            Construct::Class { .. } | Construct::TypeDecl { .. } => NodeRole::Class,
            Construct::Namespace { .. } => NodeRole::Module,
            Construct::ImplBlock { .. } => NodeRole::ImplBlock,
            Construct::Binding { .. } => NodeRole::Binding,
            Construct::Import(_) => NodeRole::Import,
            Construct::Skip | Construct::Other => {
                if self.block_kinds().contains(&node.kind()) {
                    NodeRole::Block
                } else if node.kind().ends_with("identifier") {
                    NodeRole::Identifier
                } else {
                    NodeRole::Opaque
                }
            }
        }
    }
}

static PYTHON: python::PythonSpec = python::PythonSpec;
static JAVASCRIPT: javascript::JavaScriptSpec = javascript::JavaScriptSpec;
static TYPESCRIPT: typescript::TypeScriptSpec = typescript::TypeScriptSpec { tsx: false };
static TSX: typescript::TypeScriptSpec = typescript::TypeScriptSpec { tsx: true };
static RUST: rust::RustSpec = rust::RustSpec;
static GO: go::GoSpec = go::GoSpec;

/// Get the syntax rules for a language.
pub fn spec_for(language: Language) -> Option<&'static dyn LanguageSpec> {
    match language {
        Language::Python => Some(&PYTHON),
        Language::JavaScript => Some(&JAVASCRIPT),
        Language::TypeScript => Some(&TYPESCRIPT),
        Language::Tsx => Some(&TSX),
        Language::Rust => Some(&RUST),
        Language::Go => Some(&GO),
        Language::Other => None,
    }
}

// ── Shared CST helpers ──────────────────────────────────────

pub fn range_of(node: Node<'_>) -> ByteRange {
    ByteRange::new(node.start_byte(), node.end_byte())
}

pub fn text_of(node: Node<'_>, src: &[u8]) -> String {
    node.utf8_text(src).unwrap_or_default().to_string()
}

/// Whether `child` sits in `field` of `parent`.
pub fn is_field(parent: Node<'_>, field: &str, child: Node<'_>) -> bool {
    let mut cursor = parent.walk();
    let found = parent
        .children_by_field_name(field, &mut cursor)
        .any(|n| n.id() == child.id());
    found
}

pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

pub fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

/// Every node of one of `kinds` under `node` (inclusive), not descending
/// into nodes `stop` accepts.
pub fn collect_kinds<'t>(node: Node<'t>, kinds: &[&str], stop: &dyn Fn(Node<'t>) -> bool) -> Vec<Node<'t>> {
    let mut found = Vec::new();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if kinds.contains(&n.kind()) {
            found.push(n);
            continue;
        }
        if stop(n) {
            continue;
        }
        let mut children = named_children(n);
        children.reverse();
        stack.extend(children);
    }
    found
}

/// Strip one layer of matching quotes from a string literal.
pub fn unquote(raw: &str) -> String {
    let trimmed = raw.trim();
    for q in ['"', '\'', '`'] {
        if trimmed.len() >= 2 && trimmed.starts_with(q) && trimmed.ends_with(q) {
            return trimmed[1..trimmed.len() - 1].to_string();
        }
    }
    trimmed.to_string()
}

/// Decorator-style siblings immediately preceding `node`.
pub fn leading_siblings(node: Node<'_>, kinds: &[&str]) -> Vec<ByteRange> {
    let mut ranges = Vec::new();
    let mut prev = node.prev_named_sibling();
    while let Some(p) = prev {
        if !kinds.contains(&p.kind()) {
            break;
        }
        ranges.push(range_of(p));
        prev = p.prev_named_sibling();
    }
    ranges.reverse();
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lookup() {
        for language in [Language::Python, Language::JavaScript, Language::TypeScript, Language::Tsx, Language::Rust, Language::Go] {
            let spec = spec_for(language).unwrap();
            assert_eq!(spec.language(), language);
        }
        assert!(spec_for(Language::Other).is_none());
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"./util\""), "./util");
        assert_eq!(unquote("'fmt'"), "fmt");
        assert_eq!(unquote("`x`"), "x");
        assert_eq!(unquote("plain"), "plain");
    }
}
