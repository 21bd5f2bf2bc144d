//! Core data structures for the source graph

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::edit::ByteRange;

/// Index of a node (file or symbol) in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct NodeId(pub u64);

/// Unique edge identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct EdgeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct FileId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct UsageId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct ImportId(pub u64);

/// Index into one file's scope tree. Scope 0 is the module scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct ScopeIdx(pub u32);

impl ScopeIdx {
    pub const MODULE: ScopeIdx = ScopeIdx(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Languages with grammar support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    Python,
    TypeScript,
    Tsx,
    JavaScript,
    Rust,
    Go,
    Other,
}

impl Language {
    /// Detect language from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("py") | Some("pyi") => Language::Python,
            Some("ts") | Some("mts") | Some("cts") => Language::TypeScript,
            Some("tsx") => Language::Tsx,
            Some("js") | Some("jsx") | Some("mjs") | Some("cjs") => Language::JavaScript,
            Some("rs") => Language::Rust,
            Some("go") => Language::Go,
            _ => Language::Other,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
            Language::JavaScript => "javascript",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Other => "other",
        }
    }

    /// JavaScript and the TypeScript dialects share module rules.
    pub fn is_ecmascript(self) -> bool {
        matches!(self, Language::TypeScript | Language::Tsx | Language::JavaScript)
    }
}

/// The set of languages a codebase is opened with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSet(BTreeSet<Language>);

impl LanguageSet {
    pub fn all() -> Self {
        LanguageSet(
            [
                Language::Python,
                Language::TypeScript,
                Language::Tsx,
                Language::JavaScript,
                Language::Rust,
                Language::Go,
            ]
            .into_iter()
            .collect(),
        )
    }

    pub fn only(languages: &[Language]) -> Self {
        let mut set: BTreeSet<Language> = languages.iter().copied().collect();
        if set.contains(&Language::TypeScript) {
            set.insert(Language::Tsx);
        }
        set.remove(&Language::Other);
        LanguageSet(set)
    }

    pub fn contains(&self, language: Language) -> bool {
        self.0.contains(&language)
    }

    pub fn iter(&self) -> impl Iterator<Item = Language> + '_ {
        self.0.iter().copied()
    }
}

impl Default for LanguageSet {
    fn default() -> Self {
        Self::all()
    }
}

/// Discriminates what kind of declaration a symbol is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SymbolKind {
    // ── Callables ───────────────────────────────────────────
    Function,
    Method,

    // ── Types ───────────────────────────────────────────────
    Class,
    Struct,
    Enum,
    Interface,
    TypeAlias,
    Module,

    // ── Bindings ────────────────────────────────────────────
    Constant,
    Variable,
    Parameter,
    Import,
}

impl SymbolKind {
    pub fn is_type(self) -> bool {
        matches!(
            self,
            SymbolKind::Class
                | SymbolKind::Struct
                | SymbolKind::Enum
                | SymbolKind::Interface
                | SymbolKind::TypeAlias
        )
    }
}

/// A named declaration tracked in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: NodeId,
    pub kind: SymbolKind,
    pub name: String,
    pub file: FileId,
    /// Full declaration extent.
    pub range: ByteRange,
    /// Span of the declared identifier.
    pub name_range: ByteRange,
    /// Scope the name is declared in.
    pub scope: ScopeIdx,
    /// Nearest enclosing named symbol.
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    pub file: FileId,
    pub path: PathBuf,
    pub language: Language,
}

/// A single node in the source graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphNode {
    File(FileNode),
    Symbol(Symbol),
}

impl GraphNode {
    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            GraphNode::Symbol(s) => Some(s),
            GraphNode::File(_) => None,
        }
    }

    pub fn as_symbol_mut(&mut self) -> Option<&mut Symbol> {
        match self {
            GraphNode::Symbol(s) => Some(s),
            GraphNode::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileNode> {
        match self {
            GraphNode::File(f) => Some(f),
            GraphNode::Symbol(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeKind {
    Module,
    /// Inline module or namespace body.
    Namespace,
    Function,
    /// Anonymous function, closure or comprehension.
    Lambda,
    /// Class, trait or impl body.
    Class,
}

/// One lexical scope of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub kind: ScopeKind,
    pub range: ByteRange,
    pub parent: Option<ScopeIdx>,
    pub owner: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UsageRole {
    Read,
    Write,
    Call,
    /// Named as a base class; the enclosing symbol is the derived class.
    Inherits,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unresolved {
    NotFound,
    External { module: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    /// Only observable between the two build passes.
    Pending,
    Resolved(NodeId),
    Unresolved(Unresolved),
}

impl Resolution {
    pub fn target(&self) -> Option<NodeId> {
        match self {
            Resolution::Resolved(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Resolution::Unresolved(_))
    }
}

/// A reference to a symbol from some syntactic position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub id: UsageId,
    pub name: String,
    pub file: FileId,
    pub range: ByteRange,
    pub scope: ScopeIdx,
    pub role: UsageRole,
    /// Nearest enclosing symbol, if any.
    pub enclosing: Option<NodeId>,
    pub resolution: Resolution,
}

/// What an import statement brings into scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImportedName {
    /// The module itself (`import os`, `import * as ns`).
    Module,
    /// One named member (`from m import name`).
    Name(String),
    /// The default export (`import x from "m"`).
    Default,
    /// Every public member (`from m import *`, `export * from "m"`).
    Glob,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolvedTarget {
    Pending,
    File(FileId),
    Symbol(NodeId),
    External { module: String },
    /// The module resolved to a file that does not declare the name.
    MissingName { file: FileId, name: String },
}

impl ResolvedTarget {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolvedTarget::File(_) | ResolvedTarget::Symbol(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportEdge {
    pub id: ImportId,
    pub file: FileId,
    /// The whole import statement.
    pub range: ByteRange,
    /// Module specifier as written.
    pub module: String,
    pub imported: ImportedName,
    /// Span of the imported member name, when one is written.
    pub name_range: Option<ByteRange>,
    /// Local binding; absent for glob and side-effect imports.
    pub alias: Option<NodeId>,
    pub target: ResolvedTarget,
}

/// What kind of relationship this edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// File or parent symbol to a declared symbol.
    Defines,
    /// Import binding to its resolved symbol or file.
    Imports,
    /// Enclosing symbol or file to a referenced symbol.
    Uses,
    /// Class to a resolved base class.
    Extends,
}

/// A directed edge in the source graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
    pub usage: Option<UsageId>,
    pub import: Option<ImportId>,
}

impl GraphEdge {
    pub fn new(source: NodeId, target: NodeId, kind: EdgeKind) -> Self {
        GraphEdge { source, target, kind, usage: None, import: None }
    }
}

// ── Pass-1 output ───────────────────────────────────────────
//
// Everything below is produced per file without looking at any other file.
// Cross references are indices into the same extraction.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalScope {
    pub kind: ScopeKind,
    pub range: ByteRange,
    pub parent: Option<ScopeIdx>,
    pub owner: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSymbol {
    pub kind: SymbolKind,
    pub name: String,
    pub range: ByteRange,
    pub name_range: ByteRange,
    pub scope: ScopeIdx,
    pub parent: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUsage {
    pub name: String,
    pub range: ByteRange,
    pub scope: ScopeIdx,
    pub role: UsageRole,
    pub enclosing: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImport {
    pub range: ByteRange,
    pub module: String,
    pub imported: ImportedName,
    pub name_range: Option<ByteRange>,
    pub alias: Option<usize>,
}

/// Symbols, scopes, raw usages and raw imports of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileExtraction {
    pub scopes: Vec<LocalScope>,
    /// Preorder: parents precede children, siblings in source order.
    pub symbols: Vec<LocalSymbol>,
    pub usages: Vec<RawUsage>,
    pub imports: Vec<RawImport>,
    /// Name bound by `export default`, when it names a declaration.
    pub default_export: Option<String>,
}

impl FileExtraction {
    /// Extraction of a file that produced no usable tree.
    pub fn empty(len: usize) -> Self {
        FileExtraction {
            scopes: vec![LocalScope {
                kind: ScopeKind::Module,
                range: ByteRange::new(0, len),
                parent: None,
                owner: None,
            }],
            ..Default::default()
        }
    }
}
