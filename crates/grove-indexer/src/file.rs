//! Parsed source files and the read-only file view

use std::path::{Path, PathBuf};
use std::sync::Arc;

use grove_core::{
    ByteRange, CodebaseGraph, FileExtraction, FileId, FileRecord, ImportEdge, Language, Scope, Symbol, TextEdit,
    Usage,
};
use tree_sitter::{Node, Tree};

use crate::extractor::extract;
use crate::languages::{range_of, spec_for};
use crate::nodes::{NodeCache, NodeKey, TypedNode};

/// How usable a file's syntax tree is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    Clean,
    /// The tree contains ERROR or MISSING nodes but is still walked.
    Recovered,
    /// No usable tree; the file contributes no symbols.
    Failed,
}

impl ParseStatus {
    pub fn of(tree: Option<&Tree>) -> Self {
        match tree.map(|t| t.root_node()) {
            None => ParseStatus::Failed,
            Some(root) if root.has_error() => ParseStatus::Recovered,
            Some(_) => ParseStatus::Clean,
        }
    }

    pub fn is_error(self) -> bool {
        self != ParseStatus::Clean
    }
}

/// Run pass 1 over a parsed file. Failed files extract to a bare module scope.
pub fn extract_file(language: Language, tree: Option<&Tree>, text: &str) -> FileExtraction {
    match (spec_for(language), tree) {
        (Some(spec), Some(tree)) => extract(spec, tree, text),
        _ => FileExtraction::empty(text.len()),
    }
}

/// Text, tree and node cache of one file.
pub struct SourceFile {
    pub id: FileId,
    /// Path relative to the codebase root.
    pub path: PathBuf,
    pub language: Language,
    text: String,
    tree: Option<Tree>,
    cache: NodeCache,
    revision: u64,
    status: ParseStatus,
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("language", &self.language)
            .field("len", &self.text.len())
            .field("revision", &self.revision)
            .field("status", &self.status)
            .finish()
    }
}

impl SourceFile {
    pub fn new(id: FileId, path: PathBuf, language: Language, text: String, tree: Option<Tree>) -> Self {
        let status = ParseStatus::of(tree.as_ref());
        SourceFile {
            id,
            path,
            language,
            text,
            tree,
            cache: NodeCache::new(),
            revision: 0,
            status,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    /// Bumped on every committed change to the text.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn status(&self) -> ParseStatus {
        self.status
    }

    pub fn has_parse_error(&self) -> bool {
        self.status.is_error()
    }

    /// Install the text and tree produced by applying `edits`.
    pub fn replace(&mut self, text: String, tree: Option<Tree>, edits: &[TextEdit]) {
        if edits.is_empty() {
            self.cache.clear();
        } else {
            self.cache.apply_edits(edits);
        }
        self.status = ParseStatus::of(tree.as_ref());
        self.text = text;
        self.tree = tree;
        self.revision += 1;
    }

    pub fn cached_nodes(&self) -> usize {
        self.cache.len()
    }

    /// Find the CST node a key was taken from.
    pub fn locate(&self, key: NodeKey) -> Option<Node<'_>> {
        let root = self.tree.as_ref()?.root_node();
        let mut node = root.descendant_for_byte_range(key.range.start, key.range.end)?;
        loop {
            if range_of(node) == key.range && node.kind_id() == key.kind_id {
                return Some(node);
            }
            let parent = node.parent()?;
            if range_of(parent).len() > key.range.len() {
                return None;
            }
            node = parent;
        }
    }

    /// Typed view of a node of this file's tree.
    pub fn typed(&self, node: Node<'_>) -> Option<Arc<TypedNode>> {
        let spec = spec_for(self.language)?;
        Some(self.cache.get_or_build(spec, node, self.text.as_bytes()))
    }
}

/// Read-only view over one file: its record in the graph plus its source.
#[derive(Clone, Copy)]
pub struct FileView<'a> {
    graph: &'a CodebaseGraph,
    source: &'a SourceFile,
    record: &'a FileRecord,
}

impl<'a> FileView<'a> {
    pub fn new(graph: &'a CodebaseGraph, source: &'a SourceFile, record: &'a FileRecord) -> Self {
        FileView { graph, source, record }
    }

    pub fn id(&self) -> FileId {
        self.record.id
    }

    pub fn path(&self) -> &'a Path {
        &self.record.path
    }

    pub fn language(&self) -> Language {
        self.record.language
    }

    pub fn content(&self) -> &'a str {
        self.source.text()
    }

    pub fn has_parse_error(&self) -> bool {
        self.source.has_parse_error()
    }

    pub fn revision(&self) -> u64 {
        self.source.revision()
    }

    pub fn source(&self) -> &'a SourceFile {
        self.source
    }

    /// Top-level symbols in source order.
    pub fn symbols(&self) -> Vec<&'a Symbol> {
        self.record.top_level.iter().filter_map(|id| self.graph.symbol(*id)).collect()
    }

    /// Every symbol of the file in declaration order.
    pub fn all_symbols(&self) -> Vec<&'a Symbol> {
        self.record.symbols.iter().filter_map(|id| self.graph.symbol(*id)).collect()
    }

    /// A symbol by name; top-level declarations win over nested ones.
    pub fn get_symbol(&self, name: &str) -> Option<&'a Symbol> {
        self.symbols()
            .into_iter()
            .find(|s| s.name == name)
            .or_else(|| self.all_symbols().into_iter().find(|s| s.name == name))
    }

    pub fn usages(&self) -> Vec<&'a Usage> {
        self.graph.usages_in_file(self.record.id).collect()
    }

    pub fn imports(&self) -> Vec<&'a ImportEdge> {
        self.graph.imports_in_file(self.record.id).collect()
    }

    pub fn scopes(&self) -> &'a [Scope] {
        &self.record.scopes
    }

    pub fn root(&self) -> Option<Arc<TypedNode>> {
        let tree = self.source.tree()?;
        self.source.typed(tree.root_node())
    }

    /// Smallest named node covering `range`.
    pub fn node_at(&self, range: ByteRange) -> Option<Arc<TypedNode>> {
        let node = self.cst_at(range)?;
        self.source.typed(node)
    }

    pub fn children(&self, node: &TypedNode) -> Vec<Arc<TypedNode>> {
        let Some(cst) = self.source.locate(node.key) else {
            return Vec::new();
        };
        let mut cursor = cst.walk();
        cst.named_children(&mut cursor)
            .filter_map(|child| self.source.typed(child))
            .collect()
    }

    pub fn parent(&self, node: &TypedNode) -> Option<Arc<TypedNode>> {
        let cst = self.source.locate(node.key)?;
        self.source.typed(cst.parent()?)
    }

    /// Declaration node of a symbol of this file.
    pub fn symbol_node(&self, symbol: &Symbol) -> Option<Arc<TypedNode>> {
        if symbol.file != self.record.id {
            return None;
        }
        let tree = self.source.tree()?;
        let node = tree
            .root_node()
            .named_descendant_for_byte_range(symbol.range.start, symbol.range.end)?;
        if range_of(node) != symbol.range {
            return None;
        }
        self.source.typed(node)
    }

    fn cst_at(&self, range: ByteRange) -> Option<Node<'a>> {
        self.source
            .tree()?
            .root_node()
            .named_descendant_for_byte_range(range.start, range.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser_pool::{ParseRequest, create_parser_pool};

    fn parsed(language: Language, text: &str) -> SourceFile {
        let pool = create_parser_pool();
        let result = pool
            .parse_blocking(ParseRequest::new(PathBuf::from("f"), language, text.to_string()))
            .unwrap();
        SourceFile::new(FileId(0), PathBuf::from("f"), language, text.to_string(), Some(result.tree))
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parsed(Language::Python, "x = 1\n").status(), ParseStatus::Clean);
        assert!(parsed(Language::Python, "def f(:\n    pass\n").status().is_error());
        assert_eq!(ParseStatus::of(None), ParseStatus::Failed);
    }

    #[test]
    fn test_locate_and_typed() {
        let source = parsed(Language::Python, "def add(a, b):\n    return a + b\n");
        let tree = source.tree().unwrap();
        let func = tree.root_node().named_child(0).unwrap();
        let typed = source.typed(func).unwrap();
        assert_eq!(typed.name(), Some("add"));
        assert_eq!(source.locate(typed.key).map(|n| n.id()), Some(func.id()));
        assert_eq!(source.cached_nodes(), 1);
    }

    #[test]
    fn test_replace_bumps_revision() {
        let mut source = parsed(Language::Python, "x = 1\n");
        assert_eq!(source.revision(), 0);
        source.replace("x = \n".to_string(), None, &[]);
        assert_eq!(source.revision(), 1);
        assert_eq!(source.status(), ParseStatus::Failed);
        assert!(source.has_parse_error());
    }
}
