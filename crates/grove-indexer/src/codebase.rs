//! The `Codebase` handle: query and mutation entry point over one root

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use grove_core::edit::{apply_edits, validate_edits};
use grove_core::{
    ByteRange, CodebaseGraph, Diagnostic, DiagnosticKind, DiffEngine, EditLedger, FileId, GraphDiff, GroveError, ImportEdge,
    Language, LanguageSet, NodeId, Resolution, ResolvedTarget, Result, Symbol, TextEdit, Usage,
};
use tracing::{debug, info};

use crate::config::{GroveConfig, ProjectConfig, normalize};
use crate::coordinator::{Coordinator, Loaded, load_batch};
use crate::file::{FileView, ParseStatus, SourceFile, extract_file};
use crate::parser_pool::{ParseRequest, ParserPool, create_parser_pool};
use crate::resolution::{importer_closure, package_siblings, resolve_imports, resolve_usage, resolve_usages};
use crate::resolver::ImportResolver;

/// An indexed source tree.
///
/// Reads borrow `&self`; anything that changes text or the graph borrows
/// `&mut self`, so a query can never observe a half-applied commit.
pub struct Codebase {
    root: PathBuf,
    languages: LanguageSet,
    config: ProjectConfig,
    pool: ParserPool,
    sources: BTreeMap<FileId, SourceFile>,
    graph: CodebaseGraph,
    diagnostics: Vec<Diagnostic>,
    ledger: Arc<EditLedger>,
    diffs: DiffEngine,
    modified: BTreeSet<FileId>,
}

impl std::fmt::Debug for Codebase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codebase")
            .field("root", &self.root)
            .field("files", &self.sources.len())
            .field("diagnostics", &self.diagnostics.len())
            .field("graph", &self.graph)
            .finish()
    }
}

impl Codebase {
    /// Scan `root` and build the graph, reading `grove.toml` if present.
    pub fn open(root: impl AsRef<Path>, languages: LanguageSet) -> Result<Self> {
        Self::build(root.as_ref(), languages, None)
    }

    /// Like [`Codebase::open`] with an explicit configuration instead of
    /// `grove.toml`.
    pub fn open_with_config(root: impl AsRef<Path>, languages: LanguageSet, config: GroveConfig) -> Result<Self> {
        Self::build(root.as_ref(), languages, Some(config))
    }

    fn build(root: &Path, languages: LanguageSet, config: Option<GroveConfig>) -> Result<Self> {
        let pool = create_parser_pool();
        let build = Coordinator::new(root, languages.clone(), pool.clone()).run_full_index(config)?;
        Ok(Codebase {
            root: root.to_path_buf(),
            languages,
            config: build.config,
            pool,
            sources: build.sources,
            graph: build.graph,
            diagnostics: build.diagnostics,
            ledger: Arc::new(EditLedger::new()),
            diffs: DiffEngine::new(),
            modified: BTreeSet::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Per-file problems recorded while building or editing.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn graph(&self) -> &CodebaseGraph {
        &self.graph
    }

    /// Reservations shared by every transaction on this codebase.
    pub fn ledger(&self) -> &Arc<EditLedger> {
        &self.ledger
    }

    // ── Files ───────────────────────────────────────────────

    fn relative(&self, path: &Path) -> PathBuf {
        normalize(path.strip_prefix(&self.root).unwrap_or(path))
    }

    /// A file by path, relative to the root or absolute under it.
    pub fn get_file(&self, path: impl AsRef<Path>) -> Option<FileView<'_>> {
        let id = self.graph.file_by_path(&self.relative(path.as_ref()))?;
        self.file(id)
    }

    pub fn file(&self, id: FileId) -> Option<FileView<'_>> {
        let record = self.graph.file(id)?;
        let source = self.sources.get(&id)?;
        Some(FileView::new(&self.graph, source, record))
    }

    /// Files in discovery order.
    pub fn files(&self) -> impl Iterator<Item = FileView<'_>> {
        self.graph.files().filter_map(|r| self.file(r.id))
    }

    pub fn source(&self, id: FileId) -> Option<&SourceFile> {
        self.sources.get(&id)
    }

    /// Revision of a file's text; bumped by every commit that touches it.
    pub fn revision(&self, id: FileId) -> Option<u64> {
        self.sources.get(&id).map(SourceFile::revision)
    }

    // ── Symbols and references ──────────────────────────────

    /// All symbols: file discovery order, then declaration order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.graph.symbols()
    }

    pub fn symbol(&self, id: NodeId) -> Option<&Symbol> {
        self.graph.symbol(id)
    }

    pub fn find_symbols(&self, name: &str) -> Vec<&Symbol> {
        self.graph.symbols().filter(|s| s.name == name).collect()
    }

    pub fn usages_of(&self, symbol: NodeId) -> Vec<&Usage> {
        self.graph.usages_of(symbol)
    }

    pub fn usages(&self) -> impl Iterator<Item = &Usage> {
        self.graph.usages()
    }

    pub fn unresolved_usages(&self) -> impl Iterator<Item = &Usage> {
        self.graph.unresolved_usages()
    }

    pub fn imports(&self) -> impl Iterator<Item = &ImportEdge> {
        self.graph.imports()
    }

    /// Resolve an import against the current graph.
    pub fn resolve_import(&self, edge: &ImportEdge) -> ResolvedTarget {
        ImportResolver::new(&self.graph, &self.config).resolve(edge)
    }

    /// Resolve a usage against the current graph.
    pub fn resolve_usage(&self, usage: &Usage) -> Resolution {
        resolve_usage(&self.graph, &self.config, usage)
    }

    // ── Mutation ────────────────────────────────────────────

    /// Add a new file, or replace the whole text of an existing one.
    pub fn add_file(&mut self, path: impl AsRef<Path>, text: impl Into<String>) -> Result<FileId> {
        let rel = self.relative(path.as_ref());
        let text = text.into();
        if let Some(id) = self.graph.file_by_path(&rel) {
            let len = self.sources.get(&id).map(|s| s.text().len()).unwrap_or(0);
            let whole = TextEdit::new(ByteRange::new(0, len), text);
            self.apply_edits(BTreeMap::from([(id, vec![whole])]))?;
            return Ok(id);
        }

        let language = Language::from_path(&rel);
        if language == Language::Other || !self.languages.contains(language) {
            return Err(GroveError::UnsupportedLanguage(rel));
        }
        let (mut loaded, diagnostics) = load_batch(&self.pool, vec![(rel.clone(), language, text.into_bytes())]);
        let Some(file) = loaded.pop() else {
            return Err(GroveError::FileNotFound(rel.display().to_string()));
        };
        self.diagnostics.extend(diagnostics);
        let extraction = file.extract();
        let source = Loaded::install(file, &mut self.graph, extraction)?;
        let id = source.id;
        self.sources.insert(id, source);
        self.modified.insert(id);
        self.refresh(&BTreeSet::from([id]), true)?;
        info!("Added {}", rel.display());
        Ok(id)
    }

    /// Remove a file. References into it become unresolved.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let rel = self.relative(path.as_ref());
        let id = self
            .graph
            .file_by_path(&rel)
            .ok_or_else(|| GroveError::FileNotFound(rel.display().to_string()))?;
        self.graph.remove_file(id);
        self.sources.remove(&id);
        self.modified.remove(&id);
        self.diagnostics.retain(|d| d.path != rel);
        self.refresh(&BTreeSet::new(), true)?;
        info!("Removed {}", rel.display());
        Ok(())
    }

    /// Apply validated edits to their files, re-parse incrementally and patch
    /// the graph. Nothing is applied if any edit is invalid.
    pub fn apply_edits(&mut self, edits: BTreeMap<FileId, Vec<TextEdit>>) -> Result<GraphDiff> {
        for (id, file_edits) in &edits {
            let source = self
                .sources
                .get(id)
                .ok_or_else(|| GroveError::FileNotFound(format!("{id:?}")))?;
            validate_edits(*id, &source.path.display().to_string(), source.text(), file_edits)?;
        }

        let mut diff = self.diffs.next_diff();
        let mut touched = BTreeSet::new();
        for (id, file_edits) in edits {
            if file_edits.is_empty() {
                continue;
            }
            let Some(source) = self.sources.get(&id) else { continue };
            let (text, tree) = self.reparse(source, &file_edits);

            let extraction = extract_file(source.language, tree.as_ref(), &text);
            let parse_error = ParseStatus::of(tree.as_ref()).is_error();
            let reconciled = self.graph.reconcile(id, text.len(), parse_error, &file_edits, extraction)?;
            debug!(
                "Reconciled {}: {} kept, {} added, {} removed",
                source.path.display(),
                reconciled.kept.len(),
                reconciled.added.len(),
                reconciled.removed.len()
            );

            let Some(source) = self.sources.get_mut(&id) else { continue };
            source.replace(text, tree, &file_edits);
            let path = source.path.clone();
            self.diagnostics.retain(|d| {
                d.path != path || !matches!(d.kind, DiagnosticKind::ParseError | DiagnosticKind::SyntaxRecovered)
            });
            if source.has_parse_error() {
                self.diagnostics.push(Diagnostic::warning(
                    &path,
                    DiagnosticKind::SyntaxRecovered,
                    "syntax errors after edit",
                ));
            }

            self.modified.insert(id);
            touched.insert(id);
            diff.touched_files.push(id);
            diff.added_symbols.extend(reconciled.added);
            diff.removed_symbols.extend(reconciled.removed);
            diff.shifted_symbols.extend(reconciled.kept);
        }

        let reresolved = self.refresh(&touched, false)?;
        diff.reresolved_files = reresolved.into_iter().collect();
        diff.unresolved_usages = self.graph.unresolved_usages().map(|u| u.id).collect();
        info!(
            "Committed diff {}: {} files, +{} -{} symbols",
            diff.sequence,
            diff.touched_files.len(),
            diff.added_symbols.len(),
            diff.removed_symbols.len()
        );
        Ok(diff)
    }

    /// New text and tree of a file after `edits`.
    fn reparse(&self, source: &SourceFile, edits: &[TextEdit]) -> (String, Option<tree_sitter::Tree>) {
        let parsed = match source.tree() {
            Some(old) => self
                .pool
                .reparse(source.path.clone(), source.language, old, source.text(), edits),
            None => self.pool.parse_blocking(ParseRequest::new(
                source.path.clone(),
                source.language,
                apply_edits(source.text(), edits),
            )),
        };
        match parsed {
            Ok(result) => (result.content, Some(result.tree)),
            Err(e) => {
                tracing::warn!("Re-parse of {} failed: {}", source.path.display(), e);
                (apply_edits(source.text(), edits), None)
            }
        }
    }

    /// Re-resolve what a change to `touched` can affect: touched and dirty
    /// files, their transitive importers, Go package siblings and every file
    /// whose import targets moved. When files were added or removed every
    /// import is resolved again, since a new file can satisfy any module path.
    fn refresh(&mut self, touched: &BTreeSet<FileId>, files_changed: bool) -> Result<BTreeSet<FileId>> {
        let all: BTreeSet<FileId> = self.graph.files().map(|r| r.id).collect();
        let mut seeds = touched.clone();
        seeds.extend(self.graph.take_dirty());
        seeds.retain(|f| all.contains(f));

        let mut files = importer_closure(&self.graph, &seeds);
        files.extend(package_siblings(&self.graph, &seeds));

        let import_scope = if files_changed { &all } else { &files };
        let changed = resolve_imports(&mut self.graph, &self.config, import_scope)?;
        files.extend(importer_closure(&self.graph, &changed));
        files.retain(|f| all.contains(f));

        resolve_usages(&mut self.graph, &self.config, &files)?;
        self.graph.take_dirty();
        self.graph.check_invariants()?;
        debug!("Re-resolved {} of {} files", files.len(), all.len());
        Ok(files)
    }

    /// Write every file changed since opening back to disk.
    pub fn write_back(&mut self) -> Result<usize> {
        let mut written = 0;
        let pending: Vec<FileId> = self.modified.iter().copied().collect();
        for id in pending {
            let Some(source) = self.sources.get(&id) else { continue };
            let path = self.root.join(&source.path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| GroveError::io(parent, e))?;
            }
            std::fs::write(&path, source.text()).map_err(|e| GroveError::io(&path, e))?;
            self.modified.remove(&id);
            written += 1;
        }
        info!("Wrote {} files", written);
        Ok(written)
    }
}
