//! The owned aggregate of files, symbols, usages and imports

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::edit::{ByteRange, TextEdit, any_touches, shift_at};
use crate::error::{GroveError, Result};
use crate::graph::Graph;
use crate::model::*;
use crate::symbols::SymbolTable;

/// Per-file bookkeeping kept next to the graph.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub id: FileId,
    /// Graph node standing for the file itself.
    pub node: NodeId,
    pub path: PathBuf,
    pub language: Language,
    pub len: usize,
    pub parse_error: bool,
    /// All symbols in declaration order (preorder).
    pub symbols: Vec<NodeId>,
    pub top_level: Vec<NodeId>,
    pub scopes: Vec<Scope>,
    pub usages: Vec<UsageId>,
    pub imports: Vec<ImportId>,
    pub default_export: Option<String>,
    defines: Vec<EdgeId>,
}

/// Outcome of installing a fresh extraction over a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
    pub kept: Vec<NodeId>,
}

type SymbolKey = (SymbolKind, String, ByteRange, ByteRange);
type UsageKey = (String, ByteRange, UsageRole);
type ImportKey = (String, ImportedName, ByteRange);

/// All files, symbols, usages and import edges of a codebase.
///
/// Usages and imports reference symbols and files by id only. Every
/// reference is either resolved to something live in the graph or
/// explicitly marked unresolved; removing a symbol or file flips the
/// references to it before the node goes away.
pub struct CodebaseGraph {
    graph: Graph,
    table: SymbolTable,
    files: BTreeMap<FileId, FileRecord>,
    order: Vec<FileId>,
    by_path: HashMap<PathBuf, FileId>,
    usages: BTreeMap<UsageId, Usage>,
    imports: BTreeMap<ImportId, ImportEdge>,
    alias_imports: HashMap<NodeId, ImportId>,
    usage_edges: HashMap<UsageId, Vec<EdgeId>>,
    import_edges: HashMap<ImportId, EdgeId>,
    next_file: u32,
    next_usage: u64,
    next_import: u64,
    dirty: BTreeSet<FileId>,
}

impl std::fmt::Debug for CodebaseGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodebaseGraph")
            .field("files", &self.files.len())
            .field("symbols", &self.table.len())
            .field("usages", &self.usages.len())
            .field("imports", &self.imports.len())
            .field("graph", &self.graph)
            .finish()
    }
}

impl CodebaseGraph {
    pub fn new() -> Self {
        CodebaseGraph {
            graph: Graph::new(),
            table: SymbolTable::new(),
            files: BTreeMap::new(),
            order: Vec::new(),
            by_path: HashMap::new(),
            usages: BTreeMap::new(),
            imports: BTreeMap::new(),
            alias_imports: HashMap::new(),
            usage_edges: HashMap::new(),
            import_edges: HashMap::new(),
            next_file: 0,
            next_usage: 0,
            next_import: 0,
            dirty: BTreeSet::new(),
        }
    }

    // ── Files ───────────────────────────────────────────────

    /// Register a file with no symbols yet. Returns the existing id if the
    /// path is already known.
    pub fn add_file(&mut self, path: PathBuf, language: Language, len: usize) -> FileId {
        if let Some(id) = self.by_path.get(&path) {
            return *id;
        }
        let id = FileId(self.next_file);
        self.next_file += 1;
        let node = self.graph.add_node(GraphNode::File(FileNode {
            file: id,
            path: path.clone(),
            language,
        }));
        self.files.insert(
            id,
            FileRecord {
                id,
                node,
                path: path.clone(),
                language,
                len,
                parse_error: false,
                symbols: Vec::new(),
                top_level: Vec::new(),
                scopes: Vec::new(),
                usages: Vec::new(),
                imports: Vec::new(),
                default_export: None,
                defines: Vec::new(),
            },
        );
        self.order.push(id);
        self.by_path.insert(path, id);
        id
    }

    /// Remove a file with everything it declares. References into it from
    /// other files become unresolved and those files are marked dirty.
    pub fn remove_file(&mut self, file: FileId) -> Option<FileRecord> {
        let record = self.files.get(&file)?.clone();

        for uid in &record.usages {
            self.clear_usage_edges(*uid);
            self.usages.remove(uid);
        }
        for iid in &record.imports {
            self.clear_import_edge(*iid);
            if let Some(edge) = self.imports.remove(iid) {
                if let Some(alias) = edge.alias {
                    self.alias_imports.remove(&alias);
                }
            }
        }
        for eid in &record.defines {
            self.graph.remove_edge(*eid);
        }
        for id in &record.symbols {
            self.detach_symbol(*id);
        }

        let incoming: Vec<ImportId> = self
            .graph
            .edges_to(record.node)
            .filter_map(|(_, e)| e.import)
            .collect();
        let missing: Vec<ImportId> = self
            .imports
            .values()
            .filter(|e| matches!(&e.target, ResolvedTarget::MissingName { file: f, .. } if *f == file))
            .map(|e| e.id)
            .collect();
        for iid in incoming.into_iter().chain(missing) {
            let Some(module) = self.imports.get(&iid).map(|e| e.module.clone()) else {
                continue;
            };
            // External targets add no edge, so this cannot fail.
            let _ = self.set_import_target(iid, ResolvedTarget::External { module });
        }

        self.graph.remove_node(record.node);
        self.table.remove_file(file);
        self.files.remove(&file);
        self.order.retain(|f| *f != file);
        self.by_path.remove(&record.path);
        self.dirty.remove(&file);
        debug!("Removed {} from graph", record.path.display());
        Some(record)
    }

    pub fn file(&self, id: FileId) -> Option<&FileRecord> {
        self.files.get(&id)
    }

    pub fn file_by_path(&self, path: &Path) -> Option<FileId> {
        self.by_path.get(path).copied()
    }

    /// Files in discovery order.
    pub fn files(&self) -> impl Iterator<Item = &FileRecord> {
        self.order.iter().filter_map(move |id| self.files.get(id))
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn scopes(&self, file: FileId) -> &[Scope] {
        self.files.get(&file).map(|r| r.scopes.as_slice()).unwrap_or(&[])
    }

    // ── Pass-1 installation and edit reconciliation ─────────

    /// Install `extraction` as the new content of `file`.
    ///
    /// `edits` are the edits that turned the previous text into the new one
    /// (empty for a first install). Old symbols no edit touches are matched
    /// against the new ones at their shifted offsets and keep their ids;
    /// everything else is replaced. Usages and imports of the file come back
    /// `Pending` and must be resolved again.
    pub fn reconcile(
        &mut self,
        file: FileId,
        len: usize,
        parse_error: bool,
        edits: &[TextEdit],
        extraction: FileExtraction,
    ) -> Result<Reconciled> {
        let record = self
            .files
            .get_mut(&file)
            .ok_or_else(|| GroveError::FileNotFound(format!("{file:?}")))?;
        let file_node = record.node;
        let old_symbols = std::mem::take(&mut record.symbols);
        let old_usages = std::mem::take(&mut record.usages);
        let old_imports = std::mem::take(&mut record.imports);
        let defines = std::mem::take(&mut record.defines);

        for eid in defines {
            self.graph.remove_edge(eid);
        }

        let mut usage_ids: HashMap<UsageKey, UsageId> = HashMap::new();
        for uid in old_usages {
            self.clear_usage_edges(uid);
            if let Some(u) = self.usages.remove(&uid) {
                if !any_touches(edits, &u.range) {
                    let range = u.range.shifted(shift_at(edits, u.range.start));
                    usage_ids.insert((u.name, range, u.role), uid);
                }
            }
        }

        let mut import_ids: HashMap<ImportKey, ImportId> = HashMap::new();
        for iid in old_imports {
            self.clear_import_edge(iid);
            if let Some(edge) = self.imports.remove(&iid) {
                if let Some(alias) = edge.alias {
                    self.alias_imports.remove(&alias);
                }
                if !any_touches(edits, &edge.range) {
                    let range = edge.range.shifted(shift_at(edits, edge.range.start));
                    import_ids.insert((edge.module, edge.imported, range), iid);
                }
            }
        }

        let mut reusable: HashMap<SymbolKey, NodeId> = HashMap::new();
        for id in &old_symbols {
            let Some(sym) = self.symbol(*id) else { continue };
            if any_touches(edits, &sym.range) {
                continue;
            }
            let delta = shift_at(edits, sym.range.start);
            reusable.insert(
                (
                    sym.kind,
                    sym.name.clone(),
                    sym.range.shifted(delta),
                    sym.name_range.shifted(delta),
                ),
                *id,
            );
        }

        let matched: Vec<Option<NodeId>> = extraction
            .symbols
            .iter()
            .map(|s| reusable.remove(&(s.kind, s.name.clone(), s.range, s.name_range)))
            .collect();
        let kept_set: HashSet<NodeId> = matched.iter().flatten().copied().collect();

        let mut report = Reconciled::default();
        for id in old_symbols {
            if !kept_set.contains(&id) {
                self.detach_symbol(id);
                report.removed.push(id);
            }
        }

        let mut ids: Vec<NodeId> = Vec::with_capacity(extraction.symbols.len());
        for (local, reuse) in extraction.symbols.iter().zip(&matched) {
            let parent = local.parent.and_then(|p| ids.get(p).copied());
            let mut symbol = Symbol {
                id: NodeId::default(),
                kind: local.kind,
                name: local.name.clone(),
                file,
                range: local.range,
                name_range: local.name_range,
                scope: local.scope,
                parent,
                children: Vec::new(),
            };
            let id = match reuse {
                Some(id) => {
                    symbol.id = *id;
                    if let Some(node) = self.graph.node_mut(*id) {
                        *node = GraphNode::Symbol(symbol);
                    }
                    report.kept.push(*id);
                    *id
                }
                None => {
                    let id = self.graph.add_node(GraphNode::Symbol(symbol));
                    if let Some(s) = self.graph.node_mut(id).and_then(GraphNode::as_symbol_mut) {
                        s.id = id;
                    }
                    report.added.push(id);
                    id
                }
            };
            ids.push(id);
        }

        let mut defines = Vec::with_capacity(ids.len());
        self.table.remove_file(file);
        for (i, local) in extraction.symbols.iter().enumerate() {
            let id = ids[i];
            let parent = local.parent.and_then(|p| ids.get(p).copied());
            if let Some(p) = parent {
                if let Some(ps) = self.graph.node_mut(p).and_then(GraphNode::as_symbol_mut) {
                    ps.children.push(id);
                }
            }
            let source = parent.unwrap_or(file_node);
            if let Some(eid) = self.graph.add_edge(GraphEdge::new(source, id, EdgeKind::Defines)) {
                defines.push(eid);
            }
            self.table.insert(file, local.scope, &local.name, id);
        }

        let scopes: Vec<Scope> = extraction
            .scopes
            .iter()
            .map(|s| Scope {
                kind: s.kind,
                range: s.range,
                parent: s.parent,
                owner: s.owner.and_then(|o| ids.get(o).copied()),
            })
            .collect();

        let mut usages = Vec::with_capacity(extraction.usages.len());
        for raw in extraction.usages {
            let key = (raw.name.clone(), raw.range, raw.role);
            let id = usage_ids.remove(&key).unwrap_or_else(|| self.alloc_usage());
            self.usages.insert(
                id,
                Usage {
                    id,
                    name: raw.name,
                    file,
                    range: raw.range,
                    scope: raw.scope,
                    role: raw.role,
                    enclosing: raw.enclosing.and_then(|e| ids.get(e).copied()),
                    resolution: Resolution::Pending,
                },
            );
            usages.push(id);
        }

        let mut imports = Vec::with_capacity(extraction.imports.len());
        for raw in extraction.imports {
            let key = (raw.module.clone(), raw.imported.clone(), raw.range);
            let id = import_ids.remove(&key).unwrap_or_else(|| self.alloc_import());
            let alias = raw.alias.and_then(|a| ids.get(a).copied());
            if let Some(alias) = alias {
                self.alias_imports.insert(alias, id);
            }
            self.imports.insert(
                id,
                ImportEdge {
                    id,
                    file,
                    range: raw.range,
                    module: raw.module,
                    imported: raw.imported,
                    name_range: raw.name_range,
                    alias,
                    target: ResolvedTarget::Pending,
                },
            );
            imports.push(id);
        }

        let top_level = ids
            .iter()
            .zip(&extraction.symbols)
            .filter(|(_, s)| s.parent.is_none())
            .map(|(id, _)| *id)
            .collect();

        if let Some(record) = self.files.get_mut(&file) {
            record.len = len;
            record.parse_error = parse_error;
            record.symbols = ids;
            record.top_level = top_level;
            record.scopes = scopes;
            record.usages = usages;
            record.imports = imports;
            record.default_export = extraction.default_export;
            record.defines = defines;
        }

        Ok(report)
    }

    /// Flip every reference to `id` to unresolved, then drop the node.
    fn detach_symbol(&mut self, id: NodeId) {
        let Some(symbol) = self.symbol(id).cloned() else { return };
        let incoming: Vec<GraphEdge> = self.graph.edges_to(id).map(|(_, e)| e.clone()).collect();
        for edge in incoming {
            if let Some(uid) = edge.usage {
                if let Some(file) = self.usages.get(&uid).map(|u| u.file) {
                    let _ = self.set_usage_resolution(uid, Resolution::Unresolved(Unresolved::NotFound));
                    self.dirty.insert(file);
                }
            }
            if let Some(iid) = edge.import {
                if let Some(file) = self.imports.get(&iid).map(|e| e.file) {
                    let _ = self.set_import_target(
                        iid,
                        ResolvedTarget::MissingName {
                            file: symbol.file,
                            name: symbol.name.clone(),
                        },
                    );
                    self.dirty.insert(file);
                }
            }
        }
        self.alias_imports.remove(&id);
        self.graph.remove_node(id);
    }

    fn alloc_usage(&mut self) -> UsageId {
        self.next_usage += 1;
        UsageId(self.next_usage)
    }

    fn alloc_import(&mut self) -> ImportId {
        self.next_import += 1;
        ImportId(self.next_import)
    }

    // ── Resolution state ────────────────────────────────────

    fn clear_usage_edges(&mut self, id: UsageId) {
        if let Some(edges) = self.usage_edges.remove(&id) {
            for eid in edges {
                self.graph.remove_edge(eid);
            }
        }
    }

    fn clear_import_edge(&mut self, id: ImportId) {
        if let Some(eid) = self.import_edges.remove(&id) {
            self.graph.remove_edge(eid);
        }
    }

    /// Record the resolution of a usage and its `Uses`/`Extends` edges.
    pub fn set_usage_resolution(&mut self, id: UsageId, resolution: Resolution) -> Result<()> {
        self.clear_usage_edges(id);
        let usage = self
            .usages
            .get_mut(&id)
            .ok_or_else(|| GroveError::InvariantViolation(format!("unknown usage {id:?}")))?;
        usage.resolution = resolution.clone();
        let (file, enclosing, role) = (usage.file, usage.enclosing, usage.role);

        let Resolution::Resolved(target) = resolution else {
            return Ok(());
        };
        if self.symbol(target).is_none() {
            error!("Usage {:?} resolved to missing symbol {:?}", id, target);
            if let Some(u) = self.usages.get_mut(&id) {
                u.resolution = Resolution::Unresolved(Unresolved::NotFound);
            }
            return Err(GroveError::InvariantViolation(format!(
                "usage {id:?} resolved to missing symbol {target:?}"
            )));
        }
        let file_node = self
            .files
            .get(&file)
            .map(|r| r.node)
            .ok_or_else(|| GroveError::InvariantViolation(format!("usage {id:?} in unknown file")))?;

        let mut edges = Vec::new();
        let mut uses = GraphEdge::new(enclosing.unwrap_or(file_node), target, EdgeKind::Uses);
        uses.usage = Some(id);
        edges.extend(self.graph.add_edge(uses));
        if role == UsageRole::Inherits {
            if let Some(class) = enclosing {
                let mut extends = GraphEdge::new(class, target, EdgeKind::Extends);
                extends.usage = Some(id);
                edges.extend(self.graph.add_edge(extends));
            }
        }
        self.usage_edges.insert(id, edges);
        Ok(())
    }

    /// Record the target of an import and its `Imports` edge.
    pub fn set_import_target(&mut self, id: ImportId, target: ResolvedTarget) -> Result<()> {
        self.clear_import_edge(id);
        let edge = self
            .imports
            .get_mut(&id)
            .ok_or_else(|| GroveError::InvariantViolation(format!("unknown import {id:?}")))?;
        edge.target = target.clone();
        let (file, alias) = (edge.file, edge.alias);

        let target_node = match &target {
            ResolvedTarget::Symbol(s) => {
                if self.symbol(*s).is_none() {
                    return Err(self.reject_import(id, format!("import {id:?} targets missing symbol {s:?}")));
                }
                *s
            }
            ResolvedTarget::File(f) => {
                let node = self.files.get(f).map(|r| r.node);
                match node {
                    Some(node) => node,
                    None => return Err(self.reject_import(id, format!("import {id:?} targets missing file {f:?}"))),
                }
            }
            ResolvedTarget::MissingName { file: f, .. } => {
                if !self.files.contains_key(f) {
                    return Err(self.reject_import(id, format!("import {id:?} names missing file {f:?}")));
                }
                return Ok(());
            }
            ResolvedTarget::Pending | ResolvedTarget::External { .. } => return Ok(()),
        };
        let source = match alias {
            Some(a) => a,
            None => self
                .files
                .get(&file)
                .map(|r| r.node)
                .ok_or_else(|| GroveError::InvariantViolation(format!("import {id:?} in unknown file")))?,
        };
        let mut link = GraphEdge::new(source, target_node, EdgeKind::Imports);
        link.import = Some(id);
        if let Some(eid) = self.graph.add_edge(link) {
            self.import_edges.insert(id, eid);
        }
        Ok(())
    }

    fn reject_import(&mut self, id: ImportId, message: String) -> GroveError {
        error!("{}", message);
        if let Some(edge) = self.imports.get_mut(&id) {
            edge.target = ResolvedTarget::External { module: edge.module.clone() };
        }
        GroveError::InvariantViolation(message)
    }

    pub fn mark_dirty(&mut self, file: FileId) {
        self.dirty.insert(file);
    }

    /// Files whose references were flipped since the last call.
    pub fn take_dirty(&mut self) -> BTreeSet<FileId> {
        std::mem::take(&mut self.dirty)
    }

    // ── Queries ─────────────────────────────────────────────

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn symbol(&self, id: NodeId) -> Option<&Symbol> {
        self.graph.node(id).and_then(GraphNode::as_symbol)
    }

    /// All symbols: file discovery order, then declaration order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.files()
            .flat_map(|r| r.symbols.iter())
            .filter_map(move |id| self.symbol(*id))
    }

    pub fn symbols_in_file(&self, file: FileId) -> impl Iterator<Item = &Symbol> {
        self.files
            .get(&file)
            .into_iter()
            .flat_map(|r| r.symbols.iter())
            .filter_map(move |id| self.symbol(*id))
    }

    /// The binding of `name` in exactly `scope` of `file`.
    pub fn lookup(&self, file: FileId, scope: ScopeIdx, name: &str) -> Option<NodeId> {
        self.table.lookup(file, scope, name)
    }

    /// Innermost-first lookup starting at `scope`. Class bodies stop being
    /// visible once the walk leaves a function.
    pub fn lookup_lexical(&self, file: FileId, scope: ScopeIdx, name: &str) -> Option<NodeId> {
        let scopes = self.scopes(file);
        let mut current = Some(scope);
        let mut crossed_function = false;
        while let Some(idx) = current {
            let Some(s) = scopes.get(idx.index()) else { break };
            let visible = !(s.kind == ScopeKind::Class && crossed_function);
            if visible {
                if let Some(id) = self.table.lookup(file, idx, name) {
                    return Some(id);
                }
            }
            if matches!(s.kind, ScopeKind::Function | ScopeKind::Lambda) {
                crossed_function = true;
            }
            current = s.parent;
        }
        None
    }

    pub fn usage(&self, id: UsageId) -> Option<&Usage> {
        self.usages.get(&id)
    }

    pub fn usages(&self) -> impl Iterator<Item = &Usage> {
        self.usages.values()
    }

    pub fn usages_in_file(&self, file: FileId) -> impl Iterator<Item = &Usage> {
        self.files
            .get(&file)
            .into_iter()
            .flat_map(|r| r.usages.iter())
            .filter_map(move |id| self.usages.get(id))
    }

    /// Usages resolved to `symbol`, ordered by file then offset.
    pub fn usages_of(&self, symbol: NodeId) -> Vec<&Usage> {
        let mut found: Vec<&Usage> = self
            .graph
            .edges_to(symbol)
            .filter(|(_, e)| e.kind == EdgeKind::Uses)
            .filter_map(|(_, e)| e.usage)
            .filter_map(|id| self.usages.get(&id))
            .collect();
        found.sort_by_key(|u| (u.file, u.range.start));
        found
    }

    pub fn unresolved_usages(&self) -> impl Iterator<Item = &Usage> {
        self.usages.values().filter(|u| u.resolution.is_unresolved())
    }

    pub fn import(&self, id: ImportId) -> Option<&ImportEdge> {
        self.imports.get(&id)
    }

    pub fn imports(&self) -> impl Iterator<Item = &ImportEdge> {
        self.imports.values()
    }

    pub fn imports_in_file(&self, file: FileId) -> impl Iterator<Item = &ImportEdge> {
        self.files
            .get(&file)
            .into_iter()
            .flat_map(|r| r.imports.iter())
            .filter_map(move |id| self.imports.get(id))
    }

    /// The import statement that introduced an alias symbol.
    pub fn import_for_alias(&self, alias: NodeId) -> Option<&ImportEdge> {
        self.alias_imports.get(&alias).and_then(|id| self.imports.get(id))
    }

    /// Files with an import that lands in `file`.
    pub fn importers_of(&self, file: FileId) -> BTreeSet<FileId> {
        self.imports
            .values()
            .filter(|e| match &e.target {
                ResolvedTarget::File(f) => *f == file,
                ResolvedTarget::MissingName { file: f, .. } => *f == file,
                ResolvedTarget::Symbol(s) => self.symbol(*s).is_some_and(|s| s.file == file),
                _ => false,
            })
            .map(|e| e.file)
            .collect()
    }

    // ── Invariants ──────────────────────────────────────────

    /// Verify that no reference dangles and that symbol ranges are sane.
    pub fn check_invariants(&self) -> Result<()> {
        for usage in self.usages.values() {
            match &usage.resolution {
                Resolution::Pending => {
                    return Err(violation(format!("usage {:?} ({}) left pending", usage.id, usage.name)));
                }
                Resolution::Resolved(target) => {
                    if self.symbol(*target).is_none() {
                        return Err(violation(format!(
                            "usage {:?} ({}) points at missing symbol {:?}",
                            usage.id, usage.name, target
                        )));
                    }
                    let linked = self
                        .usage_edges
                        .get(&usage.id)
                        .into_iter()
                        .flatten()
                        .filter_map(|eid| self.graph.edge(*eid))
                        .any(|e| e.kind == EdgeKind::Uses && e.target == *target);
                    if !linked {
                        return Err(violation(format!("usage {:?} has no Uses edge", usage.id)));
                    }
                }
                Resolution::Unresolved(_) => {}
            }
        }

        for edge in self.imports.values() {
            let live = match &edge.target {
                ResolvedTarget::Pending => false,
                ResolvedTarget::Symbol(s) => self.symbol(*s).is_some(),
                ResolvedTarget::File(f) | ResolvedTarget::MissingName { file: f, .. } => {
                    self.files.contains_key(f)
                }
                ResolvedTarget::External { .. } => true,
            };
            if !live {
                return Err(violation(format!(
                    "import {:?} of {:?} has dangling target {:?}",
                    edge.id, edge.module, edge.target
                )));
            }
        }

        for record in self.files.values() {
            for id in &record.symbols {
                let symbol = self
                    .symbol(*id)
                    .ok_or_else(|| violation(format!("{} lists missing symbol {id:?}", record.path.display())))?;
                if symbol.file != record.id || symbol.range.end > record.len || !symbol.range.contains(&symbol.name_range) {
                    return Err(violation(format!(
                        "symbol {} in {} has range {} outside its file (len {})",
                        symbol.name,
                        record.path.display(),
                        symbol.range,
                        record.len
                    )));
                }
                check_siblings(self, &symbol.children, &record.path)?;
            }
            check_siblings(self, &record.top_level, &record.path)?;
        }
        Ok(())
    }
}

fn check_siblings(graph: &CodebaseGraph, ids: &[NodeId], path: &Path) -> Result<()> {
    let mut ranges: Vec<(ByteRange, &str)> = ids
        .iter()
        .filter_map(|id| graph.symbol(*id))
        .map(|s| (s.range, s.name.as_str()))
        .collect();
    ranges.sort();
    for pair in ranges.windows(2) {
        if pair[0].0.end > pair[1].0.start {
            return Err(violation(format!(
                "sibling symbols {} {} and {} {} overlap in {}",
                pair[0].1,
                pair[0].0,
                pair[1].1,
                pair[1].0,
                path.display()
            )));
        }
    }
    Ok(())
}

fn violation(message: String) -> GroveError {
    error!("{}", message);
    GroveError::InvariantViolation(message)
}

impl Default for CodebaseGraph {
    fn default() -> Self {
        Self::new()
    }
}
