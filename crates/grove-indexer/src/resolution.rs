//! Pass 2: binding usages and import edges across files
//!
//! Resolutions are computed in parallel against an immutable graph, then
//! applied one by one. Imports go first so usage lookup can follow alias
//! targets.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use grove_core::{
    CodebaseGraph, FileId, ImportId, Language, NodeId, Resolution, ResolvedTarget, Result,
    ScopeIdx, SymbolKind, Unresolved, Usage, UsageId,
};
use rayon::prelude::*;
use tracing::debug;

use crate::config::{ProjectConfig, normalize};
use crate::languages::spec_for;
use crate::resolver::ImportResolver;

/// Go files grouped by package directory.
struct Packages(HashMap<PathBuf, Vec<FileId>>);

impl Packages {
    fn index(graph: &CodebaseGraph) -> Self {
        let mut dirs: HashMap<PathBuf, Vec<FileId>> = HashMap::new();
        for record in graph.files().filter(|r| r.language == Language::Go) {
            let dir = record.path.parent().map(normalize).unwrap_or_default();
            dirs.entry(dir).or_default().push(record.id);
        }
        Packages(dirs)
    }

    fn siblings(&self, graph: &CodebaseGraph, file: FileId) -> &[FileId] {
        graph
            .file(file)
            .and_then(|r| self.0.get(&r.path.parent().map(normalize).unwrap_or_default()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// `files` plus every file importing one of them, directly or through a
/// chain of re-exports.
pub fn importer_closure(graph: &CodebaseGraph, files: &BTreeSet<FileId>) -> BTreeSet<FileId> {
    let mut found = files.clone();
    let mut queue: Vec<FileId> = files.iter().copied().collect();
    while let Some(file) = queue.pop() {
        for importer in graph.importers_of(file) {
            if found.insert(importer) {
                queue.push(importer);
            }
        }
    }
    found
}

/// Go files sharing a package directory with one of `files`.
pub fn package_siblings(graph: &CodebaseGraph, files: &BTreeSet<FileId>) -> BTreeSet<FileId> {
    let packages = Packages::index(graph);
    files
        .iter()
        .filter(|f| graph.file(**f).is_some_and(|r| r.language == Language::Go))
        .flat_map(|f| packages.siblings(graph, *f).iter().copied())
        .collect()
}

/// Resolve everything in the graph.
pub fn resolve_all(graph: &mut CodebaseGraph, config: &ProjectConfig) -> Result<()> {
    let files: BTreeSet<FileId> = graph.files().map(|r| r.id).collect();
    resolve_imports(graph, config, &files)?;
    resolve_usages(graph, config, &files)
}

/// Resolve the import edges of `files`. Returns the files whose import
/// targets changed.
pub fn resolve_imports(
    graph: &mut CodebaseGraph,
    config: &ProjectConfig,
    files: &BTreeSet<FileId>,
) -> Result<BTreeSet<FileId>> {
    let computed: Vec<(ImportId, FileId, ResolvedTarget)> = {
        let resolver = ImportResolver::new(graph, config);
        let edges: Vec<_> = files.iter().flat_map(|f| graph.imports_in_file(*f)).collect();
        edges
            .par_iter()
            .map(|edge| (edge.id, edge.file, resolver.resolve(edge)))
            .filter(|(id, _, target)| graph.import(*id).is_none_or(|e| e.target != *target))
            .collect()
    };

    let mut changed = BTreeSet::new();
    for (id, file, target) in computed {
        graph.set_import_target(id, target)?;
        changed.insert(file);
    }
    debug!("Resolved imports of {} files, {} changed", files.len(), changed.len());
    Ok(changed)
}

/// Resolve every usage of `files`.
pub fn resolve_usages(graph: &mut CodebaseGraph, config: &ProjectConfig, files: &BTreeSet<FileId>) -> Result<()> {
    let computed: Vec<(UsageId, Resolution)> = {
        let resolver = ImportResolver::new(graph, config);
        let packages = Packages::index(graph);
        let usages: Vec<&Usage> = files.iter().flat_map(|f| graph.usages_in_file(*f)).collect();
        usages
            .par_iter()
            .map(|usage| (usage.id, resolve_with(graph, &resolver, &packages, usage)))
            .collect()
    };

    let count = computed.len();
    for (id, resolution) in computed {
        graph.set_usage_resolution(id, resolution)?;
    }
    debug!("Resolved {} usages in {} files", count, files.len());
    Ok(())
}

/// Resolution of a single usage against the current graph.
pub fn resolve_usage(graph: &CodebaseGraph, config: &ProjectConfig, usage: &Usage) -> Resolution {
    let resolver = ImportResolver::new(graph, config);
    let packages = Packages::index(graph);
    resolve_with(graph, &resolver, &packages, usage)
}

fn resolve_with(graph: &CodebaseGraph, resolver: &ImportResolver<'_>, packages: &Packages, usage: &Usage) -> Resolution {
    if let Some(found) = graph.lookup_lexical(usage.file, usage.scope, &usage.name) {
        return through_alias(graph, found);
    }

    if let Some(found) = resolver.glob_named(usage.file, &usage.name) {
        return through_alias(graph, found);
    }

    let Some(language) = graph.file(usage.file).map(|r| r.language) else {
        return Resolution::Unresolved(Unresolved::NotFound);
    };

    if language == Language::Go {
        for sibling in packages.siblings(graph, usage.file) {
            if *sibling == usage.file {
                continue;
            }
            let declared = graph
                .lookup(*sibling, ScopeIdx::MODULE, &usage.name)
                .filter(|id| graph.symbol(*id).is_some_and(|s| s.kind != SymbolKind::Import));
            if let Some(found) = declared {
                return Resolution::Resolved(found);
            }
        }
    }

    match spec_for(language).and_then(|spec| spec.builtin_module(&usage.name)) {
        Some(module) => Resolution::Unresolved(Unresolved::External {
            module: module.to_string(),
        }),
        None => Resolution::Unresolved(Unresolved::NotFound),
    }
}

/// Look through an import alias to what it binds.
fn through_alias(graph: &CodebaseGraph, found: NodeId) -> Resolution {
    let is_alias = graph.symbol(found).is_some_and(|s| s.kind == SymbolKind::Import);
    let edge = if is_alias { graph.import_for_alias(found) } else { None };
    let Some(edge) = edge else {
        return Resolution::Resolved(found);
    };
    match &edge.target {
        ResolvedTarget::Symbol(target) => Resolution::Resolved(*target),
        ResolvedTarget::File(_) => Resolution::Resolved(found),
        ResolvedTarget::External { module } => Resolution::Unresolved(Unresolved::External { module: module.clone() }),
        ResolvedTarget::MissingName { .. } | ResolvedTarget::Pending => Resolution::Unresolved(Unresolved::NotFound),
    }
}
