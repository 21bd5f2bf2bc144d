//! Import resolution: module specifiers to files, imported names to symbols

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use grove_core::{
    CodebaseGraph, FileId, ImportEdge, ImportedName, Language, NodeId, ResolvedTarget, ScopeIdx, SymbolKind,
};

use crate::config::{ProjectConfig, normalize};

/// Maximum number of re-export hops followed for one name.
pub const MAX_CHAIN: usize = 16;

/// `(file, name)` pairs already searched during one lookup.
type Seen = HashSet<(FileId, String)>;

const JS_EXTENSIONS: &[&str] = &["ts", "tsx", "d.ts", "js", "jsx", "mjs", "cjs"];

/// Resolves import edges against the files and symbols of a graph.
///
/// Resolution is a pure function of the graph's file index, its module-level
/// symbols and the project configuration; it never looks at previously
/// stored import targets.
pub struct ImportResolver<'a> {
    graph: &'a CodebaseGraph,
    config: &'a ProjectConfig,
    python_roots: Vec<PathBuf>,
}

impl<'a> ImportResolver<'a> {
    pub fn new(graph: &'a CodebaseGraph, config: &'a ProjectConfig) -> Self {
        ImportResolver {
            graph,
            config,
            python_roots: config.python_search_paths(),
        }
    }

    pub fn resolve(&self, edge: &ImportEdge) -> ResolvedTarget {
        self.resolve_at(edge, 0, &mut Seen::new())
    }

    fn resolve_at(&self, edge: &ImportEdge, depth: usize, seen: &mut Seen) -> ResolvedTarget {
        let external = || ResolvedTarget::External {
            module: edge.module.clone(),
        };
        let Some(record) = self.graph.file(edge.file) else {
            return external();
        };
        let from = record.path.as_path();

        if record.language == Language::Rust {
            return self.resolve_rust(edge, from, depth, seen);
        }

        let Some(target) = self.module_file(record.language, from, &edge.module) else {
            return external();
        };
        match &edge.imported {
            ImportedName::Module | ImportedName::Glob => ResolvedTarget::File(target),
            ImportedName::Default => {
                let name = self
                    .graph
                    .file(target)
                    .and_then(|r| r.default_export.clone())
                    .unwrap_or_else(|| "default".to_string());
                match self.named_in(target, &name, depth, seen) {
                    Some(id) => ResolvedTarget::Symbol(id),
                    None => ResolvedTarget::MissingName { file: target, name },
                }
            }
            ImportedName::Name(name) => {
                if let Some(id) = self.named_in(target, name, depth, seen) {
                    return ResolvedTarget::Symbol(id);
                }
                // `from pkg import submodule`
                if record.language == Language::Python {
                    let sub = if edge.module.ends_with('.') {
                        format!("{}{}", edge.module, name)
                    } else {
                        format!("{}.{}", edge.module, name)
                    };
                    if let Some(file) = self.python_module(from, &sub) {
                        return ResolvedTarget::File(file);
                    }
                }
                ResolvedTarget::MissingName {
                    file: target,
                    name: name.clone(),
                }
            }
        }
    }

    /// File a module specifier names, for every language but Rust.
    pub fn module_file(&self, language: Language, from: &Path, module: &str) -> Option<FileId> {
        match language {
            Language::Python => self.python_module(from, module),
            Language::JavaScript | Language::TypeScript | Language::Tsx => self.js_module(from, module),
            Language::Go => self.go_package(module),
            Language::Rust => self.rust_module(from, module).and_then(|(f, rest)| rest.is_empty().then_some(f)),
            Language::Other => None,
        }
    }

    /// A module-level binding of `name` in `file`, following import
    /// aliases and glob re-exports.
    pub fn named(&self, file: FileId, name: &str) -> Option<NodeId> {
        self.named_in(file, name, 0, &mut Seen::new())
    }

    /// A binding of `name` reachable through the glob imports of `file`,
    /// ignoring `file`'s own declarations.
    pub fn glob_named(&self, file: FileId, name: &str) -> Option<NodeId> {
        let mut seen = Seen::new();
        seen.insert((file, name.to_string()));
        self.through_globs(file, name, 0, &mut seen)
    }

    /// Every `(file, name)` pair is searched at most once per lookup, so glob
    /// cycles terminate and the cost stays linear in the import graph.
    fn named_in(&self, file: FileId, name: &str, depth: usize, seen: &mut Seen) -> Option<NodeId> {
        if depth > MAX_CHAIN || !seen.insert((file, name.to_string())) {
            return None;
        }
        if let Some(id) = self.graph.lookup(file, ScopeIdx::MODULE, name) {
            let is_alias = self.graph.symbol(id).is_some_and(|s| s.kind == SymbolKind::Import);
            if is_alias {
                if let Some(edge) = self.graph.import_for_alias(id) {
                    if let ResolvedTarget::Symbol(target) = self.resolve_at(edge, depth + 1, seen) {
                        return Some(target);
                    }
                }
            }
            return Some(id);
        }
        self.through_globs(file, name, depth, seen)
    }

    fn through_globs(&self, file: FileId, name: &str, depth: usize, seen: &mut Seen) -> Option<NodeId> {
        for edge in self.graph.imports_in_file(file) {
            if edge.imported != ImportedName::Glob {
                continue;
            }
            if let ResolvedTarget::File(next) = self.resolve_at(edge, depth + 1, seen) {
                if let Some(id) = self.named_in(next, name, depth + 1, seen) {
                    return Some(id);
                }
            }
        }
        None
    }

    fn file_at(&self, path: &Path) -> Option<FileId> {
        self.graph.file_by_path(&normalize(path))
    }

    // ── Python ──────────────────────────────────────────────

    pub fn python_module(&self, from: &Path, module: &str) -> Option<FileId> {
        let dots = module.chars().take_while(|c| *c == '.').count();
        let rest = &module[dots..];
        let segments: Vec<&str> = rest.split('.').filter(|s| !s.is_empty()).collect();

        if dots > 0 {
            let mut base = from.parent().map(Path::to_path_buf).unwrap_or_default();
            for _ in 1..dots {
                base = base.parent().map(Path::to_path_buf).unwrap_or_default();
            }
            return self.python_candidates(&base, &segments);
        }
        if segments.is_empty() {
            return None;
        }
        let importing_dir = from.parent().map(Path::to_path_buf).unwrap_or_default();
        self.python_roots
            .iter()
            .chain(std::iter::once(&importing_dir))
            .find_map(|root| self.python_candidates(root, &segments))
    }

    fn python_candidates(&self, base: &Path, segments: &[&str]) -> Option<FileId> {
        let stem: PathBuf = segments.iter().fold(base.to_path_buf(), |p, s| p.join(s));
        if segments.is_empty() {
            return ["__init__.py", "__init__.pyi"]
                .iter()
                .find_map(|init| self.file_at(&stem.join(init)));
        }
        let with_ext = |ext: &str| {
            let mut p = stem.clone().into_os_string();
            p.push(ext);
            PathBuf::from(p)
        };
        [
            with_ext(".py"),
            with_ext(".pyi"),
            stem.join("__init__.py"),
            stem.join("__init__.pyi"),
        ]
        .iter()
        .find_map(|candidate| self.file_at(candidate))
    }

    // ── JavaScript / TypeScript ─────────────────────────────

    pub fn js_module(&self, from: &Path, specifier: &str) -> Option<FileId> {
        let from_dir = from.parent().map(Path::to_path_buf).unwrap_or_default();
        if specifier == "." || specifier == ".." || specifier.starts_with("./") || specifier.starts_with("../") {
            return self.js_candidates(&from_dir.join(specifier));
        }
        if let Some(rooted) = specifier.strip_prefix('/') {
            return self.js_candidates(Path::new(rooted));
        }
        if let Some(ts) = self.config.tsconfig_for(from) {
            if let Some(found) = ts.path_targets(specifier).iter().find_map(|t| self.js_candidates(t)) {
                return Some(found);
            }
            if let Some(base) = &ts.base_url {
                if let Some(found) = self.js_candidates(&base.join(specifier)) {
                    return Some(found);
                }
            }
        }
        if let Some(found) = self
            .config
            .alias_targets(specifier)
            .iter()
            .find_map(|t| self.js_candidates(t))
        {
            return Some(found);
        }
        self.config
            .base_url()
            .and_then(|base| self.js_candidates(&base.join(specifier)))
    }

    fn js_candidates(&self, base: &Path) -> Option<FileId> {
        let base = normalize(base);
        let has_ext = base.extension().is_some();
        if has_ext {
            if let Some(found) = self.file_at(&base) {
                return Some(found);
            }
            let substitutes: &[&str] = match base.extension().and_then(|e| e.to_str()) {
                Some("js") => &["ts", "tsx"],
                Some("jsx") => &["tsx"],
                Some("mjs") => &["mts"],
                Some("cjs") => &["cts"],
                _ => &[],
            };
            for ext in substitutes {
                if let Some(found) = self.file_at(&base.with_extension(ext)) {
                    return Some(found);
                }
            }
        }
        for ext in JS_EXTENSIONS {
            let mut candidate = base.clone().into_os_string();
            candidate.push(".");
            candidate.push(ext);
            if let Some(found) = self.file_at(Path::new(&candidate)) {
                return Some(found);
            }
        }
        JS_EXTENSIONS
            .iter()
            .find_map(|ext| self.file_at(&base.join(format!("index.{ext}"))))
    }

    // ── Rust ────────────────────────────────────────────────

    fn resolve_rust(&self, edge: &ImportEdge, from: &Path, depth: usize, seen: &mut Seen) -> ResolvedTarget {
        let external = || ResolvedTarget::External {
            module: edge.module.clone(),
        };
        let Some((file, rest)) = self.rust_module(from, &edge.module) else {
            return external();
        };
        match (&edge.imported, rest.first()) {
            (ImportedName::Module | ImportedName::Glob, None) => ResolvedTarget::File(file),
            (ImportedName::Name(name), None) => {
                if let Some(id) = self.named_in(file, name, depth, seen) {
                    return ResolvedTarget::Symbol(id);
                }
                let submodule = format!("{}::{}", edge.module, name);
                match self.rust_module(from, &submodule) {
                    Some((sub, rest)) if rest.is_empty() => ResolvedTarget::File(sub),
                    _ => ResolvedTarget::MissingName {
                        file,
                        name: name.clone(),
                    },
                }
            }
            // inline module: the first unmatched segment names a symbol
            (_, Some(segment)) => match self.named_in(file, segment, depth, seen) {
                Some(id) => ResolvedTarget::Symbol(id),
                None => ResolvedTarget::MissingName {
                    file,
                    name: segment.clone(),
                },
            },
            (ImportedName::Default, None) => external(),
        }
    }

    /// The file of the longest resolvable prefix of a Rust module path and
    /// the segments left over.
    pub fn rust_module(&self, from: &Path, module: &str) -> Option<(FileId, Vec<String>)> {
        let segments: Vec<&str> = module.split("::").filter(|s| !s.is_empty()).collect();
        let first = *segments.first()?;
        let krate = self.config.crate_for(from);
        let src_root = match krate {
            Some(k) => k.src.clone(),
            None => from
                .ancestors()
                .find(|a| a.file_name().is_some_and(|n| n == "src"))
                .map(Path::to_path_buf)
                .or_else(|| from.parent().map(Path::to_path_buf))
                .unwrap_or_default(),
        };

        let (mut dir, rest) = match first {
            "crate" => (src_root.clone(), &segments[1..]),
            name if krate.is_some_and(|k| k.name == name) => (src_root.clone(), &segments[1..]),
            "self" => (module_dir(from), &segments[1..]),
            "super" => {
                let mut dir = module_dir(from);
                let mut used = 0;
                for seg in &segments {
                    if *seg != "super" {
                        break;
                    }
                    dir = dir.parent().map(Path::to_path_buf).unwrap_or_default();
                    used += 1;
                }
                (dir, &segments[used..])
            }
            _ => return None,
        };

        let mut best = self.rust_module_file(&dir, &src_root).map(|f| (f, 0));
        for (i, seg) in rest.iter().enumerate() {
            dir = dir.join(seg);
            match self.rust_module_file(&dir, &src_root) {
                Some(f) => best = Some((f, i + 1)),
                None => break,
            }
        }
        best.map(|(file, used)| (file, rest[used..].iter().map(|s| s.to_string()).collect()))
    }

    fn rust_module_file(&self, dir: &Path, src_root: &Path) -> Option<FileId> {
        if normalize(dir) == normalize(src_root) {
            return ["lib.rs", "main.rs"].iter().find_map(|f| self.file_at(&dir.join(f)));
        }
        let mut flat = dir.to_path_buf().into_os_string();
        flat.push(".rs");
        self.file_at(Path::new(&flat))
            .or_else(|| self.file_at(&dir.join("mod.rs")))
    }

    // ── Go ──────────────────────────────────────────────────

    pub fn go_package(&self, import: &str) -> Option<FileId> {
        let (module, rest) = self.config.go_module_for_import(import)?;
        let dir = normalize(&module.dir.join(rest));
        self.graph
            .files()
            .filter(|r| r.language == Language::Go)
            .filter(|r| r.path.parent().map(normalize).unwrap_or_default() == dir)
            .filter(|r| !r.path.to_string_lossy().ends_with("_test.go"))
            .min_by(|a, b| a.path.cmp(&b.path))
            .map(|r| r.id)
    }
}

/// Directory holding the child modules of the module defined by `file`.
fn module_dir(file: &Path) -> PathBuf {
    let parent = file.parent().map(Path::to_path_buf).unwrap_or_default();
    match file.file_name().and_then(|n| n.to_str()) {
        Some("mod.rs" | "lib.rs" | "main.rs") => parent,
        _ => match file.file_stem() {
            Some(stem) => parent.join(stem),
            None => parent,
        },
    }
}
