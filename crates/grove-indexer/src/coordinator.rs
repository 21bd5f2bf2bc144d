//! Orchestrates the two-pass build of a codebase

use std::collections::BTreeMap;
use std::path::PathBuf;

use globset::{Glob, GlobSet, GlobSetBuilder};
use grove_core::{
    CodebaseGraph, Diagnostic, DiagnosticKind, FileExtraction, FileId, Language, LanguageSet, Result,
    detect_workspace,
};
use ignore::WalkBuilder;
use rayon::prelude::*;
use tracing::{debug, info, warn};
use tree_sitter::Tree;

use crate::config::{GroveConfig, ProjectConfig, is_config_file, normalize};
use crate::file::{ParseStatus, SourceFile, extract_file};
use crate::parser_pool::{ParseRequest, ParserPool};
use crate::resolution::resolve_all;

/// Directories never worth indexing.
const DEFAULT_EXCLUDES: &[&str] = &["**/node_modules/**", "**/target/**", "**/__pycache__/**", "**/.git/**"];

/// A file read and parsed, ready for extraction.
#[derive(Debug)]
pub struct Loaded {
    pub path: PathBuf,
    pub language: Language,
    pub text: String,
    pub tree: Option<Tree>,
}

impl Loaded {
    pub fn status(&self) -> ParseStatus {
        ParseStatus::of(self.tree.as_ref())
    }

    /// Diagnostic for a tree that is missing or carries recovered errors.
    pub fn diagnostic(&self) -> Option<Diagnostic> {
        match self.status() {
            ParseStatus::Clean => None,
            ParseStatus::Recovered => Some(Diagnostic::warning(
                &self.path,
                DiagnosticKind::SyntaxRecovered,
                "syntax errors recovered by the parser",
            )),
            ParseStatus::Failed => Some(Diagnostic::error(
                &self.path,
                DiagnosticKind::ParseError,
                "no syntax tree could be produced",
            )),
        }
    }

    pub fn extract(&self) -> FileExtraction {
        extract_file(self.language, self.tree.as_ref(), &self.text)
    }

    /// Register the file in `graph` and wrap it as a [`SourceFile`].
    pub fn install(self, graph: &mut CodebaseGraph, extraction: FileExtraction) -> Result<SourceFile> {
        let status = self.status();
        let id = graph.add_file(self.path.clone(), self.language, self.text.len());
        graph.reconcile(id, self.text.len(), status.is_error(), &[], extraction)?;
        Ok(SourceFile::new(id, self.path, self.language, self.text, self.tree))
    }
}

/// Decode and parse a batch of files, keeping their order. Undecodable
/// files come back without a tree.
pub fn load_batch(pool: &ParserPool, files: Vec<(PathBuf, Language, Vec<u8>)>) -> (Vec<Loaded>, Vec<Diagnostic>) {
    let mut slots: Vec<Option<Loaded>> = Vec::with_capacity(files.len());
    let mut requests = Vec::new();
    let mut texts = Vec::new();
    for (i, (path, language, bytes)) in files.into_iter().enumerate() {
        match String::from_utf8(bytes) {
            Ok(text) => {
                texts.push((i, path.clone(), language, text.clone()));
                requests.push(ParseRequest::new(path, language, text));
                slots.push(None);
            }
            Err(e) => {
                let text = String::from_utf8_lossy(e.as_bytes()).into_owned();
                slots.push(Some(Loaded { path, language, text, tree: None }));
            }
        }
    }

    for (result, (i, path, language, text)) in pool.parse_batch(requests).into_iter().zip(texts) {
        let loaded = match result {
            Ok(parsed) => Loaded {
                path,
                language,
                text: parsed.content,
                tree: Some(parsed.tree),
            },
            Err(e) => {
                warn!("Parse failed for {}: {}", path.display(), e);
                Loaded { path, language, text, tree: None }
            }
        };
        slots[i] = Some(loaded);
    }

    let loaded: Vec<Loaded> = slots.into_iter().flatten().collect();
    let diagnostics = loaded.iter().filter_map(Loaded::diagnostic).collect();
    (loaded, diagnostics)
}

/// Everything the build produced.
#[derive(Debug)]
pub struct Build {
    pub config: ProjectConfig,
    pub graph: CodebaseGraph,
    pub sources: BTreeMap<FileId, SourceFile>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct Coordinator {
    root: PathBuf,
    languages: LanguageSet,
    pool: ParserPool,
}

impl Coordinator {
    pub fn new(root: impl Into<PathBuf>, languages: LanguageSet, pool: ParserPool) -> Self {
        Coordinator {
            root: root.into(),
            languages,
            pool,
        }
    }

    /// Scan the root, run pass 1 over every file in parallel, install the
    /// results, then resolve. Only invariant violations fail the build.
    pub fn run_full_index(&self, grove: Option<GroveConfig>) -> Result<Build> {
        let mut diagnostics = Vec::new();
        let grove = match grove {
            Some(grove) => grove,
            None => GroveConfig::load(&self.root).unwrap_or_else(|e| {
                warn!("Ignoring malformed grove.toml: {:#}", e);
                diagnostics.push(Diagnostic::warning(
                    crate::config::grove_toml::FILE_NAME,
                    DiagnosticKind::Config,
                    format!("{e:#}"),
                ));
                GroveConfig::default()
            }),
        };
        let mut config = ProjectConfig::new(grove, detect_workspace(&self.root));

        let excludes = self.excludes(&config.grove.scan.exclude, &mut diagnostics);
        let max_size = config.grove.scan.max_file_size;

        let mut pending = Vec::new();
        for (rel, size) in self.walk(&excludes) {
            let name = rel.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if is_config_file(name) {
                diagnostics.extend(config.ingest(&self.root, &rel));
                continue;
            }
            let language = Language::from_path(&rel);
            if language == Language::Other || !self.languages.contains(language) {
                continue;
            }
            if size > max_size {
                debug!("Skipping {} ({} bytes)", rel.display(), size);
                diagnostics.push(Diagnostic::warning(
                    &rel,
                    DiagnosticKind::Skipped,
                    format!("{size} bytes exceeds the {max_size} byte limit"),
                ));
                continue;
            }
            match std::fs::read(self.root.join(&rel)) {
                Ok(bytes) => pending.push((rel, language, bytes)),
                Err(e) => {
                    warn!("Failed to read {}: {}", rel.display(), e);
                    diagnostics.push(Diagnostic::error(&rel, DiagnosticKind::Unreadable, e.to_string()));
                }
            }
        }
        config.finish();
        info!("Scanned {} source files under {}", pending.len(), self.root.display());

        // Pass 1
        let (loaded, parse_diagnostics) = load_batch(&self.pool, pending);
        diagnostics.extend(parse_diagnostics);
        let extractions: Vec<FileExtraction> = loaded.par_iter().map(Loaded::extract).collect();

        let mut graph = CodebaseGraph::new();
        let mut sources = BTreeMap::new();
        for (file, extraction) in loaded.into_iter().zip(extractions) {
            debug!("Installing {} ({} symbols)", file.path.display(), extraction.symbols.len());
            let source = file.install(&mut graph, extraction)?;
            sources.insert(source.id, source);
        }

        // Pass 2
        resolve_all(&mut graph, &config)?;
        graph.take_dirty();
        graph.check_invariants()?;

        info!(
            "Built graph: {} files, {} symbols, {} usages ({} unresolved), {} diagnostics",
            graph.file_count(),
            graph.symbols().count(),
            graph.usages().count(),
            graph.unresolved_usages().count(),
            diagnostics.len()
        );
        Ok(Build {
            config,
            graph,
            sources,
            diagnostics,
        })
    }

    fn excludes(&self, patterns: &[String], diagnostics: &mut Vec<Diagnostic>) -> GlobSet {
        let mut builder = GlobSetBuilder::new();
        for pattern in DEFAULT_EXCLUDES.iter().copied().chain(patterns.iter().map(String::as_str)) {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => {
                    warn!("Ignoring exclude pattern {:?}: {}", pattern, e);
                    diagnostics.push(Diagnostic::warning(
                        crate::config::grove_toml::FILE_NAME,
                        DiagnosticKind::Config,
                        format!("bad exclude pattern {pattern:?}: {e}"),
                    ));
                }
            }
        }
        builder.build().unwrap_or_else(|e| {
            warn!("Exclude patterns disabled: {}", e);
            GlobSet::empty()
        })
    }

    /// Relative paths and sizes of every candidate file, in a stable order.
    fn walk(&self, excludes: &GlobSet) -> Vec<(PathBuf, u64)> {
        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(true)
            .git_exclude(true)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    warn!("Walk error: {}", err);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let rel = normalize(rel);
            if excludes.is_match(&rel) {
                continue;
            }
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            files.push((rel, size));
        }
        files
    }
}
