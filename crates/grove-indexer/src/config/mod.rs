//! Project configuration: `grove.toml` plus the manifests that steer import resolution

pub mod cargo;
pub mod gomod;
pub mod grove_toml;
pub mod pyproject;
pub mod tsconfig;

use std::path::{Component, Path, PathBuf};

use grove_core::{Diagnostic, DiagnosticKind, WorkspaceType};

pub use cargo::CargoCrate;
pub use gomod::GoModule;
pub use grove_toml::{GroveConfig, ResolverConfig, ScanConfig};
pub use tsconfig::TsConfig;

/// Lexically normalise a relative path: drop `.`, fold `..`.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.last(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// Whether a file name is a manifest the resolver reads.
pub fn is_config_file(name: &str) -> bool {
    tsconfig::FILE_NAMES.contains(&name)
        || name == pyproject::FILE_NAME
        || name == cargo::FILE_NAME
        || name == gomod::FILE_NAME
}

/// Everything import resolution needs to know about the project.
#[derive(Debug, Clone, Default)]
pub struct ProjectConfig {
    pub grove: GroveConfig,
    pub workspaces: Vec<WorkspaceType>,
    pub python_roots: Vec<PathBuf>,
    pub tsconfigs: Vec<TsConfig>,
    pub crates: Vec<CargoCrate>,
    pub go_modules: Vec<GoModule>,
    aliases: Vec<(String, Vec<PathBuf>)>,
}

impl ProjectConfig {
    pub fn new(grove: GroveConfig, workspaces: Vec<WorkspaceType>) -> Self {
        let aliases = grove
            .resolver
            .aliases
            .iter()
            .map(|(pattern, targets)| (pattern.clone(), targets.iter().map(|t| normalize(Path::new(t))).collect()))
            .collect();
        ProjectConfig {
            grove,
            workspaces,
            aliases: tsconfig::sort_patterns(aliases),
            ..Default::default()
        }
    }

    /// Read one manifest found during the scan. `rel` is relative to `root`.
    pub fn ingest(&mut self, root: &Path, rel: &Path) -> Option<Diagnostic> {
        let name = rel.file_name()?.to_str()?;
        let dir = rel.parent().map(normalize).unwrap_or_default();
        let text = match std::fs::read_to_string(root.join(rel)) {
            Ok(text) => text,
            Err(e) => {
                return Some(Diagnostic::warning(rel, DiagnosticKind::Config, format!("unreadable: {e}")));
            }
        };

        let outcome = match name {
            n if tsconfig::FILE_NAMES.contains(&n) => TsConfig::parse(&dir, &text).map(|c| self.tsconfigs.push(c)),
            pyproject::FILE_NAME => pyproject::source_roots(&dir, &text).map(|roots| self.python_roots.extend(roots)),
            cargo::FILE_NAME => cargo::parse(&dir, &text).map(|c| self.crates.extend(c)),
            gomod::FILE_NAME => gomod::parse(&dir, &text).map(|m| self.go_modules.push(m)),
            _ => Ok(()),
        };
        match outcome {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("Ignoring malformed {}: {:#}", rel.display(), e);
                Some(Diagnostic::warning(rel, DiagnosticKind::Config, format!("{e:#}")))
            }
        }
    }

    /// Sort discovered manifests deepest directory first, so lookups find
    /// the nearest one.
    pub fn finish(&mut self) {
        fn depth(p: &Path) -> usize {
            p.components().count()
        }
        self.tsconfigs.sort_by(|a, b| depth(&b.dir).cmp(&depth(&a.dir)).then_with(|| a.dir.cmp(&b.dir)));
        self.crates.sort_by(|a, b| depth(&b.dir).cmp(&depth(&a.dir)).then_with(|| a.dir.cmp(&b.dir)));
        self.go_modules.sort_by(|a, b| depth(&b.dir).cmp(&depth(&a.dir)).then_with(|| a.dir.cmp(&b.dir)));
        self.python_roots.dedup();
    }

    /// Python import roots in search order.
    pub fn python_search_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = if self.grove.resolver.search_paths.is_empty() {
            let mut defaults = vec![PathBuf::new()];
            if self.workspaces.contains(&WorkspaceType::Python) {
                defaults.push(PathBuf::from("src"));
            }
            defaults
        } else {
            self.grove
                .resolver
                .search_paths
                .iter()
                .map(|p| normalize(Path::new(p)))
                .collect()
        };
        for root in &self.python_roots {
            if !paths.contains(root) {
                paths.push(root.clone());
            }
        }
        paths
    }

    pub fn tsconfig_for(&self, file: &Path) -> Option<&TsConfig> {
        self.tsconfigs.iter().find(|c| file.starts_with(&c.dir))
    }

    pub fn crate_for(&self, file: &Path) -> Option<&CargoCrate> {
        self.crates.iter().find(|c| file.starts_with(&c.dir))
    }

    pub fn go_module_for_import(&self, import: &str) -> Option<(&GoModule, String)> {
        self.go_modules.iter().find_map(|m| {
            if import == m.path {
                Some((m, String::new()))
            } else {
                import
                    .strip_prefix(&m.path)
                    .and_then(|rest| rest.strip_prefix('/'))
                    .map(|rest| (m, rest.to_string()))
            }
        })
    }

    /// Targets of `grove.toml` aliases for a bare specifier.
    pub fn alias_targets(&self, specifier: &str) -> Vec<PathBuf> {
        tsconfig::map_pattern(&self.aliases, specifier)
    }

    pub fn base_url(&self) -> Option<PathBuf> {
        self.grove.resolver.base_url.as_deref().map(|b| normalize(Path::new(b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize(Path::new("./x.py")), PathBuf::from("x.py"));
        assert_eq!(normalize(Path::new("../up")), PathBuf::from("../up"));
        assert_eq!(normalize(Path::new("")), PathBuf::new());
    }

    #[test]
    fn test_python_search_paths() {
        let mut grove = GroveConfig::default();
        let config = ProjectConfig::new(grove.clone(), vec![WorkspaceType::Python]);
        assert_eq!(config.python_search_paths(), vec![PathBuf::new(), PathBuf::from("src")]);

        grove.resolver.search_paths = vec!["lib".into(), ".".into()];
        let mut config = ProjectConfig::new(grove, Vec::new());
        config.python_roots.push(PathBuf::from("pkgs"));
        assert_eq!(
            config.python_search_paths(),
            vec![PathBuf::from("lib"), PathBuf::new(), PathBuf::from("pkgs")]
        );
    }

    #[test]
    fn test_ingest_reports_malformed_manifest() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("go.mod"), "go 1.22\n").unwrap();
        std::fs::create_dir_all(dir.path().join("web")).unwrap();
        std::fs::write(dir.path().join("web/tsconfig.json"), "{\"compilerOptions\": {\"baseUrl\": \".\"}}").unwrap();

        let mut config = ProjectConfig::default();
        let diag = config.ingest(dir.path(), Path::new("go.mod")).unwrap();
        assert_eq!(diag.kind, DiagnosticKind::Config);
        assert!(config.ingest(dir.path(), Path::new("web/tsconfig.json")).is_none());
        config.finish();
        assert_eq!(config.tsconfig_for(Path::new("web/src/a.ts")).unwrap().base_url, Some(PathBuf::from("web")));
        assert!(config.tsconfig_for(Path::new("api/a.ts")).is_none());
    }

    #[test]
    fn test_go_module_prefix() {
        let mut config = ProjectConfig::default();
        config.go_modules.push(GoModule {
            path: "example.com/svc".into(),
            dir: PathBuf::new(),
        });
        let (_, rest) = config.go_module_for_import("example.com/svc/internal/db").unwrap();
        assert_eq!(rest, "internal/db");
        assert!(config.go_module_for_import("example.com/svcx").is_none());
    }
}
