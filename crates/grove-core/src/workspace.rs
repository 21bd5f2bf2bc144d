//! Workspace/monorepo detection

use std::path::Path;

/// Detect which project manifests sit at the root.
pub fn detect_workspace(root: &Path) -> Vec<WorkspaceType> {
    let mut found = Vec::new();
    if root.join("Cargo.toml").exists() {
        found.push(WorkspaceType::Cargo);
    }
    if root.join("package.json").exists() || root.join("tsconfig.json").exists() {
        found.push(WorkspaceType::Npm);
    }
    if root.join("go.mod").exists() {
        found.push(WorkspaceType::GoModules);
    }
    if root.join("pyproject.toml").exists() || root.join("setup.py").exists() {
        found.push(WorkspaceType::Python);
    }
    found
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceType {
    Cargo,
    Npm,
    GoModules,
    Python,
}
