//! Python source roots from `pyproject.toml`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::normalize;

pub const FILE_NAME: &str = "pyproject.toml";

/// Package roots declared by setuptools or poetry, relative to the repository root.
pub fn source_roots(dir: &Path, text: &str) -> Result<Vec<PathBuf>> {
    let doc: toml::Value = toml::from_str(text).context("invalid pyproject.toml")?;
    let tool = doc.get("tool");
    let mut roots = Vec::new();

    let setuptools = tool
        .and_then(|t| t.get("setuptools"))
        .and_then(|s| s.get("packages"))
        .and_then(|p| p.get("find"))
        .and_then(|f| f.get("where"))
        .and_then(|w| w.as_array());
    for root in setuptools.into_iter().flatten().filter_map(|v| v.as_str()) {
        roots.push(normalize(&dir.join(root)));
    }

    let poetry = tool
        .and_then(|t| t.get("poetry"))
        .and_then(|p| p.get("packages"))
        .and_then(|p| p.as_array());
    for package in poetry.into_iter().flatten() {
        if let Some(from) = package.get("from").and_then(|f| f.as_str()) {
            roots.push(normalize(&dir.join(from)));
        }
    }

    roots.dedup();
    Ok(roots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setuptools_and_poetry_roots() {
        let text = r#"
[tool.setuptools.packages.find]
where = ["src"]

[tool.poetry]
packages = [{ include = "pkg", from = "lib" }, { include = "other" }]
"#;
        let roots = source_roots(Path::new(""), text).unwrap();
        assert_eq!(roots, vec![PathBuf::from("src"), PathBuf::from("lib")]);
    }

    #[test]
    fn test_no_tool_table() {
        assert!(source_roots(Path::new(""), "[project]\nname = \"x\"\n").unwrap().is_empty());
    }
}
