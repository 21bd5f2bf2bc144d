//! Crate names and source roots from `Cargo.toml`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use super::normalize;

pub const FILE_NAME: &str = "Cargo.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CargoCrate {
    /// Crate name as written in paths (`-` replaced by `_`).
    pub name: String,
    pub dir: PathBuf,
    /// Directory of the crate root module.
    pub src: PathBuf,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    package: Option<Package>,
    lib: Option<Target>,
}

#[derive(Debug, Deserialize)]
struct Package {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Target {
    path: Option<String>,
}

/// Parse a manifest; workspace-only manifests declare no crate.
pub fn parse(dir: &Path, text: &str) -> Result<Option<CargoCrate>> {
    let manifest: Manifest = toml::from_str(text).context("invalid Cargo.toml")?;
    let Some(package) = manifest.package else {
        return Ok(None);
    };
    let src = manifest
        .lib
        .and_then(|l| l.path)
        .and_then(|p| Path::new(&p).parent().map(|d| normalize(&dir.join(d))))
        .unwrap_or_else(|| normalize(&dir.join("src")));
    Ok(Some(CargoCrate {
        name: package.name.replace('-', "_"),
        dir: dir.to_path_buf(),
        src,
    }))
}
