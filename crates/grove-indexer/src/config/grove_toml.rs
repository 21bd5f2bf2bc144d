//! `grove.toml` at the repository root

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const FILE_NAME: &str = "grove.toml";

const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroveConfig {
    pub scan: ScanConfig,
    pub resolver: ResolverConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Glob patterns, relative to the root, of files never indexed.
    pub exclude: Vec<String>,
    /// Files larger than this many bytes are skipped with a diagnostic.
    pub max_file_size: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            exclude: Vec::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Python import roots, searched in order. Empty means the defaults.
    pub search_paths: Vec<String>,
    /// Root for non-relative JavaScript/TypeScript specifiers when no
    /// tsconfig supplies one.
    pub base_url: Option<String>,
    /// Path aliases (`"@app/*" = ["src/app/*"]`), consulted after tsconfig.
    pub aliases: BTreeMap<String, Vec<String>>,
}

impl GroveConfig {
    /// Load `grove.toml` from `root`; a missing file yields the defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(FILE_NAME);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse_str(&text).with_context(|| format!("invalid {}", path.display()))
    }

    pub fn parse_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
