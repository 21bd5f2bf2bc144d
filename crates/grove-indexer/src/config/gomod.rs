//! Module path from `go.mod`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use regex::Regex;

pub const FILE_NAME: &str = "go.mod";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoModule {
    pub path: String,
    pub dir: PathBuf,
}

pub fn parse(dir: &Path, text: &str) -> Result<GoModule> {
    let re = Regex::new(r#"(?m)^\s*module\s+"?([^\s"]+)"?"#).context("module regex")?;
    let path = re
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| anyhow!("go.mod has no module directive"))?;
    Ok(GoModule {
        path,
        dir: dir.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_directive() {
        let module = parse(Path::new("svc"), "// comment\nmodule example.com/svc\n\ngo 1.22\n").unwrap();
        assert_eq!(module.path, "example.com/svc");
        assert_eq!(module.dir, PathBuf::from("svc"));
    }

    #[test]
    fn test_missing_directive() {
        assert!(parse(Path::new(""), "go 1.22\n").is_err());
    }
}
