//! `tsconfig.json` / `jsconfig.json` path mapping

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use super::normalize;

pub const FILE_NAMES: &[&str] = &["tsconfig.json", "jsconfig.json"];

/// Module resolution settings of one tsconfig, with every path made
/// relative to the repository root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TsConfig {
    /// Directory holding the config file.
    pub dir: PathBuf,
    pub base_url: Option<PathBuf>,
    /// `paths` patterns, longest literal prefix first.
    pub paths: Vec<(String, Vec<PathBuf>)>,
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(rename = "compilerOptions", default)]
    compiler_options: RawCompilerOptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawCompilerOptions {
    base_url: Option<String>,
    paths: BTreeMap<String, Vec<String>>,
}

impl TsConfig {
    pub fn parse(dir: &Path, text: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(&strip_jsonc(text)).context("invalid tsconfig JSON")?;
        let base_url = raw.compiler_options.base_url.map(|b| normalize(&dir.join(b)));
        let paths_base = base_url.clone().unwrap_or_else(|| dir.to_path_buf());
        let paths = raw
            .compiler_options
            .paths
            .into_iter()
            .map(|(pattern, targets)| {
                let targets = targets.iter().map(|t| normalize(&paths_base.join(t))).collect();
                (pattern, targets)
            })
            .collect();
        Ok(TsConfig {
            dir: dir.to_path_buf(),
            base_url,
            paths: sort_patterns(paths),
        })
    }

    /// Candidate paths for a bare specifier, best pattern first.
    pub fn path_targets(&self, specifier: &str) -> Vec<PathBuf> {
        map_pattern(&self.paths, specifier)
    }
}

/// Order patterns so the longest literal prefix is tried first.
pub fn sort_patterns(mut patterns: Vec<(String, Vec<PathBuf>)>) -> Vec<(String, Vec<PathBuf>)> {
    patterns.sort_by(|a, b| prefix_len(&b.0).cmp(&prefix_len(&a.0)).then_with(|| a.0.cmp(&b.0)));
    patterns
}

fn prefix_len(pattern: &str) -> usize {
    pattern.find('*').unwrap_or(pattern.len())
}

/// Apply `*`-wildcard patterns to a specifier.
pub fn map_pattern(patterns: &[(String, Vec<PathBuf>)], specifier: &str) -> Vec<PathBuf> {
    for (pattern, targets) in patterns {
        let captured = match pattern.split_once('*') {
            Some((prefix, suffix)) => {
                if specifier.len() >= prefix.len() + suffix.len()
                    && specifier.starts_with(prefix)
                    && specifier.ends_with(suffix)
                {
                    Some(&specifier[prefix.len()..specifier.len() - suffix.len()])
                } else {
                    None
                }
            }
            None => (pattern == specifier).then_some(""),
        };
        if let Some(captured) = captured {
            return targets
                .iter()
                .map(|t| PathBuf::from(t.to_string_lossy().replace('*', captured)))
                .collect();
        }
    }
    Vec::new()
}

/// Strip comments and trailing commas from JSON-with-comments.
pub fn strip_jsonc(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
            }
            ',' => {
                let rest: String = chars.clone().take_while(|c| c.is_whitespace()).collect();
                let next = chars.clone().nth(rest.chars().count());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_comments() {
        let text = r#"{
  // compiler settings
  "compilerOptions": {
    "baseUrl": "./src", /* relative to this file */
    "paths": {
      "@app/*": ["app/*"],
      "@app/core": ["core/index.ts"],
      "@/*": ["*",],
    },
  },
}"#;
        let config = TsConfig::parse(Path::new("web"), text).unwrap();
        assert_eq!(config.base_url, Some(PathBuf::from("web/src")));
        assert_eq!(config.paths[0].0, "@app/core");
        assert_eq!(config.path_targets("@app/core"), vec![PathBuf::from("web/src/core/index.ts")]);
        assert_eq!(config.path_targets("@app/ui/button"), vec![PathBuf::from("web/src/app/ui/button")]);
        assert_eq!(config.path_targets("@/lib"), vec![PathBuf::from("web/src/lib")]);
        assert!(config.path_targets("react").is_empty());
    }

    #[test]
    fn test_strip_keeps_strings() {
        assert_eq!(strip_jsonc(r#"{"a": "http://x/*y*/"}"#), r#"{"a": "http://x/*y*/"}"#);
    }
}
