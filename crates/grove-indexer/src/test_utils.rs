//! Test utilities for Grove

use std::fs;

use tempfile::TempDir;

/// Create a temporary repository with a mix of languages and imports
pub fn create_test_repo() -> TempDir {
    create_repo_with_structure(&[
        ("util.py", "def add(a, b):\n    return a + b\n"),
        ("main.py", "from util import add\n\nprint(add(1, 2))\n"),
        ("pkg/__init__.py", "from .core import Engine\n"),
        ("pkg/core.py", "class Engine:\n    def run(self):\n        return helper()\n\n\ndef helper():\n    return 1\n"),
        ("web/tsconfig.json", "{\n  // aliases\n  \"compilerOptions\": {\"baseUrl\": \".\", \"paths\": {\"@lib/*\": [\"lib/*\"]}}\n}\n"),
        ("web/lib/math.ts", "export function square(x: number): number {\n  return x * x;\n}\n"),
        ("web/app.ts", "import { square } from \"@lib/math\";\n\nexport const area = square(3);\n"),
        ("Cargo.toml", "[package]\nname = \"demo-app\"\nversion = \"0.1.0\"\n"),
        ("src/lib.rs", "pub mod graph;\n\nuse crate::graph::Graph;\n\npub fn build() -> Graph {\n    Graph::new()\n}\n"),
        ("src/graph.rs", "pub struct Graph;\n\nimpl Graph {\n    pub fn new() -> Self {\n        Graph\n    }\n}\n"),
    ])
}

/// Create a repository with a specific file structure
pub fn create_repo_with_structure(structure: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    for (path, content) in structure {
        let full_path = root.join(path);

        // Create parent directories if needed
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }

        fs::write(&full_path, content).unwrap();
    }

    temp_dir
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_repo() {
        let temp_dir = create_test_repo();
        let root = temp_dir.path();

        assert!(root.join("util.py").exists());
        assert!(root.join("pkg/core.py").exists());
        assert!(root.join("web/tsconfig.json").exists());
        assert!(root.join("src/graph.rs").exists());
    }
}
