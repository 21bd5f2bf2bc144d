//! Integration tests for Grove
//!
//! These tests drive the public facade end to end: indexing, resolution and
//! transactional edits across files.

use std::fs;

use grove::{
    ByteRange, Codebase, CodebaseExt, GroveError, LanguageSet, Resolution, Severity, SymbolKind, UsageRole,
};
use tempfile::TempDir;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn repo(structure: &[(&str, &str)]) -> TempDir {
    init_logging();
    let dir = TempDir::new().unwrap();
    for (path, content) in structure {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }
    dir
}

fn declared<'a>(codebase: &'a Codebase, path: &str, name: &str) -> &'a grove::Symbol {
    codebase
        .get_file(path)
        .unwrap()
        .all_symbols()
        .into_iter()
        .find(|s| s.name == name && s.kind != SymbolKind::Import)
        .unwrap()
}

#[test]
fn test_util_main_scenario() {
    let dir = repo(&[
        ("util.py", "def add(a,b): return a+b\n"),
        ("main.py", "from util import add\nadd(1,2)\n"),
    ]);
    let codebase = grove::open(dir.path(), LanguageSet::all()).unwrap();

    let util = codebase.get_file("util.py").unwrap();
    let adds: Vec<_> = util.all_symbols().into_iter().filter(|s| s.name == "add").collect();
    assert_eq!(adds.len(), 1);

    let main = codebase.get_file("main.py").unwrap();
    let calls: Vec<_> = main.usages().into_iter().filter(|u| u.name == "add").collect();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].resolution, Resolution::Resolved(adds[0].id));
    assert_eq!(codebase.unresolved_usages().count(), 0);
}

#[test]
fn test_rename_scenario() {
    let dir = repo(&[
        ("util.py", "def add(a,b): return a+b\n"),
        ("main.py", "from util import add\nadd(1,2)\n"),
    ]);
    let mut codebase = grove::open(dir.path(), LanguageSet::all()).unwrap();
    let add = declared(&codebase, "util.py", "add").id;

    let mut tx = codebase.begin_transaction();
    assert_eq!(tx.rename_symbol(&codebase, add, "sum_").unwrap(), 2);
    tx.commit(&mut codebase).unwrap();

    let util = codebase.get_file("util.py").unwrap();
    assert!(util.get_symbol("sum_").is_some());
    assert!(util.get_symbol("add").is_none());
    assert!(codebase.symbol(add).is_none());
    insta::assert_snapshot!(util.content(), @"def sum_(a,b): return a+b");
    insta::assert_snapshot!(codebase.get_file("main.py").unwrap().content(), @r"
    from util import add
    sum_(1,2)
    ");
}

#[test]
fn test_symbols_stay_within_files_and_siblings_do_not_overlap() {
    let dir = repo(&[
        ("shapes.py", "class Circle:\n    def area(self):\n        return 3\n\n    def name(self):\n        return 'c'\n\n\nRADIUS = 2\n"),
        ("lib.ts", "export interface Point { x: number }\n\nexport class Grid {\n  size = 4;\n  cells(): number { return this.size; }\n}\n"),
        ("main.go", "package main\n\ntype Node struct{}\n\nfunc (n Node) Visit() {}\n\nfunc main() {}\n"),
        ("src/lib.rs", "pub struct Tree;\n\nimpl Tree {\n    pub fn leaves(&self) -> usize { 0 }\n}\n\npub fn plant() -> Tree { Tree }\n"),
    ]);
    let codebase = grove::open(dir.path(), LanguageSet::all()).unwrap();
    codebase.graph().check_invariants().unwrap();

    for file in codebase.files() {
        let len = file.content().len();
        let symbols = file.all_symbols();
        assert!(!symbols.is_empty(), "{} has no symbols", file.path().display());
        for s in &symbols {
            assert!(s.range.end <= len);
            assert!(s.range.contains(&s.name_range) || s.kind == SymbolKind::Import);
        }
        for (i, a) in symbols.iter().enumerate() {
            for b in &symbols[i + 1..] {
                if a.parent == b.parent && a.scope == b.scope && a.kind != SymbolKind::Import {
                    assert!(
                        a.range.end <= b.range.start || b.range.end <= a.range.start,
                        "{} and {} overlap",
                        a.name,
                        b.name
                    );
                }
            }
        }
    }
}

#[test]
fn test_resolution_is_idempotent() {
    let dir = repo(&[
        ("a.ts", "import { b } from \"./b\";\n\nexport const c = b + 1;\n"),
        ("b.ts", "export const b = 1;\n"),
    ]);
    let codebase = grove::open(dir.path(), LanguageSet::all()).unwrap();

    for usage in codebase.usages() {
        let first = codebase.resolve_usage(usage);
        let second = codebase.resolve_usage(usage);
        assert_eq!(first, second);
        assert_eq!(first, usage.resolution);
    }
    for edge in codebase.imports() {
        assert_eq!(codebase.resolve_import(edge), edge.target);
    }
}

#[test]
fn test_inner_declaration_shadows_outer() {
    let dir = repo(&[("scope.py", "x = 1\n\ndef f():\n    x = 2\n    return x\n")]);
    let codebase = grove::open(dir.path(), LanguageSet::all()).unwrap();

    let xs = codebase.find_symbols("x");
    assert_eq!(xs.len(), 2);
    let inner = xs.iter().find(|s| s.range.start > 5).unwrap();

    let file = codebase.get_file("scope.py").unwrap();
    let read = file
        .usages()
        .into_iter()
        .find(|u| u.name == "x" && u.role == UsageRole::Read)
        .unwrap();
    assert_eq!(read.resolution, Resolution::Resolved(inner.id));
}

#[test]
fn test_deleted_import_target_leaves_usage_unresolved() {
    let dir = repo(&[
        ("pkg/__init__.py", ""),
        ("pkg/a.py", "from .b import helper\n\nhelper()\n"),
        ("pkg/b.py", "def helper():\n    return 1\n"),
    ]);
    let mut codebase = grove::open(dir.path(), LanguageSet::all()).unwrap();
    let helper = declared(&codebase, "pkg/b.py", "helper").id;
    let call = |codebase: &Codebase| {
        codebase
            .get_file("pkg/a.py")
            .unwrap()
            .usages()
            .into_iter()
            .find(|u| u.name == "helper")
            .map(|u| u.resolution.clone())
            .unwrap()
    };
    assert_eq!(call(&codebase), Resolution::Resolved(helper));

    codebase.remove_file("pkg/b.py").unwrap();
    assert!(codebase.symbol(helper).is_none());
    assert!(matches!(call(&codebase), Resolution::Unresolved(_)));
    codebase.graph().check_invariants().unwrap();
}

#[test]
fn test_round_trip_shift_in_typescript() {
    let dir = repo(&[(
        "geo.ts",
        "const base = 1;\n\nexport function area(r: number): number {\n  return base * r * r;\n}\n",
    )]);
    let mut codebase = grove::open(dir.path(), LanguageSet::all()).unwrap();
    let file = codebase.get_file("geo.ts").unwrap().id();
    let area = declared(&codebase, "geo.ts", "area").clone();

    let mut tx = codebase.begin_transaction();
    tx.stage_edit(&codebase, file, ByteRange::new(13, 14), "100").unwrap();
    let diff = tx.commit(&mut codebase).unwrap();
    assert!(diff.shifted_symbols.contains(&area.id));

    let after = codebase.symbol(area.id).unwrap();
    assert_eq!(after.name, "area");
    assert_eq!(after.range, area.range.shifted(2));

    let base = declared(&codebase, "geo.ts", "base").id;
    let usage = codebase.usages().find(|u| u.name == "base").unwrap();
    assert_eq!(usage.resolution, Resolution::Resolved(base));
}

#[test]
fn test_parse_failures_become_diagnostics() {
    let dir = repo(&[
        ("ok.py", "def fine():\n    pass\n"),
        ("broken.py", "def broken(:\n    pass\n"),
    ]);
    let codebase = grove::open(dir.path(), LanguageSet::all()).unwrap();

    assert_eq!(codebase.files().count(), 2);
    let broken = codebase.get_file("broken.py").unwrap();
    assert!(broken.has_parse_error());
    assert!(
        codebase
            .diagnostics()
            .iter()
            .any(|d| d.path.ends_with("broken.py") && d.severity == Severity::Warning)
    );
    assert!(codebase.get_file("ok.py").unwrap().get_symbol("fine").is_some());
}

#[test]
fn test_transactions_conflict_across_handles() {
    let dir = repo(&[("util.py", "def add(a,b): return a+b\n")]);
    let codebase = grove::open(dir.path(), LanguageSet::all()).unwrap();
    let add = declared(&codebase, "util.py", "add").id;

    let mut first = codebase.begin_transaction();
    first.rename_symbol(&codebase, add, "plus").unwrap();
    let mut second = codebase.begin_transaction();
    assert!(matches!(
        second.rename_symbol(&codebase, add, "sum_"),
        Err(GroveError::Overlap { .. })
    ));
}

#[test]
fn test_write_back_persists_commits() {
    let dir = repo(&[
        ("util.py", "def add(a,b): return a+b\n"),
        ("main.py", "from util import add\nadd(1,2)\n"),
    ]);
    let mut codebase = grove::open(dir.path(), LanguageSet::all()).unwrap();
    let add = declared(&codebase, "util.py", "add").id;

    let mut tx = codebase.begin_transaction();
    tx.rename_symbol(&codebase, add, "sum_").unwrap();
    tx.rename_import_bindings(&codebase, add, "sum_").unwrap();
    tx.commit(&mut codebase).unwrap();
    assert_eq!(fs::read_to_string(dir.path().join("main.py")).unwrap(), "from util import add\nadd(1,2)\n");

    assert_eq!(codebase.write_back().unwrap(), 2);
    assert_eq!(fs::read_to_string(dir.path().join("main.py")).unwrap(), "from util import sum_\nsum_(1,2)\n");

    let reopened = grove::open(dir.path(), LanguageSet::all()).unwrap();
    assert_eq!(reopened.unresolved_usages().count(), 0);
}
