//! Unit tests for grove-indexer module

use std::collections::BTreeMap;

use grove_core::{
    ByteRange, DiagnosticKind, ImportedName, LanguageSet, Resolution, ResolvedTarget, Severity, SymbolKind,
    TextEdit, Unresolved, UsageRole,
};

use crate::test_utils::{create_repo_with_structure, create_test_repo};
use crate::*;

fn open(structure: &[(&str, &str)]) -> (tempfile::TempDir, Codebase) {
    let dir = create_repo_with_structure(structure);
    let codebase = Codebase::open(dir.path(), LanguageSet::all()).unwrap();
    (dir, codebase)
}

/// The one declaration of `name` that is not an import binding.
fn single_symbol<'a>(codebase: &'a Codebase, name: &str) -> &'a grove_core::Symbol {
    let found: Vec<_> = codebase
        .find_symbols(name)
        .into_iter()
        .filter(|s| s.kind != SymbolKind::Import)
        .collect();
    assert_eq!(found.len(), 1, "expected one declaration named {name}");
    found[0]
}

#[test]
fn test_open_mixed_repo() {
    let dir = create_test_repo();
    let codebase = Codebase::open(dir.path(), LanguageSet::all()).unwrap();

    assert!(codebase.diagnostics().iter().all(|d| d.severity != Severity::Error));
    assert_eq!(codebase.files().count(), 8);

    // Python
    let add = single_symbol(&codebase, "add");
    let main = codebase.get_file("main.py").unwrap();
    let calls: Vec<_> = main.usages().into_iter().filter(|u| u.name == "add").collect();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].resolution, Resolution::Resolved(add.id));
    assert_eq!(calls[0].role, UsageRole::Call);

    // TypeScript through a tsconfig path alias
    let square = single_symbol(&codebase, "square");
    let app = codebase.get_file("web/app.ts").unwrap();
    let import = &app.imports()[0];
    assert_eq!(import.imported, ImportedName::Name("square".into()));
    assert_eq!(import.target, ResolvedTarget::Symbol(square.id));

    // Rust through `crate::`
    let graph_struct = codebase
        .find_symbols("Graph")
        .into_iter()
        .find(|s| s.kind == SymbolKind::Struct)
        .unwrap();
    let lib = codebase.get_file("src/lib.rs").unwrap();
    let graph_rs = codebase.get_file("src/graph.rs").unwrap();
    let targets: Vec<_> = lib.imports().into_iter().map(|e| e.target.clone()).collect();
    assert!(targets.contains(&ResolvedTarget::File(graph_rs.id())));
    assert!(targets.contains(&ResolvedTarget::Symbol(graph_struct.id)));
    assert!(
        lib.usages()
            .iter()
            .filter(|u| u.name == "Graph")
            .all(|u| u.resolution == Resolution::Resolved(graph_struct.id))
    );
}

#[test]
fn test_util_main_scenario() {
    let (_dir, codebase) = open(&[
        ("util.py", "def add(a,b): return a+b\n"),
        ("main.py", "from util import add\nadd(1,2)\n"),
    ]);

    let util = codebase.get_file("util.py").unwrap();
    let adds: Vec<_> = util.all_symbols().into_iter().filter(|s| s.name == "add").collect();
    assert_eq!(adds.len(), 1);
    assert_eq!(util.get_symbol("add").map(|s| s.id), Some(adds[0].id));

    let main = codebase.get_file("main.py").unwrap();
    let usages = main.usages();
    assert_eq!(usages.len(), 1);
    assert_eq!(usages[0].resolution, Resolution::Resolved(adds[0].id));
    assert_eq!(codebase.unresolved_usages().count(), 0);
    assert_eq!(codebase.usages_of(adds[0].id).len(), 1);
}

#[test]
fn test_resolution_is_idempotent() {
    let dir = create_test_repo();
    let codebase = Codebase::open(dir.path(), LanguageSet::all()).unwrap();
    for usage in codebase.usages() {
        let first = codebase.resolve_usage(usage);
        assert_eq!(first, codebase.resolve_usage(usage));
        assert_eq!(first, usage.resolution);
    }
    for edge in codebase.imports() {
        assert_eq!(codebase.resolve_import(edge), edge.target);
    }
}

#[test]
fn test_symbols_stay_inside_their_files() {
    let dir = create_test_repo();
    let codebase = Codebase::open(dir.path(), LanguageSet::all()).unwrap();
    for file in codebase.files() {
        let len = file.content().len();
        let symbols = file.all_symbols();
        for symbol in &symbols {
            assert!(symbol.range.end <= len, "{} out of bounds", symbol.name);
            assert!(symbol.range.contains(&symbol.name_range));
        }
        let top = file.symbols();
        for (i, a) in top.iter().enumerate() {
            for b in &top[i + 1..] {
                assert!(a.range.end <= b.range.start || b.range.end <= a.range.start);
            }
        }
    }
}

#[test]
fn test_shadowing() {
    let (_dir, codebase) = open(&[("shadow.py", "x = 1\n\ndef f():\n    x = 2\n    return x\n\ny = x\n")]);
    let file = codebase.get_file("shadow.py").unwrap();
    let xs: Vec<_> = file.all_symbols().into_iter().filter(|s| s.name == "x").collect();
    assert_eq!(xs.len(), 2);
    let (outer, inner) = if xs[0].parent.is_none() { (xs[0], xs[1]) } else { (xs[1], xs[0]) };

    let reads: Vec<_> = file
        .usages()
        .into_iter()
        .filter(|u| u.name == "x" && u.role == UsageRole::Read)
        .collect();
    assert_eq!(reads.len(), 2);
    assert_eq!(reads[0].resolution, Resolution::Resolved(inner.id));
    assert_eq!(reads[1].resolution, Resolution::Resolved(outer.id));
}

#[test]
fn test_python_reexport_chain() {
    let dir = create_test_repo();
    std::fs::write(dir.path().join("app.py"), "from pkg import Engine\n\nEngine().run()\n").unwrap();
    let codebase = Codebase::open(dir.path(), LanguageSet::all()).unwrap();

    let engine = codebase
        .find_symbols("Engine")
        .into_iter()
        .find(|s| s.kind == SymbolKind::Class)
        .unwrap();
    let app = codebase.get_file("app.py").unwrap();
    assert_eq!(app.imports()[0].target, ResolvedTarget::Symbol(engine.id));
    let usage = app.usages().into_iter().find(|u| u.name == "Engine").unwrap();
    assert_eq!(usage.resolution, Resolution::Resolved(engine.id));

    // the method body reaches `helper` at module scope past the class body
    let helper = single_symbol(&codebase, "helper");
    assert_eq!(codebase.usages_of(helper.id).len(), 1);
}

#[test]
fn test_cyclic_glob_imports_terminate() {
    let names = ["a", "b", "c", "d", "e"];
    let sources: Vec<(String, String)> = names
        .iter()
        .map(|name| {
            let mut text: String = names
                .iter()
                .filter(|other| *other != name)
                .map(|other| format!("from {other} import *\n"))
                .collect();
            text.push_str(&format!("\ndef shared_{name}():\n    return 1\n\nzzz()\n"));
            (format!("{name}.py"), text)
        })
        .collect();
    let structure: Vec<(&str, &str)> = sources.iter().map(|(p, t)| (p.as_str(), t.as_str())).collect();
    let (_dir, codebase) = open(&structure);

    let missing: Vec<_> = codebase.unresolved_usages().filter(|u| u.name == "zzz").collect();
    assert_eq!(missing.len(), names.len());
    assert!(
        missing
            .iter()
            .all(|u| u.resolution == Resolution::Unresolved(Unresolved::NotFound))
    );

    // a name declared anywhere in the cycle is still found through the globs
    let shared = single_symbol(&codebase, "shared_e");
    let resolver = ImportResolver::new(codebase.graph(), codebase.config());
    let a = codebase.get_file("a.py").unwrap().id();
    assert_eq!(resolver.glob_named(a, "shared_e"), Some(shared.id));
    assert_eq!(resolver.glob_named(a, "nothing"), None);
}

#[test]
fn test_javascript_default_import() {
    let (_dir, codebase) = open(&[
        ("lib.js", "export default function main() {}\n"),
        ("app.js", "import start from './lib';\nstart();\n"),
    ]);
    let main = single_symbol(&codebase, "main");
    let app = codebase.get_file("app.js").unwrap();
    assert_eq!(app.imports()[0].imported, ImportedName::Default);
    assert_eq!(app.imports()[0].target, ResolvedTarget::Symbol(main.id));
    let call = app.usages().into_iter().find(|u| u.name == "start").unwrap();
    assert_eq!(call.resolution, Resolution::Resolved(main.id));
}

#[test]
fn test_go_packages() {
    let (_dir, codebase) = open(&[
        ("go.mod", "module example.com/svc\n\ngo 1.22\n"),
        (
            "main.go",
            "package main\n\nimport \"example.com/svc/internal/db\"\n\nfunc main() {\n\thelper()\n\tdb.Open()\n}\n",
        ),
        ("util.go", "package main\n\nfunc helper() int {\n\treturn 1\n}\n"),
        ("internal/db/db.go", "package db\n\nfunc Open() {}\n"),
        ("internal/db/db_test.go", "package db\n"),
    ]);

    let db = codebase.get_file("internal/db/db.go").unwrap();
    let main = codebase.get_file("main.go").unwrap();
    assert_eq!(main.imports()[0].target, ResolvedTarget::File(db.id()));

    let helper = single_symbol(&codebase, "helper");
    let call = main.usages().into_iter().find(|u| u.name == "helper").unwrap();
    assert_eq!(call.resolution, Resolution::Resolved(helper.id));
}

#[test]
fn test_external_and_builtin_references() {
    let (_dir, codebase) = open(&[("app.py", "import requests\n\nrequests.get(len([]))\n")]);
    let app = codebase.get_file("app.py").unwrap();
    assert_eq!(
        app.imports()[0].target,
        ResolvedTarget::External {
            module: "requests".into()
        }
    );
    let resolutions: BTreeMap<_, _> = app.usages().into_iter().map(|u| (u.name.clone(), u.resolution.clone())).collect();
    assert_eq!(
        resolutions["requests"],
        Resolution::Unresolved(Unresolved::External {
            module: "requests".into()
        })
    );
    assert_eq!(
        resolutions["len"],
        Resolution::Unresolved(Unresolved::External {
            module: "builtins".into()
        })
    );
}

#[test]
fn test_parse_failures_are_diagnostics() {
    let dir = create_repo_with_structure(&[
        ("good.py", "def ok():\n    pass\n"),
        ("broken.py", "def f(:\n    pass\n"),
    ]);
    std::fs::write(dir.path().join("binary.py"), [0xff, 0xfe, 0x00, 0x41]).unwrap();
    let codebase = Codebase::open(dir.path(), LanguageSet::all()).unwrap();

    let binary = codebase.get_file("binary.py").unwrap();
    assert!(binary.has_parse_error());
    assert!(binary.all_symbols().is_empty());
    assert!(
        codebase
            .diagnostics()
            .iter()
            .any(|d| d.path.ends_with("binary.py") && d.severity == Severity::Error && d.kind == DiagnosticKind::ParseError)
    );
    assert!(
        codebase
            .diagnostics()
            .iter()
            .any(|d| d.path.ends_with("broken.py") && d.kind == DiagnosticKind::SyntaxRecovered)
    );
    assert!(codebase.get_file("good.py").unwrap().get_symbol("ok").is_some());
}

#[test]
fn test_scan_config() {
    let big = format!("x = 1\n{}", "# padding\n".repeat(20));
    let (_dir, codebase) = open(&[
        ("grove.toml", "[scan]\nexclude = [\"gen/**\"]\nmax_file_size = 100\n"),
        ("gen/out.py", "y = 2\n"),
        ("big.py", big.as_str()),
        ("small.py", "z = 3\n"),
        ("node_modules/dep/index.js", "module.exports = 1;\n"),
    ]);
    assert!(codebase.get_file("small.py").is_some());
    assert!(codebase.get_file("gen/out.py").is_none());
    assert!(codebase.get_file("big.py").is_none());
    assert!(codebase.get_file("node_modules/dep/index.js").is_none());
    assert!(
        codebase
            .diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::Skipped && d.path.ends_with("big.py"))
    );
}

#[test]
fn test_language_filter() {
    let dir = create_test_repo();
    let codebase = Codebase::open(dir.path(), LanguageSet::only(&[grove_core::Language::Python])).unwrap();
    assert!(codebase.files().all(|f| f.language() == grove_core::Language::Python));
    assert!(codebase.get_file("web/app.ts").is_none());
}

#[test]
fn test_edit_outside_symbol_shifts_it() {
    let (_dir, mut codebase) = open(&[
        ("util.py", "def add(a, b):\n    return a + b\n"),
        ("main.py", "from util import add\n\nadd(1, 2)\n"),
    ]);
    let util_id = codebase.get_file("util.py").unwrap().id();
    let before = single_symbol(&codebase, "add").clone();

    let diff = codebase
        .apply_edits(BTreeMap::from([(util_id, vec![TextEdit::insert(0, "# header\n")])]))
        .unwrap();
    assert_eq!(diff.touched_files, vec![util_id]);
    assert!(diff.removed_symbols.is_empty());
    assert!(diff.shifted_symbols.contains(&before.id));

    let after = codebase.symbol(before.id).unwrap();
    assert_eq!(after.name, "add");
    assert_eq!(after.range, before.range.shifted(9));
    assert_eq!(after.name_range, ByteRange::new(13, 16));
    assert_eq!(codebase.usages_of(before.id).len(), 1);
    assert_eq!(codebase.revision(util_id), Some(1));

    let util = codebase.get_file("util.py").unwrap();
    insta::assert_snapshot!(util.content(), @r"
    # header
    def add(a, b):
        return a + b
    ");
}

#[test]
fn test_edit_inside_symbol_rebuilds_it() {
    let (_dir, mut codebase) = open(&[
        ("util.py", "def add(a, b):\n    return a + b\n"),
        ("main.py", "from util import add\n\nadd(1, 2)\n"),
    ]);
    let util_id = codebase.get_file("util.py").unwrap().id();
    let old = single_symbol(&codebase, "add").id;

    let diff = codebase
        .apply_edits(BTreeMap::from([(util_id, vec![TextEdit::new(ByteRange::new(26, 31), "b + a")])]))
        .unwrap();
    assert!(diff.removed_symbols.contains(&old));
    assert!(codebase.symbol(old).is_none());

    let new = single_symbol(&codebase, "add").id;
    assert_ne!(new, old);
    assert_eq!(codebase.usages_of(new).len(), 1);
    assert_eq!(codebase.unresolved_usages().count(), 0);
    codebase.graph().check_invariants().unwrap();
}

#[test]
fn test_edit_reresolves_only_affected_files() {
    let (_dir, mut codebase) = open(&[
        ("util.py", "def add(a, b):\n    return a + b\n"),
        ("main.py", "from util import add\n\nprint(add(1, 2))\n"),
        ("report.py", "print(len([1, 2]))\n"),
        ("worker.go", "package jobs\n\nfunc Run() { helper() }\n"),
        ("helper.go", "package jobs\n\nfunc helper() {}\n"),
        ("other/main.go", "package main\n\nfunc main() {}\n"),
    ]);
    let util = codebase.get_file("util.py").unwrap().id();
    let main = codebase.get_file("main.py").unwrap().id();
    let report = codebase.get_file("report.py").unwrap().id();
    assert!(codebase.unresolved_usages().any(|u| u.file == report));

    let diff = codebase
        .apply_edits(BTreeMap::from([(util, vec![TextEdit::insert(0, "# header\n")])]))
        .unwrap();
    assert!(diff.reresolved_files.contains(&util));
    assert!(diff.reresolved_files.contains(&main));
    assert!(!diff.reresolved_files.contains(&report));

    let helper = codebase.get_file("helper.go").unwrap().id();
    let worker = codebase.get_file("worker.go").unwrap().id();
    let other = codebase.get_file("other/main.go").unwrap().id();
    let diff = codebase
        .apply_edits(BTreeMap::from([(helper, vec![TextEdit::insert(0, "// jobs\n")])]))
        .unwrap();
    assert!(diff.reresolved_files.contains(&worker));
    assert!(!diff.reresolved_files.contains(&other));
    assert!(!diff.reresolved_files.contains(&main));
}

#[test]
fn test_invalid_edits_change_nothing() {
    let (_dir, mut codebase) = open(&[("util.py", "def add(a, b):\n    return a + b\n")]);
    let util_id = codebase.get_file("util.py").unwrap().id();

    let overlapping = vec![
        TextEdit::new(ByteRange::new(0, 5), "x"),
        TextEdit::new(ByteRange::new(3, 8), "y"),
    ];
    let err = codebase.apply_edits(BTreeMap::from([(util_id, overlapping)])).unwrap_err();
    assert!(matches!(err, grove_core::GroveError::Overlap { .. }));

    let err = codebase
        .apply_edits(BTreeMap::from([(util_id, vec![TextEdit::insert(500, "z")])]))
        .unwrap_err();
    assert!(matches!(err, grove_core::GroveError::OutOfBounds { .. }));
    assert_eq!(codebase.revision(util_id), Some(0));
}

#[test]
fn test_remove_file_unresolves_importers() {
    let (_dir, mut codebase) = open(&[
        ("util.py", "def add(a, b):\n    return a + b\n"),
        ("main.py", "from util import add\n\nadd(1, 2)\n"),
    ]);
    codebase.remove_file("util.py").unwrap();

    assert!(codebase.get_file("util.py").is_none());
    assert!(codebase.find_symbols("add").iter().all(|s| s.kind == SymbolKind::Import));
    let main = codebase.get_file("main.py").unwrap();
    let call = main.usages().into_iter().find(|u| u.name == "add").unwrap();
    assert!(call.resolution.is_unresolved());
    codebase.graph().check_invariants().unwrap();

    // Adding it back resolves the import again.
    codebase.add_file("util.py", "def add(a, b):\n    return a - b\n").unwrap();
    let add = codebase
        .find_symbols("add")
        .into_iter()
        .find(|s| s.kind == SymbolKind::Function)
        .unwrap()
        .id;
    assert_eq!(codebase.usages_of(add).len(), 1);
}

#[test]
fn test_file_view_nodes() {
    let (_dir, codebase) = open(&[("util.py", "@cached\ndef add(a, b):\n    return a + b\n")]);
    let util = codebase.get_file("util.py").unwrap();
    let add = util.get_symbol("add").unwrap();

    let node = util.symbol_node(add).unwrap();
    assert_eq!(node.role(), NodeRole::Function);
    assert_eq!(node.name(), Some("add"));
    assert!(node.as_has_block().is_some());
    assert_eq!(node.as_attribute_holder().map(|a| a.attributes().len()), Some(1));
    assert_eq!(node.extent().start, 0);

    let children = util.children(&node);
    assert_eq!(children.len(), 3);
    assert_eq!(children[2].role(), NodeRole::Block);
    let parent = util.parent(&node).unwrap();
    assert_eq!(parent.kind(), "decorated_definition");

    let ident = util.node_at(add.name_range).unwrap();
    assert_eq!(ident.role(), NodeRole::Identifier);
    assert!(util.root().is_some());
}

#[test]
fn test_write_back() {
    let (dir, mut codebase) = open(&[("util.py", "def add(a, b):\n    return a + b\n")]);
    let util_id = codebase.get_file("util.py").unwrap().id();
    codebase
        .apply_edits(BTreeMap::from([(util_id, vec![TextEdit::insert(0, "# header\n")])]))
        .unwrap();
    assert_eq!(codebase.write_back().unwrap(), 1);
    let on_disk = std::fs::read_to_string(dir.path().join("util.py")).unwrap();
    assert!(on_disk.starts_with("# header\n"));
    assert_eq!(codebase.write_back().unwrap(), 0);
}
