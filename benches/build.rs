//! Benchmarks for the full two-pass build and for committing an edit
//!
//! Measures:
//! - `open()` on generated Python repositories of growing size
//! - Rename commit latency (incremental re-parse and re-resolution)

use std::fs;
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use grove::{CodebaseExt, LanguageSet, SymbolKind};
use tempfile::TempDir;

/// Python module with `functions` helpers and one class calling all of them.
fn generate_module(id: usize, functions: usize) -> String {
    let mut content = String::new();
    if id > 0 {
        content.push_str(&format!("from mod_{} import helper_{}_0\n\n", id - 1, id - 1));
    }
    for i in 0..functions {
        content.push_str(&format!("def helper_{id}_{i}(x):\n    y = x + {i}\n    return y\n\n\n"));
    }
    content.push_str(&format!("class Module{id}:\n    def run(self):\n        total = 0\n"));
    for i in 0..functions {
        content.push_str(&format!("        total += helper_{id}_{i}(total)\n"));
    }
    if id > 0 {
        content.push_str(&format!("        total += helper_{}_0(total)\n", id - 1));
    }
    content.push_str("        return total\n");
    content
}

fn generate_repo(modules: usize, functions: usize) -> TempDir {
    let dir = TempDir::new().unwrap();
    for id in 0..modules {
        fs::write(dir.path().join(format!("mod_{id}.py")), generate_module(id, functions)).unwrap();
    }
    dir
}

fn bench_open(c: &mut Criterion) {
    let mut group = c.benchmark_group("open");
    group.sample_size(10);
    for modules in [10, 50, 200] {
        let dir = generate_repo(modules, 20);
        group.bench_with_input(BenchmarkId::from_parameter(modules), &dir, |b, dir| {
            b.iter(|| black_box(grove::open(dir.path(), LanguageSet::all()).unwrap()))
        });
    }
    group.finish();
}

fn bench_rename_commit(c: &mut Criterion) {
    let dir = generate_repo(50, 20);
    c.bench_function("rename_commit", |b| {
        b.iter_batched(
            || grove::open(dir.path(), LanguageSet::all()).unwrap(),
            |mut codebase| {
                let target = codebase
                    .find_symbols("helper_0_0")
                    .into_iter()
                    .find(|s| s.kind != SymbolKind::Import)
                    .map(|s| s.id)
                    .unwrap();
                let mut tx = codebase.begin_transaction();
                tx.rename_symbol(&codebase, target, "renamed").unwrap();
                tx.rename_import_bindings(&codebase, target, "renamed").unwrap();
                black_box(tx.commit(&mut codebase).unwrap())
            },
            criterion::BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_open, bench_rename_commit);
criterion_main!(benches);
