//! This bench simulates compiling a deeply nested checklist and auditing it
//! against a large document corpus.

#![allow(missing_docs)]

use std::fmt::Write as _;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use regdoc::audit;
use tempfile::TempDir;

/// Generates a chain of checklists, each including the next and adding its
/// own items.
fn preseed_checklists(dir: &std::path::Path, depth: usize, items_per_level: usize) {
    for level in 0..depth {
        let mut text = String::new();
        if level + 1 < depth {
            writeln!(text, "include level_{}.txt", level + 1).unwrap();
        }
        for item in 0..items_per_level {
            writeln!(text, "62304:{level}.{item} Requirement {level}.{item}").unwrap();
        }
        std::fs::write(dir.join(format!("level_{level}.txt")), text).unwrap();
    }
}

/// Generates a corpus covering every identifier the checklists define.
fn preseed_corpus(depth: usize, items_per_level: usize) -> audit::DocumentCorpus {
    let mut corpus = audit::DocumentCorpus::default();
    for level in 0..depth {
        let mut text = String::new();
        for item in 0..items_per_level {
            writeln!(
                text,
                "The plan addresses 62304:{level}.{item} in section {item}."
            )
            .unwrap();
        }
        corpus.push(format!("doc_{level}.md").into(), text);
    }
    corpus
}

fn compile_nested(c: &mut Criterion) {
    c.bench_function("compile nested checklist", |b| {
        b.iter_batched(
            || {
                let tmp_dir = TempDir::new().unwrap();
                preseed_checklists(tmp_dir.path(), 20, 50);
                tmp_dir
            },
            |tmp_dir| {
                audit::compile(tmp_dir.path().join("level_0.txt").to_str().unwrap()).unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

fn analyze_corpus(c: &mut Criterion) {
    let tmp_dir = TempDir::new().unwrap();
    preseed_checklists(tmp_dir.path(), 20, 50);
    let checklist = audit::compile(tmp_dir.path().join("level_0.txt").to_str().unwrap()).unwrap();
    let corpus = preseed_corpus(20, 50);

    c.bench_function("analyze corpus", |b| {
        b.iter(|| audit::analyze(&checklist, &corpus));
    });
}

criterion_group!(benches, compile_nested, analyze_corpus);
criterion_main!(benches);
