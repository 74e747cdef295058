//! Benchmarks for documentation set loading and navigation construction.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use folio_config::Docset;
use folio_diagnostics::DiagnosticsCollector;
use folio_site::DocumentationSet;

/// Create `sections` folders with `pages` pages each and a matching TOC.
fn create_docs(root: &Path, sections: usize, pages: usize) -> String {
    let mut toc = String::from("toc:\n  - file: index.md\n");
    fs::create_dir_all(root).unwrap();
    fs::write(root.join("index.md"), "# Home\n").unwrap();

    for s in 0..sections {
        let dir = root.join(format!("section-{s}"));
        fs::create_dir_all(&dir).unwrap();
        writeln!(toc, "  - folder: section-{s}\n    children:").unwrap();
        for p in 0..pages {
            fs::write(
                dir.join(format!("page-{p}.md")),
                format!("# Page {s}.{p}\n\nSee [home](../index.md).\n"),
            )
            .unwrap();
            writeln!(toc, "      - file: page-{p}.md").unwrap();
        }
    }
    toc
}

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("documentation_set");

    for (sections, pages) in [(5, 10), (20, 50)] {
        let temp_dir = tempfile::tempdir().unwrap();
        let docs = temp_dir.path().join("docs");
        let toc = create_docs(&docs, sections, pages);
        let docset = Docset::parse(&toc, &docs.join("docset.yml")).unwrap();

        group.bench_with_input(
            BenchmarkId::new("load", sections * pages),
            &docset,
            |b, docset| {
                b.iter(|| {
                    let collector = DiagnosticsCollector::new(Vec::new());
                    let docset = Docset::parse(&toc, &docset.path).unwrap();
                    DocumentationSet::new(docs.clone(), temp_dir.path().join("out"), docset, &collector)
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

fn bench_previous_next(c: &mut Criterion) {
    let temp_dir = tempfile::tempdir().unwrap();
    let docs = temp_dir.path().join("docs");
    let toc = create_docs(&docs, 20, 50);
    let docset = Docset::parse(&toc, &docs.join("docset.yml")).unwrap();
    let collector = DiagnosticsCollector::new(Vec::new());
    let set = DocumentationSet::new(docs, temp_dir.path().join("out"), docset, &collector).unwrap();

    c.bench_function("navigation_next", |b| {
        b.iter(|| set.next("section-10/page-25.md"));
    });
    c.bench_function("navigation_previous", |b| {
        b.iter(|| set.previous("section-10/page-25.md"));
    });
}

criterion_group!(benches, bench_load, bench_previous_next);
criterion_main!(benches);
