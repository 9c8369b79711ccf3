use std::hint::black_box;
use std::path::{Path, PathBuf};

use biosimulations_utils::prelude::*;
use criterion::{criterion_group, criterion_main, Criterion};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

fn benchmark_readers(c: &mut Criterion) {
    // Taxa are resolved from memory so that only parsing is measured
    let reader = SbmlModelReader::with_taxonomy(
        StaticTaxonomy::new().with_taxon(7787, "Tetronarce californica"),
    );
    let continuous = fixture("sbml/continuous-l3v1.xml");
    let flux_balance = fixture("sbml/fbc.xml");
    let simulation = fixture("sedml/timecourse.sedml");

    c.bench_function("read_sbml_continuous", |b| {
        b.iter(|| {
            let _ = black_box(reader.run(black_box(&continuous)));
        })
    });

    c.bench_function("read_sbml_flux_balance", |b| {
        b.iter(|| {
            let _ = black_box(reader.run(black_box(&flux_balance)));
        })
    });

    c.bench_function("read_sedml", |b| {
        b.iter(|| {
            let _ = black_box(SedMlSimulationReader::new().run(black_box(&simulation)));
        })
    });
}

criterion_group!(benches, benchmark_readers);
criterion_main!(benches);
