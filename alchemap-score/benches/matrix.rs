use criterion::{black_box, criterion_group, criterion_main, Criterion};
use alchemap_chem::{parse_smiles_named, McsParams};
use alchemap_score::{build_matrix, compute_mapping, tmcsr, ScoringRules, TrimMode};

const SERIES: &[&str] = &[
    "c1ccc(cc1)C(=O)Nc1ccccc1",
    "Cc1ccc(cc1)C(=O)Nc1ccccc1",
    "Clc1ccc(cc1)C(=O)Nc1ccccc1",
    "c1ccc(cc1)C(=O)Nc1ccncc1",
    "c1ccc(cc1)C(=O)NC1CCCCC1",
    "c1ccc(cc1)CC(=O)Nc1ccccc1",
];

fn ligands() -> Vec<alchemap_chem::Molecule> {
    SERIES
        .iter()
        .enumerate()
        .filter_map(|(i, s)| parse_smiles_named(s, &format!("lig{i}")).ok())
        .collect()
}

fn bench_pair(c: &mut Criterion) {
    let mols = ligands();
    let params = McsParams::loose();
    c.bench_function("mapping_ring_change", |b| {
        b.iter(|| compute_mapping(black_box(&mols[0]), black_box(&mols[4]), &params))
    });

    if let Ok(result) = compute_mapping(&mols[0], &mols[4], &params) {
        c.bench_function("tmcsr_strict", |b| {
            b.iter(|| tmcsr(black_box(&result), 0.1, TrimMode::Strict))
        });
    }
}

fn bench_matrix(c: &mut Criterion) {
    let mut group = c.benchmark_group("matrix");
    group.sample_size(10);
    let mols = ligands();
    let rules = ScoringRules::default();
    let params = McsParams::loose();

    for workers in [1, 4] {
        group.bench_function(format!("series_{workers}_workers"), |b| {
            b.iter(|| build_matrix(black_box(&mols), &rules, &params, workers))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pair, bench_matrix);
criterion_main!(benches);
