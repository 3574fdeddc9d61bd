use criterion::{black_box, criterion_group, criterion_main, Criterion};
use alchemap_chem::{find_mcs, find_sssr, parse_smiles, McsParams};

/// Congeneric ligand series: a shared core with varied substituents.
const SERIES: &[&str] = &[
    "c1ccc(cc1)C(=O)Nc1ccccc1",
    "Cc1ccc(cc1)C(=O)Nc1ccccc1",
    "Clc1ccc(cc1)C(=O)Nc1ccccc1",
    "c1ccc(cc1)C(=O)Nc1ccncc1",
    "c1ccc(cc1)C(=O)NC1CCCCC1",
    "COc1ccc(cc1)C(=O)Nc1ccccc1O",
    "c1ccc2ccccc2c1C(=O)Nc1ccccc1",
    "c1ccc(cc1)CC(=O)Nc1ccccc1",
];

fn bench_smiles_parse(c: &mut Criterion) {
    let smiles_1k: Vec<&str> = SERIES.iter().copied().cycle().take(1000).collect();
    c.bench_function("smiles_parse_1k", |b| {
        b.iter(|| {
            for &smi in black_box(&smiles_1k) {
                let _ = parse_smiles(smi);
            }
        })
    });
}

fn bench_rings(c: &mut Criterion) {
    let mols: Vec<_> = SERIES.iter().filter_map(|s| parse_smiles(s).ok()).collect();
    c.bench_function("sssr_series", |b| {
        b.iter(|| {
            for mol in black_box(&mols) {
                let _ = find_sssr(mol);
            }
        })
    });
}

fn bench_mcs(c: &mut Criterion) {
    let mut group = c.benchmark_group("mcs");
    let mols: Vec<_> = SERIES
        .iter()
        .filter_map(|s| parse_smiles(s).ok())
        .collect();
    let params = McsParams::loose();

    group.bench_function("close_pair", |b| {
        b.iter(|| find_mcs(black_box(&mols[0]), black_box(&mols[1]), &params))
    });
    group.bench_function("ring_change", |b| {
        b.iter(|| find_mcs(black_box(&mols[3]), black_box(&mols[4]), &params))
    });
    group.bench_function("all_pairs", |b| {
        b.iter(|| {
            for i in 0..mols.len() {
                for j in (i + 1)..mols.len() {
                    let _ = find_mcs(&mols[i], &mols[j], &params);
                }
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_smiles_parse, bench_rings, bench_mcs);
criterion_main!(benches);
