//! All-pairs similarity matrix.

use std::io::Write;

use alchemap_chem::{McsParams, Molecule};
use alchemap_core::{Annotated, Result};
use tracing::{debug, error, info, warn};

use crate::config::{BuildOptions, ScoringRules};
use crate::rules::{evaluate_pair, PairScore};

/// Upper-triangular matrix of pair scores.
///
/// Only cells `(i, j)` with `i < j` are populated; the diagonal and the lower
/// triangle stay unset. Each populated cell has a rule breakdown unless
/// scoring that pair failed, in which case the cell holds 0.0.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    size: usize,
    labels: Vec<String>,
    cells: Vec<Option<f64>>,
    details: Vec<Option<PairScore>>,
}

impl SimilarityMatrix {
    /// An unfilled matrix with one row per label.
    pub fn new(labels: Vec<String>) -> Self {
        let size = labels.len();
        SimilarityMatrix {
            size,
            labels,
            cells: vec![None; size * size],
            details: vec![None; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Stored value of cell `(i, j)`; `None` outside the upper triangle.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        if i >= self.size || j >= self.size {
            return None;
        }
        self.cells[i * self.size + j]
    }

    /// Score of the unordered pair `{i, j}`.
    pub fn score(&self, i: usize, j: usize) -> Option<f64> {
        self.get(i.min(j), i.max(j))
    }

    /// Rule breakdown of the unordered pair `{i, j}`, if it was scored.
    pub fn pair_score(&self, i: usize, j: usize) -> Option<&PairScore> {
        let (i, j) = (i.min(j), i.max(j));
        if j >= self.size {
            return None;
        }
        self.details[i * self.size + j].as_ref()
    }

    /// Number of populated cells.
    pub fn filled_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Populated cells in row-major order.
    pub fn iter_pairs(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(move |(k, c)| c.map(|v| (k / self.size, k % self.size, v)))
    }

    fn set(&mut self, i: usize, j: usize, score: Option<PairScore>) {
        let k = i * self.size + j;
        self.cells[k] = Some(score.map_or(0.0, |s| s.total));
        self.details[k] = score;
    }

    /// Write the matrix as a tab-separated table with molecule labels as
    /// header. Unset cells are written as `-`.
    pub fn write_score_table<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "\t{}", self.labels.join("\t"))?;
        for i in 0..self.size {
            let row: Vec<String> = (0..self.size)
                .map(|j| match self.get(i, j) {
                    Some(v) => format!("{v:.4}"),
                    None => "-".to_string(),
                })
                .collect();
            writeln!(out, "{}\t{}", self.labels[i], row.join("\t"))?;
        }
        Ok(())
    }

    /// Write one line per scored pair with the individual rule scores.
    pub fn write_pairs<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "i\tj\tleft\tright\tecr\tmcsr\tmncar\ttmcsr\tscore")?;
        for (i, j, total) in self.iter_pairs() {
            let (left, right) = (&self.labels[i], &self.labels[j]);
            match self.pair_score(i, j) {
                Some(s) => writeln!(
                    out,
                    "{i}\t{j}\t{left}\t{right}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{total:.4}",
                    s.ecr, s.mcsr, s.mncar, s.tmcsr
                )?,
                None => writeln!(out, "{i}\t{j}\t{left}\t{right}\t-\t-\t-\t-\t{total:.4}")?,
            }
        }
        Ok(())
    }
}

/// Number of workers for a requested concurrency.
///
/// Requests of zero or less, or above `available`, are clamped to
/// `available` with a warning.
pub fn resolve_workers(requested: i32, available: usize) -> usize {
    let available = available.max(1);
    if requested <= 0 {
        warn!(requested, available, "using all available cores");
        return available;
    }
    let requested = requested as usize;
    if requested > available {
        warn!(requested, available, "limiting number of workers to available cores");
        return available;
    }
    requested
}

fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

type PairCell = (usize, usize, Option<PairScore>);

/// Score every pair `(i, j)` with `i < j` of one row.
fn score_row(
    molecules: &[Molecule],
    i: usize,
    rules: &ScoringRules,
    params: &McsParams,
) -> Vec<PairCell> {
    ((i + 1)..molecules.len())
        .map(|j| {
            let (left, right) = (&molecules[i], &molecules[j]);
            match evaluate_pair(left, right, rules, params) {
                Ok(score) => {
                    debug!(i, j, score = score.total, "pair scored");
                    (i, j, Some(score))
                }
                Err(e) if e.is_pair_scoped() => {
                    warn!(
                        i,
                        j,
                        left = left.name(),
                        right = right.name(),
                        error = %e,
                        "pair scored 0.0"
                    );
                    (i, j, None)
                }
                Err(e) => {
                    error!(i, j, error = %e, "unexpected failure, pair scored 0.0");
                    (i, j, None)
                }
            }
        })
        .collect()
}

/// Score all unordered molecule pairs into a [`SimilarityMatrix`].
///
/// `concurrency == 1` scores pairs on the calling thread. Larger values run
/// rows on a worker pool created for this call and shut down before it
/// returns; see [`resolve_workers`] for clamping. Results are written by the
/// calling thread, indexed by pair, so the matrix does not depend on the
/// completion order. A pair that cannot be scored gets 0.0.
pub fn build_matrix(
    molecules: &[Molecule],
    rules: &ScoringRules,
    params: &McsParams,
    concurrency: i32,
) -> Result<SimilarityMatrix> {
    let labels = molecules
        .iter()
        .enumerate()
        .map(|(i, m)| match m.name() {
            "" => format!("mol_{i}"),
            name => name.to_string(),
        })
        .collect();
    let mut matrix = SimilarityMatrix::new(labels);
    let n = molecules.len();
    if n < 2 {
        return Ok(matrix);
    }

    let workers = resolve_workers(concurrency, available_cores());
    info!(molecules = n, pairs = n * (n - 1) / 2, workers, "building similarity matrix");

    let rows: Vec<Vec<PairCell>> = if workers == 1 {
        (0..n - 1).map(|i| score_row(molecules, i, rules, params)).collect()
    } else {
        score_rows_parallel(molecules, rules, params, workers)?
    };

    for (i, j, score) in rows.into_iter().flatten() {
        matrix.set(i, j, score);
    }
    Ok(matrix)
}

/// [`build_matrix`] with bundled options.
pub fn build_matrix_with(molecules: &[Molecule], options: &BuildOptions) -> Result<SimilarityMatrix> {
    build_matrix(molecules, &options.scoring, &options.mcs, options.concurrency)
}

#[cfg(feature = "parallel")]
fn score_rows_parallel(
    molecules: &[Molecule],
    rules: &ScoringRules,
    params: &McsParams,
    workers: usize,
) -> Result<Vec<Vec<PairCell>>> {
    use alchemap_core::AlchemapError;
    use rayon::prelude::*;

    let n = molecules.len();
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|k| format!("alchemap-worker-{k}"))
        .build_scoped(
            |thread| thread.run(),
            |pool| {
                pool.install(|| {
                    (0..n - 1)
                        .into_par_iter()
                        .map(|i| score_row(molecules, i, rules, params))
                        .collect::<Vec<_>>()
                })
            },
        )
        .map_err(|e| AlchemapError::Other(format!("failed to start worker pool: {e}")))
}

#[cfg(not(feature = "parallel"))]
fn score_rows_parallel(
    molecules: &[Molecule],
    rules: &ScoringRules,
    params: &McsParams,
    workers: usize,
) -> Result<Vec<Vec<PairCell>>> {
    debug!(workers, "built without the parallel feature, scoring sequentially");
    Ok((0..molecules.len() - 1)
        .map(|i| score_row(molecules, i, rules, params))
        .collect())
}
