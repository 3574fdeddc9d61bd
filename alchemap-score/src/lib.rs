//! Pairwise ligand scoring for perturbation network planning.
//!
//! Every pair of ligands is reduced to a maximum common substructure, the
//! substructure is mapped back onto both parents, and four rules score how
//! suitable the pair is for a direct alchemical transformation:
//!
//! - **ECR** gates on equal net charge
//! - **MCSR** decays with the number of atoms outside the common core
//! - **MNCAR** gates on a minimum core size
//! - **TMCSR** trims broken rings and unstable stereocenters from the core and
//!   decays with the number of atoms lost
//!
//! [`build_matrix`] runs the pipeline over all unordered pairs, optionally on
//! a dedicated worker pool, and returns an upper-triangular
//! [`SimilarityMatrix`].
//!
//! # Example
//!
//! ```
//! use alchemap_chem::{parse_smiles_named, McsParams};
//! use alchemap_score::{build_matrix, ScoringRules};
//!
//! let ligands = vec![
//!     parse_smiles_named("c1ccccc1CC", "ethylbenzene").unwrap(),
//!     parse_smiles_named("c1ccccc1C", "toluene").unwrap(),
//!     parse_smiles_named("c1ccccc1O", "phenol").unwrap(),
//! ];
//!
//! let matrix = build_matrix(&ligands, &ScoringRules::default(), &McsParams::loose(), 1).unwrap();
//! assert_eq!(matrix.filled_cells(), 3);
//! assert!(matrix.get(0, 1).unwrap() > 0.8);
//! assert!(matrix.get(1, 0).is_none());
//! ```

pub mod config;
pub mod loader;
pub mod mapping;
pub mod matrix;
pub mod rules;
pub mod trim;

pub use config::{BuildOptions, Rule, ScoringRules, TrimMode};
pub use loader::{read_molecule_file, read_molecules};
pub use mapping::{compute_mapping, McsResult, RingCounts};
pub use matrix::{build_matrix, build_matrix_with, resolve_workers, SimilarityMatrix};
pub use rules::{ecr, evaluate_pair, mcsr, mncar, score_pair, tmcsr, PairScore};
pub use trim::{ring_conflicts, trim_mcs, TrimResult};
