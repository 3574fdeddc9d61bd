//! Molecular graphs for ligand comparison.
//!
//! Provides the molecule graph with hydrogen stripping and fragment
//! decomposition, ring perception, VF2 substructure search, time-bounded
//! maximum common substructure search, tetrahedral chirality, partial
//! charges, and SMILES / MOL / SDF / MOL2 readers.
//!
//! # Example
//!
//! ```
//! use alchemap_chem::{find_mcs, parse_smiles, McsParams};
//!
//! let ethylbenzene = parse_smiles("CCc1ccccc1").unwrap();
//! let toluene = parse_smiles("Cc1ccccc1").unwrap();
//!
//! let outcome = find_mcs(&ethylbenzene, &toluene, &McsParams::loose());
//! assert_eq!(outcome.pattern.atom_count(), 7);
//!
//! let mcs = outcome.pattern.to_molecule(&ethylbenzene, "mcs");
//! assert_eq!(mcs.heavy_atom_count(), 7);
//! ```

pub mod element;
pub mod gasteiger;
pub mod mcs;
pub mod mol2;
pub mod molecule;
pub mod ring;
pub mod sdf;
pub mod smiles;
pub mod stereo;
pub mod substructure;

pub use element::{element_by_number, element_by_symbol, Element};
pub use gasteiger::gasteiger_charges;
pub use mcs::{find_mcs, sanitize, sanitize_aromaticity, McsOutcome, McsParams, McsPattern};
pub use mol2::parse_mol2;
pub use molecule::{Bond, BondOrder, BondStereo, Chirality, MolAtom, Molecule};
pub use ring::{find_sssr, ring_atom_flags, ring_bond_flags, ring_counts};
pub use sdf::{parse_mol_block, parse_mol_v2000, parse_mol_v3000, parse_sdf};
pub use smiles::{parse_smiles, parse_smiles_named};
pub use stereo::{assign_chirality_from_coords, assign_rs, chiral_centers};
pub use substructure::{
    find_first_match_with, find_first_match_with_rings, find_substructure_matches,
    has_substructure, AtomCompare, BondCompare, MatchPolicy, SubstructureMatch,
};

#[cfg(feature = "std")]
pub use mol2::parse_mol2_file;
#[cfg(feature = "std")]
pub use sdf::parse_sdf_file;
