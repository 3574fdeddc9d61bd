//! Common substructure of a ligand pair, mapped back onto both ligands.

use std::collections::BTreeSet;

use alchemap_chem::{
    chiral_centers, find_first_match_with_rings, find_mcs, ring_bond_flags, ring_counts, sanitize,
    sanitize_aromaticity, McsParams, Molecule,
};
use alchemap_core::{AlchemapError, Annotated, Result};
use tracing::{debug, info, warn};

/// Per-atom ring membership counts of one molecule.
///
/// An atom shared by `k` rings of the smallest set of smallest rings has
/// count `k`; acyclic atoms have count 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingCounts(Vec<usize>);

impl RingCounts {
    pub fn new(mol: &Molecule) -> Self {
        RingCounts(ring_counts(mol))
    }

    /// Ring count of an atom; out-of-range atoms count as acyclic.
    pub fn get(&self, atom: usize) -> usize {
        self.0.get(atom).copied().unwrap_or(0)
    }

    pub fn is_ring_atom(&self, atom: usize) -> bool {
        self.get(atom) > 0
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

/// A ligand pair reduced to its common substructure.
///
/// All index maps refer to the hydrogen-stripped graphs held here, and are
/// aligned: entry `k` of `map_to_left`, `map_to_right` and `pair_map`
/// describe the same common atom.
#[derive(Debug, Clone)]
pub struct McsResult {
    /// Common substructure as a standalone graph.
    pub mcs: Molecule,
    /// Left molecule without explicit hydrogens.
    pub left: Molecule,
    /// Right molecule without explicit hydrogens.
    pub right: Molecule,
    /// `(mcs atom, left atom)` pairs.
    pub map_to_left: Vec<(usize, usize)>,
    /// `(mcs atom, right atom)` pairs.
    pub map_to_right: Vec<(usize, usize)>,
    /// `(left atom, right atom)` pairs through the shared common atom.
    pub pair_map: Vec<(usize, usize)>,
    pub left_rings: RingCounts,
    pub right_rings: RingCounts,
    pub mcs_rings: RingCounts,
    /// Common atoms that are stereocenters in either parent.
    pub chiral_mcs_atoms: BTreeSet<usize>,
    /// The search ran out of time and the common core may not be maximal.
    pub timed_out: bool,
}

impl McsResult {
    /// Left atom a common atom is mapped to.
    pub fn to_left(&self, mcs_atom: usize) -> Option<usize> {
        lookup(&self.map_to_left, mcs_atom)
    }

    /// Right atom a common atom is mapped to.
    pub fn to_right(&self, mcs_atom: usize) -> Option<usize> {
        lookup(&self.map_to_right, mcs_atom)
    }

    /// Whether a common atom is heavy in both parents.
    ///
    /// A kept isotope-labelled hydrogen can be matched to a heavy atom of
    /// the other ligand; such an atom is not counted as a heavy common atom.
    pub fn is_heavy_common(&self, mcs_atom: usize) -> bool {
        let heavy_in = |mol: &Molecule, atom: Option<usize>| {
            atom.and_then(|a| mol.atoms.get(a)).is_some_and(|a| a.is_heavy())
        };
        heavy_in(&self.left, self.to_left(mcs_atom)) && heavy_in(&self.right, self.to_right(mcs_atom))
    }

    /// Whether a common atom is aromatic in both parents.
    pub fn is_aromatic_common(&self, mcs_atom: usize) -> bool {
        let aromatic_in = |mol: &Molecule, atom: Option<usize>| {
            atom.and_then(|a| mol.atoms.get(a)).is_some_and(|a| a.is_aromatic)
        };
        aromatic_in(&self.left, self.to_left(mcs_atom))
            && aromatic_in(&self.right, self.to_right(mcs_atom))
    }

    /// Common atoms that are heavy in both parents.
    pub fn mcs_heavy_atoms(&self) -> usize {
        (0..self.mcs.atom_count())
            .filter(|&m| self.is_heavy_common(m))
            .count()
    }
}

fn lookup(map: &[(usize, usize)], key: usize) -> Option<usize> {
    map.iter().find(|&&(k, _)| k == key).map(|&(_, v)| v)
}

/// Compute the common substructure of two molecules and map it onto both.
///
/// Both inputs are compared without their explicit hydrogens. Fails with
/// [`AlchemapError::NoCommonSubstructure`] when nothing is shared,
/// [`AlchemapError::McsTimeout`] when the time budget ran out before any
/// atom pair was matched, and [`AlchemapError::InvalidMcsStructure`] when the
/// common substructure is not a valid molecule even after relaxing its
/// aromaticity. A timed-out search that did find atoms is used as is.
pub fn compute_mapping(left: &Molecule, right: &Molecule, params: &McsParams) -> Result<McsResult> {
    let left_noh = left.remove_hydrogens();
    let right_noh = right.remove_hydrogens();

    let outcome = find_mcs(&left_noh, &right_noh, params);
    if outcome.pattern.is_empty() {
        return Err(if outcome.timed_out {
            AlchemapError::McsTimeout {
                left: left.name().to_string(),
                right: right.name().to_string(),
                seconds: params.timeout.map_or(0.0, |t| t.as_secs_f64()),
            }
        } else {
            AlchemapError::NoCommonSubstructure {
                left: left.name().to_string(),
                right: right.name().to_string(),
            }
        });
    }
    if outcome.timed_out {
        warn!(
            left = left.name(),
            right = right.name(),
            atoms = outcome.pattern.atom_count(),
            "MCS search timed out, using best partial match"
        );
    }

    let pattern = outcome.pattern;
    let mut mcs = pattern.to_molecule(&left_noh, format!("{}~{}", left.name(), right.name()));
    if let Err(full) = sanitize(&mcs) {
        debug!(error = %full, "MCS failed validation, relaxing aromaticity");
        sanitize_aromaticity(&mut mcs)
            .map_err(|e| AlchemapError::InvalidMcsStructure(format!("{}: {e}", mcs.name())))?;
    }

    // The common graph is matched as a query whose ring bonds are those of
    // the parents, not its own possibly broken rings.
    let policy = params.policy;
    let unmatched = |side: &str| {
        AlchemapError::InvalidMcsStructure(format!(
            "{}: common substructure does not match the {side} molecule",
            mcs.name()
        ))
    };
    let self_match =
        find_first_match_with_rings(&mcs, &pattern.ring_bonds, &mcs, &pattern.ring_bonds, &policy)
            .ok_or_else(|| unmatched("common"))?
            .targets();
    let left_match = find_first_match_with_rings(
        &left_noh,
        &ring_bond_flags(&left_noh),
        &mcs,
        &pattern.ring_bonds,
        &policy,
    )
    .ok_or_else(|| unmatched("left"))?
    .targets();
    let right_match = find_first_match_with_rings(
        &right_noh,
        &ring_bond_flags(&right_noh),
        &mcs,
        &pattern.ring_bonds,
        &policy,
    )
    .ok_or_else(|| unmatched("right"))?
    .targets();

    let map_to_left: Vec<(usize, usize)> =
        self_match.iter().copied().zip(left_match.iter().copied()).collect();
    let map_to_right: Vec<(usize, usize)> =
        self_match.iter().copied().zip(right_match.iter().copied()).collect();
    let pair_map: Vec<(usize, usize)> = left_match.into_iter().zip(right_match).collect();

    let left_chiral: BTreeSet<usize> = chiral_centers(&left_noh).into_iter().collect();
    let right_chiral: BTreeSet<usize> = chiral_centers(&right_noh).into_iter().collect();
    let chiral_mcs_atoms: BTreeSet<usize> = map_to_left
        .iter()
        .filter(|(_, l)| left_chiral.contains(l))
        .chain(map_to_right.iter().filter(|(_, r)| right_chiral.contains(r)))
        .map(|&(m, _)| m)
        .collect();
    if !chiral_mcs_atoms.is_empty() {
        info!(
            left = left.name(),
            right = right.name(),
            count = chiral_mcs_atoms.len(),
            "chiral atoms detected in common substructure"
        );
    }

    Ok(McsResult {
        left_rings: RingCounts::new(&left_noh),
        right_rings: RingCounts::new(&right_noh),
        mcs_rings: RingCounts::new(&mcs),
        mcs,
        left: left_noh,
        right: right_noh,
        map_to_left,
        map_to_right,
        pair_map,
        chiral_mcs_atoms,
        timed_out: outcome.timed_out,
    })
}
