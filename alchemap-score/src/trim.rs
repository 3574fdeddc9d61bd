//! Trimming of ring and stereo conflicts from a common substructure.
//!
//! The trimmed graph keeps stable atom ids: id `k` is atom `k` of the
//! untrimmed common substructure, whatever was removed around it.

use std::collections::BTreeSet;

use alchemap_chem::{ring_atom_flags, Molecule};
use tracing::debug;

use crate::config::TrimMode;
use crate::mapping::McsResult;

/// A reduced copy of a common substructure.
#[derive(Debug, Clone)]
pub struct TrimResult {
    graph: Molecule,
    /// Stable id of each current atom, ascending.
    ids: Vec<usize>,
}

impl TrimResult {
    /// Start from the full common substructure.
    pub fn new(mcs: &Molecule) -> Self {
        TrimResult {
            graph: mcs.clone(),
            ids: (0..mcs.atom_count()).collect(),
        }
    }

    pub fn graph(&self) -> &Molecule {
        &self.graph
    }

    /// Stable ids of the remaining atoms.
    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    pub fn contains(&self, id: usize) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn atom_count(&self) -> usize {
        self.ids.len()
    }

    pub fn heavy_atom_count(&self) -> usize {
        self.graph.heavy_atom_count()
    }

    fn index_of(&self, id: usize) -> Option<usize> {
        self.ids.binary_search(&id).ok()
    }

    /// Ids of atoms that are ring members in the current graph.
    pub fn ring_ids(&self) -> BTreeSet<usize> {
        ring_atom_flags(&self.graph)
            .into_iter()
            .zip(&self.ids)
            .filter_map(|(in_ring, &id)| in_ring.then_some(id))
            .collect()
    }

    /// Ids bonded to `id` in the current graph.
    pub fn neighbor_ids(&self, id: usize) -> Vec<usize> {
        match self.index_of(id) {
            Some(idx) => self.graph.neighbors(idx).into_iter().map(|n| self.ids[n]).collect(),
            None => Vec::new(),
        }
    }

    /// Connected fragments as id lists, ordered by their lowest id.
    pub fn fragments(&self) -> Vec<Vec<usize>> {
        self.graph
            .connected_components()
            .into_iter()
            .map(|component| {
                let mut ids: Vec<usize> = component.into_iter().map(|i| self.ids[i]).collect();
                ids.sort_unstable();
                ids
            })
            .collect()
    }

    /// Drop the given ids; unknown ids are ignored.
    pub fn remove(&self, drop: &BTreeSet<usize>) -> TrimResult {
        let keep: Vec<usize> = self
            .ids
            .iter()
            .enumerate()
            .filter(|(_, id)| !drop.contains(id))
            .map(|(idx, _)| idx)
            .collect();
        self.keep_indices(&keep)
    }

    /// Keep only the largest fragment. The first fragment wins ties.
    pub fn largest_fragment(&self) -> TrimResult {
        let mut best: Vec<usize> = Vec::new();
        for fragment in self.fragments() {
            if fragment.len() > best.len() {
                best = fragment;
            }
        }
        let keep: Vec<usize> = best.iter().filter_map(|&id| self.index_of(id)).collect();
        self.keep_indices(&keep)
    }

    fn keep_indices(&self, keep: &[usize]) -> TrimResult {
        TrimResult {
            graph: self.graph.induced_subgraph(keep),
            ids: keep.iter().map(|&i| self.ids[i]).collect(),
        }
    }
}

/// Common atoms whose ring count disagrees with a ring-bound parent atom.
///
/// In [`TrimMode::Loose`] a common atom is never in conflict when it is
/// aromatic in both parents and still on a ring of the common substructure.
pub fn ring_conflicts(result: &McsResult, mode: TrimMode) -> BTreeSet<usize> {
    let mut conflicts = BTreeSet::new();
    for (&(m, l), &(_, r)) in result.map_to_left.iter().zip(&result.map_to_right) {
        let mcs_rc = result.mcs_rings.get(m);
        let left_rc = result.left_rings.get(l);
        let right_rc = result.right_rings.get(r);

        let broken = (left_rc > 0 && left_rc != mcs_rc) || (right_rc > 0 && right_rc != mcs_rc);
        let tolerated = mode == TrimMode::Loose
            && result.is_aromatic_common(m)
            && result.mcs_rings.is_ring_atom(m);
        if broken && !tolerated {
            conflicts.insert(m);
        }
    }
    conflicts
}

/// Remove broken-ring atoms and unstable stereocenters from the common
/// substructure and keep the largest surviving fragment.
///
/// 1. Atoms in ring conflict with a parent are removed.
/// 2. Atoms that were ring atoms of the common substructure but no longer
///    lie on a ring are removed.
/// 3. Only the largest fragment is kept.
/// 4. A chiral atom inside a ring takes its non-ring neighbors with it; a
///    chiral atom outside any ring is removed itself.
/// 5. Only the largest fragment is kept.
///
/// Returns as soon as the graph becomes empty.
pub fn trim_mcs(result: &McsResult, mode: TrimMode) -> TrimResult {
    let full = TrimResult::new(&result.mcs);

    let conflicts = ring_conflicts(result, mode);
    let trimmed = full.remove(&conflicts);
    if trimmed.is_empty() {
        return trimmed;
    }

    let ring_now = trimmed.ring_ids();
    let opened: BTreeSet<usize> = trimmed
        .ids()
        .iter()
        .copied()
        .filter(|&id| result.mcs_rings.is_ring_atom(id) && !ring_now.contains(&id))
        .collect();
    let trimmed = trimmed.remove(&opened);
    if trimmed.is_empty() {
        return trimmed;
    }
    let trimmed = trimmed.largest_fragment();
    debug!(
        conflicts = conflicts.len(),
        opened = opened.len(),
        left = trimmed.atom_count(),
        "ring conflicts trimmed"
    );

    let ring_ids = trimmed.ring_ids();
    let mut unstable = BTreeSet::new();
    for &id in result.chiral_mcs_atoms.iter().filter(|&&id| trimmed.contains(id)) {
        if ring_ids.contains(&id) {
            unstable.extend(trimmed.neighbor_ids(id).into_iter().filter(|n| !ring_ids.contains(n)));
        } else {
            unstable.insert(id);
        }
    }
    let trimmed = trimmed.remove(&unstable);
    if trimmed.is_empty() {
        return trimmed;
    }
    trimmed.largest_fragment()
}
