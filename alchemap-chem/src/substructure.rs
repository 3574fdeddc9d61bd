//! Subgraph matching of a pattern molecule onto a target.
//!
//! Backtracking in the style of VF2: pattern atoms are placed in
//! breadth-first order so every atom after the first of its component has a
//! placed neighbor, and its candidates are the free target neighbors of that
//! neighbor's image. Matches are monomorphisms: every pattern bond needs a
//! target bond, extra target bonds are allowed.

use std::collections::BTreeMap;
use std::ops::ControlFlow;

use crate::molecule::{BondOrder, MolAtom, Molecule};
use crate::ring::ring_bond_flags;

/// One embedding of the pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct SubstructureMatch {
    /// `(pattern atom, target atom)`, sorted by pattern atom.
    pub atom_mapping: Vec<(usize, usize)>,
}

impl SubstructureMatch {
    /// Images of the pattern atoms, indexed by pattern atom.
    pub fn targets(&self) -> Vec<usize> {
        self.atom_mapping.iter().map(|&(_, t)| t).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AtomCompare {
    /// Equal atomic numbers.
    #[default]
    Elements,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BondCompare {
    /// Equal bond orders; aromatic is its own order.
    #[default]
    Order,
    Any,
}

/// Which atom and bond pairs may be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchPolicy {
    pub atoms: AtomCompare,
    pub bonds: BondCompare,
    /// A ring bond may only match a ring bond, a chain bond a chain bond.
    pub ring_matches_ring_only: bool,
}

impl MatchPolicy {
    /// Topology only: any element, any order, ring bonds stay ring bonds.
    pub fn loose() -> Self {
        MatchPolicy {
            atoms: AtomCompare::Any,
            bonds: BondCompare::Any,
            ring_matches_ring_only: true,
        }
    }

    pub fn atoms_match(&self, a: &MolAtom, b: &MolAtom) -> bool {
        self.atoms == AtomCompare::Any || a.atomic_number == b.atomic_number
    }

    pub fn bonds_match(&self, a: BondOrder, b: BondOrder) -> bool {
        self.bonds == BondCompare::Any || a == b
    }
}

/// Whether `pattern` embeds in `target` with elements and bond orders equal.
pub fn has_substructure(target: &Molecule, pattern: &Molecule) -> bool {
    find_first_match_with(target, pattern, &MatchPolicy::default()).is_some()
}

/// Every embedding of `pattern` in `target` with elements and bond orders
/// equal. Symmetric images are reported separately.
pub fn find_substructure_matches(target: &Molecule, pattern: &Molecule) -> Vec<SubstructureMatch> {
    let target_rings = ring_bond_flags(target);
    let pattern_rings = ring_bond_flags(pattern);
    let mut found = Vec::new();
    Matcher::new(target, &target_rings, pattern, &pattern_rings, MatchPolicy::default()).run(
        &mut |m| {
            found.push(m);
            ControlFlow::Continue(())
        },
    );
    found
}

/// First embedding under `policy`, in search order.
pub fn find_first_match_with(
    target: &Molecule,
    pattern: &Molecule,
    policy: &MatchPolicy,
) -> Option<SubstructureMatch> {
    let target_rings = ring_bond_flags(target);
    let pattern_rings = ring_bond_flags(pattern);
    find_first_match_with_rings(target, &target_rings, pattern, &pattern_rings, policy)
}

/// [`find_first_match_with`] with ring-bond flags supplied by the caller.
///
/// A fragment cut out of a molecule can carry the ring flags of its parent,
/// so broken rings still only match ring bonds.
pub fn find_first_match_with_rings(
    target: &Molecule,
    target_ring_bonds: &[bool],
    pattern: &Molecule,
    pattern_ring_bonds: &[bool],
    policy: &MatchPolicy,
) -> Option<SubstructureMatch> {
    let mut first = None;
    Matcher::new(target, target_ring_bonds, pattern, pattern_ring_bonds, *policy).run(&mut |m| {
        first = Some(m);
        ControlFlow::Break(())
    });
    first
}

struct Matcher<'a> {
    target: &'a Molecule,
    target_rings: &'a [bool],
    pattern: &'a Molecule,
    pattern_rings: &'a [bool],
    policy: MatchPolicy,
    /// Pattern atoms in placement order, each with an earlier neighbor.
    plan: Vec<(usize, Option<usize>)>,
    image: Vec<Option<usize>>,
    taken: Vec<bool>,
}

impl<'a> Matcher<'a> {
    fn new(
        target: &'a Molecule,
        target_rings: &'a [bool],
        pattern: &'a Molecule,
        pattern_rings: &'a [bool],
        policy: MatchPolicy,
    ) -> Self {
        let mut plan = Vec::with_capacity(pattern.atom_count());
        for component in pattern.connected_components() {
            let mut placed = Vec::with_capacity(component.len());
            for atom in component {
                let anchor = pattern
                    .neighbors(atom)
                    .into_iter()
                    .find(|n| placed.contains(n));
                placed.push(atom);
                plan.push((atom, anchor));
            }
        }
        Matcher {
            target,
            target_rings,
            pattern,
            pattern_rings,
            policy,
            plan,
            image: vec![None; pattern.atom_count()],
            taken: vec![false; target.atom_count()],
        }
    }

    fn run(&mut self, emit: &mut dyn FnMut(SubstructureMatch) -> ControlFlow<()>) {
        if self.could_fit() {
            let _ = self.place(0, emit);
        }
    }

    /// Size and element histogram checks.
    fn could_fit(&self) -> bool {
        if self.pattern.atom_count() > self.target.atom_count()
            || self.pattern.bond_count() > self.target.bond_count()
        {
            return false;
        }
        if self.policy.atoms == AtomCompare::Any {
            return true;
        }
        let mut spare: BTreeMap<u8, isize> = BTreeMap::new();
        for atom in &self.target.atoms {
            *spare.entry(atom.atomic_number).or_default() += 1;
        }
        for atom in &self.pattern.atoms {
            *spare.entry(atom.atomic_number).or_default() -= 1;
        }
        spare.values().all(|&n| n >= 0)
    }

    fn place(
        &mut self,
        step: usize,
        emit: &mut dyn FnMut(SubstructureMatch) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        let Some(&(atom, anchor)) = self.plan.get(step) else {
            let atom_mapping = self
                .image
                .iter()
                .enumerate()
                .filter_map(|(p, t)| t.map(|t| (p, t)))
                .collect();
            return emit(SubstructureMatch { atom_mapping });
        };

        let candidates: Vec<usize> = match anchor.and_then(|a| self.image[a]) {
            Some(anchor_image) => self.target.neighbors(anchor_image),
            None => (0..self.target.atom_count()).collect(),
        };
        for candidate in candidates {
            if self.taken[candidate] || !self.compatible(atom, candidate) {
                continue;
            }
            self.image[atom] = Some(candidate);
            self.taken[candidate] = true;
            let flow = self.place(step + 1, emit);
            self.image[atom] = None;
            self.taken[candidate] = false;
            flow?;
        }
        ControlFlow::Continue(())
    }

    /// Atom match plus a compatible target bond for every placed neighbor.
    fn compatible(&self, atom: usize, candidate: usize) -> bool {
        if !self
            .policy
            .atoms_match(&self.pattern.atoms[atom], &self.target.atoms[candidate])
        {
            return false;
        }
        self.pattern.adjacency[atom].iter().all(|&(neighbor, pattern_bond)| {
            let Some(neighbor_image) = self.image[neighbor] else {
                return true;
            };
            self.target.adjacency[candidate]
                .iter()
                .find(|&&(t, _)| t == neighbor_image)
                .is_some_and(|&(_, target_bond)| {
                    self.policy.bonds_match(
                        self.pattern.bonds[pattern_bond].order,
                        self.target.bonds[target_bond].order,
                    ) && (!self.policy.ring_matches_ring_only
                        || self.pattern_rings[pattern_bond] == self.target_rings[target_bond])
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::parse_smiles;

    fn mol(smiles: &str) -> Molecule {
        parse_smiles(smiles).unwrap()
    }

    #[test]
    fn benzene_in_phenol() {
        let phenol = mol("Oc1ccccc1");
        let benzene = mol("c1ccccc1");
        assert!(has_substructure(&phenol, &benzene));
        // Six rotations in two directions.
        assert_eq!(find_substructure_matches(&phenol, &benzene).len(), 12);
    }

    #[test]
    fn aromatic_does_not_match_single() {
        assert!(!has_substructure(&mol("C1CCCCC1"), &mol("c1ccccc1")));
    }

    #[test]
    fn element_histogram_rejects_early() {
        assert!(!has_substructure(&mol("CCCC"), &mol("CCO")));
        assert!(has_substructure(&mol("CCCO"), &mol("CCO")));
    }

    #[test]
    fn loose_policy_matches_across_elements_and_orders() {
        let m = find_first_match_with(&mol("C1CCCCC1"), &mol("c1ccncc1"), &MatchPolicy::loose())
            .unwrap();
        assert_eq!(m.atom_mapping.len(), 6);
    }

    #[test]
    fn ring_only_rejects_chain_onto_ring() {
        let chain = mol("CCC");
        let benzene = mol("c1ccccc1");
        assert!(find_first_match_with(&benzene, &chain, &MatchPolicy::loose()).is_none());
        let relaxed = MatchPolicy {
            ring_matches_ring_only: false,
            ..MatchPolicy::loose()
        };
        assert!(find_first_match_with(&benzene, &chain, &relaxed).is_some());
    }

    #[test]
    fn supplied_ring_flags_override_perception() {
        let chain = mol("CCC");
        let benzene = mol("c1ccccc1");
        let m = find_first_match_with_rings(
            &benzene,
            &ring_bond_flags(&benzene),
            &chain,
            &[true, true],
            &MatchPolicy::loose(),
        );
        assert_eq!(m.map(|m| m.targets()), Some(vec![0, 1, 2]));
    }

    #[test]
    fn disconnected_pattern() {
        let m = find_first_match_with(&mol("CCOCC"), &mol("C.O"), &MatchPolicy::default()).unwrap();
        assert_eq!(m.targets(), vec![0, 2]);
    }

    #[test]
    fn fused_rings_hold_two_benzenes() {
        let matches = find_substructure_matches(&mol("c1ccc2ccccc2c1"), &mol("c1ccccc1"));
        assert_eq!(matches.len(), 24);
    }
}
