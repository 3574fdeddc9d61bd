//! Ring perception.
//!
//! Ring bonds are the bonds that are not bridges of the molecule graph. The
//! ring set is a minimum cycle basis (SSSR): the shortest cycle through each
//! ring bond is a candidate, and candidates are taken smallest first as long
//! as they are independent of the rings already chosen.

use std::collections::VecDeque;

use crate::molecule::Molecule;

/// Smallest set of smallest rings.
///
/// Each ring lists its atoms in walking order, starting at the lowest index.
/// Rings are sorted by size, then lexicographically.
pub fn find_sssr(mol: &Molecule) -> Vec<Vec<usize>> {
    let components = mol.connected_components().len();
    let cyclomatic = (mol.bond_count() + components).saturating_sub(mol.atom_count());
    if cyclomatic == 0 {
        return Vec::new();
    }

    let ring_bonds = ring_bond_flags(mol);
    let mut candidates: Vec<Vec<usize>> = Vec::new();
    for (idx, _) in ring_bonds.iter().enumerate().filter(|(_, &r)| r) {
        if let Some(cycle) = shortest_cycle_through(mol, idx, &ring_bonds) {
            let cycle = canonical_cycle(cycle);
            if !candidates.contains(&cycle) {
                candidates.push(cycle);
            }
        }
    }
    candidates.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

    let mut basis = Gf2Basis::new(mol.bond_count());
    let mut rings = Vec::with_capacity(cyclomatic);
    for cycle in candidates {
        if rings.len() == cyclomatic {
            break;
        }
        if basis.insert(cycle_bonds(mol, &cycle)) {
            rings.push(cycle);
        }
    }
    rings
}

/// How many SSSR rings contain each atom.
pub fn ring_counts(mol: &Molecule) -> Vec<usize> {
    let mut counts = vec![0; mol.atom_count()];
    for atom in find_sssr(mol).into_iter().flatten() {
        counts[atom] += 1;
    }
    counts
}

/// Atoms with at least one ring bond.
///
/// An atom that only links two rings through chain bonds is not a ring atom.
pub fn ring_atom_flags(mol: &Molecule) -> Vec<bool> {
    let mut flags = vec![false; mol.atom_count()];
    for (bond, _) in mol.bonds.iter().zip(ring_bond_flags(mol)).filter(|(_, r)| *r) {
        flags[bond.atom1] = true;
        flags[bond.atom2] = true;
    }
    flags
}

/// `true` for every bond that lies on a cycle.
pub fn ring_bond_flags(mol: &Molecule) -> Vec<bool> {
    let mut walk = BridgeWalk::new(mol);
    for root in 0..mol.atom_count() {
        walk.visit_component(root);
    }
    walk.on_cycle
}

/// Iterative depth-first bridge search (Tarjan low-link).
struct BridgeWalk<'a> {
    mol: &'a Molecule,
    order: Vec<Option<usize>>,
    low: Vec<usize>,
    clock: usize,
    on_cycle: Vec<bool>,
}

impl<'a> BridgeWalk<'a> {
    fn new(mol: &'a Molecule) -> Self {
        Self {
            mol,
            order: vec![None; mol.atom_count()],
            low: vec![0; mol.atom_count()],
            clock: 0,
            on_cycle: vec![true; mol.bond_count()],
        }
    }

    fn discover(&mut self, atom: usize) -> usize {
        let t = self.clock;
        self.order[atom] = Some(t);
        self.low[atom] = t;
        self.clock += 1;
        t
    }

    fn visit_component(&mut self, root: usize) {
        if self.order[root].is_some() {
            return;
        }
        self.discover(root);
        // (atom, bond used to reach it, next adjacency slot)
        let mut frames: Vec<(usize, Option<usize>, usize)> = vec![(root, None, 0)];

        while let Some(frame) = frames.last_mut() {
            let (atom, via, slot) = *frame;
            frame.2 += 1;
            let Some(&(next, bond)) = self.mol.adjacency[atom].get(slot) else {
                frames.pop();
                if let (Some(&(parent, _, _)), Some(via)) = (frames.last(), via) {
                    self.low[parent] = self.low[parent].min(self.low[atom]);
                    if self.order[parent].is_some_and(|t| self.low[atom] > t) {
                        self.on_cycle[via] = false;
                    }
                }
                continue;
            };
            if Some(bond) == via {
                continue;
            }
            match self.order[next] {
                Some(seen) => self.low[atom] = self.low[atom].min(seen),
                None => {
                    self.discover(next);
                    frames.push((next, Some(bond), 0));
                }
            }
        }
    }
}

/// Shortest cycle containing `bond`: a breadth-first path between its ends
/// that does not use the bond itself and stays on ring bonds.
fn shortest_cycle_through(mol: &Molecule, bond: usize, ring_bonds: &[bool]) -> Option<Vec<usize>> {
    let (from, to) = (mol.bonds[bond].atom1, mol.bonds[bond].atom2);
    let mut came_from: Vec<Option<usize>> = vec![None; mol.atom_count()];
    came_from[from] = Some(from);
    let mut queue = VecDeque::from([from]);

    while let Some(atom) = queue.pop_front() {
        if atom == to {
            let mut path = vec![to];
            let mut cursor = to;
            while cursor != from {
                cursor = came_from[cursor]?;
                path.push(cursor);
            }
            return Some(path);
        }
        for &(next, via) in &mol.adjacency[atom] {
            if via != bond && ring_bonds[via] && came_from[next].is_none() {
                came_from[next] = Some(atom);
                queue.push_back(next);
            }
        }
    }
    None
}

/// Rotate the cycle to start at its lowest atom and walk toward the smaller
/// of that atom's two ring neighbors.
fn canonical_cycle(mut cycle: Vec<usize>) -> Vec<usize> {
    if let Some(start) = cycle.iter().enumerate().min_by_key(|&(_, &a)| a).map(|(i, _)| i) {
        cycle.rotate_left(start);
    }
    if cycle.len() > 2 && cycle[cycle.len() - 1] < cycle[1] {
        cycle[1..].reverse();
    }
    cycle
}

fn cycle_bonds(mol: &Molecule, cycle: &[usize]) -> Vec<usize> {
    cycle
        .iter()
        .zip(cycle.iter().cycle().skip(1))
        .filter_map(|(&a, &b)| {
            mol.adjacency[a]
                .iter()
                .find(|&&(n, _)| n == b)
                .map(|&(_, bond)| bond)
        })
        .collect()
}

/// Cycles as bond-incidence vectors over GF(2), kept in row-echelon form.
struct Gf2Basis {
    words: usize,
    rows: Vec<(usize, Vec<u64>)>,
}

impl Gf2Basis {
    fn new(bonds: usize) -> Self {
        Self { words: bonds.div_ceil(64).max(1), rows: Vec::new() }
    }

    /// Add a cycle; `false` when it is a sum of cycles already present.
    fn insert(&mut self, bonds: Vec<usize>) -> bool {
        let mut v = vec![0u64; self.words];
        for b in bonds {
            v[b / 64] ^= 1 << (b % 64);
        }
        for (pivot, row) in &self.rows {
            if v[pivot / 64] >> (pivot % 64) & 1 == 1 {
                v.iter_mut().zip(row).for_each(|(x, r)| *x ^= r);
            }
        }
        let Some(pivot) = v
            .iter()
            .enumerate()
            .find(|(_, w)| **w != 0)
            .map(|(i, w)| i * 64 + w.trailing_zeros() as usize)
        else {
            return false;
        };
        // Keep older rows reduced against the new pivot.
        for (_, row) in &mut self.rows {
            if row[pivot / 64] >> (pivot % 64) & 1 == 1 {
                row.iter_mut().zip(&v).for_each(|(x, r)| *x ^= r);
            }
        }
        self.rows.push((pivot, v));
        true
    }
}
