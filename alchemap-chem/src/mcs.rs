//! Time-bounded maximum common substructure search.
//!
//! Branch and bound over atom pairs with partition refinement: unmapped
//! atoms of both molecules are grouped into bidomains of mutually compatible
//! candidates, and the sum of the smaller side of every bidomain bounds how
//! far the current mapping can still grow. The search is exhaustive within
//! its time budget; on timeout the best mapping seen so far is returned and
//! flagged.

use std::time::{Duration, Instant};

use alchemap_core::{AlchemapError, Result};

use crate::element::element_by_number;
use crate::molecule::{Bond, BondOrder, MolAtom, Molecule};
use crate::ring::{ring_atom_flags, ring_bond_flags};
use crate::substructure::{AtomCompare, BondCompare, MatchPolicy};

/// Nodes expanded between deadline checks.
const DEADLINE_STRIDE: u64 = 256;

/// Options for [`find_mcs`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct McsParams {
    /// Atom and bond compatibility, including ring-only bond matching.
    pub policy: MatchPolicy,
    /// Wall-clock budget for one search; `None` searches to completion.
    pub timeout: Option<Duration>,
}

impl McsParams {
    /// Any element and any bond order match, ring bonds only onto ring bonds,
    /// partial rings allowed, 20 second budget.
    pub fn loose() -> Self {
        McsParams {
            policy: MatchPolicy::loose(),
            timeout: Some(Duration::from_secs(20)),
        }
    }

    /// Same policy with a budget in (possibly fractional) seconds.
    ///
    /// The budget must be positive and finite; anything else is
    /// [`AlchemapError::InvalidInput`].
    pub fn with_timeout_secs(mut self, seconds: f64) -> Result<Self> {
        let budget = Duration::try_from_secs_f64(seconds)
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or_else(|| {
                AlchemapError::InvalidInput(format!(
                    "MCS time budget must be a positive number of seconds, got {seconds}"
                ))
            })?;
        self.timeout = Some(budget);
        Ok(self)
    }
}

impl Default for McsParams {
    fn default() -> Self {
        Self::loose()
    }
}

/// A common substructure as index lists into both parent molecules.
///
/// Pattern atom `k` is `left_atoms[k]` in the left molecule and
/// `right_atoms[k]` in the right one. Atoms are listed in growth order, so
/// every atom after the first is bonded to an earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct McsPattern {
    pub left_atoms: Vec<usize>,
    pub right_atoms: Vec<usize>,
    /// Left-molecule bond indices of the pattern bonds, ascending.
    pub left_bonds: Vec<usize>,
    /// Ring membership of each pattern bond in the parents.
    pub ring_bonds: Vec<bool>,
}

impl McsPattern {
    pub fn atom_count(&self) -> usize {
        self.left_atoms.len()
    }

    pub fn bond_count(&self) -> usize {
        self.left_bonds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left_atoms.is_empty()
    }

    /// Materialize the pattern as a molecule, taking atom and bond
    /// attributes from `left`.
    ///
    /// Pattern atoms carry no hydrogens and no stereo; bond `i` of the result
    /// corresponds to `ring_bonds[i]`.
    pub fn to_molecule(&self, left: &Molecule, name: impl Into<String>) -> Molecule {
        let mut position = vec![usize::MAX; left.atom_count()];
        for (k, &l) in self.left_atoms.iter().enumerate() {
            position[l] = k;
        }

        let atoms = self
            .left_atoms
            .iter()
            .map(|&l| {
                let mut atom = left.atoms[l].clone();
                atom.implicit_hydrogens = 0;
                atom.isotope = None;
                atom.chirality = Default::default();
                atom
            })
            .collect();

        let bonds = self
            .left_bonds
            .iter()
            .map(|&bi| {
                let source = &left.bonds[bi];
                Bond {
                    atom1: position[source.atom1],
                    atom2: position[source.atom2],
                    order: source.order,
                    is_aromatic: source.is_aromatic,
                    stereo: Default::default(),
                }
            })
            .collect();

        Molecule::new(name.into(), atoms, bonds)
    }
}

/// Result of [`find_mcs`].
#[derive(Debug, Clone, Default)]
pub struct McsOutcome {
    pub pattern: McsPattern,
    /// The budget ran out; `pattern` is the best found before that.
    pub timed_out: bool,
}

/// Find a maximum connected common substructure of `left` and `right`.
///
/// The common subgraph is induced: two mapped atoms are bonded in one
/// molecule exactly when they are bonded in the other, by bonds of the same
/// class (ring or chain under ring-only matching, and the same order when
/// orders are compared). Larger atom counts win; among equals the first
/// mapping found is kept.
///
/// # Example
///
/// ```
/// use alchemap_chem::{find_mcs, parse_smiles, McsParams};
///
/// let toluene = parse_smiles("Cc1ccccc1").unwrap();
/// let phenol = parse_smiles("Oc1ccccc1").unwrap();
/// let outcome = find_mcs(&toluene, &phenol, &McsParams::loose());
/// assert_eq!(outcome.pattern.atom_count(), 7);
/// assert!(!outcome.timed_out);
/// ```
pub fn find_mcs(left: &Molecule, right: &Molecule, params: &McsParams) -> McsOutcome {
    let mut search = McsSearch::new(left, right, params);
    let domains = search.initial_domains();
    search.expand(domains);
    McsOutcome {
        pattern: search.pattern(),
        timed_out: search.timed_out,
    }
}

/// Left and right atoms that are still interchangeable: same atom label and
/// the same bond class towards every mapped pair.
#[derive(Debug, Clone)]
struct Bidomain {
    left: Vec<usize>,
    right: Vec<usize>,
    /// Bonded to at least one mapped atom.
    adjacent: bool,
}

impl Bidomain {
    fn bound(&self) -> usize {
        self.left.len().min(self.right.len())
    }
}

struct McsSearch<'a> {
    left: &'a Molecule,
    right: &'a Molecule,
    left_ring_bonds: Vec<bool>,
    left_edges: Vec<Vec<u8>>,
    right_edges: Vec<Vec<u8>>,
    policy: MatchPolicy,
    deadline: Option<Instant>,
    nodes: u64,
    timed_out: bool,
    current: Vec<(usize, usize)>,
    best: Vec<(usize, usize)>,
    atom_limit: usize,
}

impl<'a> McsSearch<'a> {
    fn new(left: &'a Molecule, right: &'a Molecule, params: &McsParams) -> Self {
        let left_ring_bonds = ring_bond_flags(left);
        let right_ring_bonds = ring_bond_flags(right);
        McsSearch {
            left,
            right,
            left_edges: edge_labels(left, &left_ring_bonds, &params.policy),
            right_edges: edge_labels(right, &right_ring_bonds, &params.policy),
            left_ring_bonds,
            policy: params.policy,
            deadline: params.timeout.map(|t| Instant::now() + t),
            nodes: 0,
            timed_out: false,
            current: Vec::new(),
            best: Vec::new(),
            atom_limit: left.atom_count().min(right.atom_count()),
        }
    }

    /// One bidomain per atom label, in label order.
    fn initial_domains(&self) -> Vec<Bidomain> {
        let label = |atom: &MolAtom| match self.policy.atoms {
            AtomCompare::Elements => atom.atomic_number,
            AtomCompare::Any => 0,
        };

        let mut labels: Vec<u8> = self.left.atoms.iter().map(label).collect();
        labels.sort_unstable();
        labels.dedup();

        labels
            .into_iter()
            .filter_map(|value| {
                let left: Vec<usize> = (0..self.left.atom_count())
                    .filter(|&i| label(&self.left.atoms[i]) == value)
                    .collect();
                let right: Vec<usize> = (0..self.right.atom_count())
                    .filter(|&i| label(&self.right.atoms[i]) == value)
                    .collect();
                (!right.is_empty()).then_some(Bidomain { left, right, adjacent: false })
            })
            .collect()
    }

    fn expand(&mut self, mut domains: Vec<Bidomain>) {
        if self.tick() {
            return;
        }
        if self.current.len() > self.best.len() {
            self.best = self.current.clone();
        }
        if self.best.len() == self.atom_limit {
            return;
        }

        let bound = self.current.len() + domains.iter().map(Bidomain::bound).sum::<usize>();
        if bound <= self.best.len() {
            return;
        }

        let Some(di) = self.select_domain(&domains) else {
            return;
        };

        let Some(pos) = domains[di]
            .left
            .iter()
            .enumerate()
            .min_by_key(|&(_, &v)| v)
            .map(|(pos, _)| pos)
        else {
            return;
        };
        let v = domains[di].left.swap_remove(pos);

        let mut candidates = domains[di].right.clone();
        candidates.sort_unstable();
        for w in candidates {
            let refined = self.refine(&domains, di, v, w);
            self.current.push((v, w));
            self.expand(refined);
            self.current.pop();
            if self.timed_out || self.best.len() == self.atom_limit {
                return;
            }
        }

        // Leave `v` unmapped.
        if domains[di].left.is_empty() {
            domains.remove(di);
        }
        self.expand(domains);
    }

    /// Smallest bidomain (by its larger side) among those the mapping may
    /// grow into, lowest left atom on ties. Once a pair is mapped only
    /// bidomains bonded to the mapping qualify.
    fn select_domain(&self, domains: &[Bidomain]) -> Option<usize> {
        let connected_only = !self.current.is_empty();
        domains
            .iter()
            .enumerate()
            .filter(|(_, d)| !d.left.is_empty() && !d.right.is_empty())
            .filter(|(_, d)| !connected_only || d.adjacent)
            .min_by_key(|(_, d)| {
                (
                    d.left.len().max(d.right.len()),
                    d.left.iter().copied().min().unwrap_or(usize::MAX),
                )
            })
            .map(|(i, _)| i)
    }

    /// Split every bidomain by bond class towards the new pair `(v, w)`.
    fn refine(&self, domains: &[Bidomain], di: usize, v: usize, w: usize) -> Vec<Bidomain> {
        let mut refined = Vec::new();
        for (i, domain) in domains.iter().enumerate() {
            let right: Vec<usize> = if i == di {
                domain.right.iter().copied().filter(|&x| x != w).collect()
            } else {
                domain.right.clone()
            };

            let mut classes: Vec<u8> = domain.left.iter().map(|&u| self.left_edges[v][u]).collect();
            classes.sort_unstable();
            classes.dedup();

            for class in classes {
                let left_part: Vec<usize> = domain
                    .left
                    .iter()
                    .copied()
                    .filter(|&u| self.left_edges[v][u] == class)
                    .collect();
                let right_part: Vec<usize> = right
                    .iter()
                    .copied()
                    .filter(|&x| self.right_edges[w][x] == class)
                    .collect();
                if !right_part.is_empty() {
                    refined.push(Bidomain {
                        left: left_part,
                        right: right_part,
                        adjacent: domain.adjacent || class != 0,
                    });
                }
            }
        }
        refined
    }

    /// Count a node; true once the deadline has passed.
    fn tick(&mut self) -> bool {
        self.nodes += 1;
        if !self.timed_out && self.nodes % DEADLINE_STRIDE == 1 {
            if let Some(deadline) = self.deadline {
                self.timed_out = Instant::now() >= deadline;
            }
        }
        self.timed_out
    }

    fn pattern(&self) -> McsPattern {
        let mut position = vec![usize::MAX; self.left.atom_count()];
        for (k, &(l, _)) in self.best.iter().enumerate() {
            position[l] = k;
        }

        let (left_bonds, ring_bonds) = self
            .left
            .bonds
            .iter()
            .enumerate()
            .filter(|(_, b)| position[b.atom1] != usize::MAX && position[b.atom2] != usize::MAX)
            .map(|(bi, _)| (bi, self.left_ring_bonds[bi]))
            .unzip();

        McsPattern {
            left_atoms: self.best.iter().map(|&(l, _)| l).collect(),
            right_atoms: self.best.iter().map(|&(_, r)| r).collect(),
            left_bonds,
            ring_bonds,
        }
    }
}

/// Dense bond-class matrix: 0 for no bond, otherwise a class that must be
/// equal on both sides for two bonds to correspond.
fn edge_labels(mol: &Molecule, ring_bonds: &[bool], policy: &MatchPolicy) -> Vec<Vec<u8>> {
    let n = mol.atom_count();
    let mut labels = vec![vec![0u8; n]; n];
    for (bi, bond) in mol.bonds.iter().enumerate() {
        let mut class = 1u8;
        if policy.ring_matches_ring_only && ring_bonds[bi] {
            class += 1;
        }
        if policy.bonds == BondCompare::Order {
            class += 2 * match bond.order {
                BondOrder::Single => 0,
                BondOrder::Double => 1,
                BondOrder::Triple => 2,
                BondOrder::Aromatic => 3,
            };
        }
        labels[bond.atom1][bond.atom2] = class;
        labels[bond.atom2][bond.atom1] = class;
    }
    labels
}

/// Validate a materialized pattern.
///
/// Aromatic atoms and bonds must lie on a ring of the pattern itself and no
/// atom may exceed the explicit valence its element allows at its formal
/// charge.
pub fn sanitize(mol: &Molecule) -> Result<()> {
    let ring_atoms = ring_atom_flags(mol);
    let ring_bonds = ring_bond_flags(mol);

    if let Some(idx) = (0..mol.atom_count()).find(|&i| mol.atoms[i].is_aromatic && !ring_atoms[i]) {
        return Err(AlchemapError::InvalidMcsStructure(format!(
            "non-ring atom {idx} marked aromatic"
        )));
    }
    if let Some(idx) = (0..mol.bond_count()).find(|&i| mol.bonds[i].is_aromatic && !ring_bonds[i]) {
        return Err(AlchemapError::InvalidMcsStructure(format!(
            "non-ring bond {idx} marked aromatic"
        )));
    }
    check_valences(mol)
}

/// Relaxed repair: clear aromaticity outside rings, then check valences.
///
/// Aromatic atoms off any pattern ring lose their flag; aromatic bonds off
/// any ring become single bonds.
pub fn sanitize_aromaticity(mol: &mut Molecule) -> Result<()> {
    let ring_atoms = ring_atom_flags(mol);
    let ring_bonds = ring_bond_flags(mol);

    for (atom, in_ring) in mol.atoms.iter_mut().zip(ring_atoms) {
        if !in_ring {
            atom.is_aromatic = false;
        }
    }
    for (bond, in_ring) in mol.bonds.iter_mut().zip(ring_bonds) {
        if !in_ring && (bond.is_aromatic || bond.order == BondOrder::Aromatic) {
            bond.is_aromatic = false;
            bond.order = BondOrder::Single;
        }
    }
    check_valences(mol)
}

fn check_valences(mol: &Molecule) -> Result<()> {
    for (idx, atom) in mol.atoms.iter().enumerate() {
        let Some(elem) = element_by_number(atom.atomic_number) else {
            continue;
        };
        let explicit: f64 = mol.adjacency[idx]
            .iter()
            .map(|&(_, bi)| mol.bonds[bi].order.as_f64())
            .sum();
        let valence = (explicit + 1e-6).floor() as i16 + atom.implicit_hydrogens as i16;
        if valence > elem.allowed_valence(atom.formal_charge) {
            return Err(AlchemapError::InvalidMcsStructure(format!(
                "{} atom {idx} has valence {valence}",
                elem.symbol
            )));
        }
    }
    Ok(())
}
