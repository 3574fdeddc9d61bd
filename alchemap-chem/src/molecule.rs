//! Molecule graphs: atoms, bonds, adjacency and per-atom side data.

use std::collections::VecDeque;

use alchemap_core::{AlchemapError, Annotated, ContentAddressable, Result, Summarizable};
use sha2::{Digest, Sha256};

/// Tetrahedral parity tag of an atom, read against its neighbor order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Chirality {
    #[default]
    None,
    /// `@`
    CounterClockwise,
    /// `@@`
    Clockwise,
}

/// Directional single-bond marker used for double-bond geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BondStereo {
    #[default]
    None,
    /// `/`
    Up,
    /// `\`
    Down,
}

/// Bond multiplicity; aromatic bonds are their own class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    /// Valence contribution of the bond.
    pub fn as_f64(self) -> f64 {
        match self {
            BondOrder::Single => 1.0,
            BondOrder::Double => 2.0,
            BondOrder::Triple => 3.0,
            BondOrder::Aromatic => 1.5,
        }
    }
}

/// Atom attributes. Hydrogens are either explicit atoms or counted in
/// `implicit_hydrogens`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MolAtom {
    pub atomic_number: u8,
    pub formal_charge: i8,
    pub isotope: Option<u16>,
    pub is_aromatic: bool,
    pub implicit_hydrogens: u8,
    pub chirality: Chirality,
}

impl MolAtom {
    /// Neutral aliphatic atom without hydrogens or stereo.
    pub fn new(atomic_number: u8) -> Self {
        MolAtom {
            atomic_number,
            formal_charge: 0,
            isotope: None,
            is_aromatic: false,
            implicit_hydrogens: 0,
            chirality: Chirality::None,
        }
    }

    /// Anything but hydrogen.
    pub fn is_heavy(&self) -> bool {
        self.atomic_number != 1
    }
}

/// Undirected bond between two atom indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bond {
    pub atom1: usize,
    pub atom2: usize,
    pub order: BondOrder,
    pub is_aromatic: bool,
    pub stereo: BondStereo,
}

impl Bond {
    /// Unmarked bond; aromatic order also sets the aromatic flag.
    pub fn new(atom1: usize, atom2: usize, order: BondOrder) -> Self {
        Bond {
            atom1,
            atom2,
            order,
            is_aromatic: order == BondOrder::Aromatic,
            stereo: BondStereo::None,
        }
    }

    /// Opposite end of the bond from `atom`.
    pub fn other(&self, atom: usize) -> usize {
        if self.atom1 == atom {
            self.atom2
        } else {
            self.atom1
        }
    }
}

/// Molecule graph.
///
/// `adjacency` is derived from `bonds` at construction; code that edits
/// atoms or bonds in place must rebuild the molecule with [`Molecule::new`].
#[derive(Debug, Clone)]
pub struct Molecule {
    pub name: String,
    pub atoms: Vec<MolAtom>,
    pub bonds: Vec<Bond>,
    /// `(neighbor, bond index)` per atom, in bond order.
    pub adjacency: Vec<Vec<(usize, usize)>>,
    /// Partial charges from the input file.
    partial_charges: Option<Vec<f64>>,
}

impl Molecule {
    /// Bond endpoints must be valid atom indices.
    pub fn new(name: String, atoms: Vec<MolAtom>, bonds: Vec<Bond>) -> Self {
        let mut adjacency = vec![Vec::new(); atoms.len()];
        for (bi, bond) in bonds.iter().enumerate() {
            adjacency[bond.atom1].push((bond.atom2, bi));
            adjacency[bond.atom2].push((bond.atom1, bi));
        }
        Molecule {
            name,
            atoms,
            bonds,
            adjacency,
            partial_charges: None,
        }
    }

    /// Attach one partial charge per atom.
    pub fn with_partial_charges(mut self, charges: Vec<f64>) -> Result<Self> {
        if charges.len() != self.atoms.len() {
            return Err(AlchemapError::InvalidInput(format!(
                "molecule '{}' has {} atoms but {} partial charges",
                self.name,
                self.atoms.len(),
                charges.len()
            )));
        }
        self.partial_charges = Some(charges);
        Ok(self)
    }

    pub fn partial_charges(&self) -> Option<&[f64]> {
        self.partial_charges.as_deref()
    }

    /// Sum of the partial charges.
    ///
    /// Falls back to Gasteiger-Marsili charges, and to the formal charges if
    /// those cannot be computed.
    pub fn total_partial_charge(&self) -> f64 {
        match &self.partial_charges {
            Some(charges) => charges.iter().sum(),
            None => crate::gasteiger::gasteiger_charges(self)
                .map(|c| c.iter().sum())
                .unwrap_or_else(|_| self.atoms.iter().map(|a| a.formal_charge as f64).sum()),
        }
    }

    /// Graph nodes; implicit hydrogens are not counted.
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn heavy_atom_count(&self) -> usize {
        self.atoms.iter().filter(|a| a.is_heavy()).count()
    }

    pub fn neighbors(&self, atom_idx: usize) -> Vec<usize> {
        self.adjacency[atom_idx].iter().map(|&(n, _)| n).collect()
    }

    /// Explicit bonds of an atom.
    pub fn degree(&self, atom_idx: usize) -> usize {
        self.adjacency[atom_idx].len()
    }

    pub fn get_bond(&self, a1: usize, a2: usize) -> Option<&Bond> {
        self.adjacency[a1]
            .iter()
            .find(|&&(n, _)| n == a2)
            .map(|&(_, bi)| &self.bonds[bi])
    }

    /// Explicit hydrogen atoms plus implicit hydrogen counts.
    pub fn total_hydrogen_count(&self) -> usize {
        let explicit: usize = self.atoms.iter().filter(|a| a.atomic_number == 1).count();
        let implicit: usize = self.atoms.iter().map(|a| a.implicit_hydrogens as usize).sum();
        explicit + implicit
    }

    /// Fill implicit hydrogen counts from default valences.
    ///
    /// Applies to atoms of the organic subset that carry no implicit
    /// hydrogens yet, the convention of MDL connection tables. Aromatic bonds
    /// count as 1.5.
    pub fn fill_implicit_hydrogens(&mut self) {
        for idx in 0..self.atoms.len() {
            let atom = &self.atoms[idx];
            if atom.implicit_hydrogens > 0
                || !matches!(atom.atomic_number, 5 | 6 | 7 | 8 | 9 | 15 | 16 | 17 | 35 | 53)
            {
                continue;
            }
            let Some(elem) = crate::element::element_by_number(atom.atomic_number) else {
                continue;
            };
            let target = if atom.formal_charge == 0 {
                elem.valence as i16
            } else {
                elem.allowed_valence(atom.formal_charge)
            };
            let used: f64 = self.adjacency[idx]
                .iter()
                .map(|&(_, bi)| self.bonds[bi].order.as_f64())
                .sum();
            let missing = target - (used + 1e-6).floor() as i16;
            if missing > 0 {
                self.atoms[idx].implicit_hydrogens = missing as u8;
            }
        }
    }

    /// Copy of this molecule with explicit hydrogens folded into their heavy atom.
    ///
    /// A hydrogen is removed when it carries no isotope label and is bonded to
    /// exactly one heavy atom; that atom's implicit hydrogen count grows by one.
    /// Other hydrogens (H2, bridging, labelled) stay in the graph.
    pub fn remove_hydrogens(&self) -> Molecule {
        let mut implicit: Vec<u8> = self.atoms.iter().map(|a| a.implicit_hydrogens).collect();
        let mut keep = Vec::with_capacity(self.atoms.len());

        for (idx, atom) in self.atoms.iter().enumerate() {
            let removable = atom.atomic_number == 1
                && atom.isotope.is_none()
                && self.adjacency[idx].len() == 1
                && self.atoms[self.adjacency[idx][0].0].is_heavy();
            if removable {
                let heavy = self.adjacency[idx][0].0;
                implicit[heavy] = implicit[heavy].saturating_add(1);
            } else {
                keep.push(idx);
            }
        }

        let mut stripped = self.induced_subgraph(&keep);
        for (new_idx, &old_idx) in keep.iter().enumerate() {
            stripped.atoms[new_idx].implicit_hydrogens = implicit[old_idx];
        }
        stripped
    }

    /// Build a sub-molecule from a subset of atom indices.
    ///
    /// Atoms appear in the order given by `keep`; only bonds with both ends
    /// kept survive. Partial charges follow their atoms.
    pub fn induced_subgraph(&self, keep: &[usize]) -> Molecule {
        let mut index_map = vec![usize::MAX; self.atom_count()];
        let mut atoms = Vec::with_capacity(keep.len());

        for (new_idx, &old_idx) in keep.iter().enumerate() {
            index_map[old_idx] = new_idx;
            atoms.push(self.atoms[old_idx].clone());
        }

        let mut bonds = Vec::new();
        for bond in &self.bonds {
            let a1 = index_map[bond.atom1];
            let a2 = index_map[bond.atom2];
            if a1 != usize::MAX && a2 != usize::MAX {
                bonds.push(Bond {
                    atom1: a1,
                    atom2: a2,
                    order: bond.order,
                    is_aromatic: bond.is_aromatic,
                    stereo: bond.stereo,
                });
            }
        }

        let mut sub = Molecule::new(self.name.clone(), atoms, bonds);
        if let Some(charges) = &self.partial_charges {
            sub.partial_charges = Some(keep.iter().map(|&i| charges[i]).collect());
        }
        sub
    }

    /// Connected components, each a list of atom indices in BFS order.
    ///
    /// Components are ordered by their lowest atom index.
    pub fn connected_components(&self) -> Vec<Vec<usize>> {
        let n = self.atom_count();
        let mut visited = vec![false; n];
        let mut components = Vec::new();

        for start in 0..n {
            if visited[start] {
                continue;
            }
            let mut component = Vec::new();
            let mut queue = VecDeque::new();
            queue.push_back(start);
            visited[start] = true;
            while let Some(curr) = queue.pop_front() {
                component.push(curr);
                for &(neighbor, _) in &self.adjacency[curr] {
                    if !visited[neighbor] {
                        visited[neighbor] = true;
                        queue.push_back(neighbor);
                    }
                }
            }
            components.push(component);
        }

        components
    }
}

/// Flag every atom that sits on an aromatic bond as aromatic.
pub(crate) fn mark_aromatic_atoms(atoms: &mut [MolAtom], bonds: &[Bond]) {
    for bond in bonds.iter().filter(|b| b.is_aromatic) {
        atoms[bond.atom1].is_aromatic = true;
        atoms[bond.atom2].is_aromatic = true;
    }
}

impl Annotated for Molecule {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Summarizable for Molecule {
    fn summary(&self) -> String {
        let name = match self.name.as_str() {
            "" => "(unnamed)",
            name => name,
        };
        format!(
            "{name}: {} heavy atoms, {} bonds, net charge {:+.3}",
            self.heavy_atom_count(),
            self.bond_count(),
            self.total_partial_charge()
        )
    }
}

/// 64-bit FNV-1a, the mixing step of the content hash.
fn fnv1a(words: impl IntoIterator<Item = u64>) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for word in words {
        for byte in word.to_le_bytes() {
            h ^= byte as u64;
            h = h.wrapping_mul(0x0000_0100_0000_01b3);
        }
    }
    h
}

impl ContentAddressable for Molecule {
    /// SHA-256 over atom invariants refined through three rounds of
    /// neighborhood exchange, plus the invariant pairs of every bond.
    ///
    /// Independent of atom and bond order. Stereo tags and partial charges
    /// are not part of the hash.
    fn content_hash(&self) -> String {
        let mut labels: Vec<u64> = self
            .atoms
            .iter()
            .map(|a| {
                fnv1a([
                    a.atomic_number as u64,
                    a.formal_charge as i64 as u64,
                    a.isotope.map_or(0, |i| i as u64 + 1),
                    a.is_aromatic as u64,
                    a.implicit_hydrogens as u64,
                ])
            })
            .collect();

        for _ in 0..3 {
            labels = (0..self.atoms.len())
                .map(|i| {
                    let mut around: Vec<u64> = self.adjacency[i]
                        .iter()
                        .map(|&(n, bi)| fnv1a([labels[n], self.bonds[bi].order as u64]))
                        .collect();
                    around.sort_unstable();
                    fnv1a(std::iter::once(labels[i]).chain(around))
                })
                .collect();
        }

        let mut atoms = labels.clone();
        atoms.sort_unstable();
        let mut bonds: Vec<(u64, u64, u8)> = self
            .bonds
            .iter()
            .map(|b| {
                let (x, y) = (labels[b.atom1], labels[b.atom2]);
                (x.min(y), x.max(y), b.order as u8)
            })
            .collect();
        bonds.sort_unstable();

        let mut hasher = Sha256::new();
        hasher.update((atoms.len() as u64).to_le_bytes());
        for label in atoms {
            hasher.update(label.to_le_bytes());
        }
        for (x, y, order) in bonds {
            hasher.update(x.to_le_bytes());
            hasher.update(y.to_le_bytes());
            hasher.update([order]);
        }
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water() -> Molecule {
        let mut o = MolAtom::new(8);
        o.implicit_hydrogens = 2;
        Molecule::new("water".into(), vec![o], vec![])
    }

    fn ethane() -> Molecule {
        let mut c = MolAtom::new(6);
        c.implicit_hydrogens = 3;
        let atoms = vec![c.clone(), c];
        let bonds = vec![Bond::new(0, 1, BondOrder::Single)];
        Molecule::new("ethane".into(), atoms, bonds)
    }

    // C, O, then four explicit H.
    fn methanol_with_h() -> Molecule {
        let atoms = vec![
            MolAtom::new(6),
            MolAtom::new(8),
            MolAtom::new(1),
            MolAtom::new(1),
            MolAtom::new(1),
            MolAtom::new(1),
        ];
        let bonds = vec![
            Bond::new(0, 1, BondOrder::Single),
            Bond::new(0, 2, BondOrder::Single),
            Bond::new(0, 3, BondOrder::Single),
            Bond::new(0, 4, BondOrder::Single),
            Bond::new(1, 5, BondOrder::Single),
        ];
        Molecule::new("methanol".into(), atoms, bonds)
    }

    #[test]
    fn construction_and_adjacency() {
        let mol = ethane();
        assert_eq!(mol.atom_count(), 2);
        assert_eq!(mol.bond_count(), 1);
        assert_eq!(mol.adjacency[0].len(), 1);
        assert_eq!(mol.adjacency[1].len(), 1);
    }

    #[test]
    fn neighbors_and_degree() {
        let mol = ethane();
        assert_eq!(mol.neighbors(0), vec![1]);
        assert_eq!(mol.degree(0), 1);
        assert_eq!(mol.degree(1), 1);
    }

    #[test]
    fn fill_hydrogens_from_valence() {
        let mut mol = methanol_with_h();
        mol.fill_implicit_hydrogens();
        assert_eq!(mol.atoms[0].implicit_hydrogens, 0);
        assert_eq!(mol.atoms[1].implicit_hydrogens, 0);

        let atoms = vec![MolAtom::new(6), MolAtom::new(8)];
        let mut formaldehyde = Molecule::new(
            "formaldehyde".into(),
            atoms,
            vec![Bond::new(0, 1, BondOrder::Double)],
        );
        formaldehyde.fill_implicit_hydrogens();
        assert_eq!(formaldehyde.atoms[0].implicit_hydrogens, 2);
        assert_eq!(formaldehyde.atoms[1].implicit_hydrogens, 0);
    }

    #[test]
    fn heavy_atom_count() {
        let mol = water();
        assert_eq!(mol.heavy_atom_count(), 1);
        assert_eq!(mol.total_hydrogen_count(), 2);
    }

    #[test]
    fn remove_hydrogens_folds_into_implicit() {
        let mol = methanol_with_h();
        let noh = mol.remove_hydrogens();
        assert_eq!(noh.atom_count(), 2);
        assert_eq!(noh.bond_count(), 1);
        assert_eq!(noh.atoms[0].implicit_hydrogens, 3);
        assert_eq!(noh.atoms[1].implicit_hydrogens, 1);
        assert_eq!(noh.total_hydrogen_count(), mol.total_hydrogen_count());
        // The input is untouched.
        assert_eq!(mol.atom_count(), 6);
    }

    #[test]
    fn remove_hydrogens_keeps_h2() {
        let atoms = vec![MolAtom::new(1), MolAtom::new(1)];
        let mol = Molecule::new("h2".into(), atoms, vec![Bond::new(0, 1, BondOrder::Single)]);
        assert_eq!(mol.remove_hydrogens().atom_count(), 2);
    }

    #[test]
    fn induced_subgraph_reindexes() {
        let mol = methanol_with_h();
        let sub = mol.induced_subgraph(&[1, 0, 5]);
        assert_eq!(sub.atom_count(), 3);
        assert_eq!(sub.atoms[0].atomic_number, 8);
        assert_eq!(sub.bond_count(), 2);
        assert!(sub.get_bond(0, 1).is_some());
        assert!(sub.get_bond(0, 2).is_some());
    }

    #[test]
    fn partial_charges_follow_subgraph() {
        let mol = methanol_with_h()
            .with_partial_charges(vec![0.1, -0.6, 0.05, 0.05, 0.0, 0.4])
            .unwrap();
        assert!(mol.total_partial_charge().abs() < 1e-9);
        let sub = mol.induced_subgraph(&[1, 5]);
        assert_eq!(sub.partial_charges(), Some(&[-0.6, 0.4][..]));
    }

    #[test]
    fn partial_charge_length_mismatch() {
        assert!(ethane().with_partial_charges(vec![0.0]).is_err());
    }

    #[test]
    fn connected_components_split() {
        let atoms = vec![MolAtom::new(6), MolAtom::new(6), MolAtom::new(8)];
        let mol = Molecule::new("frag".into(), atoms, vec![Bond::new(0, 1, BondOrder::Single)]);
        let comps = mol.connected_components();
        assert_eq!(comps, vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn summary_names_the_molecule() {
        let text = ethane().summary();
        assert!(text.starts_with("ethane: 2 heavy atoms, 1 bonds"));
        let anonymous = Molecule::new(String::new(), vec![MolAtom::new(8)], vec![]);
        assert!(anonymous.summary().starts_with("(unnamed)"));
    }

    #[test]
    fn content_hash_ignores_atom_order() {
        let forward = methanol_with_h();
        // Same graph with the atoms listed in reverse.
        let atoms = vec![
            MolAtom::new(1),
            MolAtom::new(1),
            MolAtom::new(1),
            MolAtom::new(1),
            MolAtom::new(8),
            MolAtom::new(6),
        ];
        let bonds = vec![
            Bond::new(0, 4, BondOrder::Single),
            Bond::new(5, 1, BondOrder::Single),
            Bond::new(5, 2, BondOrder::Single),
            Bond::new(5, 3, BondOrder::Single),
            Bond::new(4, 5, BondOrder::Single),
        ];
        let reversed = Molecule::new("other name".into(), atoms, bonds);

        let hash = forward.content_hash();
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, reversed.content_hash());
        assert_ne!(hash, ethane().content_hash());
    }

    #[test]
    fn content_hash_sees_bond_orders() {
        let single = Molecule::new(
            "a".into(),
            vec![MolAtom::new(6), MolAtom::new(6)],
            vec![Bond::new(0, 1, BondOrder::Single)],
        );
        let double = Molecule::new(
            "a".into(),
            vec![MolAtom::new(6), MolAtom::new(6)],
            vec![Bond::new(0, 1, BondOrder::Double)],
        );
        assert_ne!(single.content_hash(), double.content_hash());
    }
}
