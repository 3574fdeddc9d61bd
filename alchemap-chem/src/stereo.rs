//! Tetrahedral stereochemistry: chirality tags, perception from 3D
//! coordinates, and R/S descriptors.
//!
//! A chirality tag is interpreted against the atom's neighbor list in
//! adjacency order with implicit hydrogens appended last: looking from the
//! first neighbor, the remaining three run counterclockwise for
//! [`Chirality::CounterClockwise`] and clockwise for [`Chirality::Clockwise`].

use crate::molecule::{Chirality, Molecule};

/// Signed volumes below this magnitude are treated as planar.
const PLANAR_VOLUME_EPS: f64 = 1e-3;

/// Assign an R/S descriptor to a tetrahedral stereocenter.
///
/// Returns `None` when the atom carries no chirality tag, does not have four
/// substituents (implicit hydrogens included), or has two substituents of
/// equal CIP rank.
pub fn assign_rs(mol: &Molecule, atom_idx: usize) -> Option<char> {
    let atom = mol.atoms.get(atom_idx)?;
    if atom.chirality == Chirality::None {
        return None;
    }

    let mut substituents: Vec<Option<usize>> =
        mol.adjacency[atom_idx].iter().map(|&(n, _)| Some(n)).collect();
    substituents.extend(std::iter::repeat(None).take(atom.implicit_hydrogens as usize));
    if substituents.len() != 4 {
        return None;
    }

    let ranks: Vec<u64> = substituents
        .iter()
        .map(|&n| cip_rank(mol, atom_idx, n))
        .collect();

    let mut sorted = ranks.clone();
    sorted.sort_unstable();
    if sorted.windows(2).any(|w| w[0] == w[1]) {
        return None;
    }

    let lowest = ranks
        .iter()
        .enumerate()
        .min_by_key(|&(_, &r)| r)
        .map(|(pos, _)| pos)?;

    let rest: Vec<u64> = ranks
        .iter()
        .enumerate()
        .filter(|&(pos, _)| pos != lowest)
        .map(|(_, &r)| r)
        .collect();

    // Parity of the permutation that sorts the three remaining ranks
    // descending, combined with the parity of pulling the lowest rank out of
    // the neighbor list and the written handedness.
    let inversions = (rest[0] < rest[1]) as u32 + (rest[0] < rest[2]) as u32 + (rest[1] < rest[2]) as u32;
    let mut is_r = inversions % 2 == 0;
    if lowest % 2 == 1 {
        is_r = !is_r;
    }
    if atom.chirality == Chirality::CounterClockwise {
        is_r = !is_r;
    }

    Some(if is_r { 'R' } else { 'S' })
}

/// Indices of atoms that are true tetrahedral stereocenters: tagged and with
/// four substituents of distinct CIP rank.
pub fn chiral_centers(mol: &Molecule) -> Vec<usize> {
    (0..mol.atom_count())
        .filter(|&i| assign_rs(mol, i).is_some())
        .collect()
}

/// Set chirality tags from 3D coordinates.
///
/// Every atom with four substituents (at least three of them explicit) is
/// tagged from the sign of the signed volume spanned by its second, third
/// and fourth neighbor. A missing fourth neighbor is an implicit hydrogen,
/// placed opposite the three explicit ones. Atoms that are planar within
/// tolerance, or that do not have four substituents, are left untagged.
/// Coordinates must be given per atom; a length mismatch leaves the
/// molecule unchanged.
pub fn assign_chirality_from_coords(mol: &mut Molecule, coords: &[[f64; 3]]) {
    if coords.len() != mol.atom_count() {
        return;
    }

    for idx in 0..mol.atom_count() {
        let explicit = &mol.adjacency[idx];
        let implicit = mol.atoms[idx].implicit_hydrogens as usize;
        if explicit.len() + implicit != 4 || explicit.len() < 3 {
            mol.atoms[idx].chirality = Chirality::None;
            continue;
        }

        let center = coords[idx];
        let mut vectors: Vec<[f64; 3]> = explicit
            .iter()
            .filter_map(|&(n, _)| unit(sub(coords[n], center)))
            .collect();
        if vectors.len() != explicit.len() {
            mol.atoms[idx].chirality = Chirality::None;
            continue;
        }
        if vectors.len() == 3 {
            let sum = [
                vectors[0][0] + vectors[1][0] + vectors[2][0],
                vectors[0][1] + vectors[1][1] + vectors[2][1],
                vectors[0][2] + vectors[1][2] + vectors[2][2],
            ];
            match unit([-sum[0], -sum[1], -sum[2]]) {
                Some(h) => vectors.push(h),
                None => {
                    mol.atoms[idx].chirality = Chirality::None;
                    continue;
                }
            }
        }

        let volume = dot(vectors[1], cross(vectors[2], vectors[3]));
        mol.atoms[idx].chirality = if volume < -PLANAR_VOLUME_EPS {
            Chirality::CounterClockwise
        } else if volume > PLANAR_VOLUME_EPS {
            Chirality::Clockwise
        } else {
            Chirality::None
        };
    }
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn unit(v: [f64; 3]) -> Option<[f64; 3]> {
    let len = dot(v, v).sqrt();
    (len > 1e-8).then(|| [v[0] / len, v[1] / len, v[2] / len])
}

/// CIP rank of a substituent; higher ranks win.
///
/// Packs the atomic number, the sorted atomic numbers of its own neighbors
/// and the first two of the next shell into one integer. `None` is an
/// implicit hydrogen.
fn cip_rank(mol: &Molecule, center: usize, neighbor: Option<usize>) -> u64 {
    let Some(idx) = neighbor else {
        return 1_u64 << 42;
    };
    let atom = &mol.atoms[idx];

    let mut shell1: Vec<u8> = mol.adjacency[idx]
        .iter()
        .filter(|&&(n, _)| n != center)
        .map(|&(n, _)| mol.atoms[n].atomic_number)
        .collect();
    shell1.extend(std::iter::repeat(1).take(atom.implicit_hydrogens as usize));
    shell1.sort_unstable_by(|a, b| b.cmp(a));

    let mut shell2: Vec<u8> = Vec::new();
    for &(n, _) in mol.adjacency[idx].iter().filter(|&&(n, _)| n != center) {
        shell2.extend(
            mol.adjacency[n]
                .iter()
                .filter(|&&(nn, _)| nn != idx)
                .map(|&(nn, _)| mol.atoms[nn].atomic_number),
        );
        shell2.extend(std::iter::repeat(1).take(mol.atoms[n].implicit_hydrogens as usize));
    }
    shell2.sort_unstable_by(|a, b| b.cmp(a));

    let pack = |values: &[u8], width: usize| {
        values
            .iter()
            .take(width)
            .fold(0u64, |acc, &v| acc * 128 + v as u64)
    };

    ((atom.atomic_number as u64) << 42) | (pack(&shell1, 4) << 14) | pack(&shell2, 2)
}
