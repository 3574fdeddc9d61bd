//! Gasteiger-Marsili partial charges.
//!
//! Used by the electrostatic rule when a molecule was read without partial
//! charges (SMILES, SDF). Every transfer moves the same amount of charge off
//! one end of a bond and onto the other, so the charges always add up to the
//! net formal charge.

use alchemap_core::Result;

use crate::molecule::{BondOrder, Molecule};

/// Hybridization bucket, guessed from the multiple bonds on an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hybrid {
    Sp3,
    Sp2,
    Sp,
}

impl Hybrid {
    /// A triple bond or two double bonds make an sp atom; one double or any
    /// aromatic bond make it sp2.
    fn from_bonds(doubles: u32, triples: u32, aromatic: bool) -> Self {
        if triples > 0 || doubles > 1 {
            Hybrid::Sp
        } else if doubles == 1 || aromatic {
            Hybrid::Sp2
        } else {
            Hybrid::Sp3
        }
    }
}

/// `(a, b, c)` of the electronegativity polynomial `a + b*q + c*q^2`.
type Coeffs = [f64; 3];

/// Gasteiger & Marsili, Tetrahedron 36, 3219 (1980). Elements without a
/// hybridization split list one row with `None`.
const TABLE: &[(u8, Option<Hybrid>, Coeffs)] = &[
    (1, None, [7.17, 6.24, -0.56]),
    (6, Some(Hybrid::Sp3), [7.98, 9.18, 1.88]),
    (6, Some(Hybrid::Sp2), [8.79, 9.32, 1.51]),
    (6, Some(Hybrid::Sp), [10.39, 9.45, 0.73]),
    (7, Some(Hybrid::Sp3), [11.54, 10.82, 1.36]),
    (7, Some(Hybrid::Sp2), [12.87, 11.15, 0.85]),
    (7, Some(Hybrid::Sp), [15.68, 11.70, -0.27]),
    (9, None, [14.66, 13.85, 2.31]),
    (14, None, [5.60, 6.00, 1.20]),
    (15, None, [8.90, 8.24, 0.96]),
    (17, None, [11.00, 9.69, 1.35]),
    (34, None, [10.00, 8.80, 1.20]),
    (35, None, [10.08, 8.47, 1.16]),
    (53, None, [9.90, 7.96, 0.96]),
];

const OXYGEN_SINGLE: Coeffs = [14.18, 12.92, 1.39];
const OXYGEN_DOUBLE: Coeffs = [17.07, 13.79, 0.47];
const SULFUR_LOW: Coeffs = [10.14, 9.13, 1.38];
const SULFUR_HIGH: Coeffs = [12.00, 9.88, 1.58];

/// Unknown elements are treated as sp3 carbon.
const FALLBACK: Coeffs = [7.98, 9.18, 1.88];

const ROUNDS: i32 = 6;

fn coefficients(atomic_number: u8, hybrid: Hybrid, valence_sum: f64) -> Coeffs {
    match atomic_number {
        8 if hybrid == Hybrid::Sp3 => return OXYGEN_SINGLE,
        8 => return OXYGEN_DOUBLE,
        16 if valence_sum > 2.5 => return SULFUR_HIGH,
        16 => return SULFUR_LOW,
        _ => {}
    }
    TABLE
        .iter()
        .find(|(z, h, _)| *z == atomic_number && h.map_or(true, |h| h == hybrid))
        .map_or(FALLBACK, |&(_, _, c)| c)
}

fn chi([a, b, c]: Coeffs, q: f64) -> f64 {
    a + q * (b + c * q)
}

/// Gasteiger-Marsili charge for every atom, formal charges included.
///
/// Runs six rounds. In round `k` each bond moves charge toward its more
/// electronegative end, scaled by `0.5^k` and by the electronegativity of
/// the cation of the receiving atom.
///
/// # Example
///
/// ```
/// use alchemap_chem::{parse_smiles, gasteiger_charges};
///
/// let mol = parse_smiles("CCO").unwrap();
/// let charges = gasteiger_charges(&mol).unwrap();
/// assert_eq!(charges.len(), 3);
/// assert!(charges[2] < 0.0);
/// ```
pub fn gasteiger_charges(mol: &Molecule) -> Result<Vec<f64>> {
    let coeffs: Vec<Coeffs> = mol
        .atoms
        .iter()
        .enumerate()
        .map(|(idx, atom)| {
            let (mut doubles, mut triples, mut aromatic) = (0, 0, false);
            let mut valence = atom.implicit_hydrogens as f64;
            for &(_, bi) in &mol.adjacency[idx] {
                let order = mol.bonds[bi].order;
                match order {
                    BondOrder::Double => doubles += 1,
                    BondOrder::Triple => triples += 1,
                    BondOrder::Aromatic => aromatic = true,
                    BondOrder::Single => {}
                }
                valence += order.as_f64();
            }
            let hybrid = Hybrid::from_bonds(doubles, triples, aromatic || atom.is_aromatic);
            coefficients(atom.atomic_number, hybrid, valence)
        })
        .collect();

    let mut q = vec![0.0_f64; mol.atom_count()];
    for round in 1..=ROUNDS {
        let damping = 0.5_f64.powi(round);
        let snapshot = q.clone();
        for bond in &mol.bonds {
            let (i, j) = (bond.atom1, bond.atom2);
            let gap = chi(coeffs[j], snapshot[j]) - chi(coeffs[i], snapshot[i]);
            let receiver = if gap > 0.0 { coeffs[j] } else { coeffs[i] };
            let cation = chi(receiver, 1.0);
            if cation.abs() < 1e-12 {
                continue;
            }
            let moved = damping * gap / cation;
            q[i] += moved;
            q[j] -= moved;
        }
    }

    Ok(q.into_iter()
        .zip(&mol.atoms)
        .map(|(charge, atom)| charge + atom.formal_charge as f64)
        .collect())
}
