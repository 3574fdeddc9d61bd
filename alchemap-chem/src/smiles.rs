//! SMILES reader.
//!
//! Covers the organic subset, bracket atoms (isotope, tetrahedral `@`/`@@`,
//! hydrogen count, charge), explicit and aromatic bonds, `/` and `\` bond
//! markers, branches, ring closures up to `%99` and `.` separated
//! components. Hydrogen counts of organic-subset atoms follow the lowest
//! default valence that fits their bonds.

use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::CharIndices;

use alchemap_core::{AlchemapError, Result};

use crate::element::element_by_symbol;
use crate::molecule::{Bond, BondOrder, BondStereo, Chirality, MolAtom, Molecule};

/// Parse a SMILES string into an unnamed molecule.
pub fn parse_smiles(smiles: &str) -> Result<Molecule> {
    parse_smiles_named(smiles, "")
}

/// Parse a SMILES string into a molecule called `name`.
pub fn parse_smiles_named(smiles: &str, name: &str) -> Result<Molecule> {
    let tokens = tokenize(smiles)?;
    let mut graph = GraphBuilder::default();
    for (pos, token) in tokens {
        graph.push(pos, token)?;
    }
    let (atoms, bonds) = graph.finish()?;
    Ok(Molecule::new(name.to_string(), atoms, bonds))
}

#[derive(Debug)]
enum Token {
    Atom { atom: MolAtom, bracket: bool },
    Bond(BondOrder),
    Stereo(BondStereo),
    Ring(u16),
    Open,
    Close,
    Dot,
}

fn parse_error(pos: usize, what: impl std::fmt::Display) -> AlchemapError {
    AlchemapError::Parse(format!("SMILES position {pos}: {what}"))
}

fn tokenize(smiles: &str) -> Result<Vec<(usize, Token)>> {
    let mut chars = smiles.char_indices().peekable();
    let mut tokens = Vec::new();

    while let Some((pos, c)) = chars.next() {
        let token = match c {
            '(' => Token::Open,
            ')' => Token::Close,
            '.' => Token::Dot,
            '-' => Token::Bond(BondOrder::Single),
            '=' => Token::Bond(BondOrder::Double),
            '#' => Token::Bond(BondOrder::Triple),
            ':' => Token::Bond(BondOrder::Aromatic),
            '/' => Token::Stereo(BondStereo::Up),
            '\\' => Token::Stereo(BondStereo::Down),
            '0'..='9' => Token::Ring(c as u16 - '0' as u16),
            '%' => {
                let tens = chars.next().and_then(|(_, d)| d.to_digit(10));
                let ones = chars.next().and_then(|(_, d)| d.to_digit(10));
                match (tens, ones) {
                    (Some(t), Some(o)) => Token::Ring((t * 10 + o) as u16),
                    _ => return Err(parse_error(pos, "'%' must be followed by two digits")),
                }
            }
            '[' => Token::Atom {
                atom: bracket_atom(&mut chars, pos)?,
                bracket: true,
            },
            _ => Token::Atom {
                atom: organic_atom(c, &mut chars, pos)?,
                bracket: false,
            },
        };
        tokens.push((pos, token));
    }
    Ok(tokens)
}

fn organic_atom(first: char, chars: &mut Peekable<CharIndices>, pos: usize) -> Result<MolAtom> {
    let two_letter = match (first, chars.peek().map(|&(_, c)| c)) {
        ('C', Some('l')) => Some("Cl"),
        ('B', Some('r')) => Some("Br"),
        _ => None,
    };
    let symbol = match two_letter {
        Some(symbol) => {
            chars.next();
            symbol
        }
        None => match first {
            'B' | 'b' => "B",
            'C' | 'c' => "C",
            'N' | 'n' => "N",
            'O' | 'o' => "O",
            'P' | 'p' => "P",
            'S' | 's' => "S",
            'F' => "F",
            'I' => "I",
            other => return Err(parse_error(pos, format!("unexpected character '{other}'"))),
        },
    };

    let elem = element_by_symbol(symbol).ok_or_else(|| parse_error(pos, format!("unknown element {symbol}")))?;
    let mut atom = MolAtom::new(elem.atomic_number);
    atom.is_aromatic = first.is_ascii_lowercase();
    Ok(atom)
}

/// Everything between `[` and `]`: `[isotope]symbol[@|@@][H[n]][charge]`.
fn bracket_atom(chars: &mut Peekable<CharIndices>, pos: usize) -> Result<MolAtom> {
    let mut body = String::new();
    loop {
        match chars.next() {
            Some((_, ']')) => break,
            Some((_, c)) => body.push(c),
            None => return Err(parse_error(pos, "unterminated bracket atom")),
        }
    }

    let mut rest = body.as_str();
    let isotope_len = rest.chars().take_while(char::is_ascii_digit).count();
    let isotope = match isotope_len {
        0 => None,
        n => Some(
            rest[..n]
                .parse::<u16>()
                .map_err(|_| parse_error(pos, format!("invalid isotope in [{body}]")))?,
        ),
    };
    rest = &rest[isotope_len..];

    let first = rest
        .chars()
        .next()
        .ok_or_else(|| parse_error(pos, "empty bracket atom"))?;
    let aromatic = first.is_ascii_lowercase();
    let capitalized: String = first.to_ascii_uppercase().to_string();
    // Prefer a two-letter symbol when the table knows it, e.g. [Cl-] or [se].
    let (elem, symbol_len) = match rest.get(..2) {
        Some(two) if two.as_bytes()[1].is_ascii_lowercase() => {
            let candidate = format!("{capitalized}{}", &two[1..]);
            match element_by_symbol(&candidate) {
                Some(elem) => (elem, 2),
                None => (lookup_symbol(&capitalized, pos)?, 1),
            }
        }
        _ => (lookup_symbol(&capitalized, pos)?, 1),
    };
    rest = &rest[symbol_len..];

    let at_signs = rest.chars().take_while(|&c| c == '@').count();
    rest = &rest[at_signs..];
    let chirality = match at_signs {
        0 => Chirality::None,
        1 => Chirality::CounterClockwise,
        _ => Chirality::Clockwise,
    };

    let mut hydrogens = 0u8;
    if let Some(after_h) = rest.strip_prefix('H') {
        let digits = after_h.chars().take_while(char::is_ascii_digit).count();
        hydrogens = match digits {
            0 => 1,
            n => after_h[..n]
                .parse()
                .map_err(|_| parse_error(pos, format!("invalid hydrogen count in [{body}]")))?,
        };
        rest = &after_h[digits..];
    }

    let formal_charge = parse_charge(rest).ok_or_else(|| parse_error(pos, format!("invalid bracket atom [{body}]")))?;

    let mut atom = MolAtom::new(elem.atomic_number);
    atom.isotope = isotope;
    atom.is_aromatic = aromatic;
    atom.chirality = chirality;
    atom.implicit_hydrogens = hydrogens;
    atom.formal_charge = formal_charge;
    Ok(atom)
}

fn lookup_symbol(symbol: &str, pos: usize) -> Result<&'static crate::element::Element> {
    element_by_symbol(symbol).ok_or_else(|| parse_error(pos, format!("unknown element {symbol}")))
}

/// `""`, `+`, `++`, `+2`, `-`, `--`, `-3`. Anything else is `None`.
fn parse_charge(text: &str) -> Option<i8> {
    let sign = match text.chars().next() {
        None => return Some(0),
        Some('+') => 1,
        Some('-') => -1,
        Some(_) => return None,
    };
    let tail = &text[1..];
    if tail.is_empty() {
        return Some(sign);
    }
    if tail.chars().all(|c| c == text.as_bytes()[0] as char) {
        return i8::try_from(tail.len() + 1).ok().map(|n| sign * n);
    }
    tail.parse::<i8>().ok().map(|n| sign * n)
}

/// Bond written before the next atom or ring closure digit.
#[derive(Debug, Clone, Copy, Default)]
struct PendingBond {
    order: Option<BondOrder>,
    stereo: BondStereo,
}

#[derive(Default)]
struct GraphBuilder {
    atoms: Vec<MolAtom>,
    bonds: Vec<Bond>,
    bracket: Vec<bool>,
    previous: Option<usize>,
    branches: Vec<Option<usize>>,
    pending: PendingBond,
    open_rings: BTreeMap<u16, (usize, PendingBond)>,
}

impl GraphBuilder {
    fn push(&mut self, pos: usize, token: Token) -> Result<()> {
        match token {
            Token::Atom { atom, bracket } => {
                let idx = self.atoms.len();
                self.atoms.push(atom);
                self.bracket.push(bracket);
                if let Some(prev) = self.previous {
                    let pending = std::mem::take(&mut self.pending);
                    self.connect(prev, idx, pending);
                }
                self.previous = Some(idx);
            }
            Token::Bond(order) => self.pending.order = Some(order),
            Token::Stereo(stereo) => self.pending.stereo = stereo,
            Token::Ring(label) => {
                let current = self
                    .previous
                    .ok_or_else(|| parse_error(pos, "ring closure before any atom"))?;
                let here = std::mem::take(&mut self.pending);
                match self.open_rings.remove(&label) {
                    Some((start, opened)) => {
                        if start == current {
                            return Err(parse_error(pos, format!("ring {label} closes on itself")));
                        }
                        let bond = PendingBond {
                            order: here.order.or(opened.order),
                            stereo: match here.stereo {
                                BondStereo::None => opened.stereo,
                                s => s,
                            },
                        };
                        self.connect(start, current, bond);
                    }
                    None => {
                        self.open_rings.insert(label, (current, here));
                    }
                }
            }
            Token::Open => {
                if self.previous.is_none() {
                    return Err(parse_error(pos, "branch before any atom"));
                }
                self.branches.push(self.previous);
            }
            Token::Close => {
                self.previous = self
                    .branches
                    .pop()
                    .ok_or_else(|| parse_error(pos, "unbalanced ')'"))?;
                self.pending = PendingBond::default();
            }
            Token::Dot => {
                self.previous = None;
                self.pending = PendingBond::default();
            }
        }
        Ok(())
    }

    /// An unwritten bond between two aromatic atoms is aromatic, otherwise
    /// single.
    fn connect(&mut self, a: usize, b: usize, bond: PendingBond) {
        let both_aromatic = self.atoms[a].is_aromatic && self.atoms[b].is_aromatic;
        let order = bond.order.unwrap_or(if both_aromatic {
            BondOrder::Aromatic
        } else {
            BondOrder::Single
        });
        let mut new = Bond::new(a, b, order);
        new.is_aromatic = order == BondOrder::Aromatic;
        new.stereo = bond.stereo;
        self.bonds.push(new);
    }

    fn finish(mut self) -> Result<(Vec<MolAtom>, Vec<Bond>)> {
        if let Some(label) = self.open_rings.keys().next() {
            return Err(AlchemapError::Parse(format!("SMILES: ring {label} is never closed")));
        }
        if !self.branches.is_empty() {
            return Err(AlchemapError::Parse(format!(
                "SMILES: {} unclosed branch(es)",
                self.branches.len()
            )));
        }
        if self.atoms.is_empty() {
            return Err(AlchemapError::Parse("SMILES: no atoms".into()));
        }
        self.add_hydrogens();
        Ok((self.atoms, self.bonds))
    }

    fn add_hydrogens(&mut self) {
        let mut degree = vec![0usize; self.atoms.len()];
        let mut order_sum = vec![0.0f64; self.atoms.len()];
        for bond in &self.bonds {
            for end in [bond.atom1, bond.atom2] {
                degree[end] += 1;
                order_sum[end] += bond.order.as_f64();
            }
        }

        for (idx, atom) in self.atoms.iter_mut().enumerate() {
            if self.bracket[idx] {
                continue;
            }
            let valences = default_valences(atom.atomic_number);
            // An aromatic atom gives one electron to the ring, keeps its
            // lowest valence, and each of its sigma bonds uses one valence.
            let (used, reserved, valences) = if atom.is_aromatic {
                let extra = (order_sum[idx] - degree[idx] as f64 * 1.5).max(0.0);
                let lowest = &valences[..valences.len().min(1)];
                ((degree[idx] as f64 + extra).round() as u8, 1, lowest)
            } else {
                (order_sum[idx].round() as u8, 0, valences)
            };
            if let Some(&target) = valences.iter().find(|&&v| v >= used + reserved) {
                atom.implicit_hydrogens = target - used - reserved;
            }
        }
    }
}

/// Default valences of the organic subset, lowest first.
fn default_valences(atomic_number: u8) -> &'static [u8] {
    match atomic_number {
        5 => &[3],
        6 => &[4],
        7 | 15 => &[3, 5],
        8 => &[2],
        16 => &[2, 4, 6],
        9 | 17 | 35 | 53 => &[1],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hydrogens(smiles: &str) -> Vec<u8> {
        parse_smiles(smiles)
            .unwrap()
            .atoms
            .iter()
            .map(|a| a.implicit_hydrogens)
            .collect()
    }

    #[test]
    fn chains_and_branches() {
        let mol = parse_smiles("CC(C)CO").unwrap();
        assert_eq!(mol.atom_count(), 5);
        assert_eq!(mol.bond_count(), 4);
        assert_eq!(mol.degree(1), 3);
        assert_eq!(hydrogens("CC(C)CO"), vec![3, 1, 3, 2, 1]);
        assert_eq!(hydrogens("C"), vec![4]);
    }

    #[test]
    fn bond_orders() {
        let mol = parse_smiles("C=CC#N").unwrap();
        assert_eq!(mol.bonds[0].order, BondOrder::Double);
        assert_eq!(mol.bonds[1].order, BondOrder::Single);
        assert_eq!(mol.bonds[2].order, BondOrder::Triple);
        assert_eq!(hydrogens("C=CC#N"), vec![2, 1, 0, 0]);
    }

    #[test]
    fn aromatic_rings() {
        let benzene = parse_smiles("c1ccccc1").unwrap();
        assert_eq!(benzene.bond_count(), 6);
        assert!(benzene.atoms.iter().all(|a| a.is_aromatic && a.implicit_hydrogens == 1));
        assert!(benzene.bonds.iter().all(|b| b.is_aromatic && b.order == BondOrder::Aromatic));

        assert_eq!(hydrogens("c1ccncc1"), vec![1, 1, 1, 0, 1, 1]);
        assert_eq!(hydrogens("c1ccsc1")[3], 0);
        assert_eq!(hydrogens("Cc1ccccc1")[1], 0);
        // The pyrrole NH must be written explicitly.
        assert_eq!(hydrogens("c1cc[nH]c1")[3], 1);
        // Exocyclic double bond on an aromatic carbon.
        assert_eq!(hydrogens("O=c1cccc[nH]1")[1], 0);
    }

    #[test]
    fn biphenyl_link_is_single() {
        let mol = parse_smiles("c1ccccc1-c1ccccc1").unwrap();
        let link = mol.get_bond(5, 6).unwrap();
        assert_eq!(link.order, BondOrder::Single);
        assert!(!link.is_aromatic);
    }

    #[test]
    fn hypervalent_defaults() {
        assert_eq!(hydrogens("CS(=O)(=O)C"), vec![3, 0, 0, 0, 3]);
        assert_eq!(hydrogens("OP(=O)(O)O")[1], 0);
        assert_eq!(hydrogens("CS")[1], 1);
    }

    #[test]
    fn bracket_atoms() {
        let mol = parse_smiles("[NH4+]").unwrap();
        assert_eq!(mol.atoms[0].atomic_number, 7);
        assert_eq!(mol.atoms[0].formal_charge, 1);
        assert_eq!(mol.atoms[0].implicit_hydrogens, 4);

        let mol = parse_smiles("[13CH3][O-]").unwrap();
        assert_eq!(mol.atoms[0].isotope, Some(13));
        assert_eq!(mol.atoms[0].implicit_hydrogens, 3);
        assert_eq!(mol.atoms[1].formal_charge, -1);
        assert_eq!(mol.atoms[1].implicit_hydrogens, 0);

        assert_eq!(parse_smiles("[Fe++]").unwrap().atoms[0].formal_charge, 2);
        assert_eq!(parse_smiles("[O-2]").unwrap().atoms[0].formal_charge, -2);
        assert_eq!(parse_smiles("[Cl-]").unwrap().atoms[0].atomic_number, 17);
        assert_eq!(parse_smiles("[se]1cccc1").unwrap().atoms[0].atomic_number, 34);
        assert_eq!(parse_smiles("[H][H]").unwrap().atom_count(), 2);
    }

    #[test]
    fn tetrahedral_tags() {
        let mol = parse_smiles("N[C@@H](C)C(=O)O").unwrap();
        assert_eq!(mol.atoms[1].chirality, Chirality::Clockwise);
        assert_eq!(mol.atoms[1].implicit_hydrogens, 1);
        assert_eq!(mol.atoms[0].chirality, Chirality::None);

        let mol = parse_smiles("F[C@](Cl)(Br)I").unwrap();
        assert_eq!(mol.atoms[1].chirality, Chirality::CounterClockwise);
        assert_eq!(mol.atoms[1].implicit_hydrogens, 0);
    }

    #[test]
    fn cis_trans_markers() {
        let mol = parse_smiles("F/C=C\\F").unwrap();
        assert_eq!(mol.bonds[0].stereo, BondStereo::Up);
        assert_eq!(mol.bonds[1].stereo, BondStereo::None);
        assert_eq!(mol.bonds[2].stereo, BondStereo::Down);
    }

    #[test]
    fn ring_closures() {
        let mol = parse_smiles("C%10CCCCCCCCC%10").unwrap();
        assert_eq!(mol.atom_count(), 10);
        assert_eq!(mol.bond_count(), 10);

        let mol = parse_smiles("C=1CCCCC1").unwrap();
        assert_eq!(mol.get_bond(0, 5).unwrap().order, BondOrder::Double);

        let decalin = parse_smiles("C1CCC2CCCCC2C1").unwrap();
        assert_eq!(decalin.bond_count(), 11);
    }

    #[test]
    fn disconnected_components() {
        let mol = parse_smiles("[Na+].[Cl-]").unwrap();
        assert_eq!(mol.atom_count(), 2);
        assert_eq!(mol.bond_count(), 0);
        assert_eq!(mol.connected_components().len(), 2);
    }

    #[test]
    fn malformed_input() {
        for bad in ["", "C(", "C)", "C1CC", "[", "[C", "[Xx]", "C%1", "1CC", "C11", "(C)", "Q", "[C+a]"] {
            assert!(parse_smiles(bad).is_err(), "{bad:?} should not parse");
        }
    }
}
