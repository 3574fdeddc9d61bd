//! TRIPOS MOL2 reader.
//!
//! MOL2 is the usual input for ligand sets prepared for free-energy work:
//! hydrogens are explicit and every atom carries a partial charge. Charges
//! are kept on the molecule; chirality is perceived from the coordinates.

use alchemap_core::{AlchemapError, Result};

use crate::element::element_by_symbol_ignore_case;
use crate::molecule::{mark_aromatic_atoms, Bond, BondOrder, MolAtom, Molecule};
use crate::stereo::assign_chirality_from_coords;

const RTI: &str = "@<TRIPOS>";

/// Parse every `@<TRIPOS>MOLECULE` record in a MOL2 string.
pub fn parse_mol2(input: &str) -> Vec<Result<Molecule>> {
    split_records(input).into_iter().map(parse_record).collect()
}

/// Parse a MOL2 file from disk.
#[cfg(feature = "std")]
pub fn parse_mol2_file(path: impl AsRef<std::path::Path>) -> Result<Vec<Molecule>> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        AlchemapError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.as_ref().display(), e),
        ))
    })?;
    parse_mol2(&content).into_iter().collect()
}

/// Split the input into per-molecule line groups, each starting at a
/// MOLECULE record indicator.
fn split_records(input: &str) -> Vec<Vec<&str>> {
    let mut records: Vec<Vec<&str>> = Vec::new();
    for line in input.lines() {
        if line.trim_start().starts_with("@<TRIPOS>MOLECULE") {
            records.push(Vec::new());
        }
        if let Some(current) = records.last_mut() {
            current.push(line);
        }
    }
    records
}

/// Non-empty, non-comment lines of one section of a record.
fn section<'a>(record: &[&'a str], name: &str) -> Option<Vec<&'a str>> {
    let header = format!("{RTI}{name}");
    let start = record.iter().position(|l| l.trim() == header)?;
    Some(
        record[start + 1..]
            .iter()
            .take_while(|l| !l.trim_start().starts_with(RTI))
            .map(|l| l.trim())
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .collect(),
    )
}

fn parse_record(record: Vec<&str>) -> Result<Molecule> {
    let header = section(&record, "MOLECULE").unwrap_or_default();
    let name = header.first().map(|s| s.to_string()).unwrap_or_default();
    let declared_atoms: Option<usize> = header
        .get(1)
        .and_then(|counts| counts.split_whitespace().next())
        .and_then(|n| n.parse().ok());

    let atom_lines = section(&record, "ATOM")
        .ok_or_else(|| AlchemapError::Parse(format!("MOL2 '{name}': missing ATOM section")))?;

    let mut atoms = Vec::with_capacity(atom_lines.len());
    let mut coords = Vec::with_capacity(atom_lines.len());
    let mut charges = Vec::with_capacity(atom_lines.len());
    let mut ids = Vec::with_capacity(atom_lines.len());
    for line in &atom_lines {
        let parsed = parse_atom_line(line)?;
        ids.push(parsed.id);
        atoms.push(parsed.atom);
        coords.push(parsed.position);
        charges.push(parsed.charge);
    }

    if let Some(n) = declared_atoms {
        if n != atoms.len() {
            return Err(AlchemapError::Parse(format!(
                "MOL2 '{name}': {n} atoms declared, {} found",
                atoms.len()
            )));
        }
    }

    let mut bonds = Vec::new();
    for line in section(&record, "BOND").unwrap_or_default() {
        if let Some(bond) = parse_bond_line(line, &ids)? {
            bonds.push(bond);
        }
    }

    mark_aromatic_atoms(&mut atoms, &bonds);
    let mut mol = Molecule::new(name, atoms, bonds).with_partial_charges(charges)?;
    assign_chirality_from_coords(&mut mol, &coords);
    Ok(mol)
}

struct AtomRecord {
    id: usize,
    atom: MolAtom,
    position: [f64; 3],
    charge: f64,
}

/// `atom_id atom_name x y z atom_type [subst_id [subst_name [charge [status]]]]`
fn parse_atom_line(line: &str) -> Result<AtomRecord> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 6 {
        return Err(AlchemapError::Parse(format!("MOL2 atom line too short: '{line}'")));
    }

    let number = |s: &str, what: &str| -> Result<f64> {
        s.parse()
            .map_err(|_| AlchemapError::Parse(format!("MOL2: invalid {what} '{s}'")))
    };

    let id: usize = parts[0]
        .parse()
        .map_err(|_| AlchemapError::Parse(format!("MOL2: invalid atom id '{}'", parts[0])))?;
    let position = [
        number(parts[2], "x coordinate")?,
        number(parts[3], "y coordinate")?,
        number(parts[4], "z coordinate")?,
    ];

    // SYBYL type: element, optionally followed by `.hybridization`.
    let sybyl = parts[5];
    let (symbol, hybrid) = sybyl.split_once('.').unwrap_or((sybyl, ""));
    let elem = element_by_symbol_ignore_case(symbol)
        .ok_or_else(|| AlchemapError::Parse(format!("MOL2: unknown atom type '{sybyl}'")))?;

    let mut atom = MolAtom::new(elem.atomic_number);
    atom.is_aromatic = hybrid == "ar";
    if elem.atomic_number == 7 && hybrid == "4" {
        atom.formal_charge = 1;
    }

    let charge = match parts.get(8) {
        Some(s) => number(s, "partial charge")?,
        None => 0.0,
    };

    Ok(AtomRecord { id, atom, position, charge })
}

/// `bond_id origin_atom_id target_atom_id bond_type [status]`
///
/// Returns `None` for `nc` (not connected) bonds.
fn parse_bond_line(line: &str, ids: &[usize]) -> Result<Option<Bond>> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 4 {
        return Err(AlchemapError::Parse(format!("MOL2 bond line too short: '{line}'")));
    }

    let resolve = |token: &str| -> Result<usize> {
        token
            .parse::<usize>()
            .ok()
            .and_then(|id| ids.iter().position(|&known| known == id))
            .ok_or_else(|| AlchemapError::Parse(format!("MOL2: bond references unknown atom '{token}'")))
    };
    let a1 = resolve(parts[1])?;
    let a2 = resolve(parts[2])?;

    let order = match parts[3] {
        "nc" => return Ok(None),
        "2" => BondOrder::Double,
        "3" => BondOrder::Triple,
        "ar" => BondOrder::Aromatic,
        // single, amide, dummy and unknown
        _ => BondOrder::Single,
    };
    Ok(Some(Bond::new(a1, a2, order)))
}
