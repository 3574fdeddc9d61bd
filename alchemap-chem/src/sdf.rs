//! MDL MOL (V2000/V3000) and SD file readers.
//!
//! Connection tables carry no implicit hydrogens, so they are filled from
//! default valences. Tetrahedral chirality is perceived from the atom
//! coordinates.

use alchemap_core::{AlchemapError, Result};

use crate::element::element_by_symbol;
use crate::molecule::{mark_aromatic_atoms, Bond, BondOrder, MolAtom, Molecule};
use crate::stereo::assign_chirality_from_coords;

/// Atom record of a connection table before the graph is assembled.
struct CtabAtom {
    atom: MolAtom,
    position: [f64; 3],
}

/// Parse a MOL block, detecting V2000 or V3000.
pub fn parse_mol_block(input: &str) -> Result<Molecule> {
    if is_v3000(input) {
        parse_mol_v3000(input)
    } else {
        parse_mol_v2000(input)
    }
}

/// Parse a MOL V2000 block into a `Molecule`.
pub fn parse_mol_v2000(input: &str) -> Result<Molecule> {
    let lines: Vec<&str> = input.lines().collect();
    if lines.len() < 4 {
        return Err(AlchemapError::Parse("MOL block too short".into()));
    }

    let name = lines[0].trim().to_string();

    // Counts line: aaabbb...
    let counts = lines[3];
    let num_atoms = fixed_field::<usize>(counts, 0, 3, "atom count")?;
    let num_bonds = fixed_field::<usize>(counts, 3, 6, "bond count")?;

    let bond_start = 4 + num_atoms;
    if lines.len() < bond_start + num_bonds {
        return Err(AlchemapError::Parse(format!(
            "MOL block '{name}' truncated: {num_atoms} atoms and {num_bonds} bonds declared"
        )));
    }

    let mut atoms = lines[4..bond_start]
        .iter()
        .map(|line| parse_v2000_atom(line))
        .collect::<Result<Vec<_>>>()?;
    let bonds = lines[bond_start..bond_start + num_bonds]
        .iter()
        .map(|line| parse_v2000_bond(line))
        .collect::<Result<Vec<_>>>()?;

    for line in &lines[bond_start + num_bonds..] {
        if line.starts_with("M  END") {
            break;
        }
        if line.starts_with("M  CHG") {
            apply_property_line(line, &mut atoms, |atom, value| {
                atom.atom.formal_charge = value as i8;
            })?;
        } else if line.starts_with("M  ISO") {
            apply_property_line(line, &mut atoms, |atom, value| {
                atom.atom.isotope = u16::try_from(value).ok();
            })?;
        }
    }

    assemble(name, atoms, bonds)
}

/// Parse a MOL V3000 block into a `Molecule`.
///
/// Fields are whitespace separated behind `M  V30` prefixes; indices are
/// 1-based.
pub fn parse_mol_v3000(input: &str) -> Result<Molecule> {
    let lines: Vec<&str> = input.lines().collect();
    if lines.len() < 4 {
        return Err(AlchemapError::Parse("V3000 MOL block too short".into()));
    }

    let name = lines[0].trim().to_string();

    let counts: Vec<&str> = lines
        .iter()
        .find(|l| l.contains("M  V30 COUNTS"))
        .ok_or_else(|| AlchemapError::Parse("V3000: missing COUNTS line".into()))?
        .split_whitespace()
        .collect();
    if counts.len() < 5 {
        return Err(AlchemapError::Parse("V3000: COUNTS line too short".into()));
    }
    let num_atoms: usize = parse_token(counts[3], "V3000 atom count")?;
    let num_bonds: usize = parse_token(counts[4], "V3000 bond count")?;

    let atom_lines = v3000_section(&lines, "ATOM")?
        .ok_or_else(|| AlchemapError::Parse("V3000: missing BEGIN ATOM".into()))?;
    let atoms = atom_lines
        .iter()
        .map(|line| parse_v3000_atom(line))
        .collect::<Result<Vec<_>>>()?;
    if atoms.len() != num_atoms {
        return Err(AlchemapError::Parse(format!(
            "V3000: expected {num_atoms} atoms, found {}",
            atoms.len()
        )));
    }

    let bonds = match v3000_section(&lines, "BOND")? {
        Some(bond_lines) => bond_lines
            .iter()
            .map(|line| parse_v3000_bond(line))
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };
    if bonds.len() != num_bonds {
        return Err(AlchemapError::Parse(format!(
            "V3000: expected {num_bonds} bonds, found {}",
            bonds.len()
        )));
    }

    assemble(name, atoms, bonds)
}

/// Parse a multi-molecule SD string, one result per `$$$$`-delimited record.
pub fn parse_sdf(input: &str) -> Vec<Result<Molecule>> {
    input
        .split("$$$$")
        .map(|block| block.trim_start_matches(['\r', '\n']).trim_end())
        .filter(|block| !block.trim().is_empty())
        .map(parse_mol_block)
        .collect()
}

/// Parse an SD file from disk.
#[cfg(feature = "std")]
pub fn parse_sdf_file(path: impl AsRef<std::path::Path>) -> Result<Vec<Molecule>> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        AlchemapError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.as_ref().display(), e),
        ))
    })?;
    parse_sdf(&content).into_iter().collect()
}

fn is_v3000(block: &str) -> bool {
    block.lines().take(5).any(|line| line.contains("V3000")) || block.contains("M  V30 BEGIN CTAB")
}

/// Lines strictly between `M  V30 BEGIN <section>` and `M  V30 END <section>`.
fn v3000_section<'a>(lines: &[&'a str], section: &str) -> Result<Option<Vec<&'a str>>> {
    let begin = format!("M  V30 BEGIN {section}");
    let end = format!("M  V30 END {section}");
    let Some(start) = lines.iter().position(|l| l.trim_end() == begin) else {
        return Ok(None);
    };
    let stop = lines[start..]
        .iter()
        .position(|l| l.trim_end() == end)
        .ok_or_else(|| AlchemapError::Parse(format!("V3000: missing END {section}")))?;
    Ok(Some(lines[start + 1..start + stop].to_vec()))
}

fn assemble(name: String, records: Vec<CtabAtom>, bonds: Vec<Bond>) -> Result<Molecule> {
    for bond in &bonds {
        if bond.atom1 >= records.len() || bond.atom2 >= records.len() {
            return Err(AlchemapError::Parse(format!(
                "MOL block '{name}': bond {}-{} references a missing atom",
                bond.atom1 + 1,
                bond.atom2 + 1
            )));
        }
    }

    let (mut atoms, coords): (Vec<MolAtom>, Vec<[f64; 3]>) =
        records.into_iter().map(|r| (r.atom, r.position)).unzip();
    mark_aromatic_atoms(&mut atoms, &bonds);

    let mut mol = Molecule::new(name, atoms, bonds);
    mol.fill_implicit_hydrogens();
    assign_chirality_from_coords(&mut mol, &coords);
    Ok(mol)
}

fn fixed_field<T: std::str::FromStr>(line: &str, start: usize, end: usize, what: &str) -> Result<T> {
    line.get(start..end.min(line.len()))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| AlchemapError::Parse(format!("invalid {what} in '{line}'")))
}

fn parse_token<T: std::str::FromStr>(token: &str, what: &str) -> Result<T> {
    token
        .parse()
        .map_err(|_| AlchemapError::Parse(format!("invalid {what} '{token}'")))
}

fn bond_from_type(a1: usize, a2: usize, bond_type: u8) -> Result<Bond> {
    if a1 == 0 || a2 == 0 {
        return Err(AlchemapError::Parse("bond atom indices must be >= 1".into()));
    }
    let order = match bond_type {
        2 => BondOrder::Double,
        3 => BondOrder::Triple,
        4 => BondOrder::Aromatic,
        _ => BondOrder::Single,
    };
    Ok(Bond::new(a1 - 1, a2 - 1, order))
}

fn parse_v2000_atom(line: &str) -> Result<CtabAtom> {
    // xxxxx.xxxxyyyyy.yyyyzzzzz.zzzz aaaddccc
    if line.len() < 34 {
        return Err(AlchemapError::Parse(format!("atom line too short: '{line}'")));
    }
    let position = [
        fixed_field::<f64>(line, 0, 10, "x coordinate")?,
        fixed_field::<f64>(line, 10, 20, "y coordinate")?,
        fixed_field::<f64>(line, 20, 30, "z coordinate")?,
    ];

    let symbol = line[31..34].trim();
    let elem = element_by_symbol(symbol)
        .ok_or_else(|| AlchemapError::Parse(format!("unknown element '{symbol}' in MOL atom block")))?;

    let mut atom = MolAtom::new(elem.atomic_number);
    // Old-style charge column: 1=+3, 2=+2, 3=+1, 5=-1, 6=-2, 7=-3.
    atom.formal_charge = match line.get(36..39).map(str::trim) {
        Some("1") => 3,
        Some("2") => 2,
        Some("3") => 1,
        Some("5") => -1,
        Some("6") => -2,
        Some("7") => -3,
        _ => 0,
    };
    Ok(CtabAtom { atom, position })
}

fn parse_v2000_bond(line: &str) -> Result<Bond> {
    // 111222ttt
    let a1 = fixed_field::<usize>(line, 0, 3, "bond atom")?;
    let a2 = fixed_field::<usize>(line, 3, 6, "bond atom")?;
    let bond_type = fixed_field::<u8>(line, 6, 9, "bond type")?;
    bond_from_type(a1, a2, bond_type)
}

/// `M  CHG  n  aaa vvv  aaa vvv ...` and the other per-atom property lines.
fn apply_property_line(
    line: &str,
    atoms: &mut [CtabAtom],
    mut apply: impl FnMut(&mut CtabAtom, i32),
) -> Result<()> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 3 {
        return Ok(());
    }
    let count: usize = parse_token(parts[2], "property count")?;
    for pair in parts[3..].chunks_exact(2).take(count) {
        let idx: usize = parse_token(pair[0], "property atom index")?;
        let value: i32 = parse_token(pair[1], "property value")?;
        if let Some(atom) = idx.checked_sub(1).and_then(|i| atoms.get_mut(i)) {
            apply(atom, value);
        }
    }
    Ok(())
}

fn strip_v30(line: &str) -> Result<&str> {
    line.trim()
        .strip_prefix("M  V30")
        .map(str::trim_start)
        .ok_or_else(|| AlchemapError::Parse(format!("V3000: line missing prefix: '{line}'")))
}

/// `M  V30 idx symbol x y z aamap [CHG=val] [MASS=val] ...`
fn parse_v3000_atom(line: &str) -> Result<CtabAtom> {
    let parts: Vec<&str> = strip_v30(line)?.split_whitespace().collect();
    if parts.len() < 6 {
        return Err(AlchemapError::Parse(format!("V3000: atom line too short: '{line}'")));
    }

    let symbol = parts[1];
    let elem = element_by_symbol(symbol)
        .ok_or_else(|| AlchemapError::Parse(format!("V3000: unknown element '{symbol}'")))?;
    let position = [
        parse_token(parts[2], "x coordinate")?,
        parse_token(parts[3], "y coordinate")?,
        parse_token(parts[4], "z coordinate")?,
    ];

    let mut atom = MolAtom::new(elem.atomic_number);
    for field in &parts[6..] {
        if let Some(val) = field.strip_prefix("CHG=") {
            atom.formal_charge = parse_token(val, "CHG value")?;
        } else if let Some(val) = field.strip_prefix("MASS=") {
            atom.isotope = Some(parse_token(val, "MASS value")?);
        }
    }
    Ok(CtabAtom { atom, position })
}

/// `M  V30 idx type atom1 atom2 [CFG=val] ...`
fn parse_v3000_bond(line: &str) -> Result<Bond> {
    let parts: Vec<&str> = strip_v30(line)?.split_whitespace().collect();
    if parts.len() < 4 {
        return Err(AlchemapError::Parse(format!("V3000: bond line too short: '{line}'")));
    }
    bond_from_type(
        parse_token(parts[2], "V3000 bond atom")?,
        parse_token(parts[3], "V3000 bond atom")?,
        parse_token(parts[1], "V3000 bond type")?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::molecule::Chirality;
    use alchemap_core::Annotated;

    fn methane_v2000() -> &'static str {
        "\
Methane
     RDKit          3D

  1  0  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
M  END"
    }

    fn methane_v3000() -> &'static str {
        "\
Methane
     RDKit          3D

  0  0  0  0  0  0  0  0  0  0  0 V3000
M  V30 BEGIN CTAB
M  V30 COUNTS 1 0 0 0 0
M  V30 BEGIN ATOM
M  V30 1 C 0.0000 0.0000 0.0000 0
M  V30 END ATOM
M  V30 END CTAB
M  END"
    }

    /// Bromochlorofluoromethane with explicit H, in two mirror-image forms.
    fn chfclbr(mirror: bool) -> String {
        let y = if mirror { -0.9430 } else { 0.9430 };
        format!(
            "\
CHFClBr
     test           3D

  5  4  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    0.0000    0.0000    1.0900 H   0  0  0  0  0  0  0  0  0  0  0  0
    1.0277    0.0000   -0.3633 F   0  0  0  0  0  0  0  0  0  0  0  0
   -0.5138 {y:9.4}   -0.3633 Cl  0  0  0  0  0  0  0  0  0  0  0  0
   -0.5138 {:9.4}   -0.3633 Br  0  0  0  0  0  0  0  0  0  0  0  0
  1  2  1  0
  1  3  1  0
  1  4  1  0
  1  5  1  0
M  END",
            -y
        )
    }

    #[test]
    fn parse_minimal_v2000() {
        let mol = parse_mol_v2000(methane_v2000()).unwrap();
        assert_eq!(mol.name(), "Methane");
        assert_eq!(mol.atom_count(), 1);
        assert_eq!(mol.bond_count(), 0);
        assert_eq!(mol.atoms[0].atomic_number, 6);
        assert_eq!(mol.atoms[0].implicit_hydrogens, 4);
    }

    #[test]
    fn charge_and_isotope_properties() {
        let block = "\
Charged
     test           3D

  2  1  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 N   0  0  0  0  0  0  0  0  0  0  0  0
    1.0000    0.0000    0.0000 O   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  1  0
M  CHG  2   1   1   2  -1
M  ISO  1   1  15
M  END";
        let mol = parse_mol_v2000(block).unwrap();
        assert_eq!(mol.atoms[0].formal_charge, 1);
        assert_eq!(mol.atoms[1].formal_charge, -1);
        assert_eq!(mol.atoms[0].isotope, Some(15));
        assert_eq!(mol.atoms[0].implicit_hydrogens, 3);
        assert_eq!(mol.atoms[1].implicit_hydrogens, 0);
    }

    #[test]
    fn aromatic_bonds_flag_atoms() {
        let mut block = String::from("benzene\n     test           3D\n\n  6  6  0  0  0  0  0  0  0  0999 V2000\n");
        for _ in 0..6 {
            block.push_str("    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0\n");
        }
        for i in 1..=6 {
            block.push_str(&format!("{:3}{:3}  4  0\n", i, i % 6 + 1));
        }
        block.push_str("M  END");
        let mol = parse_mol_v2000(&block).unwrap();
        assert!(mol.atoms.iter().all(|a| a.is_aromatic));
        assert!(mol.atoms.iter().all(|a| a.implicit_hydrogens == 1));
    }

    #[test]
    fn chirality_from_coordinates() {
        let left = parse_mol_v2000(&chfclbr(false)).unwrap();
        let right = parse_mol_v2000(&chfclbr(true)).unwrap();
        assert_ne!(left.atoms[0].chirality, Chirality::None);
        assert_ne!(right.atoms[0].chirality, Chirality::None);
        assert_ne!(left.atoms[0].chirality, right.atoms[0].chirality);
    }

    #[test]
    fn multi_record_sdf() {
        let sdf = format!(
            "{}\n>  <score>\n1.5\n\n$$$$\n{}\n$$$$\n",
            methane_v2000(),
            methane_v3000()
        );
        let results = parse_sdf(&sdf);
        assert_eq!(results.len(), 2);
        for mol in results {
            let mol = mol.unwrap();
            assert_eq!(mol.name(), "Methane");
            assert_eq!(mol.atom_count(), 1);
        }
    }

    #[test]
    fn v3000_with_bonds_and_charges() {
        let block = "\
Hydroxide
     test           3D

  0  0  0  0  0  0  0  0  0  0  0 V3000
M  V30 BEGIN CTAB
M  V30 COUNTS 2 1 0 0 0
M  V30 BEGIN ATOM
M  V30 1 O 0.0000 0.0000 0.0000 0 CHG=-1
M  V30 2 H 0.9600 0.0000 0.0000 0
M  V30 END ATOM
M  V30 BEGIN BOND
M  V30 1 1 1 2
M  V30 END BOND
M  V30 END CTAB
M  END";
        let mol = parse_mol_v3000(block).unwrap();
        assert_eq!(mol.atom_count(), 2);
        assert_eq!(mol.bond_count(), 1);
        assert_eq!(mol.atoms[0].formal_charge, -1);
        assert_eq!(mol.bonds[0].order, BondOrder::Single);
        assert_eq!((mol.bonds[0].atom1, mol.bonds[0].atom2), (0, 1));
    }

    #[test]
    fn malformed_blocks_are_errors() {
        assert!(parse_mol_v2000("too\nshort").is_err());
        assert!(parse_mol_v2000("name\nprog\ncomment\nabc  0").is_err());

        let dangling = "\
Dangling
     test           3D

  1  1  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  1  0
M  END";
        assert!(parse_mol_v2000(dangling).is_err());

        let missing_atoms = "\
Bad
     test           3D

  0  0  0  0  0  0  0  0  0  0  0 V3000
M  V30 BEGIN CTAB
M  V30 COUNTS 1 0 0 0 0
M  V30 END CTAB
M  END";
        assert!(parse_mol_v3000(missing_atoms).is_err());
    }
}
