//! Reading ligand sets from files and directories.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use alchemap_chem::{parse_mol2, parse_mol_block, parse_sdf, parse_smiles_named, Molecule};
use alchemap_core::{AlchemapError, Annotated, ContentAddressable, Result, Summarizable};
use tracing::{debug, info, warn};

/// File extensions [`read_molecule_file`] understands.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mol2", "sdf", "mol", "smi", "smiles"];

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn is_supported(path: &Path) -> bool {
    extension(path).is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
}

/// Parse every record of one molecule file.
///
/// The format follows the file extension. Fails when the file cannot be read
/// or has an unsupported extension; individual records that fail to parse
/// are returned as errors alongside the good ones.
pub fn read_molecule_file(path: &Path) -> Result<Vec<Result<Molecule>>> {
    let read_error = |reason: String| AlchemapError::MoleculeRead {
        path: path.display().to_string(),
        reason,
    };
    let format = extension(path)
        .filter(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
        .ok_or_else(|| read_error("unsupported file extension".into()))?;
    let content = fs::read_to_string(path).map_err(|e| read_error(e.to_string()))?;

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("mol")
        .to_string();

    let records = match format.as_str() {
        "mol2" => parse_mol2(&content),
        "sdf" => parse_sdf(&content),
        "mol" => vec![parse_mol_block(&content)],
        _ => parse_smiles_lines(&content),
    };

    // Records without a title are named after the file.
    let single = records.len() == 1;
    Ok(records
        .into_iter()
        .enumerate()
        .map(|(k, record)| {
            record.map(|mut mol| {
                if mol.name().trim().is_empty() {
                    mol.name = if single { stem.clone() } else { format!("{stem}_{k}") };
                }
                mol
            })
        })
        .collect())
}

/// One SMILES per line, optionally followed by whitespace and a name.
/// Blank lines and `#` comments are skipped.
fn parse_smiles_lines(content: &str) -> Vec<Result<Molecule>> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|line| {
            let (smiles, name) = line
                .split_once(char::is_whitespace)
                .map_or((line, ""), |(s, n)| (s, n.trim()));
            parse_smiles_named(smiles, name)
        })
        .collect()
}

/// Expand directories into their supported files, sorted by path.
fn expand_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            match fs::read_dir(input) {
                Ok(entries) => {
                    let mut found: Vec<PathBuf> = entries
                        .filter_map(|e| e.ok().map(|e| e.path()))
                        .filter(|p| p.is_file() && is_supported(p))
                        .collect();
                    found.sort();
                    files.extend(found);
                }
                Err(e) => warn!(path = %input.display(), error = %e, "cannot list directory"),
            }
        } else {
            files.push(input.clone());
        }
    }
    files
}

/// Read all molecules from a list of files and directories.
///
/// Unreadable files and unparsable records are reported as warnings and
/// skipped. Molecules keep the order of the inputs. Fails with
/// [`AlchemapError::NoMolecules`] when nothing could be read.
pub fn read_molecules(inputs: &[PathBuf]) -> Result<Vec<Molecule>> {
    let mut molecules = Vec::new();
    for path in expand_inputs(inputs) {
        info!(path = %path.display(), "reading molecules");
        let records = match read_molecule_file(&path) {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "skipping file");
                continue;
            }
        };
        for (k, record) in records.into_iter().enumerate() {
            match record {
                Ok(mol) => molecules.push(mol),
                Err(e) => warn!(path = %path.display(), record = k, error = %e, "skipping record"),
            }
        }
    }

    if molecules.is_empty() {
        return Err(AlchemapError::NoMolecules);
    }

    let mut seen: HashMap<String, usize> = HashMap::new();
    for (i, mol) in molecules.iter().enumerate() {
        debug!(index = i, summary = %mol.summary(), "loaded");
        let hash = mol.content_hash();
        if let Some(&first) = seen.get(&hash) {
            warn!(
                first = molecules[first].name(),
                duplicate = mol.name(),
                "molecule read twice"
            );
        } else {
            seen.insert(hash, i);
        }
    }

    info!(count = molecules.len(), "molecules read");
    Ok(molecules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ETHANOL_MOL2: &str = "\
@<TRIPOS>MOLECULE
ethanol
3 2 1 0 0
SMALL
USER_CHARGES
@<TRIPOS>ATOM
1 C1 0.0000 0.0000 0.0000 C.3 1 LIG -0.1
2 C2 1.5000 0.0000 0.0000 C.3 1 LIG 0.3
3 O1 2.0000 1.2000 0.0000 O.3 1 LIG -0.2
@<TRIPOS>BOND
1 1 2 1
2 2 3 1
";

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn reads_smiles_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "set.smi",
            "# ligands\nc1ccccc1C toluene\n\nCCO\nnot_smiles!! broken\n",
        );
        let records = read_molecule_file(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].as_ref().unwrap().name(), "toluene");
        assert_eq!(records[1].as_ref().unwrap().name(), "set_1");
        assert!(records[2].is_err());
    }

    #[test]
    fn reads_mixed_formats_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let smi = write(dir.path(), "a.smi", "CCN ethylamine\n");
        let mol2 = write(dir.path(), "b.mol2", ETHANOL_MOL2);
        let mols = read_molecules(&[mol2, smi]).unwrap();
        assert_eq!(mols.len(), 2);
        assert_eq!(mols[0].name(), "ethanol");
        assert!(mols[0].partial_charges().is_some());
        assert_eq!(mols[1].name(), "ethylamine");
    }

    #[test]
    fn directories_are_expanded_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.smi", "CCC propane\n");
        write(dir.path(), "a.smi", "CC ethane\n");
        write(dir.path(), "notes.txt", "not a molecule\n");
        let mols = read_molecules(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<&str> = mols.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["ethane", "propane"]);
    }

    #[test]
    fn bad_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = write(dir.path(), "good.smi", "CCO\n");
        let unknown = write(dir.path(), "data.xyz", "3\n");
        let missing = dir.path().join("missing.sdf");
        let mols = read_molecules(&[unknown.clone(), missing, good]).unwrap();
        assert_eq!(mols.len(), 1);
        assert_eq!(mols[0].name(), "good");

        let err = read_molecule_file(&unknown).unwrap_err();
        assert!(matches!(err, AlchemapError::MoleculeRead { .. }));
    }

    #[test]
    fn nothing_readable_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let empty = write(dir.path(), "empty.smi", "# nothing\n");
        let err = read_molecules(&[empty]).unwrap_err();
        assert!(matches!(err, AlchemapError::NoMolecules));
        assert!(matches!(read_molecules(&[]), Err(AlchemapError::NoMolecules)));
    }
}
