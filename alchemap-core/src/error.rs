//! The error type shared by every alchemap crate.

use thiserror::Error;

/// Everything that can go wrong between reading ligands and writing scores.
#[derive(Debug, Error)]
pub enum AlchemapError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed SMILES, MOL, SD or MOL2 text.
    #[error("parse error: {0}")]
    Parse(String),

    /// Arguments or graph edits that make no sense, e.g. mismatched lengths.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The common substructure search matched no atoms.
    #[error("no common substructure between '{left}' and '{right}'")]
    NoCommonSubstructure { left: String, right: String },

    /// The common substructure search ran out of time before finding anything usable.
    #[error("MCS search between '{left}' and '{right}' timed out after {seconds}s")]
    McsTimeout {
        left: String,
        right: String,
        seconds: f64,
    },

    /// The common substructure could not be turned into a valid molecular graph.
    #[error("invalid MCS structure: {0}")]
    InvalidMcsStructure(String),

    /// A molecule file could not be read or parsed.
    #[error("failed to read molecules from {path}: {reason}")]
    MoleculeRead { path: String, reason: String },

    /// No molecule could be read from any input.
    #[error("no molecular structures found in input file(s)")]
    NoMolecules,

    #[error("{0}")]
    Other(String),
}

impl AlchemapError {
    /// Whether this error only invalidates a single molecule pair.
    ///
    /// Pair-scoped failures are turned into a zero score by the matrix builder.
    pub fn is_pair_scoped(&self) -> bool {
        matches!(
            self,
            AlchemapError::NoCommonSubstructure { .. }
                | AlchemapError::McsTimeout { .. }
                | AlchemapError::InvalidMcsStructure(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AlchemapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_scoped_classification() {
        let timeout = AlchemapError::McsTimeout {
            left: "a".into(),
            right: "b".into(),
            seconds: 1.0,
        };
        assert!(timeout.is_pair_scoped());
        assert!(AlchemapError::InvalidMcsStructure("x".into()).is_pair_scoped());
        assert!(!AlchemapError::NoMolecules.is_pair_scoped());
        assert!(!AlchemapError::Parse("bad".into()).is_pair_scoped());
    }

    #[test]
    fn display_names_both_molecules() {
        let err = AlchemapError::NoCommonSubstructure {
            left: "ethanol".into(),
            right: "water".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ethanol") && msg.contains("water"));
    }
}
