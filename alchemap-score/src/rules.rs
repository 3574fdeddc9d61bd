//! Pair scoring rules.
//!
//! Each rule maps a ligand pair to a non-negative score; a pair's score is
//! the product of the enabled rules, so any rule returning 0.0 vetoes the
//! pair.

use alchemap_chem::{McsParams, Molecule};
use alchemap_core::{Result, Scored};

use crate::config::{Rule, ScoringRules, TrimMode};
use crate::mapping::{compute_mapping, McsResult};
use crate::trim::trim_mcs;

/// Electrostatic compatibility: 1.0 when both molecules carry the same net
/// charge within `tolerance`, else 0.0.
///
/// Uses the stored partial charges of the full molecules, falling back to
/// Gasteiger charges for molecules read without them.
pub fn ecr(left: &Molecule, right: &Molecule, tolerance: f64) -> f64 {
    let diff = (left.total_partial_charge() - right.total_partial_charge()).abs();
    if diff < tolerance {
        1.0
    } else {
        0.0
    }
}

/// Common core size: `exp(-beta * (heavy(left) + heavy(right) - 2 * heavy(mcs)))`.
///
/// `heavy(mcs)` counts the common atoms that are heavy in both parents, see
/// [`McsResult::is_heavy_common`].
pub fn mcsr(result: &McsResult, beta: f64) -> f64 {
    let uncovered = (result.left.heavy_atom_count() + result.right.heavy_atom_count()) as f64
        - 2.0 * result.mcs_heavy_atoms() as f64;
    (-beta * uncovered).exp()
}

/// Minimum common atoms gate.
///
/// Passes when the core has at least `threshold` heavy atoms, or when either
/// `heavy(left) + 3` or `heavy(right) + 3` is non-zero. The latter always
/// holds, so the gate never closes; the rule is kept in this form for
/// score compatibility with existing networks.
pub fn mncar(result: &McsResult, threshold: usize) -> f64 {
    let mcs = result.mcs_heavy_atoms();
    let left = result.left.heavy_atom_count();
    let right = result.right.heavy_atom_count();
    let pass = mcs >= threshold || left + 3 != 0 || right + 3 != 0;
    if pass {
        1.0
    } else {
        0.0
    }
}

/// Trimmed core size: `exp(-2 * beta * (heavy(mcs) - heavy(trimmed)))`,
/// where the trimmed core is [`trim_mcs`] of the common substructure.
pub fn tmcsr(result: &McsResult, beta: f64, mode: TrimMode) -> f64 {
    let original = result.mcs_heavy_atoms();
    let retained = trim_mcs(result, mode)
        .ids()
        .iter()
        .filter(|&&m| result.is_heavy_common(m))
        .count();
    (-2.0 * beta * (original as f64 - retained as f64)).exp()
}

/// Rule breakdown of one scored pair.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PairScore {
    pub ecr: f64,
    pub mcsr: f64,
    pub mncar: f64,
    pub tmcsr: f64,
    /// Product of the four rule scores.
    pub total: f64,
}

impl PairScore {
    pub fn new(ecr: f64, mcsr: f64, mncar: f64, tmcsr: f64) -> Self {
        PairScore {
            ecr,
            mcsr,
            mncar,
            tmcsr,
            total: ecr * mcsr * mncar * tmcsr,
        }
    }

    pub fn rule(&self, rule: Rule) -> f64 {
        match rule {
            Rule::Ecr => self.ecr,
            Rule::Mcsr => self.mcsr,
            Rule::Mncar => self.mncar,
            Rule::Tmcsr => self.tmcsr,
        }
    }
}

impl Scored for PairScore {
    fn score(&self) -> f64 {
        self.total
    }
}

/// Apply the enabled rules to a mapped pair. Disabled rules score 1.0.
pub fn score_pair(left: &Molecule, right: &Molecule, result: &McsResult, rules: &ScoringRules) -> PairScore {
    let rule = |r: Rule, f: &dyn Fn() -> f64| if rules.is_enabled(r) { f() } else { 1.0 };
    PairScore::new(
        rule(Rule::Ecr, &|| ecr(left, right, rules.ecr_tolerance)),
        rule(Rule::Mcsr, &|| mcsr(result, rules.beta)),
        rule(Rule::Mncar, &|| mncar(result, rules.mncar_threshold)),
        rule(Rule::Tmcsr, &|| tmcsr(result, rules.beta, rules.trim_mode)),
    )
}

/// Map and score one pair.
pub fn evaluate_pair(
    left: &Molecule,
    right: &Molecule,
    rules: &ScoringRules,
    params: &McsParams,
) -> Result<PairScore> {
    let result = compute_mapping(left, right, params)?;
    Ok(score_pair(left, right, &result, rules))
}
