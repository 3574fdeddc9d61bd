//! Scoring and matrix-building options.

use alchemap_chem::McsParams;

/// How strictly ring-membership conflicts are trimmed from the common core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrimMode {
    /// Every atom whose ring count disagrees with a ring-bound parent atom is
    /// removed.
    #[default]
    Strict,
    /// Aromatic atoms are exempt from ring-count conflicts.
    Loose,
}

/// One of the pair scoring rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rule {
    /// Electrostatic compatibility: equal net charge.
    Ecr,
    /// Common core size relative to both molecules.
    Mcsr,
    /// Minimum number of common atoms.
    Mncar,
    /// Common core size after trimming ring and stereo conflicts.
    Tmcsr,
}

impl Rule {
    pub const ALL: [Rule; 4] = [Rule::Ecr, Rule::Mcsr, Rule::Mncar, Rule::Tmcsr];

    pub fn name(self) -> &'static str {
        match self {
            Rule::Ecr => "ecr",
            Rule::Mcsr => "mcsr",
            Rule::Mncar => "mncar",
            Rule::Tmcsr => "tmcsr",
        }
    }
}

/// Parameters of the pair scoring rules.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoringRules {
    /// Decay rate of MCSR; TMCSR decays at twice this rate.
    pub beta: f64,
    /// Common-atom threshold of MNCAR.
    pub mncar_threshold: usize,
    pub trim_mode: TrimMode,
    /// Largest net-charge difference ECR still accepts (exclusive).
    pub ecr_tolerance: f64,
    /// Rules multiplied into the pair score. Disabled rules contribute 1.0.
    pub rules: Vec<Rule>,
}

impl Default for ScoringRules {
    fn default() -> Self {
        ScoringRules {
            beta: 0.1,
            mncar_threshold: 4,
            trim_mode: TrimMode::Strict,
            ecr_tolerance: 1e-3,
            rules: Rule::ALL.to_vec(),
        }
    }
}

impl ScoringRules {
    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    pub fn with_mncar_threshold(mut self, threshold: usize) -> Self {
        self.mncar_threshold = threshold;
        self
    }

    pub fn with_trim_mode(mut self, mode: TrimMode) -> Self {
        self.trim_mode = mode;
        self
    }

    /// Restrict scoring to the given rules.
    pub fn with_rules(mut self, rules: &[Rule]) -> Self {
        self.rules = rules.to_vec();
        self
    }

    pub fn is_enabled(&self, rule: Rule) -> bool {
        self.rules.contains(&rule)
    }
}

/// Everything [`crate::build_matrix_with`] needs besides the molecules.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuildOptions {
    pub scoring: ScoringRules,
    pub mcs: McsParams,
    /// Requested worker count; `<= 0` means all available cores.
    pub concurrency: i32,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            scoring: ScoringRules::default(),
            mcs: McsParams::loose(),
            concurrency: 1,
        }
    }
}
