//! `alchemap`: score every pair of a ligand set for relative free-energy
//! perturbation planning.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use alchemap_chem::McsParams;
use alchemap_score::{build_matrix_with, read_molecules, BuildOptions, ScoringRules, TrimMode};
use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Verbosity {
    Off,
    Info,
    Pedantic,
}

impl Verbosity {
    fn filter(self) -> &'static str {
        match self {
            Verbosity::Off => "off",
            Verbosity::Info => "info",
            Verbosity::Pedantic => "debug",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "alchemap")]
#[command(version, about = "Plan relative binding free-energy calculations by scoring ligand pairs")]
struct Cli {
    /// Files or directories containing molecules (.mol2, .sdf, .mol, .smi)
    #[arg(required = true)]
    molfiles: Vec<PathBuf>,

    /// Maximum time in seconds for each MCS search
    #[arg(short, long, default_value_t = 20.0, allow_negative_numbers = true)]
    time: f64,

    /// Number of worker threads; 0 or less uses every core
    #[arg(short = 'n', long, default_value_t = 1, allow_negative_numbers = true)]
    nproc: i32,

    /// Log verbosity
    #[arg(short, long, value_enum, default_value_t = Verbosity::Info)]
    verbose: Verbosity,

    /// Write log messages to this file instead of stderr
    #[arg(short, long)]
    logfile: Option<PathBuf>,

    /// Write the score table and pair breakdown to files
    #[arg(short, long)]
    output: bool,

    /// Prefix of the output files
    #[arg(long, default_value = "out")]
    name: String,

    /// Decay rate of the size rules
    #[arg(long, default_value_t = 0.1)]
    beta: f64,

    /// Minimum number of common heavy atoms
    #[arg(long, default_value_t = 4)]
    threshold: usize,

    /// Tolerate ring-count conflicts on aromatic atoms when trimming
    #[arg(long)]
    loose: bool,
}

impl Cli {
    fn build_options(&self) -> anyhow::Result<BuildOptions> {
        let trim_mode = if self.loose { TrimMode::Loose } else { TrimMode::Strict };
        let mcs = McsParams::loose()
            .with_timeout_secs(self.time)
            .context("invalid --time")?;
        Ok(BuildOptions {
            scoring: ScoringRules::default()
                .with_beta(self.beta)
                .with_mncar_threshold(self.threshold)
                .with_trim_mode(trim_mode),
            mcs,
            concurrency: self.nproc,
        })
    }
}

fn init_logging(verbose: Verbosity, logfile: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbose.filter()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    match logfile {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(io::stderr).init(),
    }
    Ok(())
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let options = cli.build_options()?;
    let molecules = read_molecules(&cli.molfiles)?;
    let matrix = build_matrix_with(&molecules, &options)?;

    if cli.output {
        let score_path = PathBuf::from(format!("{}_score.txt", cli.name));
        let pairs_path = PathBuf::from(format!("{}_pairs.txt", cli.name));
        let create = |path: &Path| {
            File::create(path)
                .map(BufWriter::new)
                .with_context(|| format!("cannot create {}", path.display()))
        };
        matrix.write_score_table(create(&score_path)?)?;
        matrix.write_pairs(create(&pairs_path)?)?;
        info!(scores = %score_path.display(), pairs = %pairs_path.display(), "results written");
    } else {
        matrix.write_score_table(io::stdout().lock())?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.verbose, cli.logfile.as_deref()) {
        eprintln!("error: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["alchemap", "ligands.mol2"]).unwrap();
        assert_eq!(cli.time, 20.0);
        assert_eq!(cli.nproc, 1);
        assert_eq!(cli.verbose, Verbosity::Info);
        assert!(!cli.output);
        assert_eq!(cli.name, "out");

        let opts = cli.build_options().unwrap();
        assert_eq!(opts.concurrency, 1);
        assert_eq!(opts.mcs.timeout, Some(Duration::from_secs(20)));
        assert_eq!(opts.scoring.trim_mode, TrimMode::Strict);
    }

    #[test]
    fn all_flags() {
        let cli = Cli::try_parse_from([
            "alchemap", "a.sdf", "b.smi", "-t", "2.5", "-n", "-1", "-v", "pedantic", "-o",
            "--name", "run1", "--beta", "0.2", "--threshold", "6", "--loose",
        ])
        .unwrap();
        assert_eq!(cli.molfiles.len(), 2);
        assert_eq!(cli.nproc, -1);
        assert_eq!(cli.verbose.filter(), "debug");
        let opts = cli.build_options().unwrap();
        assert_eq!(opts.mcs.timeout, Some(Duration::from_millis(2500)));
        assert_eq!(opts.scoring.beta, 0.2);
        assert_eq!(opts.scoring.mncar_threshold, 6);
        assert_eq!(opts.scoring.trim_mode, TrimMode::Loose);
    }

    #[test]
    fn non_positive_time_is_rejected() {
        for time in ["-5", "0"] {
            let cli = Cli::try_parse_from(["alchemap", "x.smi", "-t", time]).unwrap();
            let err = cli.build_options().unwrap_err();
            assert!(matches!(
                err.downcast_ref::<alchemap_core::AlchemapError>(),
                Some(alchemap_core::AlchemapError::InvalidInput(_))
            ));
            // Rejected before any input is read.
            assert!(run(&cli).is_err());
        }
    }

    #[test]
    fn molecule_files_are_required() {
        assert!(Cli::try_parse_from(["alchemap"]).is_err());
        assert!(Cli::try_parse_from(["alchemap", "x.smi", "-v", "loud"]).is_err());
    }

    #[test]
    fn writes_output_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("set.smi");
        std::fs::write(&input, "c1ccccc1C toluene\nc1ccccc1O phenol\nc1ccccc1CC ethylbenzene\n").unwrap();
        let prefix = dir.path().join("run");
        let cli = Cli::try_parse_from([
            "alchemap".to_string(),
            input.display().to_string(),
            "-o".to_string(),
            "--name".to_string(),
            prefix.display().to_string(),
        ])
        .unwrap();
        run(&cli).unwrap();

        let table = std::fs::read_to_string(format!("{}_score.txt", prefix.display())).unwrap();
        assert_eq!(table.lines().count(), 4);
        assert!(table.starts_with("\ttoluene\tphenol\tethylbenzene"));
        let pairs = std::fs::read_to_string(format!("{}_pairs.txt", prefix.display())).unwrap();
        assert_eq!(pairs.lines().count(), 4);
    }

    #[test]
    fn no_molecules_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.smi");
        std::fs::write(&input, "").unwrap();
        let cli = Cli::try_parse_from(["alchemap".to_string(), input.display().to_string()]).unwrap();
        let err = run(&cli).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<alchemap_core::AlchemapError>(),
            Some(alchemap_core::AlchemapError::NoMolecules)
        ));
    }
}
