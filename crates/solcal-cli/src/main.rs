//! solcal - Solitaire solver calibration harness
//!
//! ## Commands
//!
//! - `calibrate`: find the highest level each variant solves in time
//! - `replay`: re-classify the stuck deals in a solver session log
//! - `compare`: check that disabling an optimisation never changes a verdict
//! - `describe`: print the ruleset for a variant and level
//! - `variants`: list the known variants

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};

use solcal_core::{LogFormat, PileOrder, TemplateSource, Variant, VARIANT_TABLE};
use solcal_runner::{
    render_comparison, render_summary_md, write_summary_json, CalibrationLoop, ClassifyOutcome,
    DisabledBehavior, HarnessConfig, HarnessMode, OptimisationComparison, ProcessSweep,
    ResultAggregator, SolverProcess, StuckDealReplay, TrialExecutor,
};

#[derive(Parser)]
#[command(name = "solcal")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Calibration harness for an external solitaire solver", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Harness config file (JSON)
    #[arg(long, global = true, env = "SOLCAL_CONFIG")]
    config: Option<PathBuf>,

    /// Solver executable; overrides --solver-root
    #[arg(long, global = true, env = "SOLCAL_SOLVER")]
    solver: Option<PathBuf>,

    /// Solver checkout containing the cmake-build-* directories
    #[arg(long, global = true, env = "SOLCAL_SOLVER_ROOT")]
    solver_root: Option<PathBuf>,

    /// Directory of <variant>.json templates replacing the built-in ones
    #[arg(long, global = true, env = "SOLCAL_TEMPLATES")]
    templates: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Escalate each variant until the solver stops keeping up
    Calibrate {
        /// debug, release, or one --no-* solver flag
        #[arg(allow_hyphen_values = true)]
        mode: Option<String>,

        /// Variant to calibrate (repeatable; default: all)
        #[arg(long = "variant", value_name = "VARIANT")]
        variants: Vec<Variant>,

        /// Highest level attempted
        #[arg(long, env = "SOLCAL_MAX_LEVEL")]
        max_level: Option<u32>,

        /// Trials per level
        #[arg(long, env = "SOLCAL_TRIALS")]
        trials: Option<u32>,

        /// Per-trial budget in milliseconds
        #[arg(long, env = "SOLCAL_TRIAL_TIMEOUT_MS")]
        timeout_ms: Option<u64>,

        /// Timeouts a level may have and still pass
        #[arg(long, env = "SOLCAL_THRESHOLD")]
        threshold: Option<u32>,

        /// Also write the summary table as JSON
        #[arg(long)]
        summary_json: Option<PathBuf>,
    },

    /// Re-classify every stuck deal in a session log
    Replay {
        /// Session log to scan
        log: PathBuf,

        /// Solver preset the deals are solved under
        #[arg(long)]
        solver_type: Option<String>,

        /// Header prefix naming the variant
        #[arg(long)]
        prefix: Option<String>,

        /// Classify budget per deal in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Treat the leftmost printed card as the top of its pile
        #[arg(long)]
        reversed: bool,
    },

    /// Compare verdicts with and without a solver optimisation
    Compare {
        /// Behaviour to disable (repeatable), e.g. card-just-moved
        #[arg(long = "disable", value_name = "BEHAVIOUR", allow_hyphen_values = true)]
        behaviors: Vec<DisabledBehavior>,

        /// Preset to compare (repeatable)
        #[arg(long = "preset", value_name = "PRESET")]
        presets: Vec<String>,

        /// Seeds 0..RUNS per preset
        #[arg(long)]
        runs: Option<u64>,
    },

    /// Print the ruleset for a variant at a level
    Describe {
        variant: Variant,
        level: u32,
    },

    /// List variants and their minimum levels
    Variants,
}

impl Commands {
    /// Whether the command spawns the solver.
    fn drives_solver(&self) -> bool {
        matches!(
            self,
            Commands::Calibrate { .. } | Commands::Replay { .. } | Commands::Compare { .. }
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    solcal_core::init_tracing(LogFormat::from_json_flag(cli.json), level);

    let config = load_config(&cli)?;

    // Stray solver processes are swept on every exit path, interrupt included.
    let _sweep = cli
        .command
        .drives_solver()
        .then(|| ProcessSweep::new(&config.solver.process_name()));

    tokio::select! {
        result = run(cli.command, config) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted");
            anyhow::bail!("interrupted")
        }
    }
}

fn load_config(cli: &Cli) -> Result<HarnessConfig> {
    let mut config = match &cli.config {
        Some(path) => HarnessConfig::load(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => HarnessConfig::default(),
    };
    if let Some(binary) = &cli.solver {
        config.solver.binary = Some(binary.clone());
    }
    if let Some(root) = &cli.solver_root {
        config.solver.root = root.clone();
    }
    if let Some(dir) = &cli.templates {
        config.templates = TemplateSource::Directory(dir.clone());
    }
    Ok(config)
}

async fn run(command: Commands, mut config: HarnessConfig) -> Result<()> {
    match command {
        Commands::Calibrate {
            mode,
            variants,
            max_level,
            trials,
            timeout_ms,
            threshold,
            summary_json,
        } => {
            if !variants.is_empty() {
                config.variants = variants;
            }
            let policy = &mut config.calibration;
            policy.max_level = max_level.unwrap_or(policy.max_level);
            policy.trials_per_level = trials.unwrap_or(policy.trials_per_level);
            policy.trial_timeout_ms = timeout_ms.unwrap_or(policy.trial_timeout_ms);
            policy.timeout_threshold = threshold.unwrap_or(policy.timeout_threshold);
            cmd_calibrate(config, mode.as_deref(), summary_json.as_deref()).await
        }
        Commands::Replay {
            log,
            solver_type,
            prefix,
            timeout_ms,
            reversed,
        } => {
            let replay = &mut config.replay;
            if let Some(solver_type) = solver_type {
                replay.solver_type = solver_type;
            }
            if let Some(prefix) = prefix {
                replay.extractor.variant_prefix = prefix;
            }
            replay.timeout_ms = timeout_ms.unwrap_or(replay.timeout_ms);
            if reversed {
                replay.order = PileOrder::Reversed;
            }
            cmd_replay(config, &log).await
        }
        Commands::Compare {
            behaviors,
            presets,
            runs,
        } => {
            let comparison = &mut config.comparison;
            if !behaviors.is_empty() {
                comparison.behaviors = behaviors;
            }
            if !presets.is_empty() {
                comparison.presets = presets;
            }
            comparison.runs = runs.unwrap_or(comparison.runs);
            cmd_compare(config).await
        }
        Commands::Describe { variant, level } => cmd_describe(&config, variant, level),
        Commands::Variants => cmd_variants(),
    }
}

async fn cmd_calibrate(
    config: HarnessConfig,
    mode: Option<&str>,
    summary_json: Option<&Path>,
) -> Result<()> {
    let mode = HarnessMode::from_first_arg(mode);
    let solver = config.solver.clone().with_mode(mode);
    info!(
        solver = %solver.binary_path().display(),
        disabled = ?solver.disabled,
        variants = config.variants.len(),
        "Starting calibration"
    );

    let executor: Arc<dyn TrialExecutor> = Arc::new(SolverProcess::new(solver));
    let calibration = CalibrationLoop::new(executor, config.calibration.clone())
        .with_templates(config.templates.clone());
    let mut aggregator = ResultAggregator::new(config.calibration.clone());

    for variant in &config.variants {
        let result = calibration
            .calibrate(*variant)
            .await
            .with_context(|| format!("Calibration of {} failed", variant))?;

        match result.summary.highest_level_solved {
            Some(level) => println!("{}: {}", variant, level),
            None => println!("{}: no level solved", variant),
        }
        if let Some(ruleset) = &result.failing_ruleset {
            println!("Game description at level {}:", ruleset.level());
            println!("{}", ruleset);
        }
        aggregator.record(&result);
    }

    let table = aggregator.finish();
    println!();
    print!("{}", render_summary_md(&table));

    if let Some(path) = summary_json {
        write_summary_json(path, &table).with_context(|| format!("write {:?}", path))?;
        info!(path = %path.display(), "Summary written");
    }
    Ok(())
}

async fn cmd_replay(config: HarnessConfig, log: &Path) -> Result<()> {
    let text =
        std::fs::read_to_string(log).with_context(|| format!("Failed to read log {:?}", log))?;

    let executor: Arc<dyn TrialExecutor> = Arc::new(SolverProcess::new(config.solver.clone()));
    let verdicts = StuckDealReplay::new(executor, config.replay.clone())
        .replay(&text)
        .await
        .context("Replay failed")?;

    if verdicts.is_empty() {
        println!("No stuck deals found in {:?}", log);
    }
    for verdict in &verdicts {
        println!(
            "deal {} (line {}): {}",
            verdict.index + 1,
            verdict.header_line,
            classify_label(verdict.outcome)
        );
    }
    Ok(())
}

fn classify_label(outcome: ClassifyOutcome) -> &'static str {
    match outcome {
        ClassifyOutcome::Solved => "Solved",
        ClassifyOutcome::NoSolution => "No solution",
        ClassifyOutcome::Timeout => "Timed out",
    }
}

async fn cmd_compare(config: HarnessConfig) -> Result<()> {
    let comparison = &config.comparison;
    let baseline: Arc<dyn TrialExecutor> = Arc::new(SolverProcess::new(config.solver.clone()));

    for behavior in &comparison.behaviors {
        info!(behavior = behavior.flag(), presets = comparison.presets.len(), "Comparing");
        let candidate: Arc<dyn TrialExecutor> =
            Arc::new(SolverProcess::new(config.solver.disabling(*behavior)));
        let results = OptimisationComparison::new(
            baseline.clone(),
            candidate,
            comparison.runs,
            comparison.timeout(),
        )
        .compare_all(&comparison.presets)
        .await
        .with_context(|| format!("Comparison for {} failed", behavior.flag()))?;

        print!("{}", render_comparison(*behavior, &results));
    }
    Ok(())
}

fn cmd_describe(config: &HarnessConfig, variant: Variant, level: u32) -> Result<()> {
    let ruleset = config
        .templates
        .parameterize(variant, level)
        .with_context(|| format!("Cannot build {} at level {}", variant, level))?;
    println!("{}", ruleset);
    println!("sha256: {}", ruleset.digest()?);
    Ok(())
}

fn cmd_variants() -> Result<()> {
    println!("{:<18} min level", "variant");
    for spec in VARIANT_TABLE.iter() {
        println!("{:<18} {}", spec.name, spec.min_level);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_calibrate_accepts_mode_flag() {
        let cli = Cli::try_parse_from([
            "solcal",
            "calibrate",
            "--variant",
            "free-cell",
            "--max-level",
            "5",
            "--no-reduced-state",
        ])
        .expect("parse failed");

        match cli.command {
            Commands::Calibrate {
                mode,
                variants,
                max_level,
                ..
            } => {
                assert_eq!(mode.as_deref(), Some("--no-reduced-state"));
                assert_eq!(variants, vec![Variant::FreeCell]);
                assert_eq!(max_level, Some(5));
            }
            _ => panic!("expected calibrate"),
        }
    }

    #[test]
    fn test_unknown_variant_rejected() {
        assert!(Cli::try_parse_from(["solcal", "describe", "klondike", "3"]).is_err());
    }

    #[test]
    fn test_compare_parses_behaviours() {
        let cli = Cli::try_parse_from([
            "solcal",
            "compare",
            "--disable",
            "card-just-moved",
            "--disable",
            "--no-pile-symmetry",
            "--runs",
            "10",
        ])
        .expect("parse failed");

        match cli.command {
            Commands::Compare { behaviors, runs, .. } => {
                assert_eq!(
                    behaviors,
                    vec![DisabledBehavior::CardJustMoved, DisabledBehavior::PileSymmetry]
                );
                assert_eq!(runs, Some(10));
            }
            _ => panic!("expected compare"),
        }
    }

    #[test]
    fn test_global_flags_override_config() {
        let cli = Cli::try_parse_from([
            "solcal",
            "--solver-root",
            "/src/solvitaire",
            "--templates",
            "resources",
            "variants",
        ])
        .expect("parse failed");

        let config = load_config(&cli).expect("config");
        assert_eq!(
            config.solver.binary_path(),
            PathBuf::from("/src/solvitaire/cmake-build-release/bin/solvitaire")
        );
        assert_eq!(config.templates, TemplateSource::Directory("resources".into()));
    }

    #[test]
    fn test_describe_rejects_level_below_minimum() {
        let err = cmd_describe(&HarnessConfig::default(), Variant::Canfield, 1).unwrap_err();
        assert!(format!("{:#}", err).contains("requires level >= 2"));
    }

    #[test]
    fn test_describe_rejects_level_past_range() {
        let err = cmd_describe(&HarnessConfig::default(), Variant::FreeCell, 100_000_000)
            .unwrap_err();
        assert!(format!("{:#}", err).contains("overflows tableau piles"));
    }

    #[test]
    fn test_only_solver_commands_sweep() {
        let drives = |args: &[&str]| Cli::try_parse_from(args).unwrap().command.drives_solver();

        assert!(drives(&["solcal", "calibrate"]));
        assert!(drives(&["solcal", "replay", "session.log"]));
        assert!(drives(&["solcal", "compare", "--runs", "1"]));
        assert!(!drives(&["solcal", "describe", "canfield", "3"]));
        assert!(!drives(&["solcal", "variants"]));
    }
}
