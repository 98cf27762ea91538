//! Solver invocation: binary location, behaviour switches and the argument
//! list for a single trial.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// File name of the solver executable.
pub const SOLVER_BINARY: &str = "solvitaire";

/// Which CMake build of the solver to drive.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuildProfile {
    Debug,
    #[default]
    Release,
}

impl BuildProfile {
    /// Build directory relative to the solver checkout.
    pub fn build_dir(&self) -> &'static str {
        match self {
            BuildProfile::Debug => "cmake-build-debug",
            BuildProfile::Release => "cmake-build-release",
        }
    }
}

/// Solver search optimisations that can be switched off.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DisabledBehavior {
    SuitSymmetry,
    PileSymmetry,
    ReducedState,
    AutoFoundations,
    CardJustMoved,
}

impl DisabledBehavior {
    pub const ALL: [DisabledBehavior; 5] = [
        DisabledBehavior::SuitSymmetry,
        DisabledBehavior::PileSymmetry,
        DisabledBehavior::ReducedState,
        DisabledBehavior::AutoFoundations,
        DisabledBehavior::CardJustMoved,
    ];

    /// Solver flag that switches the behaviour off.
    pub fn flag(&self) -> &'static str {
        match self {
            DisabledBehavior::SuitSymmetry => "--no-suit-symmetry",
            DisabledBehavior::PileSymmetry => "--no-pile-symmetry",
            DisabledBehavior::ReducedState => "--no-reduced-state",
            DisabledBehavior::AutoFoundations => "--no-auto-foundations",
            DisabledBehavior::CardJustMoved => "--no-card-just-moved",
        }
    }

    /// Short form accepted as the harness mode argument.
    ///
    /// Both symmetry switches claim `-s`, so neither is reachable through it.
    pub fn short_flag(&self) -> &'static str {
        match self {
            DisabledBehavior::SuitSymmetry | DisabledBehavior::PileSymmetry => "-s",
            DisabledBehavior::ReducedState => "-r",
            DisabledBehavior::AutoFoundations => "-a",
            DisabledBehavior::CardJustMoved => "-c",
        }
    }
}

impl FromStr for DisabledBehavior {
    type Err = ModeError;

    /// Accepts the bare name (`reduced-state`) or the solver flag
    /// (`--no-reduced-state`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix("--no-").unwrap_or(s);
        DisabledBehavior::ALL
            .into_iter()
            .find(|b| b.flag().strip_prefix("--no-") == Some(name))
            .ok_or_else(|| ModeError::UnknownBehavior(s.to_string()))
    }
}

/// What the optional first harness argument selects.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HarnessMode {
    pub profile: BuildProfile,
    pub disabled: Option<DisabledBehavior>,
}

/// Why a mode argument was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModeError {
    #[error("unrecognized mode argument {0:?}")]
    Unrecognized(String),

    #[error("unknown solver behaviour {0:?}")]
    UnknownBehavior(String),

    #[error("mode argument {token:?} is ambiguous between {}", .flags.join(" and "))]
    Ambiguous {
        token: String,
        flags: Vec<&'static str>,
    },
}

impl HarnessMode {
    /// Strict parse of a mode argument.
    pub fn parse(arg: &str) -> Result<Self, ModeError> {
        match arg {
            "debug" | "-d" | "--debug" => {
                return Ok(HarnessMode {
                    profile: BuildProfile::Debug,
                    disabled: None,
                })
            }
            "release" | "--release" => return Ok(HarnessMode::default()),
            _ => {}
        }

        if let Some(behavior) = DisabledBehavior::ALL.iter().find(|b| b.flag() == arg) {
            return Ok(HarnessMode {
                profile: BuildProfile::Release,
                disabled: Some(*behavior),
            });
        }

        let matches: Vec<DisabledBehavior> = DisabledBehavior::ALL
            .into_iter()
            .filter(|b| b.short_flag() == arg)
            .collect();
        match matches.as_slice() {
            [] => Err(ModeError::Unrecognized(arg.to_string())),
            [behavior] => Ok(HarnessMode {
                profile: BuildProfile::Release,
                disabled: Some(*behavior),
            }),
            several => Err(ModeError::Ambiguous {
                token: arg.to_string(),
                flags: several.iter().map(DisabledBehavior::flag).collect(),
            }),
        }
    }

    /// Lenient parse: anything unusable falls back to the default mode.
    pub fn from_first_arg(arg: Option<&str>) -> Self {
        match arg.map(HarnessMode::parse) {
            None => HarnessMode::default(),
            Some(Ok(mode)) => mode,
            Some(Err(e)) => {
                warn!(error = %e, "Falling back to release build with all behaviours enabled");
                HarnessMode::default()
            }
        }
    }
}

/// Location of the solver and switches applied to every invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SolverConfig {
    /// Explicit solver path. Overrides `root` and `profile`.
    pub binary: Option<PathBuf>,

    /// Solver checkout containing the CMake build directories.
    pub root: PathBuf,

    pub profile: BuildProfile,

    /// Behaviours switched off on every invocation.
    pub disabled: Vec<DisabledBehavior>,

    /// Extra wall-clock allowance on top of the solver's own timeout in
    /// classify mode, in milliseconds.
    pub classify_grace_ms: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            binary: None,
            root: PathBuf::from("."),
            profile: BuildProfile::Release,
            disabled: Vec::new(),
            classify_grace_ms: 5_000,
        }
    }
}

impl SolverConfig {
    /// Resolved solver executable.
    pub fn binary_path(&self) -> PathBuf {
        match &self.binary {
            Some(path) => path.clone(),
            None => self
                .root
                .join(self.profile.build_dir())
                .join("bin")
                .join(SOLVER_BINARY),
        }
    }

    /// Executable file name. [`crate::ProcessSweep`] cuts it to the kernel's
    /// process-name length.
    pub fn process_name(&self) -> String {
        self.binary_path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| SOLVER_BINARY.to_string())
    }

    /// Apply a harness mode on top of this configuration.
    pub fn with_mode(mut self, mode: HarnessMode) -> Self {
        self.profile = mode.profile;
        if let Some(behavior) = mode.disabled {
            if !self.disabled.contains(&behavior) {
                self.disabled.push(behavior);
            }
        }
        self
    }

    /// Copy of this configuration with one more behaviour switched off.
    pub fn disabling(&self, behavior: DisabledBehavior) -> Self {
        let mut config = self.clone();
        if !config.disabled.contains(&behavior) {
            config.disabled.push(behavior);
        }
        config
    }
}

/// Where the solver takes its rules from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleSource {
    /// A built-in preset (`--type <name>`).
    Preset(String),

    /// A ruleset JSON file (`--rules <path>`).
    File(PathBuf),
}

/// One solver invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialRequest {
    pub source: RuleSource,

    /// Deal fixture to solve instead of a random deal.
    pub deal_file: Option<PathBuf>,

    /// Seed for random deal generation.
    pub seed: Option<u64>,

    /// Wall-clock budget.
    pub timeout: Duration,
}

impl TrialRequest {
    /// Random deal from a ruleset file.
    pub fn ruleset_file(path: &Path, seed: u64, timeout: Duration) -> Self {
        Self {
            source: RuleSource::File(path.to_path_buf()),
            deal_file: None,
            seed: Some(seed),
            timeout,
        }
    }

    /// Preset rules; add a seed or a deal file with the builder methods.
    pub fn preset(name: &str, timeout: Duration) -> Self {
        Self {
            source: RuleSource::Preset(name.to_string()),
            deal_file: None,
            seed: None,
            timeout,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_deal_file(mut self, path: &Path) -> Self {
        self.deal_file = Some(path.to_path_buf());
        self
    }

    /// Solver arguments for this request.
    ///
    /// In classify mode the solver also gets its own `--timeout`, in
    /// milliseconds; plain trials rely on the harness deadline alone.
    pub fn args(&self, disabled: &[DisabledBehavior], classify: bool) -> Vec<String> {
        let mut args = Vec::new();
        match &self.source {
            RuleSource::Preset(name) => {
                args.push("--type".to_string());
                args.push(name.clone());
            }
            RuleSource::File(path) => {
                args.push("--rules".to_string());
                args.push(path.to_string_lossy().into_owned());
            }
        }
        if let Some(deal) = &self.deal_file {
            args.push(deal.to_string_lossy().into_owned());
        }
        if let Some(seed) = self.seed {
            args.push("--random".to_string());
            args.push(seed.to_string());
        }
        if classify {
            args.push("--classify".to_string());
            args.push("--timeout".to_string());
            args.push(self.timeout.as_millis().to_string());
        }
        args.extend(disabled.iter().map(|b| b.flag().to_string()));
        args
    }
}
