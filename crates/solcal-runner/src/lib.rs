//! solcal Runner
//!
//! Drives the external solver:
//! - Trial execution behind the [`TrialExecutor`] seam
//! - Difficulty calibration per variant
//! - Replay of stuck deals recovered from session logs
//! - Optimisation comparison across seeded deals
//! - Summary tables and cleanup guards

pub mod calibration;
pub mod compare;
pub mod config;
pub mod error;
pub mod executor;
pub mod fakes;
pub mod guard;
pub mod replay;
pub mod solver;
pub mod summary;

pub use calibration::{
    CalibrationLoop, CalibrationPolicy, EscalationState, LevelResult, LevelVerdict,
    VariantCalibration, VariantSummary,
};
pub use compare::{render_comparison, ComparisonConfig, OptimisationComparison, PresetComparison};
pub use config::HarnessConfig;
pub use error::{HarnessError, HarnessResult};
pub use executor::{ClassifyOutcome, SolverProcess, TrialExecutor, TrialOutcome};
pub use guard::{ProcessSweep, TransientFile};
pub use replay::{DealVerdict, ReplayConfig, StuckDealReplay};
pub use solver::{
    BuildProfile, DisabledBehavior, HarnessMode, ModeError, RuleSource, SolverConfig, TrialRequest,
};
pub use summary::{render_summary_md, write_summary_json, ResultAggregator, SummaryRow, SummaryTable};
