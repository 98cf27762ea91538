//! Difficulty escalation.
//!
//! For each variant the loop starts at the variant's minimum level and runs
//! a batch of seeded trials per level. A level whose timeout count stays at
//! or under the threshold is passed and the loop moves up; the first level
//! that exceeds it ends the variant, and the level below it is the result.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use solcal_core::{Ruleset, TemplateSource, Variant};
use tracing::{debug, info, warn};

use crate::error::{HarnessError, HarnessResult};
use crate::executor::{TrialExecutor, TrialOutcome};
use crate::guard::TransientFile;
use crate::solver::TrialRequest;

/// Escalation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationPolicy {
    /// Trials per level; seeds run from 1 to this value.
    pub trials_per_level: u32,

    /// Wall-clock budget per trial, in milliseconds.
    pub trial_timeout_ms: u64,

    /// Most timeouts a level may have and still count as solved.
    pub timeout_threshold: u32,

    /// Highest level attempted.
    pub max_level: u32,
}

impl Default for CalibrationPolicy {
    fn default() -> Self {
        Self {
            trials_per_level: 20,
            trial_timeout_ms: 1_000,
            timeout_threshold: 4,
            max_level: 12,
        }
    }
}

impl CalibrationPolicy {
    pub fn trial_timeout(&self) -> Duration {
        Duration::from_millis(self.trial_timeout_ms)
    }

    pub fn verdict(&self, timeout_count: u32) -> LevelVerdict {
        if timeout_count > self.timeout_threshold {
            LevelVerdict::Stop
        } else {
            LevelVerdict::Escalate
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelVerdict {
    Escalate,
    Stop,
}

/// Outcome of one level's trial batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelResult {
    pub variant: Variant,
    pub level: u32,
    pub timeout_count: u32,
    /// Trials actually run; fewer than the policy asks for when the batch
    /// was cut short.
    pub total_attempts: u32,
    pub verdict: LevelVerdict,
    /// SHA-256 of the ruleset the batch ran against.
    pub ruleset_digest: String,
}

/// Highest level a variant passed. `None` when even the minimum level
/// failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSummary {
    pub variant: Variant,
    pub highest_level_solved: Option<u32>,
}

/// Per-variant escalation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationState {
    Escalating { level: u32 },
    Stopped(VariantSummary),
}

impl EscalationState {
    pub fn start(variant: Variant, policy: &CalibrationPolicy) -> Self {
        let level = variant.min_level();
        if level > policy.max_level {
            EscalationState::Stopped(VariantSummary {
                variant,
                highest_level_solved: None,
            })
        } else {
            EscalationState::Escalating { level }
        }
    }

    /// Transition after a level has been judged.
    pub fn advance(result: &LevelResult, policy: &CalibrationPolicy) -> Self {
        let variant = result.variant;
        match result.verdict {
            LevelVerdict::Stop => EscalationState::Stopped(VariantSummary {
                variant,
                highest_level_solved: (result.level > variant.min_level())
                    .then(|| result.level - 1),
            }),
            LevelVerdict::Escalate if result.level >= policy.max_level => {
                EscalationState::Stopped(VariantSummary {
                    variant,
                    highest_level_solved: Some(result.level),
                })
            }
            LevelVerdict::Escalate => EscalationState::Escalating {
                level: result.level + 1,
            },
        }
    }
}

/// Full record of one variant's calibration.
#[derive(Debug, Clone)]
pub struct VariantCalibration {
    pub summary: VariantSummary,
    pub levels: Vec<LevelResult>,
    /// Ruleset of the level that ended escalation, if one did.
    pub failing_ruleset: Option<Ruleset>,
}

impl VariantCalibration {
    pub fn attempts(&self) -> u32 {
        self.levels.iter().map(|l| l.total_attempts).sum()
    }
}

/// Drives escalation for one variant at a time.
pub struct CalibrationLoop {
    executor: Arc<dyn TrialExecutor>,
    policy: CalibrationPolicy,
    templates: TemplateSource,
}

impl CalibrationLoop {
    pub fn new(executor: Arc<dyn TrialExecutor>, policy: CalibrationPolicy) -> Self {
        Self {
            executor,
            policy,
            templates: TemplateSource::Builtin,
        }
    }

    pub fn with_templates(mut self, templates: TemplateSource) -> Self {
        self.templates = templates;
        self
    }

    pub fn policy(&self) -> &CalibrationPolicy {
        &self.policy
    }

    /// Run one level's batch against a ruleset already written to `rules`.
    ///
    /// Stops as soon as the timeout count passes the threshold; an `Error`
    /// outcome ends the run.
    pub async fn run_level(&self, ruleset: &Ruleset, rules: &TransientFile) -> HarnessResult<LevelResult> {
        let timeout = self.policy.trial_timeout();
        let mut timeout_count = 0;
        let mut total_attempts = 0;

        for seed in 1..=u64::from(self.policy.trials_per_level) {
            let request = TrialRequest::ruleset_file(rules.path(), seed, timeout);
            total_attempts += 1;

            match self.executor.run(&request).await? {
                TrialOutcome::Solved => {}
                TrialOutcome::Timeout => {
                    timeout_count += 1;
                    debug!(variant = %ruleset.variant(), level = ruleset.level(), seed, "Trial timed out");
                    if timeout_count > self.policy.timeout_threshold {
                        break;
                    }
                }
                TrialOutcome::Error { exit_code } => {
                    return Err(HarnessError::SolverFailed {
                        variant: ruleset.variant().to_string(),
                        level: ruleset.level(),
                        seed,
                        exit_code,
                        ruleset: ruleset.to_pretty_json()?,
                    });
                }
            }
        }

        Ok(LevelResult {
            variant: ruleset.variant(),
            level: ruleset.level(),
            timeout_count,
            total_attempts,
            verdict: self.policy.verdict(timeout_count),
            ruleset_digest: ruleset.digest()?,
        })
    }

    /// Escalate `variant` until it stops.
    pub async fn calibrate(&self, variant: Variant) -> HarnessResult<VariantCalibration> {
        let mut rules = TransientFile::new("solcal-rules-")?;
        let mut levels = Vec::new();
        let mut failing_ruleset = None;
        let mut state = EscalationState::start(variant, &self.policy);

        info!(variant = %variant, min_level = variant.min_level(), "Calibrating variant");

        let summary = loop {
            let level = match state {
                EscalationState::Stopped(summary) => break summary,
                EscalationState::Escalating { level } => level,
            };

            let ruleset = self.templates.parameterize(variant, level)?;
            rules.overwrite(&ruleset.to_json()?)?;

            let result = self.run_level(&ruleset, &rules).await?;
            info!(
                variant = %variant,
                level,
                timeouts = result.timeout_count,
                attempts = result.total_attempts,
                digest = %&result.ruleset_digest[..12],
                verdict = ?result.verdict,
                "Level finished"
            );

            state = EscalationState::advance(&result, &self.policy);
            if result.verdict == LevelVerdict::Stop {
                failing_ruleset = Some(ruleset);
            }
            levels.push(result);
        };

        match summary.highest_level_solved {
            Some(level) => info!(variant = %variant, level, "Variant calibrated"),
            None => warn!(variant = %variant, "No level solved"),
        }

        Ok(VariantCalibration {
            summary,
            levels,
            failing_ruleset,
        })
    }

    /// Calibrate each variant in turn. The first error ends the run.
    pub async fn calibrate_all(&self, variants: &[Variant]) -> HarnessResult<Vec<VariantCalibration>> {
        let mut results = Vec::with_capacity(variants.len());
        for variant in variants {
            results.push(self.calibrate(*variant).await?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(variant: Variant, level: u32, timeouts: u32, policy: &CalibrationPolicy) -> LevelResult {
        LevelResult {
            variant,
            level,
            timeout_count: timeouts,
            total_attempts: 20,
            verdict: policy.verdict(timeouts),
            ruleset_digest: String::new(),
        }
    }

    #[test]
    fn test_threshold_boundary() {
        let policy = CalibrationPolicy::default();
        assert_eq!(policy.verdict(0), LevelVerdict::Escalate);
        assert_eq!(policy.verdict(4), LevelVerdict::Escalate);
        assert_eq!(policy.verdict(5), LevelVerdict::Stop);
    }

    #[test]
    fn test_start_at_minimum_level() {
        let policy = CalibrationPolicy::default();
        assert_eq!(
            EscalationState::start(Variant::FreeCell, &policy),
            EscalationState::Escalating { level: 1 }
        );
        assert_eq!(
            EscalationState::start(Variant::Canfield, &policy),
            EscalationState::Escalating { level: 2 }
        );
    }

    #[test]
    fn test_max_below_minimum_stops_immediately() {
        let policy = CalibrationPolicy {
            max_level: 1,
            ..CalibrationPolicy::default()
        };
        assert_eq!(
            EscalationState::start(Variant::FortunesFavor, &policy),
            EscalationState::Stopped(VariantSummary {
                variant: Variant::FortunesFavor,
                highest_level_solved: None,
            })
        );
    }

    #[test]
    fn test_advance_transitions() {
        let policy = CalibrationPolicy::default();
        let v = Variant::Somerset;

        assert_eq!(
            EscalationState::advance(&result(v, 5, 2, &policy), &policy),
            EscalationState::Escalating { level: 6 }
        );
        assert_eq!(
            EscalationState::advance(&result(v, 6, 5, &policy), &policy),
            EscalationState::Stopped(VariantSummary {
                variant: v,
                highest_level_solved: Some(5),
            })
        );
        assert_eq!(
            EscalationState::advance(&result(v, 12, 0, &policy), &policy),
            EscalationState::Stopped(VariantSummary {
                variant: v,
                highest_level_solved: Some(12),
            })
        );
    }

    #[test]
    fn test_failing_minimum_level_solves_nothing() {
        let policy = CalibrationPolicy::default();
        let state = EscalationState::advance(&result(Variant::Canfield, 2, 20, &policy), &policy);
        assert_eq!(
            state,
            EscalationState::Stopped(VariantSummary {
                variant: Variant::Canfield,
                highest_level_solved: None,
            })
        );
    }

    #[test]
    fn test_policy_deserializes_partial() {
        let policy: CalibrationPolicy = serde_json::from_str(r#"{"max_level": 13}"#).unwrap();
        assert_eq!(policy.max_level, 13);
        assert_eq!(policy.trials_per_level, 20);
        assert_eq!(policy.trial_timeout(), Duration::from_secs(1));
    }
}
