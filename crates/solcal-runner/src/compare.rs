//! Optimisation comparison.
//!
//! Classifies the same seeded deals twice, once with the solver as
//! configured and once with a behaviour switched off, and reports the seeds
//! where the two verdicts disagree. A pruning optimisation that changes a
//! verdict is unsound.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::HarnessResult;
use crate::executor::TrialExecutor;
use crate::solver::{DisabledBehavior, TrialRequest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Behaviours compared, one at a time.
    pub behaviors: Vec<DisabledBehavior>,

    pub presets: Vec<String>,

    /// Seeds `0..runs` are classified per preset.
    pub runs: u64,

    /// Classify budget per deal, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            behaviors: vec![DisabledBehavior::CardJustMoved],
            presets: [
                "simple-alpha-star",
                "simple-bakers-dozen",
                "simple-black-hole",
                "simple-canfield",
                "simple-flower-garden",
                "simple-fortunes-favor",
                "simple-free-cell",
                "simple-somerset",
                "simple-spanish-patience",
                "simple-spider",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            runs: 1_000,
            timeout_ms: 60_000,
        }
    }
}

impl ComparisonConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Seeds whose verdict changed for one preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetComparison {
    pub preset: String,
    pub runs: u64,
    pub differing_seeds: Vec<u64>,
}

impl PresetComparison {
    pub fn differs(&self) -> bool {
        !self.differing_seeds.is_empty()
    }
}

/// Compares a baseline executor against one with a behaviour disabled.
pub struct OptimisationComparison {
    baseline: Arc<dyn TrialExecutor>,
    candidate: Arc<dyn TrialExecutor>,
    runs: u64,
    timeout: Duration,
}

impl OptimisationComparison {
    pub fn new(
        baseline: Arc<dyn TrialExecutor>,
        candidate: Arc<dyn TrialExecutor>,
        runs: u64,
        timeout: Duration,
    ) -> Self {
        Self {
            baseline,
            candidate,
            runs,
            timeout,
        }
    }

    /// Classify seeds `0..runs` of `preset` on both executors.
    pub async fn compare_preset(&self, preset: &str) -> HarnessResult<PresetComparison> {
        let mut differing_seeds = Vec::new();

        for seed in 0..self.runs {
            let request = TrialRequest::preset(preset, self.timeout).with_seed(seed);
            let candidate = self.candidate.classify(&request).await?;
            let baseline = self.baseline.classify(&request).await?;
            if candidate != baseline {
                warn!(preset, seed, baseline = ?baseline, candidate = ?candidate, "Verdicts differ");
                differing_seeds.push(seed);
            }
        }

        info!(preset, runs = self.runs, differing = differing_seeds.len(), "Preset compared");
        Ok(PresetComparison {
            preset: preset.to_string(),
            runs: self.runs,
            differing_seeds,
        })
    }

    pub async fn compare_all(&self, presets: &[String]) -> HarnessResult<Vec<PresetComparison>> {
        let mut results = Vec::with_capacity(presets.len());
        for preset in presets {
            results.push(self.compare_preset(preset).await?);
        }
        Ok(results)
    }
}

/// One line per preset, in the order compared.
pub fn render_comparison(behavior: DisabledBehavior, results: &[PresetComparison]) -> String {
    let mut out = String::new();
    for result in results {
        if result.differs() {
            let seeds: Vec<String> = result.differing_seeds.iter().map(u64::to_string).collect();
            out.push_str(&format!(
                "{}: {} differs for seeds [{}]\n",
                result.preset,
                behavior.flag(),
                seeds.join(", ")
            ));
        } else {
            out.push_str(&format!(
                "{}: no difference in verdicts for {}\n",
                result.preset,
                behavior.flag()
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ComparisonConfig::default();
        assert_eq!(config.runs, 1_000);
        assert_eq!(config.presets.len(), 10);
        assert_eq!(config.behaviors, vec![DisabledBehavior::CardJustMoved]);
    }

    #[test]
    fn test_render_comparison() {
        let results = vec![
            PresetComparison {
                preset: "simple-free-cell".to_string(),
                runs: 10,
                differing_seeds: vec![],
            },
            PresetComparison {
                preset: "simple-somerset".to_string(),
                runs: 10,
                differing_seeds: vec![3, 8],
            },
        ];
        let text = render_comparison(DisabledBehavior::ReducedState, &results);
        assert_eq!(
            text,
            "simple-free-cell: no difference in verdicts for --no-reduced-state\n\
             simple-somerset: --no-reduced-state differs for seeds [3, 8]\n"
        );
    }
}
