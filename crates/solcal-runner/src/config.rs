//! Harness configuration, loadable from a JSON file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use solcal_core::{TemplateSource, Variant};
use tracing::debug;

use crate::calibration::CalibrationPolicy;
use crate::compare::ComparisonConfig;
use crate::error::HarnessResult;
use crate::replay::ReplayConfig;
use crate::solver::SolverConfig;

/// Every tunable of a harness run. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub solver: SolverConfig,
    pub templates: TemplateSource,
    pub calibration: CalibrationPolicy,
    /// Variants calibrated, in order.
    pub variants: Vec<Variant>,
    pub replay: ReplayConfig,
    pub comparison: ComparisonConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            solver: SolverConfig::default(),
            templates: TemplateSource::Builtin,
            calibration: CalibrationPolicy::default(),
            variants: Variant::ALL.to_vec(),
            replay: ReplayConfig::default(),
            comparison: ComparisonConfig::default(),
        }
    }
}

impl HarnessConfig {
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        debug!(path = %path.display(), "Loaded harness config");
        Ok(config)
    }
}
