//! Stuck-deal replay.
//!
//! Every stuck deal found in a session log is rebuilt as a deal fixture and
//! handed back to the solver in classify mode with a long budget. Each deal
//! gets its own verdict; nothing is aggregated.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use solcal_core::{DealStateExtractor, ExtractorConfig, PileOrder};
use tracing::{info, warn};

use crate::error::HarnessResult;
use crate::executor::{ClassifyOutcome, TrialExecutor};
use crate::guard::TransientFile;
use crate::solver::TrialRequest;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub extractor: ExtractorConfig,

    /// Preset the fixtures are solved under.
    pub solver_type: String,

    /// Classify budget per deal, in milliseconds.
    pub timeout_ms: u64,

    pub order: PileOrder,

    /// Expected highest rank; a deal whose card count disagrees is still
    /// replayed but logged.
    pub max_rank: Option<u32>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            extractor: ExtractorConfig::default(),
            solver_type: "canfield".to_string(),
            timeout_ms: 600_000,
            order: PileOrder::AsPrinted,
            max_rank: Some(13),
        }
    }
}

impl ReplayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Verdict for one replayed deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealVerdict {
    /// Position among the deals found, from 0.
    pub index: usize,
    /// 1-based line of the deal's header in the log.
    pub header_line: usize,
    pub outcome: ClassifyOutcome,
}

pub struct StuckDealReplay {
    executor: Arc<dyn TrialExecutor>,
    config: ReplayConfig,
    extractor: DealStateExtractor,
}

impl StuckDealReplay {
    pub fn new(executor: Arc<dyn TrialExecutor>, config: ReplayConfig) -> Self {
        let extractor = DealStateExtractor::new(config.extractor.clone());
        Self {
            executor,
            config,
            extractor,
        }
    }

    /// Replay every stuck deal in `log`, in the order they appear.
    pub async fn replay(&self, log: &str) -> HarnessResult<Vec<DealVerdict>> {
        let deals = self.extractor.find_stuck_deals(log);
        info!(deals = deals.len(), solver_type = %self.config.solver_type, "Replaying stuck deals");

        let mut fixture = TransientFile::new("solcal-deal-")?;
        let mut verdicts = Vec::with_capacity(deals.len());

        for (index, deal) in deals.iter().enumerate() {
            if let Some(max_rank) = self.config.max_rank {
                if let Err(e) = deal.record.check_deck_size(max_rank) {
                    warn!(line = deal.header_line, error = %e, "Replaying incomplete deal");
                }
            }

            fixture.overwrite(&deal.record.to_fixture(self.config.order).to_json()?)?;
            let request = TrialRequest::preset(&self.config.solver_type, self.config.timeout())
                .with_deal_file(fixture.path());
            let outcome = self.executor.classify(&request).await?;

            info!(index, line = deal.header_line, outcome = ?outcome, "Deal classified");
            verdicts.push(DealVerdict {
                index,
                header_line: deal.header_line,
                outcome,
            });
        }

        Ok(verdicts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReplayConfig::default();
        assert_eq!(config.solver_type, "canfield");
        assert_eq!(config.timeout(), Duration::from_secs(600));
        assert_eq!(config.extractor.variant_prefix, "Canfield");
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: ReplayConfig =
            serde_json::from_str(r#"{"order": "reversed", "max_rank": null}"#).unwrap();
        assert_eq!(config.order, PileOrder::Reversed);
        assert_eq!(config.max_rank, None);
        assert_eq!(config.timeout_ms, 600_000);
    }
}
