use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solcal_core::Variant;

use crate::calibration::{CalibrationPolicy, VariantCalibration, VariantSummary};
use crate::error::HarnessResult;

/// Row of the summary table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryRow {
    pub variant: Variant,
    pub highest_level_solved: Option<u32>,
    pub levels_run: usize,
    pub trials_run: u32,
}

/// Calibration results persisted as summary.json.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryTable {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub policy: CalibrationPolicy,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn summaries(&self) -> Vec<VariantSummary> {
        self.rows
            .iter()
            .map(|row| VariantSummary {
                variant: row.variant,
                highest_level_solved: row.highest_level_solved,
            })
            .collect()
    }
}

/// Collects per-variant results in the order they finish.
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    policy: CalibrationPolicy,
    rows: Vec<SummaryRow>,
}

impl ResultAggregator {
    pub fn new(policy: CalibrationPolicy) -> Self {
        Self {
            policy,
            rows: Vec::new(),
        }
    }

    pub fn record(&mut self, calibration: &VariantCalibration) {
        self.rows.push(SummaryRow {
            variant: calibration.summary.variant,
            highest_level_solved: calibration.summary.highest_level_solved,
            levels_run: calibration.levels.len(),
            trials_run: calibration.attempts(),
        });
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn finish(self) -> SummaryTable {
        self.finish_at(Utc::now())
    }

    pub fn finish_at(self, generated_at: DateTime<Utc>) -> SummaryTable {
        SummaryTable {
            schema_version: "1.0".to_string(),
            generated_at,
            policy: self.policy,
            rows: self.rows,
        }
    }
}

/// Render the table as markdown.
pub fn render_summary_md(table: &SummaryTable) -> String {
    let mut out = String::new();
    out.push_str("# Calibration Summary\n\n");
    out.push_str(&format!(
        "- trials per level: {}\n- trial timeout: {} ms\n- timeout threshold: {}\n- max level: {}\n\n",
        table.policy.trials_per_level,
        table.policy.trial_timeout_ms,
        table.policy.timeout_threshold,
        table.policy.max_level
    ));
    out.push_str("| variant | highest level solved | levels run | trials |\n");
    out.push_str("|---|---|---|---|\n");
    for row in &table.rows {
        let level = row
            .highest_level_solved
            .map_or_else(|| "none".to_string(), |l| l.to_string());
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            row.variant, level, row.levels_run, row.trials_run
        ));
    }
    out
}

/// Write summary.json in pretty JSON format.
pub fn write_summary_json(path: &Path, table: &SummaryTable) -> HarnessResult<()> {
    let content = serde_json::to_string_pretty(table)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{LevelResult, LevelVerdict};

    fn calibration(variant: Variant, solved: Option<u32>, levels: u32) -> VariantCalibration {
        VariantCalibration {
            summary: VariantSummary {
                variant,
                highest_level_solved: solved,
            },
            levels: (0..levels)
                .map(|i| LevelResult {
                    variant,
                    level: variant.min_level() + i,
                    timeout_count: 0,
                    total_attempts: 20,
                    verdict: LevelVerdict::Escalate,
                    ruleset_digest: String::new(),
                })
                .collect(),
            failing_ruleset: None,
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .expect("parse RFC3339")
            .with_timezone(&Utc)
    }

    #[test]
    fn rows_keep_recording_order() {
        let mut aggregator = ResultAggregator::new(CalibrationPolicy::default());
        assert!(aggregator.is_empty());
        aggregator.record(&calibration(Variant::Somerset, Some(7), 7));
        aggregator.record(&calibration(Variant::Canfield, None, 1));

        let table = aggregator.finish_at(fixed_time());
        assert_eq!(
            table.summaries(),
            vec![
                VariantSummary {
                    variant: Variant::Somerset,
                    highest_level_solved: Some(7)
                },
                VariantSummary {
                    variant: Variant::Canfield,
                    highest_level_solved: None
                },
            ]
        );
        assert_eq!(table.rows[0].trials_run, 140);
    }

    #[test]
    fn markdown_lists_every_variant() {
        let mut aggregator = ResultAggregator::new(CalibrationPolicy::default());
        aggregator.record(&calibration(Variant::FreeCell, Some(12), 12));
        aggregator.record(&calibration(Variant::Canfield, None, 1));
        let md = render_summary_md(&aggregator.finish_at(fixed_time()));

        assert!(md.contains("| free-cell | 12 | 12 | 240 |"));
        assert!(md.contains("| canfield | none | 1 | 20 |"));
        assert!(md.contains("- timeout threshold: 4"));
    }

    #[test]
    fn summary_json_schema_has_expected_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("summary.json");
        let mut aggregator = ResultAggregator::new(CalibrationPolicy::default());
        aggregator.record(&calibration(Variant::BlackHole, Some(4), 4));
        write_summary_json(&path, &aggregator.finish_at(fixed_time())).expect("write summary");

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["schema_version"], "1.0");
        assert_eq!(value["generated_at"], "2026-01-01T00:00:00Z");
        assert_eq!(value["rows"][0]["variant"], "black-hole");
        assert_eq!(value["rows"][0]["highest_level_solved"], 4);
        assert_eq!(value["policy"]["max_level"], 12);
    }
}
