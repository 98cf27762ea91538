//! Scripted executor for tests.
//!
//! `ScriptedExecutor` answers trials from closures instead of spawning the
//! solver, and records every request it sees. For ruleset-file trials the
//! level is read back from the file's `max rank`, so scripts see exactly
//! what the solver would have been given.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::HarnessResult;
use crate::executor::{ClassifyOutcome, TrialExecutor, TrialOutcome};
use crate::solver::{RuleSource, TrialRequest};

// ---------------------------------------------------------------------------
// Recorded calls
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    Run,
    Classify,
}

/// One request as the fake saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub mode: CallMode,
    /// `max rank` of the ruleset file, when the request used one.
    pub level: Option<u32>,
    pub preset: Option<String>,
    pub seed: Option<u64>,
    /// Deal fixture contents at call time.
    pub deal: Option<String>,
}

type TrialScript = Box<dyn Fn(u32, u64) -> TrialOutcome + Send + Sync>;
type ClassifyScript = Box<dyn Fn(&RecordedCall) -> HarnessResult<ClassifyOutcome> + Send + Sync>;

// ---------------------------------------------------------------------------
// ScriptedExecutor
// ---------------------------------------------------------------------------

/// Executor whose outcomes come from closures.
///
/// Unscripted trials are `Solved`; unscripted classify calls are
/// `ClassifyOutcome::Solved`.
pub struct ScriptedExecutor {
    trials: TrialScript,
    classify: ClassifyScript,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Default for ScriptedExecutor {
    fn default() -> Self {
        Self {
            trials: Box::new(|_, _| TrialOutcome::Solved),
            classify: Box::new(|_| Ok(ClassifyOutcome::Solved)),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `run` from `(level, seed)`. Preset requests see level 0.
    pub fn with_trials<F>(mut self, script: F) -> Self
    where
        F: Fn(u32, u64) -> TrialOutcome + Send + Sync + 'static,
    {
        self.trials = Box::new(script);
        self
    }

    pub fn with_classify<F>(mut self, script: F) -> Self
    where
        F: Fn(&RecordedCall) -> HarnessResult<ClassifyOutcome> + Send + Sync + 'static,
    {
        self.classify = Box::new(script);
        self
    }

    /// Every request so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Distinct levels run, in the order first attempted.
    pub fn levels_attempted(&self) -> Vec<u32> {
        let mut levels: Vec<u32> = Vec::new();
        for call in self.calls.lock().unwrap().iter() {
            if let Some(level) = call.level {
                if levels.last() != Some(&level) {
                    levels.push(level);
                }
            }
        }
        levels
    }

    /// Number of trials run at `level`.
    pub fn trials_at(&self, level: u32) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.mode == CallMode::Run && c.level == Some(level))
            .count()
    }

    fn record(&self, mode: CallMode, request: &TrialRequest) -> HarnessResult<RecordedCall> {
        let (level, preset) = match &request.source {
            RuleSource::File(path) => {
                let document: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
                let level = document
                    .get("max rank")
                    .and_then(Value::as_u64)
                    .and_then(|rank| u32::try_from(rank).ok());
                (level, None)
            }
            RuleSource::Preset(name) => (None, Some(name.clone())),
        };
        let deal = match &request.deal_file {
            Some(path) => Some(std::fs::read_to_string(path)?),
            None => None,
        };

        let call = RecordedCall {
            mode,
            level,
            preset,
            seed: request.seed,
            deal,
        };
        self.calls.lock().unwrap().push(call.clone());
        Ok(call)
    }
}

#[async_trait]
impl TrialExecutor for ScriptedExecutor {
    async fn run(&self, request: &TrialRequest) -> HarnessResult<TrialOutcome> {
        let call = self.record(CallMode::Run, request)?;
        Ok((self.trials)(call.level.unwrap_or(0), call.seed.unwrap_or(0)))
    }

    async fn classify(&self, request: &TrialRequest) -> HarnessResult<ClassifyOutcome> {
        let call = self.record(CallMode::Classify, request)?;
        (self.classify)(&call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[tokio::test]
    async fn test_level_read_from_rules_file() {
        let mut rules = tempfile::NamedTempFile::new().unwrap();
        write!(rules, r#"{{"max rank": 6, "tableau piles": {{"count": 4}}}}"#).unwrap();

        let fake = ScriptedExecutor::new().with_trials(|level, seed| {
            if level == 6 && seed == 2 {
                TrialOutcome::Timeout
            } else {
                TrialOutcome::Solved
            }
        });

        let timeout = Duration::from_secs(1);
        let first = TrialRequest::ruleset_file(rules.path(), 1, timeout);
        let second = TrialRequest::ruleset_file(rules.path(), 2, timeout);
        assert_eq!(fake.run(&first).await.unwrap(), TrialOutcome::Solved);
        assert_eq!(fake.run(&second).await.unwrap(), TrialOutcome::Timeout);

        assert_eq!(fake.levels_attempted(), vec![6]);
        assert_eq!(fake.trials_at(6), 2);
    }

    #[tokio::test]
    async fn test_classify_records_preset_and_deal() {
        let mut deal = tempfile::NamedTempFile::new().unwrap();
        write!(deal, r#"{{"stock": ["Ah"]}}"#).unwrap();

        let fake = ScriptedExecutor::new().with_classify(|_| Ok(ClassifyOutcome::NoSolution));
        let request = TrialRequest::preset("canfield", Duration::from_secs(600))
            .with_deal_file(deal.path());
        assert_eq!(fake.classify(&request).await.unwrap(), ClassifyOutcome::NoSolution);

        let calls = fake.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].mode, CallMode::Classify);
        assert_eq!(calls[0].preset.as_deref(), Some("canfield"));
        assert_eq!(calls[0].deal.as_deref(), Some(r#"{"stock": ["Ah"]}"#));
        assert!(fake.levels_attempted().is_empty());
    }
}
