//! Error types for harness orchestration.

use solcal_core::CoreError;

/// Errors that end a harness run.
///
/// Timeouts are not errors: they are counted by the calibration loop.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error(
        "error running {variant} at level {level} with seed {seed} (exit code {}):\n{ruleset}",
        exit_label(.exit_code)
    )]
    SolverFailed {
        variant: String,
        level: u32,
        seed: u64,
        exit_code: Option<i32>,
        ruleset: String,
    },

    #[error("invalid classify response: {output:?}")]
    ProtocolViolation { output: String },

    #[error("failed to spawn solver {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

/// Result type for harness operations.
pub type HarnessResult<T> = std::result::Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solver_failed_reports_ruleset() {
        let err = HarnessError::SolverFailed {
            variant: "free-cell".to_string(),
            level: 7,
            seed: 3,
            exit_code: Some(2),
            ruleset: "{\n  \"max rank\": 7\n}".to_string(),
        };
        let message = err.to_string();
        assert!(message.starts_with("error running free-cell at level 7 with seed 3 (exit code 2)"));
        assert!(message.contains("\"max rank\": 7"));
    }

    #[test]
    fn test_solver_failed_without_exit_code() {
        let err = HarnessError::SolverFailed {
            variant: "canfield".to_string(),
            level: 2,
            seed: 1,
            exit_code: None,
            ruleset: "{}".to_string(),
        };
        assert!(err.to_string().contains("exit code none"));
    }

    #[test]
    fn test_protocol_violation_quotes_output() {
        let err = HarnessError::ProtocolViolation {
            output: "Segmentation fault".to_string(),
        };
        assert_eq!(err.to_string(), "invalid classify response: \"Segmentation fault\"");
    }
}
