//! Error taxonomy for ruleset generation and board extraction.

/// Errors produced by the core (pure) layer.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("unknown variant: {0}")]
    UnknownVariant(String),

    #[error("{variant} requires level >= {min_level}, got {level}")]
    LevelBelowMinimum {
        variant: String,
        level: u32,
        min_level: u32,
    },

    #[error("{variant} at level {level} derives a negative {field}")]
    DegenerateRuleset {
        variant: String,
        level: u32,
        field: &'static str,
    },

    #[error("{variant} at level {level} overflows {field}")]
    LevelOutOfRange {
        variant: String,
        level: u32,
        field: &'static str,
    },

    #[error("invalid template for {variant}: {reason}")]
    InvalidTemplate { variant: String, reason: String },

    #[error("malformed board block: expected {expected} lines, got {found}")]
    MalformedBlock { expected: usize, found: usize },

    #[error("deck size mismatch: expected {expected} cards, found {found}")]
    DeckSizeMismatch { expected: usize, found: usize },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_below_minimum_message() {
        let err = CoreError::LevelBelowMinimum {
            variant: "fortunes-favor".to_string(),
            level: 1,
            min_level: 2,
        };
        assert_eq!(err.to_string(), "fortunes-favor requires level >= 2, got 1");
    }

    #[test]
    fn test_serde_error_converts() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: CoreError = parse_err.into();
        assert!(matches!(err, CoreError::Serialization(_)));
    }
}
