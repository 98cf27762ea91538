//! Tracing setup for the solcal binary.
//!
//! Log lines go to stderr; stdout carries the calibration results and
//! summary tables. `RUST_LOG` replaces the default filter entirely.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates whose events pass at the requested level by default.
const HARNESS_TARGETS: [&str; 3] = ["solcal", "solcal_core", "solcal_runner"];

/// Encoding of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    /// Newline-delimited JSON.
    Json,
}

impl LogFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Filter used when `RUST_LOG` is unset: `level` for the harness crates,
/// warnings and errors from everything else.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    let mut directives = String::from("warn");
    for target in HARNESS_TARGETS {
        directives.push_str(&format!(",{target}={level}"));
    }
    directives
}

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed; the existing one
/// is kept.
pub fn init_tracing(format: LogFormat, level: Level) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let text = (format == LogFormat::Text)
        .then(|| fmt::layer().with_target(false).with_writer(std::io::stderr));
    let json = (format == LogFormat::Json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .try_init()
        .is_ok()
}
