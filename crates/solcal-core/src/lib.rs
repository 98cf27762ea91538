//! solcal Core Library
//!
//! Pure building blocks of the calibration harness:
//! - Variant table and ruleset parameterization by difficulty level
//! - Deal records and the solver's deal fixture format
//! - Extraction of stuck deals from colour-coded board dumps

pub mod deal;
pub mod error;
pub mod extract;
pub mod ruleset;
pub mod telemetry;
pub mod variant;

pub use deal::{normalize_rank, Card, DealFixture, DealRecord, PileOrder};
pub use error::{CoreError, Result};
pub use extract::{
    strip_escapes, DealStateExtractor, ExtractorConfig, StrippedLine, StuckDeal, BLOCK_LINES,
    MARKER_OFFSET,
};
pub use ruleset::{parameterize, parameterize_from, Ruleset, TemplateSource};
pub use telemetry::{init_tracing, LogFormat};
pub use variant::{Scaling, ScalingError, Variant, VariantSpec, VARIANT_TABLE};
