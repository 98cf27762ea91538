//! Variant table: base templates and difficulty scaling laws.
//!
//! Every variant is one row of [`VARIANT_TABLE`]: a name, the lowest level
//! at which its configuration is meaningful, the solver preset JSON it
//! starts from, and a pure function from level to the fields that change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Solitaire variants the harness knows how to scale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    SpanishPatience,
    FreeCell,
    BlackHole,
    BakersDozen,
    AlphaStar,
    Somerset,
    FlowerGarden,
    FortunesFavor,
    Canfield,
}

impl Variant {
    /// All variants, in calibration order.
    pub const ALL: [Variant; 9] = [
        Variant::SpanishPatience,
        Variant::FreeCell,
        Variant::BlackHole,
        Variant::BakersDozen,
        Variant::AlphaStar,
        Variant::Somerset,
        Variant::FlowerGarden,
        Variant::FortunesFavor,
        Variant::Canfield,
    ];

    /// Table row for this variant. Rows are stored in declaration order.
    pub fn spec(&self) -> &'static VariantSpec {
        &VARIANT_TABLE[*self as usize]
    }

    /// Solver-facing name (also the template file stem).
    pub fn name(&self) -> &'static str {
        self.spec().name
    }

    /// Lowest level with a non-degenerate configuration.
    pub fn min_level(&self) -> u32 {
        self.spec().min_level
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VARIANT_TABLE
            .iter()
            .find(|row| row.name == s)
            .map(|row| row.variant)
            .ok_or_else(|| CoreError::UnknownVariant(s.to_string()))
    }
}

/// Fields a scaling law writes over the template. `None` keeps the
/// template's value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scaling {
    pub max_rank: u32,
    pub tableau_piles: Option<u32>,
    pub cells: Option<u32>,
    pub reserve: Option<u32>,
    pub stock: Option<u32>,
}

/// Why a scaling law produced no configuration for a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingError {
    /// The named field would go negative.
    Negative(&'static str),
    /// The named field does not fit in a `u32` at this level.
    Overflow(&'static str),
}

/// Level -> overrides.
pub type ScalingLaw = fn(u32) -> Result<Scaling, ScalingError>;

/// One row of the variant table.
pub struct VariantSpec {
    pub variant: Variant,
    pub name: &'static str,
    pub min_level: u32,
    pub template: &'static str,
    pub scale: ScalingLaw,
}

impl fmt::Debug for VariantSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariantSpec")
            .field("name", &self.name)
            .field("min_level", &self.min_level)
            .finish_non_exhaustive()
    }
}

/// `ceil(numerator / denominator)` in integers.
pub fn ceil_div(numerator: u32, denominator: u32) -> u32 {
    numerator.div_ceil(denominator)
}

/// `ceil(level * numerator / denominator)`, checked.
fn scaled(
    level: u32,
    numerator: u32,
    denominator: u32,
    field: &'static str,
) -> Result<u32, ScalingError> {
    level
        .checked_mul(numerator)
        .map(|n| ceil_div(n, denominator))
        .ok_or(ScalingError::Overflow(field))
}

/// Cards left once the four aces are set aside: `4 * (level - 1)`.
fn cards_above_aces(level: u32, field: &'static str) -> Result<u32, ScalingError> {
    level
        .saturating_sub(1)
        .checked_mul(4)
        .ok_or(ScalingError::Overflow(field))
}

fn scale_identity(level: u32) -> Result<Scaling, ScalingError> {
    Ok(Scaling {
        max_rank: level,
        tableau_piles: Some(level),
        ..Scaling::default()
    })
}

fn scale_free_cell(level: u32) -> Result<Scaling, ScalingError> {
    Ok(Scaling {
        max_rank: level,
        // ceil(level * 0.61), ceil(level * 0.3)
        tableau_piles: Some(scaled(level, 61, 100, "tableau piles")?),
        cells: Some(scaled(level, 3, 10, "cells")?),
        ..Scaling::default()
    })
}

fn scale_black_hole(level: u32) -> Result<Scaling, ScalingError> {
    let numerator = level
        .checked_mul(4)
        .ok_or(ScalingError::Overflow("tableau piles"))?
        .checked_sub(1)
        .ok_or(ScalingError::Negative("tableau piles"))?;
    Ok(Scaling {
        max_rank: level,
        tableau_piles: Some(ceil_div(numerator, 3)),
        ..Scaling::default()
    })
}

fn scale_alpha_star(level: u32) -> Result<Scaling, ScalingError> {
    Ok(Scaling {
        max_rank: level,
        tableau_piles: Some(scaled(level, 12, 13, "tableau piles")?),
        ..Scaling::default()
    })
}

fn scale_somerset(level: u32) -> Result<Scaling, ScalingError> {
    Ok(Scaling {
        max_rank: level,
        tableau_piles: Some(scaled(level, 10, 13, "tableau piles")?),
        ..Scaling::default()
    })
}

fn scale_flower_garden(level: u32) -> Result<Scaling, ScalingError> {
    Ok(Scaling {
        max_rank: level,
        tableau_piles: Some(scaled(level, 6, 13, "tableau piles")?),
        reserve: Some(scaled(level, 16, 13, "reserve")?),
        ..Scaling::default()
    })
}

fn scale_fortunes_favor(level: u32) -> Result<Scaling, ScalingError> {
    let tableau = scaled(level, 12, 13, "tableau piles")?;
    let stock = cards_above_aces(level, "stock size")?
        .checked_sub(tableau)
        .ok_or(ScalingError::Negative("stock size"))?;
    Ok(Scaling {
        max_rank: level,
        tableau_piles: Some(tableau),
        stock: Some(stock),
        ..Scaling::default()
    })
}

fn scale_canfield(level: u32) -> Result<Scaling, ScalingError> {
    let remaining = cards_above_aces(level, "reserve")?;
    // ceil(0.7 * remaining)
    let reserve = scaled(remaining, 7, 10, "reserve")?;
    Ok(Scaling {
        max_rank: level,
        reserve: Some(reserve),
        stock: Some(remaining - reserve),
        ..Scaling::default()
    })
}

const SPANISH_PATIENCE: &str = r#"{
  "tableau piles": { "count": 13 },
  "foundations": { "removable": true },
  "max rank": 13
}"#;

const FREE_CELL: &str = r#"{
  "tableau piles": { "count": 8, "build policy": "red-black" },
  "cells": { "count": 4 },
  "max rank": 13
}"#;

const BLACK_HOLE: &str = r#"{
  "tableau piles": { "count": 17, "build policy": "no-build" },
  "foundations": { "present": false },
  "hole": { "present": true },
  "max rank": 13
}"#;

const BAKERS_DOZEN: &str = r#"{
  "tableau piles": { "count": 13, "spaces policy": "no-build" },
  "foundations": { "removable": true },
  "max rank": 13
}"#;

const ALPHA_STAR: &str = r#"{
  "tableau piles": { "count": 12, "build policy": "same-suit", "move built group": "yes" },
  "foundations": { "initial cards": "all" },
  "max rank": 13
}"#;

const SOMERSET: &str = r#"{
  "tableau piles": { "count": 10, "build policy": "red-black", "diagonal deal": true },
  "foundations": { "removable": true },
  "max rank": 13
}"#;

const FLOWER_GARDEN: &str = r#"{
  "tableau piles": { "count": 6 },
  "reserve": { "size": 16 },
  "foundations": { "removable": true },
  "max rank": 13
}"#;

const FORTUNES_FAVOR: &str = r#"{
  "tableau piles": { "count": 12, "build policy": "same-suit", "spaces policy": "auto-waste-then-stock" },
  "foundations": { "initial cards": "all" },
  "stock": { "size": 36 },
  "max rank": 13
}"#;

const CANFIELD: &str = r#"{
  "tableau piles": {
    "count": 4,
    "build policy": "red-black",
    "move built group": "partial-if-card-above-buildable",
    "spaces policy": "auto-reserve-then-any"
  },
  "foundations": { "initial cards": "one", "base card": "random" },
  "stock": { "size": 34, "deal count": 3, "redeal": true },
  "reserve": { "size": 13, "stacked": true },
  "max rank": 13
}"#;

/// The variant table.
pub static VARIANT_TABLE: &[VariantSpec] = &[
    VariantSpec {
        variant: Variant::SpanishPatience,
        name: "spanish-patience",
        min_level: 1,
        template: SPANISH_PATIENCE,
        scale: scale_identity,
    },
    VariantSpec {
        variant: Variant::FreeCell,
        name: "free-cell",
        min_level: 1,
        template: FREE_CELL,
        scale: scale_free_cell,
    },
    VariantSpec {
        variant: Variant::BlackHole,
        name: "black-hole",
        min_level: 1,
        template: BLACK_HOLE,
        scale: scale_black_hole,
    },
    VariantSpec {
        variant: Variant::BakersDozen,
        name: "bakers-dozen",
        min_level: 1,
        template: BAKERS_DOZEN,
        scale: scale_identity,
    },
    VariantSpec {
        variant: Variant::AlphaStar,
        name: "alpha-star",
        min_level: 1,
        template: ALPHA_STAR,
        scale: scale_alpha_star,
    },
    VariantSpec {
        variant: Variant::Somerset,
        name: "somerset",
        min_level: 1,
        template: SOMERSET,
        scale: scale_somerset,
    },
    VariantSpec {
        variant: Variant::FlowerGarden,
        name: "flower-garden",
        min_level: 1,
        template: FLOWER_GARDEN,
        scale: scale_flower_garden,
    },
    // Level 1 leaves no card for the stock once a tableau pile is dealt.
    VariantSpec {
        variant: Variant::FortunesFavor,
        name: "fortunes-favor",
        min_level: 2,
        template: FORTUNES_FAVOR,
        scale: scale_fortunes_favor,
    },
    // Level 1 has an empty reserve and stock under four tableau piles.
    VariantSpec {
        variant: Variant::Canfield,
        name: "canfield",
        min_level: 2,
        template: CANFIELD,
        scale: scale_canfield,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_rows_follow_declaration_order() {
        assert_eq!(VARIANT_TABLE.len(), Variant::ALL.len());
        for (index, variant) in Variant::ALL.iter().enumerate() {
            assert_eq!(VARIANT_TABLE[index].variant, *variant);
            assert_eq!(variant.spec().variant, *variant);
        }
    }

    #[test]
    fn test_variant_name_round_trips_through_from_str() {
        for variant in Variant::ALL {
            assert_eq!(variant.name().parse::<Variant>().unwrap(), variant);
        }
    }

    #[test]
    fn test_unknown_variant_rejected() {
        let err = "klondike".parse::<Variant>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownVariant(name) if name == "klondike"));
    }

    #[test]
    fn test_templates_are_json_objects() {
        for row in VARIANT_TABLE {
            let value: serde_json::Value = serde_json::from_str(row.template).unwrap();
            assert!(value.is_object(), "{}", row.name);
        }
    }

    #[test]
    fn test_ceil_div() {
        assert_eq!(ceil_div(12, 13), 1);
        assert_eq!(ceil_div(26, 13), 2);
        assert_eq!(ceil_div(27, 13), 3);
        assert_eq!(ceil_div(0, 13), 0);
    }

    #[test]
    fn test_fortunes_favor_level_one_is_degenerate() {
        assert_eq!(scale_fortunes_favor(1), Err(ScalingError::Negative("stock size")));
        assert!(scale_fortunes_favor(2).is_ok());
    }

    #[test]
    fn test_laws_report_overflow_by_field() {
        assert_eq!(scale_free_cell(u32::MAX), Err(ScalingError::Overflow("tableau piles")));
        assert_eq!(scale_flower_garden(300_000_000), Err(ScalingError::Overflow("reserve")));
        assert_eq!(scale_canfield(2_000_000_000), Err(ScalingError::Overflow("reserve")));
        // The ratio laws stay in range until the multiply itself overflows.
        assert_eq!(
            scale_alpha_star(u32::MAX / 12).map(|s| s.tableau_piles),
            Ok(Some(ceil_div(u32::MAX / 12 * 12, 13)))
        );
        assert_eq!(scale_identity(u32::MAX).map(|s| s.max_rank), Ok(u32::MAX));
    }

    #[test]
    fn test_serde_uses_solver_names() {
        let json = serde_json::to_string(&Variant::FortunesFavor).unwrap();
        assert_eq!(json, "\"fortunes-favor\"");
    }
}
