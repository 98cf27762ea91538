//! Ruleset parameterization.
//!
//! A [`Ruleset`] is the variant's base template with the scaled fields
//! written over it. Each `(variant, level)` pair produces a fresh value;
//! rulesets are never edited in place.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::variant::{ScalingError, Variant};

/// A concrete solver configuration for one `(variant, level)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Ruleset {
    variant: Variant,
    level: u32,
    document: Value,
}

impl Ruleset {
    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// The JSON document handed to the solver.
    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn max_rank(&self) -> u32 {
        self.field("/max rank").unwrap_or(self.level)
    }

    pub fn tableau_pile_count(&self) -> Option<u32> {
        self.field("/tableau piles/count")
    }

    pub fn cell_count(&self) -> Option<u32> {
        self.field("/cells/count")
    }

    pub fn reserve_size(&self) -> Option<u32> {
        self.field("/reserve/size")
    }

    pub fn stock_size(&self) -> Option<u32> {
        self.field("/stock/size")
    }

    /// Cards in play: four suits of `max_rank` cards.
    pub fn deck_size(&self) -> usize {
        self.max_rank() as usize * 4
    }

    /// Compact JSON, as written to the transient rules file.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.document)?)
    }

    /// Indented JSON for diagnostics.
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.document)?)
    }

    /// SHA-256 of the compact JSON, hex encoded.
    pub fn digest(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(self.to_json()?.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }

    fn field(&self, pointer: &str) -> Option<u32> {
        self.document
            .pointer(pointer)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    }
}

impl fmt::Display for Ruleset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string_pretty(&self.document) {
            Ok(pretty) => f.write_str(&pretty),
            Err(_) => write!(f, "{} level {}", self.variant, self.level),
        }
    }
}

/// Build the ruleset for `variant` at `level` from its built-in template.
pub fn parameterize(variant: Variant, level: u32) -> Result<Ruleset> {
    let template: Value = serde_json::from_str(variant.spec().template)?;
    parameterize_from(&template, variant, level)
}

/// Build the ruleset for `variant` at `level` from an explicit template.
pub fn parameterize_from(template: &Value, variant: Variant, level: u32) -> Result<Ruleset> {
    let spec = variant.spec();
    if level < spec.min_level {
        return Err(CoreError::LevelBelowMinimum {
            variant: variant.to_string(),
            level,
            min_level: spec.min_level,
        });
    }

    let scaling = (spec.scale)(level).map_err(|e| match e {
        ScalingError::Negative(field) => CoreError::DegenerateRuleset {
            variant: variant.to_string(),
            level,
            field,
        },
        ScalingError::Overflow(field) => CoreError::LevelOutOfRange {
            variant: variant.to_string(),
            level,
            field,
        },
    })?;

    let mut document = template.clone();
    let root = document
        .as_object_mut()
        .ok_or_else(|| CoreError::InvalidTemplate {
            variant: variant.to_string(),
            reason: "template must be a JSON object".to_string(),
        })?;

    root.insert("max rank".to_string(), json!(scaling.max_rank));
    let overrides = [
        ("tableau piles", "count", scaling.tableau_piles),
        ("cells", "count", scaling.cells),
        ("reserve", "size", scaling.reserve),
        ("stock", "size", scaling.stock),
    ];
    for (section, key, value) in overrides {
        if let Some(value) = value {
            set_nested(root, variant, section, key, value)?;
        }
    }

    Ok(Ruleset {
        variant,
        level,
        document,
    })
}

fn set_nested(
    root: &mut Map<String, Value>,
    variant: Variant,
    section: &str,
    key: &str,
    value: u32,
) -> Result<()> {
    let entry = root
        .entry(section.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    let object = entry
        .as_object_mut()
        .ok_or_else(|| CoreError::InvalidTemplate {
            variant: variant.to_string(),
            reason: format!("\"{}\" must be an object", section),
        })?;
    object.insert(key.to_string(), json!(value));
    Ok(())
}

/// Where base templates come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSource {
    /// Templates compiled into the variant table.
    #[default]
    Builtin,

    /// `<dir>/<variant>.json`, falling back to the built-in template for
    /// variants without a file.
    Directory(PathBuf),
}

impl TemplateSource {
    /// Load the base template for `variant`.
    pub fn load(&self, variant: Variant) -> Result<Value> {
        let text = match self {
            TemplateSource::Builtin => variant.spec().template.to_string(),
            TemplateSource::Directory(dir) => {
                let path = dir.join(format!("{}.json", variant.name()));
                if path.is_file() {
                    debug!(variant = %variant, path = %path.display(), "Loading template override");
                    std::fs::read_to_string(&path)?
                } else {
                    variant.spec().template.to_string()
                }
            }
        };
        Ok(serde_json::from_str(&text)?)
    }

    /// Load the template and parameterize it.
    pub fn parameterize(&self, variant: Variant, level: u32) -> Result<Ruleset> {
        let template = self.load(variant)?;
        parameterize_from(&template, variant, level)
    }
}
