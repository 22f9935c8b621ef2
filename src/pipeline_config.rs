//! Pipeline tunables.
//!
//! Every empirically tuned constant of the menu pipeline lives here: escalation
//! thresholds, similarity threshold, plausible price bands, association window
//! and validator limits. Defaults match the values the pipeline was tuned on;
//! callers may override them from JSON or environment variables.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::types::Currency;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {name}: {value}")]
    InvalidOverride { name: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Cannot read configuration file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
}

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Primary results with fewer dishes escalate to the secondary engine.
    pub min_dish_count: usize,
    /// Primary results below this overall confidence escalate.
    pub min_overall_confidence: f32,
    /// Names more similar than this are the same dish.
    pub similarity_threshold: f64,
    /// Lines searched before and after a candidate for its price.
    pub association_window: usize,
    /// Plausible band for marked prices.
    pub min_price: f64,
    pub max_price: f64,
    /// Plausible band for bare numbers without a currency marker.
    pub bare_price_min: f64,
    pub bare_price_max: f64,
    /// Dish name length limits, in characters.
    pub min_name_chars: usize,
    pub max_name_chars: usize,
    /// Longest allowed run of one repeated character in a name.
    pub max_char_run: usize,
    /// Final list cap; lowest-confidence excess is dropped.
    pub max_dishes: usize,
    /// Lettered variants sharing a base needed to call them hallucinated.
    pub min_variant_siblings: usize,
    /// Anchor dishes a cuisine needs before it can conflict with another.
    pub min_cuisine_anchors: usize,
    /// Currency for unmarked prices when the menu shows no marker at all.
    pub default_currency: Option<Currency>,
    /// Time budget per acquisition stage.
    pub stage_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_dish_count: 3,
            min_overall_confidence: 0.35,
            similarity_threshold: 0.85,
            association_window: 2,
            min_price: 1.0,
            max_price: 10_000.0,
            bare_price_min: 10.0,
            bare_price_max: 2_000.0,
            min_name_chars: 2,
            max_name_chars: 60,
            max_char_run: 3,
            max_dishes: 80,
            min_variant_siblings: 2,
            min_cuisine_anchors: 2,
            default_currency: None,
            stage_timeout_ms: 30_000,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Loading
// ═══════════════════════════════════════════════════════════

const ENV_MIN_DISHES: &str = "MENUSCAN_MIN_DISHES";
const ENV_SIMILARITY: &str = "MENUSCAN_SIMILARITY";
const ENV_MAX_PRICE: &str = "MENUSCAN_MAX_PRICE";
const ENV_STAGE_TIMEOUT_MS: &str = "MENUSCAN_STAGE_TIMEOUT_MS";

impl PipelineConfig {
    /// Parse a (possibly partial) JSON config; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `MENUSCAN_*` environment overrides.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary lookup (environment in production).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_MIN_DISHES) {
            self.min_dish_count = parse_override(ENV_MIN_DISHES, &v)?;
        }
        if let Some(v) = lookup(ENV_SIMILARITY) {
            self.similarity_threshold = parse_override(ENV_SIMILARITY, &v)?;
        }
        if let Some(v) = lookup(ENV_MAX_PRICE) {
            self.max_price = parse_override(ENV_MAX_PRICE, &v)?;
        }
        if let Some(v) = lookup(ENV_STAGE_TIMEOUT_MS) {
            self.stage_timeout_ms = parse_override(ENV_STAGE_TIMEOUT_MS, &v)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject nonsensical combinations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "similarity_threshold must be in (0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.min_overall_confidence) {
            return Err(ConfigError::Invalid(format!(
                "min_overall_confidence must be in [0, 1], got {}",
                self.min_overall_confidence
            )));
        }
        if self.min_price <= 0.0 || self.min_price >= self.max_price {
            return Err(ConfigError::Invalid(format!(
                "price band must satisfy 0 < min < max, got {}..{}",
                self.min_price, self.max_price
            )));
        }
        if self.bare_price_min <= 0.0 || self.bare_price_min >= self.bare_price_max {
            return Err(ConfigError::Invalid(format!(
                "bare price band must satisfy 0 < min < max, got {}..{}",
                self.bare_price_min, self.bare_price_max
            )));
        }
        if self.min_name_chars == 0 || self.min_name_chars >= self.max_name_chars {
            return Err(ConfigError::Invalid(format!(
                "name length limits must satisfy 0 < min < max, got {}..{}",
                self.min_name_chars, self.max_name_chars
            )));
        }
        if self.max_dishes == 0 || self.max_char_run == 0 {
            return Err(ConfigError::Invalid(
                "max_dishes and max_char_run must be positive".into(),
            ));
        }
        if self.stage_timeout_ms == 0 {
            return Err(ConfigError::Invalid("stage_timeout_ms must be positive".into()));
        }
        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidOverride {
        name,
        value: value.to_string(),
    })
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
