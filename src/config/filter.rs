// src/config/filter.rs
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Per-source filter settings as read from TOML. Every field is optional so
/// that a missing one is reported per source instead of failing the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawFilterConfig {
    pub max_age_days: Option<u32>,
    pub min_engagement: Option<u64>,
    pub min_content_length: Option<usize>,
    pub relevance_threshold: Option<f32>,
    pub max_items_per_source: Option<usize>,
    #[serde(default)]
    pub require_created_at: bool,
}

/// Validated per-source filter settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    pub max_age_days: u32,
    pub min_engagement: u64,
    pub min_content_length: usize,
    pub relevance_threshold: f32,
    pub max_items_per_source: usize,
    pub require_created_at: bool,
}

impl FilterConfig {
    pub fn validate(raw: &RawFilterConfig) -> Result<Self, ConfigError> {
        let max_age_days = raw
            .max_age_days
            .ok_or(ConfigError::MissingField("max_age_days"))?;
        let min_engagement = raw
            .min_engagement
            .ok_or(ConfigError::MissingField("min_engagement"))?;
        let min_content_length = raw
            .min_content_length
            .ok_or(ConfigError::MissingField("min_content_length"))?;
        let relevance_threshold = raw
            .relevance_threshold
            .ok_or(ConfigError::MissingField("relevance_threshold"))?;
        let max_items_per_source = raw
            .max_items_per_source
            .ok_or(ConfigError::MissingField("max_items_per_source"))?;

        if !relevance_threshold.is_finite() || !(0.0..=1.0).contains(&relevance_threshold) {
            return Err(ConfigError::OutOfRange {
                field: "relevance_threshold",
                value: relevance_threshold.to_string(),
            });
        }
        if max_items_per_source == 0 {
            return Err(ConfigError::OutOfRange {
                field: "max_items_per_source",
                value: "0".into(),
            });
        }

        Ok(Self {
            max_age_days,
            min_engagement,
            min_content_length,
            relevance_threshold,
            max_items_per_source,
            require_created_at: raw.require_created_at,
        })
    }
}

impl TryFrom<&RawFilterConfig> for FilterConfig {
    type Error = ConfigError;

    fn try_from(raw: &RawFilterConfig) -> Result<Self, Self::Error> {
        Self::validate(raw)
    }
}
