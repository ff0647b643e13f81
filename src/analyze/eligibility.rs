// src/analyze/eligibility.rs
use chrono::{DateTime, Utc};

use crate::config::FilterConfig;
use crate::ingest::types::ContentItem;

/// Why an item was excluded before scoring.
#[derive(Debug, Clone, PartialEq)]
pub enum Ineligible {
    TooOld { age_days: i64 },
    MissingDate,
    LowEngagement { engagement: u64 },
    TooShort { chars: usize },
}

/// Cheap pre-score filter on age, engagement and body length.
pub fn check(item: &ContentItem, config: &FilterConfig, now: DateTime<Utc>) -> Result<(), Ineligible> {
    match item.created_at {
        Some(ts) => {
            let age = now.signed_duration_since(ts);
            if age.num_seconds() > i64::from(config.max_age_days) * 86_400 {
                return Err(Ineligible::TooOld {
                    age_days: age.num_days(),
                });
            }
        }
        None if config.require_created_at => return Err(Ineligible::MissingDate),
        None => {}
    }
    if item.engagement < config.min_engagement {
        return Err(Ineligible::LowEngagement {
            engagement: item.engagement,
        });
    }
    let chars = item.body.trim().chars().count();
    if chars < config.min_content_length {
        return Err(Ineligible::TooShort { chars });
    }
    Ok(())
}
