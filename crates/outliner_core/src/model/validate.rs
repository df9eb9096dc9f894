//! Field normalization and range checks shared by drafts and patches.
//!
//! # Invariants
//! - Titles are trimmed and never blank.
//! - Tags are trimmed, lower-cased, deduplicated and sorted.
//! - Importance/urgency stay within `0..=max`; progress within `0..=100`.

use crate::error::ValidationError;
use std::collections::BTreeSet;

/// Highest value of the importance/urgency scale by default (five stars).
pub const DEFAULT_MAX_SCALE: u8 = 5;
/// Progress is a percentage.
pub const MAX_PROGRESS: u8 = 100;

/// Upper bounds of the enumerated scheduling scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationLimits {
    pub max_importance: u8,
    pub max_urgency: u8,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_importance: DEFAULT_MAX_SCALE,
            max_urgency: DEFAULT_MAX_SCALE,
        }
    }
}

impl ValidationLimits {
    pub fn check_importance(&self, value: u8) -> Result<u8, ValidationError> {
        if value > self.max_importance {
            return Err(ValidationError::ImportanceOutOfRange {
                value,
                max: self.max_importance,
            });
        }
        Ok(value)
    }

    pub fn check_urgency(&self, value: u8) -> Result<u8, ValidationError> {
        if value > self.max_urgency {
            return Err(ValidationError::UrgencyOutOfRange {
                value,
                max: self.max_urgency,
            });
        }
        Ok(value)
    }
}

pub fn check_progress(value: u8) -> Result<u8, ValidationError> {
    if value > MAX_PROGRESS {
        return Err(ValidationError::ProgressOutOfRange { value });
    }
    Ok(value)
}

/// Trims a title and rejects blank input.
pub fn normalize_title(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankTitle);
    }
    Ok(trimmed.to_string())
}

/// Normalizes one tag value for lookups. Returns `None` for blank input.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes and deduplicates a tag set; blank tags are rejected.
pub fn normalize_tags(tags: &[String]) -> Result<Vec<String>, ValidationError> {
    let mut unique = BTreeSet::new();
    for tag in tags {
        let normalized = normalize_tag(tag).ok_or(ValidationError::BlankTag)?;
        unique.insert(normalized);
    }
    Ok(unique.into_iter().collect())
}
