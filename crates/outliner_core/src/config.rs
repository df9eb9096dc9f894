//! Repository configuration.
//!
//! # Responsibility
//! - Carry the tunable policies of the repository: scale bounds, search
//!   defaults, tie-break order and post-mutation verification.
//! - Load those policies from JSON with per-field defaults.
//!
//! # Invariants
//! - A loaded config has passed [`RepositoryConfig::validate`].

use crate::model::{ValidationLimits, DEFAULT_MAX_SCALE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Secondary order for projection rows with equal sort keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    #[default]
    IdAscending,
    IdDescending,
}

/// Order of search hits that share a relevance level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecencyOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryConfig {
    pub max_importance: u8,
    pub max_urgency: u8,
    /// Default case sensitivity for queries that do not set it explicitly.
    pub search_case_sensitive: bool,
    pub projection_tie_break: TieBreak,
    pub search_recency: RecencyOrder,
    /// Run the integrity check after each structural mutation and rebuild
    /// the index on divergence.
    pub verify_after_mutation: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            max_importance: DEFAULT_MAX_SCALE,
            max_urgency: DEFAULT_MAX_SCALE,
            search_case_sensitive: false,
            projection_tie_break: TieBreak::default(),
            search_recency: RecencyOrder::default(),
            verify_after_mutation: cfg!(debug_assertions),
        }
    }
}

impl RepositoryConfig {
    /// Parses a JSON object; absent keys keep their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_importance == 0 {
            return Err(ConfigError::Invalid(
                "max_importance must be at least 1".to_string(),
            ));
        }
        if self.max_urgency == 0 {
            return Err(ConfigError::Invalid(
                "max_urgency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn limits(&self) -> ValidationLimits {
        ValidationLimits {
            max_importance: self.max_importance,
            max_urgency: self.max_urgency,
        }
    }
}
