use items::{Category, PublicItem};
use serde::{Deserialize, Serialize};
use store::StoreError;
use thiserror::Error;

/// Tuning for the matching engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchConfig {
    /// Titles with fewer characters (after trimming) are not matched.
    #[serde(default = "MatchConfig::default_min_title_chars")]
    pub min_title_chars: usize,
}

impl MatchConfig {
    pub(crate) fn default_min_title_chars() -> usize {
        3
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if self.min_title_chars == 0 {
            return Err(MatchError::InvalidConfig(
                "min_title_chars must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_title_chars: Self::default_min_title_chars(),
        }
    }
}

/// The part of a lost report that drives matching.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LostQuery {
    pub title: String,
    pub category: Category,
}

impl LostQuery {
    pub fn new(title: impl Into<String>, category: Category) -> Self {
        Self {
            title: title.into(),
            category,
        }
    }
}

/// Result of one matching pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    /// Candidates in store order.
    pub candidates: Vec<PublicItem>,
    /// Set when the store query failed; `candidates` is then empty.
    pub failure: Option<MatchError>,
    /// True when the title was too short to match and no query was issued.
    pub skipped: bool,
}

impl MatchOutcome {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    pub fn failed(err: MatchError) -> Self {
        Self {
            failure: Some(err),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MatchError {
    #[error("invalid match config: {0}")]
    InvalidConfig(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
