//! AI collaborators for the lost & found service.
//!
//! Two narrow roles sit behind traits so the rest of the system never sees a
//! model or an HTTP call:
//!
//! - [`ImageAnalyzer`] turns a photo into draft report fields.
//! - [`ClaimComparator`] scores a claimant's proof against the hidden details
//!   recorded by the finder.
//!
//! [`GeminiClient`] implements both against the Gemini REST API with retry
//! and a circuit breaker; [`StubAssistant`] implements both offline and
//! deterministically.

pub mod config;
pub mod error;
pub mod gemini;
pub mod prompt;
pub mod resilience;
pub mod stub;

mod serde_millis;

pub use config::{AssistConfig, Collaborators, Provider};
pub use error::AssistError;
pub use gemini::{GeminiClient, GeminiSettings};
pub use stub::{StubAssistant, StubScoring};

use async_trait::async_trait;
use items::Category;
use serde::{Deserialize, Serialize};

/// Notice shown when photo analysis fails and the form must be filled by hand.
pub const ANALYSIS_FALLBACK_NOTICE: &str =
    "AI could not analyze the image. Please fill details manually.";

/// Draft fields suggested from a photo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAnalysis {
    pub title: String,
    pub category: Category,
    pub color: String,
    pub brand: Option<String>,
    pub tags: Vec<String>,
    pub description: String,
}

/// Outcome of comparing a proof with the hidden details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimAssessment {
    /// 0 to 100.
    pub score: u8,
    pub reason: Option<String>,
}

#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    /// `image_base64` is the raw payload without a data URL prefix.
    async fn analyze(&self, image_base64: &str, mime: &str) -> Result<ItemAnalysis, AssistError>;
}

#[async_trait]
pub trait ClaimComparator: Send + Sync {
    /// Both inputs must be non-empty.
    async fn compare(
        &self,
        hidden_details: &str,
        proof: &str,
    ) -> Result<ClaimAssessment, AssistError>;
}

/// Found-report form prefill. Analysis failures degrade to empty fields and a
/// notice instead of an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutofillDraft {
    pub title: String,
    pub category: Category,
    pub color: String,
    pub brand: Option<String>,
    pub tags: Vec<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl AutofillDraft {
    pub fn from_result(result: Result<ItemAnalysis, AssistError>) -> Self {
        match result {
            Ok(analysis) => Self {
                title: analysis.title,
                category: analysis.category,
                color: analysis.color,
                brand: analysis.brand,
                tags: analysis.tags,
                description: analysis.description,
                notice: None,
            },
            Err(err) => {
                tracing::warn!(target: "lostfound::assist", error = %err, "image analysis degraded");
                Self {
                    notice: Some(ANALYSIS_FALLBACK_NOTICE.to_string()),
                    ..Self::default()
                }
            }
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.notice.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn autofill_copies_successful_analysis() {
        let draft = AutofillDraft::from_result(Ok(ItemAnalysis {
            title: "Sony Headset".into(),
            category: Category::Electronics,
            color: "Black".into(),
            brand: Some("Sony".into()),
            tags: vec!["audio".into()],
            description: "Over-ear".into(),
        }));
        assert!(!draft.is_degraded());
        assert_eq!(draft.title, "Sony Headset");
        assert_eq!(draft.category, Category::Electronics);
    }

    #[test]
    fn autofill_degrades_failures_to_empty_fields() {
        let draft =
            AutofillDraft::from_result(Err(AssistError::MalformedResponse("not json".into())));
        assert!(draft.is_degraded());
        assert_eq!(draft.notice.as_deref(), Some(ANALYSIS_FALLBACK_NOTICE));
        assert!(draft.title.is_empty());
        assert_eq!(draft.category, Category::Others);
        assert!(draft.tags.is_empty());
    }
}
