use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use items::Category;

use crate::{AssistError, ClaimAssessment, ClaimComparator, ImageAnalyzer, ItemAnalysis};

/// How the stub scores claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubScoring {
    /// Share of the distinctive hidden-detail words that the proof repeats.
    Overlap,
    /// Always the same answer.
    Fixed { score: u8, reason: Option<String> },
    /// Every call fails with a transport error.
    Failing,
}

/// Deterministic, offline collaborator used by tests and the `stub`
/// provider. Counts calls so tests can assert a collaborator was (not)
/// contacted.
#[derive(Debug)]
pub struct StubAssistant {
    scoring: StubScoring,
    analysis: Option<ItemAnalysis>,
    delay: Option<Duration>,
    comparisons: AtomicUsize,
    analyses: AtomicUsize,
}

impl Default for StubAssistant {
    fn default() -> Self {
        Self {
            scoring: StubScoring::Overlap,
            analysis: None,
            delay: None,
            comparisons: AtomicUsize::new(0),
            analyses: AtomicUsize::new(0),
        }
    }
}

impl StubAssistant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fixed(score: u8, reason: impl Into<String>) -> Self {
        Self {
            scoring: StubScoring::Fixed {
                score,
                reason: Some(reason.into()),
            },
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            scoring: StubScoring::Failing,
            ..Self::default()
        }
    }

    pub fn with_scoring(mut self, scoring: StubScoring) -> Self {
        self.scoring = scoring;
        self
    }

    /// Analysis returned for every image. Without one, the stub describes
    /// an unidentified item.
    pub fn with_analysis(mut self, analysis: ItemAnalysis) -> Self {
        self.analysis = Some(analysis);
        self
    }

    /// Sleep before answering, to exercise caller timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn comparisons(&self) -> usize {
        self.comparisons.load(Ordering::SeqCst)
    }

    pub fn analyses(&self) -> usize {
        self.analyses.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn distinctive_words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
        .collect()
}

fn overlap_score(hidden_details: &str, proof: &str) -> ClaimAssessment {
    let truth = distinctive_words(hidden_details);
    let claim = distinctive_words(proof);
    if truth.is_empty() {
        return ClaimAssessment {
            score: 0,
            reason: Some("Nothing to compare against.".into()),
        };
    }
    let shared = truth.intersection(&claim).count();
    let score = ((shared as f64 / truth.len() as f64) * 100.0).round() as u8;
    ClaimAssessment {
        score,
        reason: Some(format!(
            "{shared} of {} identifying details matched.",
            truth.len()
        )),
    }
}

#[async_trait]
impl ClaimComparator for StubAssistant {
    async fn compare(
        &self,
        hidden_details: &str,
        proof: &str,
    ) -> Result<ClaimAssessment, AssistError> {
        if hidden_details.trim().is_empty() {
            return Err(AssistError::MissingInput("hidden_details"));
        }
        if proof.trim().is_empty() {
            return Err(AssistError::MissingInput("proof"));
        }
        self.comparisons.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        match &self.scoring {
            StubScoring::Overlap => Ok(overlap_score(hidden_details, proof)),
            StubScoring::Fixed { score, reason } => Ok(ClaimAssessment {
                score: (*score).min(100),
                reason: reason.clone(),
            }),
            StubScoring::Failing => Err(AssistError::Transport("stub provider offline".into())),
        }
    }
}

#[async_trait]
impl ImageAnalyzer for StubAssistant {
    async fn analyze(&self, image_base64: &str, _mime: &str) -> Result<ItemAnalysis, AssistError> {
        if image_base64.trim().is_empty() {
            return Err(AssistError::MissingInput("image"));
        }
        self.analyses.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.scoring == StubScoring::Failing {
            return Err(AssistError::Transport("stub provider offline".into()));
        }
        Ok(self.analysis.clone().unwrap_or_else(|| ItemAnalysis {
            title: "Unidentified item".into(),
            category: Category::Others,
            ..ItemAnalysis::default()
        }))
    }
}
