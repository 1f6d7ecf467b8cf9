use std::fmt;

use assist::ClaimAssessment;
use items::Principal;
use serde::{Deserialize, Serialize};

use crate::error::ClaimError;
use crate::pickup::PickupCredential;

/// Minimum score for a successful claim, inclusive.
pub const VERIFICATION_THRESHOLD: u8 = 70;
/// Minimum proof length in characters, after trimming.
pub const MIN_PROOF_CHARS: usize = 10;

pub const SUCCESS_REASON: &str = "Strong match with hidden details.";
pub const MISMATCH_REASON: &str =
    "Our AI could not match your description with the item's hidden details.";
pub const UNAVAILABLE_REASON: &str = "Verification could not be completed. Please try again.";
pub const TIMEOUT_REASON: &str = "Verification took too long. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStep {
    Input,
    Processing,
    Success,
    Fail,
}

impl ClaimStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStep::Input => "input",
            ClaimStep::Processing => "processing",
            ClaimStep::Success => "success",
            ClaimStep::Fail => "fail",
        }
    }
}

impl fmt::Display for ClaimStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a verification ended without a comparator score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationFailure {
    /// The comparator or the store returned an error.
    Unavailable,
    TimedOut,
    /// The item stopped being claimable while the claim was processing.
    Closed(String),
}

/// Identifies one submission, so a late result from an earlier attempt
/// cannot overwrite a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptTicket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
struct Verdict {
    score: Option<u8>,
    reason: String,
    pickup: Option<PickupCredential>,
}

/// Ownership claim state machine:
/// `input -> processing -> success | fail`, and `fail -> input` on retry.
#[derive(Debug, Clone)]
pub struct ClaimWorkflow {
    item_id: String,
    claimant: Principal,
    step: ClaimStep,
    proof: String,
    attempt: u64,
    verdict: Option<Verdict>,
}

impl ClaimWorkflow {
    pub fn new(item_id: impl Into<String>, claimant: Principal) -> Self {
        Self {
            item_id: item_id.into(),
            claimant,
            step: ClaimStep::Input,
            proof: String::new(),
            attempt: 0,
            verdict: None,
        }
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn claimant(&self) -> &Principal {
        &self.claimant
    }

    pub fn step(&self) -> ClaimStep {
        self.step
    }

    pub fn proof(&self) -> &str {
        &self.proof
    }

    pub fn score(&self) -> Option<u8> {
        self.verdict.as_ref().and_then(|v| v.score)
    }

    pub fn reason(&self) -> Option<&str> {
        self.verdict.as_ref().map(|v| v.reason.as_str())
    }

    pub fn pickup(&self) -> Option<&PickupCredential> {
        self.verdict.as_ref().and_then(|v| v.pickup.as_ref())
    }

    /// `input -> processing`. A too-short proof leaves the claim in `input`.
    pub fn begin(&mut self, proof: &str) -> Result<AttemptTicket, ClaimError> {
        match self.step {
            ClaimStep::Input => {}
            ClaimStep::Processing => return Err(ClaimError::AlreadyProcessing),
            from => {
                return Err(ClaimError::InvalidTransition {
                    from,
                    action: "submit",
                })
            }
        }
        let proof = proof.trim();
        let actual = proof.chars().count();
        if actual < MIN_PROOF_CHARS {
            return Err(ClaimError::ProofTooShort {
                min: MIN_PROOF_CHARS,
                actual,
            });
        }
        self.proof = proof.to_string();
        self.attempt += 1;
        self.step = ClaimStep::Processing;
        Ok(AttemptTicket(self.attempt))
    }

    /// `processing -> success | fail`. Returns `false` when the ticket is
    /// stale or the claim is no longer processing; the result is dropped.
    pub fn resolve(
        &mut self,
        ticket: AttemptTicket,
        result: Result<ClaimAssessment, VerificationFailure>,
    ) -> bool {
        if self.step != ClaimStep::Processing || ticket.0 != self.attempt {
            return false;
        }
        let verdict = match result {
            Ok(assessment) if assessment.score >= VERIFICATION_THRESHOLD => Verdict {
                score: Some(assessment.score),
                reason: non_empty(assessment.reason).unwrap_or_else(|| SUCCESS_REASON.into()),
                pickup: Some(PickupCredential::issue(&self.item_id, &self.claimant.uid)),
            },
            Ok(assessment) => Verdict {
                score: Some(assessment.score),
                reason: non_empty(assessment.reason).unwrap_or_else(|| MISMATCH_REASON.into()),
                pickup: None,
            },
            Err(VerificationFailure::Unavailable) => Verdict {
                score: None,
                reason: UNAVAILABLE_REASON.into(),
                pickup: None,
            },
            Err(VerificationFailure::TimedOut) => Verdict {
                score: None,
                reason: TIMEOUT_REASON.into(),
                pickup: None,
            },
            Err(VerificationFailure::Closed(reason)) => Verdict {
                score: None,
                reason,
                pickup: None,
            },
        };
        self.step = if verdict.pickup.is_some() {
            ClaimStep::Success
        } else {
            ClaimStep::Fail
        };
        self.verdict = Some(verdict);
        true
    }

    /// `fail -> input`. The previous score and reason are discarded; the
    /// proof text is kept for editing.
    pub fn retry(&mut self) -> Result<(), ClaimError> {
        if self.step != ClaimStep::Fail {
            return Err(ClaimError::InvalidTransition {
                from: self.step,
                action: "retry",
            });
        }
        self.step = ClaimStep::Input;
        self.verdict = None;
        Ok(())
    }

    pub fn view(&self, claim_id: &str) -> ClaimView {
        ClaimView {
            claim_id: claim_id.to_string(),
            item_id: self.item_id.clone(),
            step: self.step,
            proof: self.proof.clone(),
            score: self.score(),
            reason: self.reason().map(str::to_string),
            pickup_code: self.pickup().map(ToString::to_string),
        }
    }
}

fn non_empty(reason: Option<String>) -> Option<String> {
    reason.filter(|r| !r.trim().is_empty())
}

/// Client-facing snapshot of a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimView {
    pub claim_id: String,
    pub item_id: String,
    pub step: ClaimStep,
    pub proof: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workflow() -> ClaimWorkflow {
        ClaimWorkflow::new("item-1", Principal::new("uid-owner", "owner@iare.ac.in"))
    }

    fn assessed(score: u8, reason: Option<&str>) -> Result<ClaimAssessment, VerificationFailure> {
        Ok(ClaimAssessment {
            score,
            reason: reason.map(str::to_string),
        })
    }

    #[test]
    fn short_proof_stays_in_input() {
        let mut wf = workflow();
        for proof in ["", "too short", "  123456789  "] {
            let err = wf.begin(proof).unwrap_err();
            assert!(matches!(err, ClaimError::ProofTooShort { min: 10, .. }));
            assert_eq!(wf.step(), ClaimStep::Input);
        }
        assert!(wf.begin("1234567890").is_ok());
    }

    #[test]
    fn threshold_is_inclusive() {
        let mut wf = workflow();
        let t = wf.begin("black case with a scratch").unwrap();
        assert!(wf.resolve(t, assessed(70, Some("ok"))));
        assert_eq!(wf.step(), ClaimStep::Success);
        assert!(wf.pickup().is_some());

        let mut wf = workflow();
        let t = wf.begin("black case with a scratch").unwrap();
        assert!(wf.resolve(t, assessed(69, Some("weak"))));
        assert_eq!(wf.step(), ClaimStep::Fail);
        assert_eq!(wf.score(), Some(69));
        assert!(wf.pickup().is_none());
    }

    #[test]
    fn double_submit_is_single_flight() {
        let mut wf = workflow();
        wf.begin("first detailed proof").unwrap();
        assert_eq!(
            wf.begin("second detailed proof").unwrap_err(),
            ClaimError::AlreadyProcessing
        );
        assert_eq!(wf.proof(), "first detailed proof");
    }

    #[test]
    fn submit_after_outcome_is_invalid() {
        let mut wf = workflow();
        let t = wf.begin("detailed proof text").unwrap();
        wf.resolve(t, assessed(95, None));
        assert_eq!(
            wf.begin("another detailed proof").unwrap_err(),
            ClaimError::InvalidTransition {
                from: ClaimStep::Success,
                action: "submit"
            }
        );
    }

    #[test]
    fn retry_clears_result_and_keeps_proof() {
        let mut wf = workflow();
        let t = wf.begin("blue sticker on the back").unwrap();
        wf.resolve(t, assessed(20, Some("no match")));
        wf.retry().unwrap();
        assert_eq!(wf.step(), ClaimStep::Input);
        assert_eq!(wf.score(), None);
        assert_eq!(wf.reason(), None);
        assert_eq!(wf.proof(), "blue sticker on the back");

        let view = wf.view("c-1");
        assert_eq!(view.score, None);
        assert_eq!(view.reason, None);
        assert_eq!(view.pickup_code, None);
    }

    #[test]
    fn retry_only_from_fail() {
        let mut wf = workflow();
        assert!(matches!(
            wf.retry(),
            Err(ClaimError::InvalidTransition { from: ClaimStep::Input, .. })
        ));
        let t = wf.begin("detailed proof text").unwrap();
        assert!(matches!(
            wf.retry(),
            Err(ClaimError::InvalidTransition { from: ClaimStep::Processing, .. })
        ));
        wf.resolve(t, assessed(90, None));
        assert!(matches!(
            wf.retry(),
            Err(ClaimError::InvalidTransition { from: ClaimStep::Success, .. })
        ));
    }

    #[test]
    fn failures_use_generic_reasons() {
        let mut wf = workflow();
        let t = wf.begin("detailed proof text").unwrap();
        wf.resolve(t, Err(VerificationFailure::TimedOut));
        assert_eq!(wf.step(), ClaimStep::Fail);
        assert_eq!(wf.reason(), Some(TIMEOUT_REASON));
        assert_eq!(wf.score(), None);

        wf.retry().unwrap();
        let t = wf.begin("detailed proof text").unwrap();
        wf.resolve(t, Err(VerificationFailure::Unavailable));
        assert_eq!(wf.reason(), Some(UNAVAILABLE_REASON));

        wf.retry().unwrap();
        let t = wf.begin("detailed proof text").unwrap();
        wf.resolve(t, assessed(10, Some("   ")));
        assert_eq!(wf.reason(), Some(MISMATCH_REASON));
    }

    #[test]
    fn stale_ticket_is_ignored() {
        let mut wf = workflow();
        let first = wf.begin("detailed proof text").unwrap();
        wf.resolve(first, Err(VerificationFailure::TimedOut));
        wf.retry().unwrap();
        let second = wf.begin("more detailed proof").unwrap();

        assert!(!wf.resolve(first, assessed(99, None)));
        assert_eq!(wf.step(), ClaimStep::Processing);
        assert!(wf.resolve(second, assessed(12, None)));
        assert_eq!(wf.step(), ClaimStep::Fail);
    }

    #[test]
    fn success_carries_credential_for_claimant() {
        let mut wf = workflow();
        let t = wf
            .begin("It has a sticker of 'Apple' on the bottom right")
            .unwrap();
        wf.resolve(t, assessed(88, Some("Strong match with hidden details.")));
        let view = wf.view("c-9");
        assert_eq!(view.step, ClaimStep::Success);
        assert_eq!(view.score, Some(88));
        let expected = PickupCredential::issue("item-1", "uid-owner").to_string();
        assert_eq!(view.pickup_code.as_deref(), Some(expected.as_str()));
    }
}
