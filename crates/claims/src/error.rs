use std::time::Duration;

use assist::AssistError;
use store::StoreError;
use thiserror::Error;

use crate::workflow::ClaimStep;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClaimError {
    #[error("item {0} not found")]
    ItemNotFound(String),
    #[error("claim {0} not found")]
    ClaimNotFound(String),
    #[error("item {0} is a lost report and cannot be claimed")]
    NotClaimable(String),
    #[error("item {0} has already been returned")]
    ItemReturned(String),
    #[error("you reported this item as found and cannot claim it")]
    OwnItem,
    #[error("proof must be at least {min} characters, got {actual}")]
    ProofTooShort { min: usize, actual: usize },
    #[error("a verification is already in progress for this claim")]
    AlreadyProcessing,
    #[error("cannot {action} a claim in the {from} step")]
    InvalidTransition {
        from: ClaimStep,
        action: &'static str,
    },
    #[error("verification timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Assist(#[from] AssistError),
}

impl ClaimError {
    /// User-facing hint for recovering from the error.
    pub fn next_step(&self) -> &'static str {
        match self {
            ClaimError::ItemNotFound(_) | ClaimError::ClaimNotFound(_) => {
                "Refresh the feed and pick the item again."
            }
            ClaimError::NotClaimable(_) | ClaimError::OwnItem => {
                "Only found items reported by someone else can be claimed."
            }
            ClaimError::ItemReturned(_) => "This item has already been handed back to its owner.",
            ClaimError::ProofTooShort { .. } => {
                "Describe a unique hidden feature in more detail (at least 10 characters)."
            }
            ClaimError::AlreadyProcessing => "Wait for the current verification to finish.",
            ClaimError::InvalidTransition { .. } => "Reload the claim to see its current step.",
            ClaimError::Timeout(_) | ClaimError::Assist(_) => "Try the verification again shortly.",
            ClaimError::Store(_) => "The item store is unavailable. Try again in a moment.",
        }
    }
}
