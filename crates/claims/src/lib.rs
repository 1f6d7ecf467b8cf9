//! Ownership claims on found items.
//!
//! A claimant picks a found item, describes a hidden feature only the owner
//! would know, and an AI comparator scores that description against the
//! finder's hidden details. A score of [`VERIFICATION_THRESHOLD`] or more
//! succeeds and yields a [`PickupCredential`].
//!
//! [`ClaimWorkflow`] is the pure state machine; [`ClaimDesk`] keeps the open
//! claims of all users and drives the comparator.

pub mod desk;
pub mod error;
pub mod pickup;
pub mod workflow;

pub use desk::{ClaimDesk, ClaimsConfig, NO_HIDDEN_DETAILS};
pub use error::ClaimError;
pub use pickup::PickupCredential;
pub use workflow::{
    AttemptTicket, ClaimStep, ClaimView, ClaimWorkflow, VerificationFailure, MIN_PROOF_CHARS,
    VERIFICATION_THRESHOLD,
};
