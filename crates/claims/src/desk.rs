use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use assist::{ClaimAssessment, ClaimComparator};
use dashmap::DashMap;
use items::{ItemRecord, ItemType, Principal};
use store::ItemStore;

use crate::error::ClaimError;
use crate::workflow::{
    AttemptTicket, ClaimStep, ClaimView, ClaimWorkflow, VerificationFailure, MIN_PROOF_CHARS,
};

/// Comparator input when the finder recorded no hidden details.
pub const NO_HIDDEN_DETAILS: &str = "No hidden details recorded.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimsConfig {
    /// Upper bound on one comparator call. A slower call fails the claim.
    pub verification_timeout: Duration,
    /// Claims untouched for this long are discarded, unless a verification
    /// is still running.
    pub idle_ttl: Duration,
}

impl Default for ClaimsConfig {
    fn default() -> Self {
        Self {
            verification_timeout: Duration::from_secs(20),
            idle_ttl: Duration::from_secs(30 * 60),
        }
    }
}

type SharedWorkflow = Arc<Mutex<ClaimWorkflow>>;

struct ClaimSlot {
    workflow: SharedWorkflow,
    touched: Instant,
}

/// Registry of open claims.
///
/// Each claim belongs to the principal who opened it; other principals see
/// it as missing. Claims live only in memory. They vanish when closed, once
/// verification succeeds, or after sitting idle for
/// [`ClaimsConfig::idle_ttl`].
pub struct ClaimDesk {
    store: Arc<ItemStore>,
    comparator: Arc<dyn ClaimComparator>,
    claims: DashMap<String, ClaimSlot>,
    /// (uid, item id) pairs with a direct assessment in flight.
    assessing: DashMap<(String, String), ()>,
    cfg: ClaimsConfig,
}

/// Releases an in-flight assessment slot on drop.
struct AssessingSlot<'a> {
    desk: &'a ClaimDesk,
    key: (String, String),
}

impl Drop for AssessingSlot<'_> {
    fn drop(&mut self) {
        self.desk.assessing.remove(&self.key);
    }
}

impl ClaimDesk {
    pub fn new(
        store: Arc<ItemStore>,
        comparator: Arc<dyn ClaimComparator>,
        cfg: ClaimsConfig,
    ) -> Self {
        Self {
            store,
            comparator,
            claims: DashMap::new(),
            assessing: DashMap::new(),
            cfg,
        }
    }

    pub fn config(&self) -> &ClaimsConfig {
        &self.cfg
    }

    pub fn open_claims(&self) -> usize {
        self.claims.len()
    }

    /// Start a claim on an open found item reported by someone else.
    pub fn open(&self, item_id: &str, principal: &Principal) -> Result<ClaimView, ClaimError> {
        self.sweep_idle();
        self.claimable(item_id, principal)?;

        let claim_id = uuid::Uuid::new_v4().to_string();
        let workflow = ClaimWorkflow::new(item_id, principal.clone());
        let view = workflow.view(&claim_id);
        self.claims.insert(
            claim_id.clone(),
            ClaimSlot {
                workflow: Arc::new(Mutex::new(workflow)),
                touched: Instant::now(),
            },
        );
        tracing::info!(
            target: "lostfound::claims",
            claim_id = %claim_id,
            item_id,
            claimant_uid = %principal.uid,
            "claim opened"
        );
        Ok(view)
    }

    pub fn view(&self, claim_id: &str, principal: &Principal) -> Result<ClaimView, ClaimError> {
        let workflow = self.lookup(claim_id, principal)?;
        let view = lock(&workflow).view(claim_id);
        Ok(view)
    }

    /// Submit proof and wait for the verdict.
    ///
    /// The comparison runs on its own task: if the caller goes away, the
    /// claim still reaches `success` or `fail` within the verification
    /// timeout instead of staying in `processing`.
    pub async fn submit_proof(
        &self,
        claim_id: &str,
        principal: &Principal,
        proof: &str,
    ) -> Result<ClaimView, ClaimError> {
        let workflow = self.lookup(claim_id, principal)?;
        let (ticket, item_id, proof) = {
            let mut guard = lock(&workflow);
            let ticket = guard.begin(proof)?;
            (ticket, guard.item_id().to_string(), guard.proof().to_string())
        };

        let task = tokio::spawn(verify(
            Arc::clone(&self.store),
            Arc::clone(&self.comparator),
            self.cfg.verification_timeout,
            Arc::clone(&workflow),
            ticket,
            item_id,
            proof,
        ));
        if let Err(err) = task.await {
            tracing::error!(target: "lostfound::claims", claim_id, error = %err, "verification task failed");
            lock(&workflow).resolve(ticket, Err(VerificationFailure::Unavailable));
        }

        let view = lock(&workflow).view(claim_id);
        tracing::info!(
            target: "lostfound::claims",
            claim_id,
            step = %view.step,
            score = view.score,
            "claim verified"
        );
        // The pickup code is derivable from item and claimant, so the claim
        // itself has nothing left to offer.
        if view.step == ClaimStep::Success {
            self.claims.remove(claim_id);
        }
        Ok(view)
    }

    pub fn retry(&self, claim_id: &str, principal: &Principal) -> Result<ClaimView, ClaimError> {
        let workflow = self.lookup(claim_id, principal)?;
        let mut guard = lock(&workflow);
        guard.retry()?;
        Ok(guard.view(claim_id))
    }

    /// Discard the claim. A verification still running finishes into a
    /// workflow nobody can reach.
    pub fn close(&self, claim_id: &str, principal: &Principal) -> Result<(), ClaimError> {
        self.lookup(claim_id, principal)?;
        self.claims.remove(claim_id);
        tracing::debug!(target: "lostfound::claims", claim_id, "claim closed");
        Ok(())
    }

    /// Discard claims idle past [`ClaimsConfig::idle_ttl`]. Claims with a
    /// verification in flight are kept. Returns how many were dropped.
    pub fn sweep_idle(&self) -> usize {
        let ttl = self.cfg.idle_ttl;
        let mut evicted = 0;
        self.claims.retain(|_, slot| {
            let keep = slot.touched.elapsed() < ttl
                || lock(&slot.workflow).step() == ClaimStep::Processing;
            if !keep {
                evicted += 1;
            }
            keep
        });
        if evicted > 0 {
            tracing::debug!(target: "lostfound::claims", evicted, "idle claims discarded");
        }
        evicted
    }

    /// One-shot comparison against an item's hidden details, outside any
    /// claim. The item must be claimable by `principal`, exactly as for
    /// [`ClaimDesk::open`], and each principal gets one assessment per item
    /// at a time. Errors are reported rather than folded into a verdict.
    pub async fn assess(
        &self,
        item_id: &str,
        principal: &Principal,
        proof: &str,
    ) -> Result<ClaimAssessment, ClaimError> {
        let actual = proof.trim().chars().count();
        if actual < MIN_PROOF_CHARS {
            return Err(ClaimError::ProofTooShort {
                min: MIN_PROOF_CHARS,
                actual,
            });
        }
        let item = self.claimable(item_id, principal)?;

        let key = (principal.uid.clone(), item_id.to_string());
        if self.assessing.insert(key.clone(), ()).is_some() {
            return Err(ClaimError::AlreadyProcessing);
        }
        let _slot = AssessingSlot { desk: self, key };

        let hidden = item.hidden_details().unwrap_or(NO_HIDDEN_DETAILS).to_string();
        let timeout = self.cfg.verification_timeout;
        match tokio::time::timeout(timeout, self.comparator.compare(&hidden, proof.trim())).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ClaimError::Timeout(timeout)),
        }
    }

    /// An open found item reported by someone other than `principal`.
    fn claimable(&self, item_id: &str, principal: &Principal) -> Result<ItemRecord, ClaimError> {
        let item = self
            .store
            .get(item_id)?
            .ok_or_else(|| ClaimError::ItemNotFound(item_id.to_string()))?;
        if item.item_type != ItemType::Found {
            return Err(ClaimError::NotClaimable(item_id.to_string()));
        }
        if !item.is_open() {
            return Err(ClaimError::ItemReturned(item_id.to_string()));
        }
        if item.is_owned_by(principal) {
            return Err(ClaimError::OwnItem);
        }
        Ok(item)
    }

    fn lookup(&self, claim_id: &str, principal: &Principal) -> Result<SharedWorkflow, ClaimError> {
        let mut slot = self
            .claims
            .get_mut(claim_id)
            .ok_or_else(|| ClaimError::ClaimNotFound(claim_id.to_string()))?;
        if lock(&slot.workflow).claimant().uid != principal.uid {
            return Err(ClaimError::ClaimNotFound(claim_id.to_string()));
        }
        slot.touched = Instant::now();
        Ok(Arc::clone(&slot.workflow))
    }
}

fn lock(workflow: &SharedWorkflow) -> MutexGuard<'_, ClaimWorkflow> {
    workflow.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn verify(
    store: Arc<ItemStore>,
    comparator: Arc<dyn ClaimComparator>,
    timeout: Duration,
    workflow: SharedWorkflow,
    ticket: AttemptTicket,
    item_id: String,
    proof: String,
) {
    let outcome = match store.get(&item_id) {
        Ok(Some(item)) if item.is_open() => {
            let hidden = item.hidden_details().unwrap_or(NO_HIDDEN_DETAILS);
            match tokio::time::timeout(timeout, comparator.compare(hidden, &proof)).await {
                Ok(Ok(assessment)) => Ok(assessment),
                Ok(Err(err)) => {
                    tracing::warn!(target: "lostfound::claims", item_id = %item_id, error = %err, "comparator failed");
                    Err(VerificationFailure::Unavailable)
                }
                Err(_) => {
                    tracing::warn!(
                        target: "lostfound::claims",
                        item_id = %item_id,
                        timeout_ms = timeout.as_millis() as u64,
                        "comparator timed out"
                    );
                    Err(VerificationFailure::TimedOut)
                }
            }
        }
        Ok(Some(_)) => Err(VerificationFailure::Closed(
            "This item has already been returned to its owner.".into(),
        )),
        Ok(None) => Err(VerificationFailure::Closed(
            "This item is no longer listed.".into(),
        )),
        Err(err) => {
            tracing::warn!(target: "lostfound::claims", item_id = %item_id, error = %err, "item lookup failed");
            Err(VerificationFailure::Unavailable)
        }
    };
    lock(&workflow).resolve(ticket, outcome);
}
