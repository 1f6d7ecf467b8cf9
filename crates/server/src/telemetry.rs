//! Prometheus counters.
//!
//! The recorder is process-wide, so it is installed at most once and the
//! handle is shared by every router built afterwards.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub const ITEMS_CREATED: &str = "lostfound_items_created_total";
pub const CLAIMS: &str = "lostfound_claims_total";
pub const MATCH_QUERIES: &str = "lostfound_match_queries_total";
pub const AUTH_REJECTIONS: &str = "lostfound_auth_rejections_total";

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the global recorder, or return the one already installed.
pub fn install() -> anyhow::Result<PrometheusHandle> {
    let handle = HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;
        metrics::describe_counter!(ITEMS_CREATED, "Item reports stored, by type");
        metrics::describe_counter!(CLAIMS, "Claim verifications, by outcome");
        metrics::describe_counter!(MATCH_QUERIES, "Matching engine queries");
        metrics::describe_counter!(AUTH_REJECTIONS, "Rejected sign-ins, by reason");
        Ok::<_, anyhow::Error>(handle)
    })?;
    Ok(handle.clone())
}

pub fn record_item_created(item_type: &'static str) {
    metrics::counter!(ITEMS_CREATED, "type" => item_type).increment(1);
}

pub fn record_claim(outcome: &'static str) {
    metrics::counter!(CLAIMS, "outcome" => outcome).increment(1);
}

pub fn record_match_query(skipped: bool) {
    let skipped = if skipped { "true" } else { "false" };
    metrics::counter!(MATCH_QUERIES, "skipped" => skipped).increment(1);
}

pub fn record_auth_rejection(reason: &'static str) {
    metrics::counter!(AUTH_REJECTIONS, "reason" => reason).increment(1);
}
