//! Structured observability hooks for deletion handling.
//!
//! This module provides:
//! - A per-event tracing span via [`deletion_span`]
//! - Emission functions for each way a deletion event can end
//!
//! Events are emitted at `info!` level unless noted. Filter with `RUST_LOG`.

use tracing::{debug, info, warn};

/// Span covering the handling of one deleted item.
///
/// Attach it with `tracing::Instrument` so it follows the future across
/// await points.
///
/// # Example
///
/// ```ignore
/// handle(item).instrument(deletion_span("p/feature", &event_id)).await;
/// // every event inside carries deleted_job = "p/feature"
/// ```
pub fn deletion_span(deleted_job: &str, event_id: &str) -> tracing::Span {
    tracing::info_span!("teardown.deletion", deleted_job = %deleted_job, event_id = %event_id)
}

/// Emit event: the deleted item is not a multi-branch branch job.
pub fn emit_ignored(deleted_job: &str) {
    debug!(event = "teardown.ignored", deleted_job = %deleted_job);
}

/// Emit event: tear-down job resolved.
pub fn emit_resolved(deleted_job: &str, tear_down_job: &str, source: &str) {
    info!(
        event = "teardown.resolved",
        deleted_job = %deleted_job,
        tear_down_job = %tear_down_job,
        source = %source,
    );
}

/// Emit event: tear-down build queued.
pub fn emit_scheduled(tear_down_job: &str, queue_ref: &str, git_url: &str, branch_name: &str) {
    info!(
        event = "teardown.scheduled",
        tear_down_job = %tear_down_job,
        queue_ref = %queue_ref,
        git_url = %git_url,
        branch_name = %branch_name,
    );
}

/// Emit event: resolved job does not exist (debug level).
pub fn emit_not_found(tear_down_job: &str) {
    debug!(event = "teardown.not_found", tear_down_job = %tear_down_job);
}

/// Emit event: SCM metadata missing, dispatch aborted (warning level).
pub fn emit_metadata_unavailable(deleted_job: &str, error: &dyn std::fmt::Display) {
    warn!(event = "teardown.metadata_unavailable", deleted_job = %deleted_job, error = %error);
}

/// Emit event: enqueue rejected (warning level).
pub fn emit_enqueue_failed(tear_down_job: &str, error: &dyn std::fmt::Display) {
    warn!(event = "teardown.enqueue_failed", tear_down_job = %tear_down_job, error = %error);
}
