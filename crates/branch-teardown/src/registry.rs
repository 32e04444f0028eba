//! The host's job registry, as seen by the dispatcher.
//!
//! Implementations:
//! - [`MemoryJobRegistry`](crate::fakes::MemoryJobRegistry) for tests
//! - [`JenkinsRegistry`](crate::jenkins::JenkinsRegistry) over the Jenkins HTTP API

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Result, TearDownParameters};

/// A job found in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub name: String,

    /// Whether the host will accept new builds (false when disabled).
    pub buildable: bool,

    /// Number the next build of this job will get.
    pub next_build_number: u64,
}

/// Acknowledgement that a build was placed in the host's queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub job_name: String,

    /// Host-assigned queue reference (an id or a queue item URL).
    pub reference: String,

    pub enqueued_at: DateTime<Utc>,
}

/// Job lookup and build scheduling.
///
/// Guarantees:
/// - `find_top_level_job` matches names exactly and only at the top level.
/// - `schedule_build` returns once the build is queued; it never waits for the
///   build to start or finish.
#[async_trait]
pub trait JobRegistry: Send + Sync {
    /// Look up a top-level job by exact name.
    async fn find_top_level_job(&self, name: &str) -> Result<Option<JobSummary>>;

    /// Queue one build of `job` with `params` attached in their fixed order.
    ///
    /// Rejections surface as `TearDownError::EnqueueFailure`.
    async fn schedule_build(
        &self,
        job: &JobSummary,
        params: &TearDownParameters,
    ) -> Result<QueueItem>;
}
