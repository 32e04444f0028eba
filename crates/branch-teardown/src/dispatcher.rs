//! Looking up the resolved tear-down job and queueing one build of it.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::domain::{Result, TearDownParameters};
use crate::registry::{JobRegistry, QueueItem};

/// What happened to a dispatch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// One build was queued.
    Scheduled {
        job_name: String,
        queue_item: QueueItem,
    },

    /// No top-level job has that name; nothing to do.
    NotFound { job_name: String },
}

impl DispatchOutcome {
    pub fn is_scheduled(&self) -> bool {
        matches!(self, DispatchOutcome::Scheduled { .. })
    }
}

/// Queues tear-down builds against a [`JobRegistry`].
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<dyn JobRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<dyn JobRegistry>) -> Self {
        Self { registry }
    }

    /// Queue one build of `job_name` with `params`.
    ///
    /// Returns after the registry acknowledges the enqueue. A missing job is
    /// `Ok(NotFound)`; a rejected enqueue is `Err(EnqueueFailure)`. Nothing is
    /// retried.
    pub async fn dispatch(
        &self,
        job_name: &str,
        params: &TearDownParameters,
    ) -> Result<DispatchOutcome> {
        let Some(job) = self.registry.find_top_level_job(job_name).await? else {
            debug!(job = %job_name, "tear-down job not found, nothing to trigger");
            return Ok(DispatchOutcome::NotFound {
                job_name: job_name.to_string(),
            });
        };

        let queue_item = self.registry.schedule_build(&job, params).await?;
        Ok(DispatchOutcome::Scheduled {
            job_name: job.name,
            queue_item,
        })
    }
}
