//! In-memory job registry (testing only)
//!
//! `MemoryJobRegistry` keeps a flat map of top-level jobs and records every
//! build it is asked to schedule, so tests can assert on build numbers and
//! parameter lists without a running host.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{ParameterValue, Result, TearDownError, TearDownParameters};
use crate::registry::{JobRegistry, JobSummary, QueueItem};

/// A build recorded by [`MemoryJobRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedBuild {
    pub number: u64,
    pub parameters: Vec<ParameterValue>,
}

#[derive(Debug)]
struct JobState {
    buildable: bool,
    next_build_number: u64,
    builds: Vec<RecordedBuild>,
}

impl JobState {
    fn new(buildable: bool) -> Self {
        Self {
            buildable,
            next_build_number: 1,
            builds: Vec::new(),
        }
    }
}

/// In-memory registry backed by a `HashMap<job name, JobState>`.
#[derive(Debug, Default)]
pub struct MemoryJobRegistry {
    jobs: Mutex<HashMap<String, JobState>>,
    lookup_failure: Mutex<Option<String>>,
}

impl MemoryJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buildable top-level job.
    pub fn create_job(&self, name: &str) {
        self.jobs
            .lock()
            .unwrap()
            .insert(name.to_string(), JobState::new(true));
    }

    /// Create a disabled top-level job that rejects new builds.
    pub fn create_disabled_job(&self, name: &str) {
        self.jobs
            .lock()
            .unwrap()
            .insert(name.to_string(), JobState::new(false));
    }

    /// Make every lookup fail with `reason`, as an unreachable host would.
    pub fn fail_lookups(&self, reason: &str) {
        *self.lookup_failure.lock().unwrap() = Some(reason.to_string());
    }

    /// Next build number of `name`, or `None` if the job does not exist.
    pub fn next_build_number(&self, name: &str) -> Option<u64> {
        self.jobs
            .lock()
            .unwrap()
            .get(name)
            .map(|job| job.next_build_number)
    }

    /// Builds scheduled for `name`, oldest first.
    pub fn builds(&self, name: &str) -> Vec<RecordedBuild> {
        self.jobs
            .lock()
            .unwrap()
            .get(name)
            .map(|job| job.builds.clone())
            .unwrap_or_default()
    }

    /// Most recent build scheduled for `name`.
    pub fn last_build(&self, name: &str) -> Option<RecordedBuild> {
        self.builds(name).pop()
    }

    /// Total builds scheduled across all jobs.
    pub fn total_builds(&self) -> usize {
        self.jobs
            .lock()
            .unwrap()
            .values()
            .map(|job| job.builds.len())
            .sum()
    }
}

#[async_trait]
impl JobRegistry for MemoryJobRegistry {
    async fn find_top_level_job(&self, name: &str) -> Result<Option<JobSummary>> {
        if let Some(reason) = self.lookup_failure.lock().unwrap().clone() {
            return Err(TearDownError::Registry {
                job: name.to_string(),
                reason,
            });
        }
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs.get(name).map(|job| JobSummary {
            name: name.to_string(),
            buildable: job.buildable,
            next_build_number: job.next_build_number,
        }))
    }

    async fn schedule_build(
        &self,
        job: &JobSummary,
        params: &TearDownParameters,
    ) -> Result<QueueItem> {
        let mut jobs = self.jobs.lock().unwrap();
        let state = jobs
            .get_mut(&job.name)
            .ok_or_else(|| TearDownError::EnqueueFailure {
                job: job.name.clone(),
                reason: "job no longer exists".to_string(),
            })?;
        if !state.buildable {
            return Err(TearDownError::EnqueueFailure {
                job: job.name.clone(),
                reason: "job is disabled".to_string(),
            });
        }

        let number = state.next_build_number;
        state.next_build_number += 1;
        state.builds.push(RecordedBuild {
            number,
            parameters: params.to_values(),
        });

        Ok(QueueItem {
            job_name: job.name.clone(),
            reference: format!("{}#{}", job.name, number),
            enqueued_at: Utc::now(),
        })
    }
}
