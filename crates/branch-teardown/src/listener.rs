//! Deletion listener: the entry point the host calls when an item is deleted.
//!
//! For each deleted branch job of a multi-branch project the listener
//! reads the pipeline's declared override, snapshots the global
//! configuration, resolves the tear-down job, builds the parameters and
//! dispatches one build. Nothing is persisted between events and nothing is
//! retried. Failures are logged and reported in the returned
//! [`ListenerOutcome`]; they never propagate to the host, so the deletion
//! itself always goes through.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::GlobalConfig;
use crate::declaration::{DeclarationReader, PropertyDeclarationReader};
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::domain::{BranchJob, DeletedItem, Result, TearDownError, TearDownParameters};
use crate::metrics::Metrics;
use crate::obs;
use crate::params::{build_parameters, LocatorScmReader, ScmMetadataReader};
use crate::registry::{JobRegistry, QueueItem};
use crate::resolver::{resolve, ResolvedTarget};

/// Host-facing notification interface.
#[async_trait]
pub trait ItemListener: Send + Sync {
    /// Called once per deleted item.
    async fn on_deleted(&self, item: &DeletedItem) -> ListenerOutcome;
}

/// How one deletion event ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ListenerOutcome {
    /// Not a branch job of a multi-branch project.
    Ignored { deleted_job: String },

    /// A tear-down build was queued.
    Scheduled {
        deleted_job: String,
        target: ResolvedTarget,
        parameters: TearDownParameters,
        queue_item: QueueItem,
    },

    /// The resolved tear-down job does not exist.
    NotFound {
        deleted_job: String,
        target: ResolvedTarget,
    },

    /// Metadata was missing or the enqueue was rejected.
    Failed {
        deleted_job: String,
        target: ResolvedTarget,
        error: String,
    },
}

impl ListenerOutcome {
    pub fn is_scheduled(&self) -> bool {
        matches!(self, ListenerOutcome::Scheduled { .. })
    }
}

/// What the listener would do for a branch job, before dispatching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TearDownPlan {
    pub deleted_job: String,
    pub target: ResolvedTarget,
    pub parameters: TearDownParameters,
}

/// Triggers tear-down jobs for deleted branch jobs.
pub struct TearDownListener {
    config: Arc<GlobalConfig>,
    declarations: Arc<dyn DeclarationReader>,
    scm: Arc<dyn ScmMetadataReader>,
    dispatcher: Dispatcher,
    metrics: Metrics,
}

impl TearDownListener {
    /// Listener reading declarations from job properties and SCM metadata from
    /// the recorded locator.
    pub fn new(config: Arc<GlobalConfig>, registry: Arc<dyn JobRegistry>) -> Self {
        Self {
            config,
            declarations: Arc::new(PropertyDeclarationReader),
            scm: Arc::new(LocatorScmReader),
            dispatcher: Dispatcher::new(registry),
            metrics: Metrics::new(),
        }
    }

    pub fn with_declaration_reader(mut self, reader: Arc<dyn DeclarationReader>) -> Self {
        self.declarations = reader;
        self
    }

    pub fn with_scm_reader(mut self, reader: Arc<dyn ScmMetadataReader>) -> Self {
        self.scm = reader;
        self
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Resolve the tear-down job for `job`.
    pub fn resolve_target(&self, job: &BranchJob) -> ResolvedTarget {
        let declared = self.declarations.declared_tear_down_job(job);
        let global = self.config.tear_down_job();
        resolve(declared.as_deref(), global.as_deref())
    }

    /// Resolve the target and build the parameters without dispatching.
    pub fn plan(&self, job: &BranchJob) -> Result<TearDownPlan> {
        let target = self.resolve_target(job);
        let parameters = build_parameters(job, self.scm.as_ref())?;
        Ok(TearDownPlan {
            deleted_job: job.full_name(),
            target,
            parameters,
        })
    }

    async fn handle_branch_job(&self, job: &BranchJob) -> ListenerOutcome {
        let deleted_job = job.full_name();

        let target = self.resolve_target(job);
        obs::emit_resolved(&deleted_job, &target.job_name, target.source.as_str());

        let parameters = match build_parameters(job, self.scm.as_ref()) {
            Ok(p) => p,
            Err(e) => {
                obs::emit_metadata_unavailable(&deleted_job, &e);
                self.metrics.inc_failed();
                return ListenerOutcome::Failed {
                    deleted_job,
                    target,
                    error: e.to_string(),
                };
            }
        };

        match self.dispatcher.dispatch(&target.job_name, &parameters).await {
            Ok(DispatchOutcome::Scheduled { queue_item, .. }) => {
                obs::emit_scheduled(
                    &target.job_name,
                    &queue_item.reference,
                    parameters.git_url(),
                    parameters.branch_name(),
                );
                self.metrics.inc_scheduled();
                ListenerOutcome::Scheduled {
                    deleted_job,
                    target,
                    parameters,
                    queue_item,
                }
            }
            Ok(DispatchOutcome::NotFound { .. }) => {
                obs::emit_not_found(&target.job_name);
                self.metrics.inc_not_found();
                ListenerOutcome::NotFound {
                    deleted_job,
                    target,
                }
            }
            Err(e) => {
                log_dispatch_error(&target.job_name, &e);
                self.metrics.inc_failed();
                ListenerOutcome::Failed {
                    deleted_job,
                    target,
                    error: e.to_string(),
                }
            }
        }
    }
}

fn log_dispatch_error(tear_down_job: &str, err: &TearDownError) {
    match err {
        TearDownError::EnqueueFailure { .. } => obs::emit_enqueue_failed(tear_down_job, err),
        other => tracing::warn!(
            event = "teardown.dispatch_error",
            tear_down_job = %tear_down_job,
            error = %other,
        ),
    }
}

#[async_trait]
impl ItemListener for TearDownListener {
    async fn on_deleted(&self, item: &DeletedItem) -> ListenerOutcome {
        self.metrics.inc_received();

        let Some(job) = item.as_branch_job() else {
            let deleted_job = item.full_name();
            obs::emit_ignored(&deleted_job);
            self.metrics.inc_ignored();
            return ListenerOutcome::Ignored { deleted_job };
        };

        let event_id = Uuid::new_v4().to_string();
        self.handle_branch_job(job)
            .instrument(obs::deletion_span(&job.full_name(), &event_id))
            .await
    }
}
