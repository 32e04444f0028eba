//! Branch Tear-Down Trigger
//!
//! Reacts to the deletion of a branch job inside a multi-branch pipeline
//! project by triggering a tear-down job with the branch's coordinates:
//! - Resolves the tear-down job: pipeline declaration, then global
//!   configuration, then `job-tear-down-executor`
//! - Builds the ordered `git_url` / `branch_name` parameters
//! - Queues exactly one build of the resolved job, if it exists
//!
//! The host plugs in through [`ItemListener`], [`JobRegistry`],
//! [`DeclarationReader`] and [`ScmMetadataReader`].

pub mod config;
pub mod declaration;
pub mod dispatcher;
pub mod domain;
pub mod fakes;
pub mod git;
pub mod jenkins;
pub mod listener;
pub mod metrics;
pub mod obs;
pub mod params;
pub mod registry;
pub mod resolver;
pub mod telemetry;

pub use config::{ConfigDocument, GlobalConfig, GlobalConfigFile, DEFAULT_CONFIG_FILE, FORM_FIELD};
pub use declaration::{parse_tear_down_declaration, DeclarationReader, PropertyDeclarationReader};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use domain::{
    BranchJob, DeletedItem, JobProperty, ParameterValue, ProjectRef, Result, ScmLocator,
    TearDownError, TearDownParameters, BRANCH_NAME_PARAM, GIT_URL_PARAM,
};
pub use git::GitWorkspaceReader;
pub use jenkins::{JenkinsConfig, JenkinsRegistry};
pub use listener::{ItemListener, ListenerOutcome, TearDownListener, TearDownPlan};
pub use metrics::Metrics;
pub use params::{build_parameters, short_branch_name, LocatorScmReader, ScmMetadataReader};
pub use registry::{JobRegistry, JobSummary, QueueItem};
pub use resolver::{resolve, ResolvedTarget, TargetSource, DEFAULT_TEAR_DOWN_JOB};
pub use telemetry::init_tracing;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
