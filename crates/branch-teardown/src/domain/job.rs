//! Jobs as reported by the host when they are deleted.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reference to the multi-branch project that owns a branch job.
///
/// Only the name is kept; the project's lifecycle belongs to the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectRef {
    pub name: String,
}

impl ProjectRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Source-control coordinates of a branch job at the time it was last checked out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScmLocator {
    /// Repository URL or filesystem path, as the SCM integration reports it.
    pub repository_url: String,

    /// Branch name; may be short (`feature`) or fully qualified (`refs/heads/feature`).
    pub branch_name: String,
}

impl ScmLocator {
    pub fn new(repository_url: impl Into<String>, branch_name: impl Into<String>) -> Self {
        Self {
            repository_url: repository_url.into(),
            branch_name: branch_name.into(),
        }
    }
}

/// A job-level property recorded by the host when the pipeline last ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobProperty {
    /// `properties([branchTearDownExecutor('<job_name>')])`
    BranchTearDownExecutor { job_name: String },

    /// Any other property the host tracks; carried through but never interpreted.
    Other { name: String },
}

/// A job created by a multi-branch project for a single branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchJob {
    /// Short job name, which equals the branch name for multi-branch children.
    pub name: String,

    /// Owning multi-branch project.
    pub project: ProjectRef,

    /// SCM coordinates; absent if the job never checked out.
    #[serde(default)]
    pub scm: Option<ScmLocator>,

    /// Properties declared by the pipeline definition.
    #[serde(default)]
    pub properties: Vec<JobProperty>,

    /// Pipeline script text, when the host exposes it.
    #[serde(default)]
    pub pipeline_script: Option<String>,

    /// Workspace directory holding the last checkout, when one is retained.
    #[serde(default)]
    pub workspace: Option<PathBuf>,
}

impl BranchJob {
    /// Create a branch job with no metadata attached.
    pub fn new(project: ProjectRef, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            project,
            scm: None,
            properties: Vec::new(),
            pipeline_script: None,
            workspace: None,
        }
    }

    /// Attach SCM coordinates.
    pub fn with_scm(mut self, scm: ScmLocator) -> Self {
        self.scm = Some(scm);
        self
    }

    /// Add a declared job property.
    pub fn with_property(mut self, property: JobProperty) -> Self {
        self.properties.push(property);
        self
    }

    /// Attach the pipeline script text.
    pub fn with_pipeline_script(mut self, script: impl Into<String>) -> Self {
        self.pipeline_script = Some(script.into());
        self
    }

    /// Attach the checkout workspace directory.
    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    /// `<project>/<name>`, the host's full display path for the job.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.project.name, self.name)
    }
}

/// An item the host reports as deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeletedItem {
    /// A branch job owned by a multi-branch project.
    Branch(BranchJob),

    /// A job that is not part of a multi-branch project.
    Standalone { full_name: String },

    /// A folder or any other container item.
    Folder { full_name: String },
}

impl DeletedItem {
    /// The branch job, if this item is one.
    pub fn as_branch_job(&self) -> Option<&BranchJob> {
        match self {
            DeletedItem::Branch(job) => Some(job),
            _ => None,
        }
    }

    pub fn full_name(&self) -> String {
        match self {
            DeletedItem::Branch(job) => job.full_name(),
            DeletedItem::Standalone { full_name } | DeletedItem::Folder { full_name } => {
                full_name.clone()
            }
        }
    }
}
