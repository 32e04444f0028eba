//! Building tear-down parameters from a deleted job's SCM metadata.

use crate::domain::{BranchJob, Result, TearDownError, TearDownParameters};

/// Source-control metadata for a branch job.
pub trait ScmMetadataReader: Send + Sync {
    /// Repository URL or filesystem path as the SCM integration reports it.
    fn repository_url(&self, job: &BranchJob) -> Result<String>;

    /// Branch name, short or fully qualified.
    fn branch_name(&self, job: &BranchJob) -> Result<String>;
}

/// Reads the [`ScmLocator`](crate::domain::ScmLocator) recorded on the job.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocatorScmReader;

impl LocatorScmReader {
    pub fn new() -> Self {
        Self
    }
}

impl ScmMetadataReader for LocatorScmReader {
    fn repository_url(&self, job: &BranchJob) -> Result<String> {
        job.scm
            .as_ref()
            .map(|scm| scm.repository_url.clone())
            .ok_or_else(|| no_checkout(job))
    }

    fn branch_name(&self, job: &BranchJob) -> Result<String> {
        job.scm
            .as_ref()
            .map(|scm| scm.branch_name.clone())
            .ok_or_else(|| no_checkout(job))
    }
}

fn no_checkout(job: &BranchJob) -> TearDownError {
    TearDownError::MetadataUnavailable {
        job: job.full_name(),
        detail: "no checkout recorded".to_string(),
    }
}

/// Build `(git_url, branch_name)` for a deleted branch job.
///
/// Fails with `MetadataUnavailable` rather than passing empty values on.
pub fn build_parameters(
    job: &BranchJob,
    scm: &dyn ScmMetadataReader,
) -> Result<TearDownParameters> {
    let git_url = scm.repository_url(job)?;
    if git_url.is_empty() {
        return Err(TearDownError::MetadataUnavailable {
            job: job.full_name(),
            detail: "repository URL is empty".to_string(),
        });
    }

    let branch_name = short_branch_name(&scm.branch_name(job)?).to_string();
    if branch_name.is_empty() {
        return Err(TearDownError::MetadataUnavailable {
            job: job.full_name(),
            detail: "branch name is empty".to_string(),
        });
    }

    Ok(TearDownParameters::new(git_url, branch_name))
}

/// `refs/heads/feature` becomes `feature`; short names pass through.
pub fn short_branch_name(branch: &str) -> &str {
    branch.strip_prefix("refs/heads/").unwrap_or(branch)
}
