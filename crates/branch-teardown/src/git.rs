//! SCM metadata read straight from a branch job's git checkout.

use std::path::Path;
use std::process::Command;

use crate::domain::{BranchJob, Result, TearDownError};
use crate::params::ScmMetadataReader;

/// Reads repository URL and branch from the job's retained workspace.
///
/// The URL is `remote.origin.url` when set, otherwise the checkout's top-level
/// directory. On a detached HEAD, as multi-branch checkouts usually are, the
/// branch is the single local or `origin` branch pointing at HEAD.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitWorkspaceReader;

impl GitWorkspaceReader {
    pub fn new() -> Self {
        Self
    }

    fn workspace<'a>(&self, job: &'a BranchJob) -> Result<&'a Path> {
        job.workspace
            .as_deref()
            .ok_or_else(|| TearDownError::MetadataUnavailable {
                job: job.full_name(),
                detail: "no workspace retained".to_string(),
            })
    }
}

impl ScmMetadataReader for GitWorkspaceReader {
    fn repository_url(&self, job: &BranchJob) -> Result<String> {
        let dir = self.workspace(job)?;
        let lookup = remote_origin_url(dir).and_then(|remote| match remote {
            Some(url) => Ok(url),
            None => toplevel(dir),
        });
        lookup.map_err(|e| unavailable(job, e))
    }

    fn branch_name(&self, job: &BranchJob) -> Result<String> {
        let dir = self.workspace(job)?;
        let branch = match current_branch(dir).map_err(|e| unavailable(job, e))? {
            Some(branch) => branch,
            None => {
                let mut candidates = branches_at_head(dir).map_err(|e| unavailable(job, e))?;
                if candidates.len() != 1 {
                    return Err(TearDownError::MetadataUnavailable {
                        job: job.full_name(),
                        detail: format!(
                            "detached HEAD matches {} branches: [{}]",
                            candidates.len(),
                            candidates.join(", ")
                        ),
                    });
                }
                candidates.remove(0)
            }
        };
        Ok(branch)
    }
}

fn unavailable(job: &BranchJob, err: TearDownError) -> TearDownError {
    TearDownError::MetadataUnavailable {
        job: job.full_name(),
        detail: err.to_string(),
    }
}

fn run_git(dir: &Path, args: &[&str]) -> Result<std::process::Output> {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| TearDownError::Git(format!("failed to run git: {e}")))
}

/// `remote.origin.url`, or `None` when the checkout has no origin remote.
pub fn remote_origin_url(dir: &Path) -> Result<Option<String>> {
    let output = run_git(dir, &["config", "--get", "remote.origin.url"])?;
    // `git config --get` exits 1 when the key is unset.
    if !output.status.success() {
        return Ok(None);
    }
    let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(Some(url).filter(|u| !u.is_empty()))
}

/// Top-level directory of the work tree containing `dir`.
pub fn toplevel(dir: &Path) -> Result<String> {
    let output = run_git(dir, &["rev-parse", "--show-toplevel"])?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TearDownError::Git(format!(
            "git rev-parse --show-toplevel failed: {stderr}"
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Current branch, or `None` on a detached HEAD.
pub fn current_branch(dir: &Path) -> Result<Option<String>> {
    let output = run_git(dir, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TearDownError::Git(format!(
            "git rev-parse --abbrev-ref HEAD failed: {stderr}"
        )));
    }
    let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if branch.is_empty() || branch == "HEAD" {
        return Ok(None);
    }
    Ok(Some(branch))
}

/// Distinct branch names whose local or `origin` ref points at HEAD.
pub fn branches_at_head(dir: &Path) -> Result<Vec<String>> {
    let output = run_git(
        dir,
        &[
            "for-each-ref",
            "--points-at",
            "HEAD",
            "--format=%(refname)",
            "refs/heads",
            "refs/remotes/origin",
        ],
    )?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TearDownError::Git(format!(
            "git for-each-ref --points-at HEAD failed: {stderr}"
        )));
    }

    let mut branches: Vec<String> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter_map(|r| {
            r.strip_prefix("refs/heads/")
                .or_else(|| r.strip_prefix("refs/remotes/origin/"))
        })
        .filter(|b| !b.is_empty() && *b != "HEAD")
        .map(str::to_string)
        .collect();
    branches.sort();
    branches.dedup();
    Ok(branches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProjectRef;
    use crate::params::build_parameters;
    use std::process::Command as StdCommand;

    fn run(repo_dir: &Path, args: &[&str]) {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn make_feature_checkout() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), &["init"]);
        run(dir.path(), &["config", "user.name", "test-user"]);
        run(dir.path(), &["config", "user.email", "test@example.com"]);
        run(dir.path(), &["commit", "--allow-empty", "-m", "initial"]);
        run(dir.path(), &["checkout", "-b", "feature"]);
        dir
    }

    fn job_in(dir: &Path) -> BranchJob {
        BranchJob::new(ProjectRef::new("p"), "feature").with_workspace(dir)
    }

    #[test]
    fn reads_toplevel_path_without_remote() {
        let repo = make_feature_checkout();
        let params = build_parameters(&job_in(repo.path()), &GitWorkspaceReader).unwrap();

        let expected = repo.path().canonicalize().unwrap();
        assert_eq!(Path::new(params.git_url()).canonicalize().unwrap(), expected);
        assert_eq!(params.branch_name(), "feature");
    }

    #[test]
    fn prefers_origin_url() {
        let repo = make_feature_checkout();
        run(
            repo.path(),
            &["remote", "add", "origin", "https://example.com/org/repo.git"],
        );

        let url = GitWorkspaceReader
            .repository_url(&job_in(repo.path()))
            .unwrap();
        assert_eq!(url, "https://example.com/org/repo.git");
    }

    fn detached_checkout_of(branch: &str) -> tempfile::TempDir {
        let repo = make_feature_checkout();
        // `feature` would clash with `feature/...` refs.
        run(repo.path(), &["checkout", "--detach"]);
        run(repo.path(), &["branch", "-D", "feature"]);
        run(repo.path(), &["checkout", "-b", branch]);
        run(repo.path(), &["commit", "--allow-empty", "-m", "work"]);
        run(repo.path(), &["checkout", "--detach"]);
        repo
    }

    fn encoded_job_in(dir: &Path) -> BranchJob {
        BranchJob::new(ProjectRef::new("p"), "feature%2Flogin").with_workspace(dir)
    }

    #[test]
    fn detached_head_reads_branch_pointing_at_head() {
        let repo = detached_checkout_of("feature/login");

        let branch = GitWorkspaceReader
            .branch_name(&encoded_job_in(repo.path()))
            .unwrap();
        assert_eq!(branch, "feature/login");
    }

    #[test]
    fn detached_head_reads_remote_tracking_branch() {
        let repo = detached_checkout_of("feature/login");
        run(
            repo.path(),
            &["update-ref", "refs/remotes/origin/feature/login", "HEAD"],
        );
        run(repo.path(), &["branch", "-D", "feature/login"]);

        let branch = GitWorkspaceReader
            .branch_name(&encoded_job_in(repo.path()))
            .unwrap();
        assert_eq!(branch, "feature/login");
    }

    #[test]
    fn ambiguous_detached_head_is_metadata_unavailable() {
        let repo = detached_checkout_of("feature/login");
        run(repo.path(), &["branch", "feature/other"]);

        let err = build_parameters(&encoded_job_in(repo.path()), &GitWorkspaceReader).unwrap_err();
        assert!(matches!(err, TearDownError::MetadataUnavailable { .. }));
    }

    #[test]
    fn detached_head_without_branch_is_metadata_unavailable() {
        let repo = detached_checkout_of("feature/login");
        run(repo.path(), &["branch", "-D", "feature/login"]);

        let err = GitWorkspaceReader
            .branch_name(&encoded_job_in(repo.path()))
            .unwrap_err();
        assert!(matches!(err, TearDownError::MetadataUnavailable { .. }));
    }

    #[test]
    fn non_repo_is_metadata_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = GitWorkspaceReader
            .repository_url(&job_in(dir.path()))
            .unwrap_err();
        assert!(matches!(err, TearDownError::MetadataUnavailable { .. }));
    }

    #[test]
    fn missing_workspace_is_metadata_unavailable() {
        let job = BranchJob::new(ProjectRef::new("p"), "feature");
        let err = GitWorkspaceReader.branch_name(&job).unwrap_err();
        assert!(matches!(err, TearDownError::MetadataUnavailable { .. }));
    }
}
