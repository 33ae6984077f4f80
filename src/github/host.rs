use crate::error::Result;
use crate::github::types::{
    FileChange, FileContent, IssueDetails, PullRequestDraft, PullRequestHandle, RepoInfo,
    RepoSlug,
};
use async_trait::async_trait;

/// Operations the fixer needs from a repository-hosting API.
///
/// Lookups return `Ok(None)` when the remote reports the object as missing;
/// any other failure is an error.
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Login of the account the credentials belong to.
    async fn current_login(&self) -> Result<String>;

    async fn repository(&self, slug: &RepoSlug) -> Result<Option<RepoInfo>>;

    /// Requests a fork under the current account. Forking is asynchronous on
    /// the remote, so the fork may not be visible right away.
    async fn create_fork(&self, upstream: &RepoSlug) -> Result<()>;

    /// Commit SHA at the tip of `heads/<branch>`.
    async fn branch_tip(&self, slug: &RepoSlug, branch: &str) -> Result<Option<String>>;

    /// Fails with `Branch` if the branch already exists.
    async fn create_branch(&self, slug: &RepoSlug, branch: &str, sha: &str) -> Result<()>;

    async fn file(&self, slug: &RepoSlug, path: &str, branch: &str)
        -> Result<Option<FileContent>>;

    /// Creates the file, or updates it when `change.prior_sha` is set.
    async fn write_file(
        &self,
        slug: &RepoSlug,
        branch: &str,
        change: &FileChange,
        message: &str,
    ) -> Result<()>;

    /// Every blob path reachable from the branch tip.
    async fn list_files(&self, slug: &RepoSlug, branch: &str) -> Result<Vec<String>>;

    async fn issue(&self, slug: &RepoSlug, number: u64) -> Result<Option<IssueDetails>>;

    /// Fails with `PullRequest` if the remote rejects the request.
    async fn open_pull_request(
        &self,
        upstream: &RepoSlug,
        draft: &PullRequestDraft,
    ) -> Result<PullRequestHandle>;
}
