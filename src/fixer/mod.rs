pub mod edit;
pub mod fork;

use crate::error::{ForkfixError, Result};
use crate::github::host::RepoHost;
use crate::github::types::{FileChange, PullRequestDraft, PullRequestHandle, RepoSlug};
use async_trait::async_trait;
use clap::ValueEnum;
use fork::ForkWait;
use serde::{Deserialize, Serialize};

/// Which placeholder edit to make on the issue branch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FixVariant {
    /// Append an attribution footer to README.md, creating it if needed.
    #[default]
    Minimal,
    /// Read the issue, walk the tree and append to README.md only if it exists.
    IssueAware,
}

#[derive(Clone, Debug)]
pub struct FixOptions {
    pub branch_prefix: String,
    pub base_branch: String,
    pub variant: FixVariant,
    pub fork_wait: ForkWait,
}

impl Default for FixOptions {
    fn default() -> Self {
        Self {
            branch_prefix: "issue-fix".to_string(),
            base_branch: "main".to_string(),
            variant: FixVariant::Minimal,
            fork_wait: ForkWait::default(),
        }
    }
}

impl FixOptions {
    pub fn branch_name(&self, issue_number: u64) -> String {
        format!("{}-{issue_number}", self.branch_prefix)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixRequest {
    pub upstream: RepoSlug,
    pub issue_number: u64,
}

/// Anything that can turn an issue into an opened pull request.
#[async_trait]
pub trait IssueFixer: Send + Sync {
    async fn fix(&self, request: &FixRequest) -> Result<PullRequestHandle>;
}

pub struct Fixer<H> {
    host: H,
    options: FixOptions,
}

impl<H: RepoHost> Fixer<H> {
    pub fn new(host: H, options: FixOptions) -> Self {
        Self { host, options }
    }

    #[cfg(test)]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Forks, branches, commits the placeholder change and opens the pull request.
    ///
    /// Remote state created before a failing step is left in place.
    pub async fn apply(&self, request: &FixRequest) -> Result<PullRequestHandle> {
        let host = &self.host;
        let opts = &self.options;
        let number = request.issue_number;

        let login = host.current_login().await?;
        tracing::debug!(login = %login, "authenticated");

        let upstream = host.repository(&request.upstream).await?.ok_or_else(|| {
            ForkfixError::NotFound(format!(
                "upstream repository {} is not accessible",
                request.upstream
            ))
        })?;

        let fork = fork::ensure_fork(host, &login, &upstream, opts.fork_wait).await?;
        let base_sha =
            fork::ensure_base_branch(host, &fork.slug, &upstream, &opts.base_branch).await?;

        let branch = opts.branch_name(number);
        host.create_branch(&fork.slug, &branch, &base_sha).await?;
        tracing::info!(fork = %fork.slug, branch = %branch, "created issue branch");

        let (issue, changes) = match opts.variant {
            FixVariant::Minimal => {
                let readme = host.file(&fork.slug, edit::README_PATH, &branch).await?;
                (None, vec![edit::minimal_change(readme, number)])
            }
            FixVariant::IssueAware => {
                let issue = host.issue(&upstream.slug, number).await?.ok_or_else(|| {
                    ForkfixError::NotFound(format!("issue #{number} on {}", upstream.slug))
                })?;
                let changes = self.issue_aware_changes(&fork.slug, &branch).await?;
                (Some(issue), changes)
            }
        };

        let committed = self.commit_changes(&fork.slug, &branch, &changes, number).await;

        let draft = PullRequestDraft {
            title: edit::pull_request_title(number, issue.as_ref()),
            body: edit::pull_request_body(number, issue.as_ref(), &committed),
            head: format!("{login}:{branch}"),
            base: opts.base_branch.clone(),
        };

        let pr = host.open_pull_request(&upstream.slug, &draft).await?;
        tracing::info!(url = %pr.url, number = pr.number, "pull request created");
        Ok(pr)
    }

    async fn issue_aware_changes(&self, fork: &RepoSlug, branch: &str) -> Result<Vec<FileChange>> {
        let tree = self.host.list_files(fork, branch).await?;
        tracing::debug!(files = tree.len(), "walked fork tree");

        let mut changes = Vec::new();
        for path in edit::select_targets(&tree) {
            match self.host.file(fork, &path, branch).await? {
                Some(file) => changes.push(edit::issue_aware_change(file)),
                None => tracing::warn!(path = %path, "listed file vanished before it was read"),
            }
        }

        if changes.is_empty() {
            tracing::info!("no README.md on the issue branch, change set is empty");
        }
        Ok(changes)
    }

    /// Writes each change as its own commit. A failed write is logged and skipped.
    async fn commit_changes(
        &self,
        fork: &RepoSlug,
        branch: &str,
        changes: &[FileChange],
        issue_number: u64,
    ) -> Vec<String> {
        let message = edit::commit_message(issue_number);
        let mut committed = Vec::new();

        for change in changes {
            let verb = if change.prior_sha.is_some() { "updated" } else { "created" };
            match self.host.write_file(fork, branch, change, &message).await {
                Ok(()) => {
                    tracing::info!(path = %change.path, branch, "{verb} file");
                    committed.push(change.path.clone());
                }
                Err(e) => {
                    tracing::error!(path = %change.path, branch, error = %e, "could not commit file");
                }
            }
        }

        committed
    }
}

#[async_trait]
impl<H: RepoHost> IssueFixer for Fixer<H> {
    async fn fix(&self, request: &FixRequest) -> Result<PullRequestHandle> {
        self.apply(request).await
    }
}
