use crate::error::{ForkfixError, Result};
use crate::github::host::RepoHost;
use crate::github::types::{RepoInfo, RepoSlug};
use std::time::Duration;

/// How long to wait for a freshly requested fork to become visible.
///
/// Fork creation is asynchronous on the remote. After requesting one we check
/// up to `attempts` times, sleeping `delay` before the first check and doubling
/// it after every miss.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForkWait {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for ForkWait {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(3),
        }
    }
}

pub async fn ensure_fork<H: RepoHost + ?Sized>(
    host: &H,
    login: &str,
    upstream: &RepoInfo,
    wait: ForkWait,
) -> Result<RepoInfo> {
    let fork_slug = RepoSlug::new(login, &upstream.slug.name);

    if let Some(fork) = host.repository(&fork_slug).await? {
        tracing::info!(fork = %fork_slug, "found existing fork");
        return Ok(fork);
    }

    tracing::info!(fork = %fork_slug, upstream = %upstream.slug, "no fork found, creating one");
    host.create_fork(&upstream.slug).await?;

    let mut delay = wait.delay;
    for attempt in 1..=wait.attempts {
        tokio::time::sleep(delay).await;
        if let Some(fork) = host.repository(&fork_slug).await? {
            tracing::info!(fork = %fork_slug, attempt, "fork created");
            return Ok(fork);
        }
        tracing::debug!(fork = %fork_slug, attempt, "fork not visible yet");
        delay = delay.saturating_mul(2);
    }

    Err(ForkfixError::NotFound(format!(
        "fork {fork_slug} not visible after {} checks",
        wait.attempts
    )))
}

/// Returns the tip of `base` on the fork, copying it from upstream if the fork lacks it.
pub async fn ensure_base_branch<H: RepoHost + ?Sized>(
    host: &H,
    fork: &RepoSlug,
    upstream: &RepoInfo,
    base: &str,
) -> Result<String> {
    if let Some(sha) = host.branch_tip(fork, base).await? {
        tracing::info!(branch = base, "found base branch on fork");
        return Ok(sha);
    }

    tracing::info!(branch = base, "base branch missing on fork, copying from upstream");
    let Some(sha) = host.branch_tip(&upstream.slug, base).await? else {
        let hint = upstream
            .default_branch
            .as_deref()
            .map(|b| format!(" (its default branch is '{b}')"))
            .unwrap_or_default();
        return Err(ForkfixError::Branch(format!(
            "base branch '{base}' not found on {}{hint}",
            upstream.slug
        )));
    };
    host.create_branch(fork, base, &sha).await?;
    tracing::info!(branch = base, sha = %sha, "created base branch on fork");
    Ok(sha)
}
