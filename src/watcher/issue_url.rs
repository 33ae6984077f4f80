use crate::error::{ForkfixError, Result};
use crate::github::types::RepoSlug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssueRef {
    pub upstream: RepoSlug,
    pub number: u64,
}

/// Parses `http(s)://<host>/<owner>/<repo>/issues/<number>`.
pub fn parse_issue_url(url: &str) -> Result<IssueRef> {
    let malformed = || ForkfixError::MalformedInput(format!("not an issue URL: '{url}'"));

    let trimmed = url.trim();
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .ok_or_else(malformed)?;
    // Query and fragment carry nothing about the issue itself.
    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    let rest = rest.strip_suffix('/').unwrap_or(rest);

    match rest.split('/').collect::<Vec<_>>().as_slice() {
        [host, owner, repo, "issues", number]
            if !host.is_empty()
                && !owner.is_empty()
                && !repo.is_empty()
                && !number.is_empty()
                && number.bytes().all(|b| b.is_ascii_digit()) =>
        {
            Ok(IssueRef {
                upstream: RepoSlug::new(owner, repo),
                number: number.parse().map_err(|_| malformed())?,
            })
        }
        _ => Err(malformed()),
    }
}
