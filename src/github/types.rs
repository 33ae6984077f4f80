use crate::error::{ForkfixError, Result};
use std::fmt;
use std::str::FromStr;

/// `owner/name` identifier of a hosted repository.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoSlug {
    type Err = ForkfixError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(owner, name))
            }
            _ => Err(ForkfixError::MalformedInput(format!(
                "expected owner/name, got '{s}'"
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RepoInfo {
    pub slug: RepoSlug,
    pub default_branch: Option<String>,
}

/// A file as stored on a branch, with the blob checksum needed to update it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileContent {
    pub path: String,
    pub text: String,
    pub sha: String,
}

/// One pending write. `prior_sha` is set when the file already exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub content: String,
    pub prior_sha: Option<String>,
}

#[derive(Clone, Debug)]
pub struct IssueDetails {
    pub title: String,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullRequestDraft {
    pub title: String,
    pub body: String,
    /// `<fork-owner>:<branch>`
    pub head: String,
    pub base: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullRequestHandle {
    pub number: u64,
    pub url: String,
}
