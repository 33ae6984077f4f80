#![cfg(test)]

use crate::error::{ForkfixError, Result};
use crate::fixer::{FixRequest, IssueFixer};
use crate::github::host::RepoHost;
use crate::github::types::*;
use crate::store::{IssueRecord, IssueStore};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Mutex;

pub fn slug(s: &str) -> RepoSlug {
    s.parse().expect("valid slug in test")
}

#[derive(Clone, Default)]
struct FakeBranch {
    tip: String,
    /// path -> (text, blob sha)
    files: BTreeMap<String, (String, String)>,
    own_commits: u32,
}

#[derive(Clone, Default)]
struct FakeRepo {
    branches: HashMap<String, FakeBranch>,
    /// Lookups that still report the repo as missing.
    hidden_checks: u32,
}

#[derive(Default)]
struct FakeState {
    login: String,
    bad_credentials: bool,
    repos: HashMap<String, FakeRepo>,
    issues: HashMap<(String, u64), IssueDetails>,
    pulls: Vec<(String, PullRequestDraft)>,
    fork_visible_after: u32,
    fork_requests: u32,
    failing_paths: HashSet<String>,
    counter: u64,
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{prefix}{:04}", self.counter)
    }

    fn branch_with_tip(&self, sha: &str) -> Option<FakeBranch> {
        self.repos
            .values()
            .flat_map(|r| r.branches.values())
            .find(|b| b.tip == sha)
            .cloned()
    }
}

/// In-memory hosting API with just enough behaviour to drive the fixer.
#[derive(Default)]
pub struct FakeHost {
    state: Mutex<FakeState>,
}

impl FakeHost {
    pub fn new(login: &str) -> Self {
        let host = Self::default();
        host.state.lock().unwrap().login = login.to_string();
        host
    }

    pub fn add_repo(&self, full_name: &str, branches: &[(&str, Vec<(&str, &str)>)]) {
        let mut state = self.state.lock().unwrap();
        let mut repo = FakeRepo::default();
        for (name, files) in branches {
            let tip = state.next_id("commit");
            let mut branch = FakeBranch {
                tip,
                ..FakeBranch::default()
            };
            for (path, text) in files.iter() {
                let sha = state.next_id("blob");
                branch
                    .files
                    .insert(path.to_string(), (text.to_string(), sha));
            }
            repo.branches.insert(name.to_string(), branch);
        }
        state.repos.insert(full_name.to_string(), repo);
    }

    pub fn add_issue(&self, full_name: &str, number: u64, title: &str, body: &str) {
        self.state.lock().unwrap().issues.insert(
            (full_name.to_string(), number),
            IssueDetails {
                title: title.to_string(),
                body: body.to_string(),
            },
        );
    }

    pub fn set_fork_visible_after(&self, checks: u32) {
        self.state.lock().unwrap().fork_visible_after = checks;
    }

    pub fn reject_credentials(&self) {
        self.state.lock().unwrap().bad_credentials = true;
    }

    pub fn fail_writes_to(&self, path: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_paths
            .insert(path.to_string());
    }

    pub fn fork_requests(&self) -> u32 {
        self.state.lock().unwrap().fork_requests
    }

    pub fn tip(&self, full_name: &str, branch: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .repos
            .get(full_name)?
            .branches
            .get(branch)
            .map(|b| b.tip.clone())
    }

    pub fn file_text(&self, full_name: &str, branch: &str, path: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .repos
            .get(full_name)?
            .branches
            .get(branch)?
            .files
            .get(path)
            .map(|(text, _)| text.clone())
    }

    pub fn pull_requests(&self) -> Vec<(String, PullRequestDraft)> {
        self.state.lock().unwrap().pulls.clone()
    }
}

#[async_trait]
impl RepoHost for FakeHost {
    async fn current_login(&self) -> Result<String> {
        let state = self.state.lock().unwrap();
        if state.bad_credentials {
            return Err(ForkfixError::Auth("Bad credentials".to_string()));
        }
        Ok(state.login.clone())
    }

    async fn repository(&self, slug: &RepoSlug) -> Result<Option<RepoInfo>> {
        let mut state = self.state.lock().unwrap();
        let Some(repo) = state.repos.get_mut(&slug.to_string()) else {
            return Ok(None);
        };
        if repo.hidden_checks > 0 {
            repo.hidden_checks -= 1;
            return Ok(None);
        }
        Ok(Some(RepoInfo {
            slug: slug.clone(),
            default_branch: Some("main".to_string()),
        }))
    }

    async fn create_fork(&self, upstream: &RepoSlug) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.fork_requests += 1;
        let mut fork = state
            .repos
            .get(&upstream.to_string())
            .cloned()
            .ok_or_else(|| ForkfixError::GitHub(format!("cannot fork {upstream}")))?;
        for branch in fork.branches.values_mut() {
            branch.own_commits = 0;
        }
        fork.hidden_checks = state.fork_visible_after;
        let name = format!("{}/{}", state.login, upstream.name);
        state.repos.entry(name).or_insert(fork);
        Ok(())
    }

    async fn branch_tip(&self, slug: &RepoSlug, branch: &str) -> Result<Option<String>> {
        Ok(self.tip(&slug.to_string(), branch))
    }

    async fn create_branch(&self, slug: &RepoSlug, branch: &str, sha: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let source = state
            .branch_with_tip(sha)
            .ok_or_else(|| ForkfixError::Branch(format!("Object does not exist: {sha}")))?;
        let repo = state
            .repos
            .get_mut(&slug.to_string())
            .ok_or_else(|| ForkfixError::Branch(format!("{slug} not found")))?;
        if repo.branches.contains_key(branch) {
            return Err(ForkfixError::Branch(format!(
                "Reference already exists: refs/heads/{branch}"
            )));
        }
        repo.branches.insert(
            branch.to_string(),
            FakeBranch {
                own_commits: 0,
                ..source
            },
        );
        Ok(())
    }

    async fn file(
        &self,
        slug: &RepoSlug,
        path: &str,
        branch: &str,
    ) -> Result<Option<FileContent>> {
        let state = self.state.lock().unwrap();
        let found = state
            .repos
            .get(&slug.to_string())
            .and_then(|r| r.branches.get(branch))
            .and_then(|b| b.files.get(path));
        Ok(found.map(|(text, sha)| FileContent {
            path: path.to_string(),
            text: text.clone(),
            sha: sha.clone(),
        }))
    }

    async fn write_file(
        &self,
        slug: &RepoSlug,
        branch: &str,
        change: &FileChange,
        _message: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_paths.contains(&change.path) {
            return Err(ForkfixError::GitHub(format!("write to {} refused", change.path)));
        }
        let blob = state.next_id("blob");
        let commit = state.next_id("commit");
        let target = state
            .repos
            .get_mut(&slug.to_string())
            .and_then(|r| r.branches.get_mut(branch))
            .ok_or_else(|| ForkfixError::GitHub(format!("no branch {branch} on {slug}")))?;

        let current = target.files.get(&change.path).map(|(_, sha)| sha.clone());
        if current != change.prior_sha {
            return Err(ForkfixError::GitHub(format!(
                "sha mismatch for {}",
                change.path
            )));
        }
        target
            .files
            .insert(change.path.clone(), (change.content.clone(), blob));
        target.tip = commit;
        target.own_commits += 1;
        Ok(())
    }

    async fn list_files(&self, slug: &RepoSlug, branch: &str) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .repos
            .get(&slug.to_string())
            .and_then(|r| r.branches.get(branch))
            .map(|b| b.files.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn issue(&self, slug: &RepoSlug, number: u64) -> Result<Option<IssueDetails>> {
        let state = self.state.lock().unwrap();
        Ok(state.issues.get(&(slug.to_string(), number)).cloned())
    }

    async fn open_pull_request(
        &self,
        upstream: &RepoSlug,
        draft: &PullRequestDraft,
    ) -> Result<PullRequestHandle> {
        let mut state = self.state.lock().unwrap();
        let (owner, branch) = draft
            .head
            .split_once(':')
            .ok_or_else(|| ForkfixError::PullRequest("head must be owner:branch".to_string()))?;
        let fork = format!("{owner}/{}", upstream.name);
        let head = state
            .repos
            .get(&fork)
            .and_then(|r| r.branches.get(branch))
            .ok_or_else(|| ForkfixError::PullRequest(format!("head {} not found", draft.head)))?;
        if head.own_commits == 0 {
            return Err(ForkfixError::PullRequest(format!(
                "No commits between {} and {}",
                draft.base, draft.head
            )));
        }
        if state.pulls.iter().any(|(_, pr)| pr.head == draft.head) {
            return Err(ForkfixError::PullRequest(format!(
                "A pull request already exists for {}",
                draft.head
            )));
        }
        state.pulls.push((upstream.to_string(), draft.clone()));
        let number = state.pulls.len() as u64;
        Ok(PullRequestHandle {
            number,
            url: format!("https://github.com/{upstream}/pull/{number}"),
        })
    }
}

/// Store that hands out a scripted batch of rows per query.
#[derive(Default)]
pub struct FakeStore {
    batches: Mutex<VecDeque<Result<Vec<IssueRecord>>>>,
}

impl FakeStore {
    pub fn with_batches(batches: Vec<Result<Vec<IssueRecord>>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
        }
    }

    /// The same rows on every query.
    pub fn repeating(rows: Vec<IssueRecord>, cycles: usize) -> Self {
        Self::with_batches((0..cycles).map(|_| Ok(rows.clone())).collect())
    }
}

#[async_trait]
impl IssueStore for FakeStore {
    async fn fetch_all(&self) -> Result<Vec<IssueRecord>> {
        self.batches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

pub fn record(link: &str) -> IssueRecord {
    IssueRecord {
        issue_link: Some(link.to_string()),
        ..IssueRecord::default()
    }
}

/// Fixer that records every request and fails for the listed issue numbers.
#[derive(Default)]
pub struct RecordingFixer {
    calls: Mutex<Vec<FixRequest>>,
    failing: HashSet<u64>,
}

impl RecordingFixer {
    pub fn failing_on(numbers: &[u64]) -> Self {
        Self {
            calls: Mutex::default(),
            failing: numbers.iter().copied().collect(),
        }
    }

    pub fn calls(&self) -> Vec<FixRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl IssueFixer for RecordingFixer {
    async fn fix(&self, request: &FixRequest) -> Result<PullRequestHandle> {
        self.calls.lock().unwrap().push(request.clone());
        if self.failing.contains(&request.issue_number) {
            return Err(ForkfixError::PullRequest("rejected".to_string()));
        }
        Ok(PullRequestHandle {
            number: request.issue_number,
            url: format!(
                "https://github.com/{}/pull/{}",
                request.upstream, request.issue_number
            ),
        })
    }
}
