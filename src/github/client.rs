use crate::error::{ForkfixError, Result};
use crate::github::host::RepoHost;
use crate::github::types::{
    FileChange, FileContent, IssueDetails, PullRequestDraft, PullRequestHandle, RepoInfo,
    RepoSlug,
};
use async_trait::async_trait;
use base64::Engine;
use octocrab::models::repos::Object;
use octocrab::params::repos::Reference;
use octocrab::Octocrab;
use serde::Deserialize;

#[derive(Clone)]
pub struct OctocrabHost {
    octo: Octocrab,
}

impl OctocrabHost {
    /// `api_url` points at a GitHub Enterprise API root; `None` means api.github.com.
    pub fn new(token: &str, api_url: Option<&str>) -> Result<Self> {
        let mut builder = Octocrab::builder().personal_token(token.to_string());
        if let Some(url) = api_url {
            builder = builder.base_uri(url).map_err(|e| {
                ForkfixError::Config(format!("invalid github_api_url '{url}': {e}"))
            })?;
        }
        let octo = builder
            .build()
            .map_err(|e| ForkfixError::GitHub(e.to_string()))?;

        Ok(Self { octo })
    }

    async fn blob_text(&self, slug: &RepoSlug, path: &str, sha: &str) -> Result<String> {
        let route = format!("/repos/{}/{}/git/blobs/{sha}", slug.owner, slug.name);
        let blob: BlobResponse = self
            .octo
            .get(route, None::<&()>)
            .await
            .map_err(|e| github_err(&format!("reading blob of {path} on {slug}"), e))?;

        match blob.encoding.as_str() {
            "base64" => decode_blob(path, &blob.content),
            "utf-8" => Ok(blob.content),
            other => Err(ForkfixError::GitHub(format!(
                "{path} on {slug} has unsupported blob encoding '{other}'"
            ))),
        }
    }
}

impl std::fmt::Debug for OctocrabHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OctocrabHost").finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct BlobResponse {
    content: String,
    encoding: String,
}

#[derive(Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

fn status_of(err: &octocrab::Error) -> Option<u16> {
    match err {
        octocrab::Error::GitHub { source, .. } => Some(source.status_code.as_u16()),
        _ => None,
    }
}

fn is_not_found(err: &octocrab::Error) -> bool {
    status_of(err) == Some(404)
}

fn github_err(context: &str, err: octocrab::Error) -> ForkfixError {
    ForkfixError::GitHub(format!("{context}: {err}"))
}

fn decode_blob(path: &str, encoded: &str) -> Result<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| ForkfixError::GitHub(format!("invalid base64 in {path}: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| ForkfixError::GitHub(format!("{path} is not UTF-8: {e}")))
}

#[async_trait]
impl RepoHost for OctocrabHost {
    async fn current_login(&self) -> Result<String> {
        match self.octo.current().user().await {
            Ok(user) => Ok(user.login),
            Err(e) if matches!(status_of(&e), Some(401) | Some(403)) => {
                Err(ForkfixError::Auth(e.to_string()))
            }
            Err(e) => Err(github_err("fetching current user", e)),
        }
    }

    async fn repository(&self, slug: &RepoSlug) -> Result<Option<RepoInfo>> {
        match self.octo.repos(&slug.owner, &slug.name).get().await {
            Ok(repo) => {
                let owner = repo
                    .owner
                    .as_ref()
                    .map(|o| o.login.clone())
                    .unwrap_or_else(|| slug.owner.clone());
                Ok(Some(RepoInfo {
                    slug: RepoSlug::new(&owner, &repo.name),
                    default_branch: repo.default_branch,
                }))
            }
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(github_err(&format!("fetching {slug}"), e)),
        }
    }

    async fn create_fork(&self, upstream: &RepoSlug) -> Result<()> {
        self.octo
            .repos(&upstream.owner, &upstream.name)
            .create_fork()
            .send()
            .await
            .map_err(|e| github_err(&format!("forking {upstream}"), e))?;
        Ok(())
    }

    async fn branch_tip(&self, slug: &RepoSlug, branch: &str) -> Result<Option<String>> {
        let reference = Reference::Branch(branch.to_string());
        match self
            .octo
            .repos(&slug.owner, &slug.name)
            .get_ref(&reference)
            .await
        {
            Ok(r) => match r.object {
                Object::Commit { sha, .. } | Object::Tag { sha, .. } => Ok(Some(sha)),
                #[allow(unreachable_patterns)]
                _ => Err(ForkfixError::GitHub(format!(
                    "heads/{branch} on {slug} does not point at a commit"
                ))),
            },
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(github_err(&format!("reading heads/{branch} on {slug}"), e)),
        }
    }

    async fn create_branch(&self, slug: &RepoSlug, branch: &str, sha: &str) -> Result<()> {
        self.octo
            .repos(&slug.owner, &slug.name)
            .create_ref(&Reference::Branch(branch.to_string()), sha)
            .await
            .map_err(|e| {
                ForkfixError::Branch(format!("could not create '{branch}' on {slug}: {e}"))
            })?;
        Ok(())
    }

    async fn file(
        &self,
        slug: &RepoSlug,
        path: &str,
        branch: &str,
    ) -> Result<Option<FileContent>> {
        let result = self
            .octo
            .repos(&slug.owner, &slug.name)
            .get_content()
            .path(path)
            .r#ref(branch)
            .send()
            .await;

        let items = match result {
            Ok(items) => items.items,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(github_err(&format!("reading {path} on {slug}"), e)),
        };

        // A directory listing comes back as several items; only a single file counts.
        let item = match items.as_slice() {
            [item] if item.path == path => item,
            _ => return Ok(None),
        };

        // Files over 1 MB come back with `encoding: none` and no inline content.
        let text = match (item.encoding.as_deref(), item.content.as_deref()) {
            (Some("base64"), Some(encoded)) => decode_blob(path, encoded)?,
            _ => self.blob_text(slug, path, &item.sha).await?,
        };

        Ok(Some(FileContent {
            path: item.path.clone(),
            text,
            sha: item.sha.clone(),
        }))
    }

    async fn write_file(
        &self,
        slug: &RepoSlug,
        branch: &str,
        change: &FileChange,
        message: &str,
    ) -> Result<()> {
        let repo = self.octo.repos(&slug.owner, &slug.name);
        let sent = match &change.prior_sha {
            Some(sha) => {
                repo.update_file(&change.path, message, &change.content, sha)
                    .branch(branch)
                    .send()
                    .await
            }
            None => {
                repo.create_file(&change.path, message, &change.content)
                    .branch(branch)
                    .send()
                    .await
            }
        };
        sent.map_err(|e| github_err(&format!("writing {} on {slug}", change.path), e))?;
        Ok(())
    }

    async fn list_files(&self, slug: &RepoSlug, branch: &str) -> Result<Vec<String>> {
        let route = format!(
            "/repos/{}/{}/git/trees/{branch}?recursive=1",
            slug.owner, slug.name
        );
        let tree: TreeResponse = match self.octo.get(route, None::<&()>).await {
            Ok(tree) => tree,
            Err(e) if is_not_found(&e) => return Ok(Vec::new()),
            Err(e) => return Err(github_err(&format!("listing tree of {slug}"), e)),
        };

        if tree.truncated {
            tracing::warn!(repo = %slug, branch, "tree listing truncated by the API");
        }

        Ok(tree
            .tree
            .into_iter()
            .filter(|entry| entry.kind == "blob")
            .map(|entry| entry.path)
            .collect())
    }

    async fn issue(&self, slug: &RepoSlug, number: u64) -> Result<Option<IssueDetails>> {
        match self.octo.issues(&slug.owner, &slug.name).get(number).await {
            Ok(issue) => Ok(Some(IssueDetails {
                title: issue.title,
                body: issue.body.unwrap_or_default(),
            })),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(github_err(&format!("fetching issue #{number} on {slug}"), e)),
        }
    }

    async fn open_pull_request(
        &self,
        upstream: &RepoSlug,
        draft: &PullRequestDraft,
    ) -> Result<PullRequestHandle> {
        let pr = self
            .octo
            .pulls(&upstream.owner, &upstream.name)
            .create(&draft.title, &draft.head, &draft.base)
            .body(&draft.body)
            .send()
            .await
            .map_err(|e| ForkfixError::PullRequest(e.to_string()))?;

        let url = pr.html_url.map_or_else(
            || {
                format!(
                    "https://github.com/{}/{}/pull/{}",
                    upstream.owner, upstream.name, pr.number
                )
            },
            |url| url.to_string(),
        );

        Ok(PullRequestHandle {
            number: pr.number,
            url,
        })
    }
}
