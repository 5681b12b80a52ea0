//! GitHub API client for the bot's repository operations.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{GitStage, ScmError};

const DEFAULT_API_URL: &str = "https://api.github.com";

/// GitHub API client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

/// A file changed by a pull request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangedFile {
    pub filename: String,
    pub status: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
}

/// Pull request as returned by the pulls API.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub body: Option<String>,
    pub html_url: String,
}

/// Issue as returned by the issues API.
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub html_url: String,
}

/// Created comment.
#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub html_url: String,
}

#[derive(Debug, Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Debug, Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ShaOnly {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitCommit {
    tree: ShaOnly,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    content: String,
    encoding: String,
}

impl GitHubClient {
    /// Create a client against api.github.com.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: &str) -> Result<Self, ScmError> {
        Self::with_base_url(token, DEFAULT_API_URL)
    }

    /// Create a client against a custom API base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self, ScmError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("simpleflow/1.0"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ScmError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn auth(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// List the files changed by a pull request.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn list_pull_files(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<ChangedFile>, ScmError> {
        let url = format!(
            "{}/repos/{owner}/{repo}/pulls/{number}/files?per_page=100",
            self.base_url
        );

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, self.auth())
            .send()
            .await
            .map_err(ScmError::transport)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        decode(response).await
    }

    /// Fetch a pull request.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn get_pull(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequest, ScmError> {
        let url = format!("{}/repos/{owner}/{repo}/pulls/{number}", self.base_url);

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, self.auth())
            .send()
            .await
            .map_err(ScmError::transport)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        decode(response).await
    }

    /// Replace a pull request's body.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn update_pull_body(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<PullRequest, ScmError> {
        let url = format!("{}/repos/{owner}/{repo}/pulls/{number}", self.base_url);

        let response = self
            .client
            .patch(&url)
            .header(AUTHORIZATION, self.auth())
            .json(&json!({ "body": body }))
            .send()
            .await
            .map_err(ScmError::transport)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        info!(owner, repo, number, "Updated pull request body");
        decode(response).await
    }

    /// Open a pull request from `head` into `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn create_pull(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
        head: &str,
        base: &str,
        body: &str,
    ) -> Result<PullRequest, ScmError> {
        let url = format!("{}/repos/{owner}/{repo}/pulls", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.auth())
            .json(&json!({
                "title": title,
                "head": head,
                "base": base,
                "body": body,
            }))
            .send()
            .await
            .map_err(ScmError::transport)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let pr: PullRequest = decode(response).await?;
        info!(owner, repo, number = pr.number, "Created pull request");
        Ok(pr)
    }

    /// Fetch a file's raw content at a ref.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails or the content cannot be
    /// decoded.
    pub async fn fetch_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        reference: &str,
    ) -> Result<Vec<u8>, ScmError> {
        let url = format!(
            "{}/repos/{owner}/{repo}/contents/{path}?ref={reference}",
            self.base_url
        );
        debug!(owner, repo, path, reference, "Fetching file content");

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, self.auth())
            .send()
            .await
            .map_err(ScmError::transport)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let content: ContentResponse = decode(response).await?;
        if content.encoding != "base64" {
            return Err(ScmError::Decode(format!(
                "unexpected content encoding `{}` for {path}",
                content.encoding
            )));
        }

        // The contents API wraps base64 at 60 columns.
        let compact: String = content
            .content
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        BASE64
            .decode(compact)
            .map_err(|e| ScmError::Decode(format!("invalid base64 content for {path}: {e}")))
    }

    /// Create an issue.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
        body: &str,
    ) -> Result<Issue, ScmError> {
        let url = format!("{}/repos/{owner}/{repo}/issues", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.auth())
            .json(&json!({ "title": title, "body": body }))
            .send()
            .await
            .map_err(ScmError::transport)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let issue: Issue = decode(response).await?;
        info!(owner, repo, number = issue.number, "Created issue");
        Ok(issue)
    }

    /// Update an issue's title and body.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn update_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        title: &str,
        body: &str,
    ) -> Result<Issue, ScmError> {
        let url = format!("{}/repos/{owner}/{repo}/issues/{number}", self.base_url);

        let response = self
            .client
            .patch(&url)
            .header(AUTHORIZATION, self.auth())
            .json(&json!({ "title": title, "body": body }))
            .send()
            .await
            .map_err(ScmError::transport)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        info!(owner, repo, number, "Updated issue");
        decode(response).await
    }

    /// Post a comment on an issue or pull request.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn post_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<Comment, ScmError> {
        let url = format!(
            "{}/repos/{owner}/{repo}/issues/{number}/comments",
            self.base_url
        );

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.auth())
            .json(&json!({ "body": body }))
            .send()
            .await
            .map_err(ScmError::transport)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        decode(response).await
    }

    /// Add a reaction to an issue or pull request comment.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn add_reaction(
        &self,
        owner: &str,
        repo: &str,
        comment_id: u64,
        content: &str,
    ) -> Result<(), ScmError> {
        let url = format!(
            "{}/repos/{owner}/{repo}/issues/comments/{comment_id}/reactions",
            self.base_url
        );

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.auth())
            .json(&json!({ "content": content }))
            .send()
            .await
            .map_err(ScmError::transport)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(())
    }

    /// Resolve the head commit SHA of a branch.
    ///
    /// # Errors
    ///
    /// Returns a `Git` error tagged with the ref stage.
    pub async fn branch_sha(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<String, ScmError> {
        let url = format!(
            "{}/repos/{owner}/{repo}/git/ref/heads/{branch}",
            self.base_url
        );

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, self.auth())
            .send()
            .await
            .map_err(ScmError::transport)?;

        if !response.status().is_success() {
            return Err(git_error(GitStage::Ref, response).await);
        }

        let reference: RefResponse = decode(response).await?;
        Ok(reference.object.sha)
    }

    /// Delete a branch ref. Absence of the ref is not an error.
    ///
    /// Returns `true` if a ref was deleted, `false` if none existed.
    ///
    /// # Errors
    ///
    /// Returns a `Git` error tagged with the ref stage.
    pub async fn delete_branch(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<bool, ScmError> {
        let url = format!(
            "{}/repos/{owner}/{repo}/git/refs/heads/{branch}",
            self.base_url
        );

        let response = self
            .client
            .delete(&url)
            .header(AUTHORIZATION, self.auth())
            .send()
            .await
            .map_err(ScmError::transport)?;

        let status = response.status().as_u16();
        // 404 and 422 both signal a missing ref depending on API version.
        if matches!(status, 404 | 422) {
            debug!(owner, repo, branch, "Branch ref did not exist");
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(git_error(GitStage::Ref, response).await);
        }

        debug!(owner, repo, branch, "Deleted branch ref");
        Ok(true)
    }

    /// Create a branch ref at `sha`.
    ///
    /// # Errors
    ///
    /// Returns a `Git` error tagged with the ref stage.
    pub async fn create_branch(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
    ) -> Result<(), ScmError> {
        let url = format!("{}/repos/{owner}/{repo}/git/refs", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.auth())
            .json(&json!({
                "ref": format!("refs/heads/{branch}"),
                "sha": sha,
            }))
            .send()
            .await
            .map_err(ScmError::transport)?;

        if !response.status().is_success() {
            return Err(git_error(GitStage::Ref, response).await);
        }

        Ok(())
    }

    /// Force-move a branch ref to `sha`.
    ///
    /// # Errors
    ///
    /// Returns a `Git` error tagged with the ref stage.
    pub async fn force_update_branch(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
    ) -> Result<(), ScmError> {
        let url = format!(
            "{}/repos/{owner}/{repo}/git/refs/heads/{branch}",
            self.base_url
        );

        let response = self
            .client
            .patch(&url)
            .header(AUTHORIZATION, self.auth())
            .json(&json!({ "sha": sha, "force": true }))
            .send()
            .await
            .map_err(ScmError::transport)?;

        if !response.status().is_success() {
            return Err(git_error(GitStage::Ref, response).await);
        }

        Ok(())
    }

    /// Create a blob from raw bytes, returning its SHA.
    ///
    /// # Errors
    ///
    /// Returns a `Git` error tagged with the blob stage.
    pub async fn create_blob(
        &self,
        owner: &str,
        repo: &str,
        content: &[u8],
    ) -> Result<String, ScmError> {
        let url = format!("{}/repos/{owner}/{repo}/git/blobs", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.auth())
            .json(&json!({
                "content": BASE64.encode(content),
                "encoding": "base64",
            }))
            .send()
            .await
            .map_err(ScmError::transport)?;

        if !response.status().is_success() {
            return Err(git_error(GitStage::Blob, response).await);
        }

        let blob: ShaOnly = decode(response).await?;
        Ok(blob.sha)
    }

    /// Fetch the tree SHA of a commit.
    ///
    /// # Errors
    ///
    /// Returns a `Git` error tagged with the commit stage.
    pub async fn commit_tree_sha(
        &self,
        owner: &str,
        repo: &str,
        commit_sha: &str,
    ) -> Result<String, ScmError> {
        let url = format!(
            "{}/repos/{owner}/{repo}/git/commits/{commit_sha}",
            self.base_url
        );

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, self.auth())
            .send()
            .await
            .map_err(ScmError::transport)?;

        if !response.status().is_success() {
            return Err(git_error(GitStage::Commit, response).await);
        }

        let commit: GitCommit = decode(response).await?;
        Ok(commit.tree.sha)
    }

    /// Create a tree overlaying `{path -> blob}` on `base_tree`.
    ///
    /// # Errors
    ///
    /// Returns a `Git` error tagged with the tree stage.
    pub async fn create_tree(
        &self,
        owner: &str,
        repo: &str,
        base_tree: &str,
        path: &str,
        blob_sha: &str,
    ) -> Result<String, ScmError> {
        let url = format!("{}/repos/{owner}/{repo}/git/trees", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.auth())
            .json(&json!({
                "base_tree": base_tree,
                "tree": [{
                    "path": path,
                    "mode": "100644",
                    "type": "blob",
                    "sha": blob_sha,
                }],
            }))
            .send()
            .await
            .map_err(ScmError::transport)?;

        if !response.status().is_success() {
            return Err(git_error(GitStage::Tree, response).await);
        }

        let tree: ShaOnly = decode(response).await?;
        Ok(tree.sha)
    }

    /// Create a commit with a single parent, returning its SHA.
    ///
    /// # Errors
    ///
    /// Returns a `Git` error tagged with the commit stage.
    pub async fn create_commit(
        &self,
        owner: &str,
        repo: &str,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
    ) -> Result<String, ScmError> {
        let url = format!("{}/repos/{owner}/{repo}/git/commits", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.auth())
            .json(&json!({
                "message": message,
                "tree": tree_sha,
                "parents": [parent_sha],
            }))
            .send()
            .await
            .map_err(ScmError::transport)?;

        if !response.status().is_success() {
            return Err(git_error(GitStage::Commit, response).await);
        }

        let commit: ShaOnly = decode(response).await?;
        Ok(commit.sha)
    }
}

async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, ScmError> {
    response
        .json()
        .await
        .map_err(|e| ScmError::Decode(e.without_url().to_string()))
}

async fn api_error(response: reqwest::Response) -> ScmError {
    let status = response.status().as_u16();
    let message = error_message(response).await;
    ScmError::Api { status, message }
}

async fn git_error(stage: GitStage, response: reqwest::Response) -> ScmError {
    let status = response.status().as_u16();
    let message = error_message(response).await;
    ScmError::Git {
        stage,
        status,
        message,
    }
}

async fn error_message(response: reqwest::Response) -> String {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or(text)
}
