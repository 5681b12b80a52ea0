//! GitHub webhook event payloads.
//!
//! Only the fields the orchestrator reads are modeled; everything else in
//! the payload is ignored by serde.

use serde::Deserialize;
use serde_json::Value;

/// GitHub repository info.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    /// Repository name.
    pub name: String,
    /// Full name (owner/repo).
    pub full_name: String,
    /// Repository owner.
    pub owner: RepoOwner,
    /// Default branch.
    #[serde(default)]
    pub default_branch: Option<String>,
}

/// Repository owner.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoOwner {
    /// Owner login.
    pub login: String,
}

/// Git reference (branch).
#[derive(Debug, Clone, Deserialize)]
pub struct GitRefInfo {
    /// Branch name.
    #[serde(rename = "ref")]
    pub ref_name: String,
    /// Head SHA.
    pub sha: String,
}

/// GitHub user.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    /// User login.
    pub login: String,
}

/// GitHub pull request event payload (simplified).
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    /// Action type (opened, closed, etc.).
    pub action: String,
    /// Pull request details.
    pub pull_request: PullRequestInfo,
    /// Repository info.
    pub repository: Repository,
}

/// Pull request details within an event.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestInfo {
    /// PR number.
    pub number: u64,
    /// PR title.
    #[serde(default)]
    pub title: Option<String>,
    /// PR body/description.
    #[serde(default)]
    pub body: Option<String>,
    /// Source branch.
    pub head: GitRefInfo,
    /// Target branch.
    pub base: GitRefInfo,
    /// Whether the PR was merged.
    #[serde(default)]
    pub merged: bool,
}

/// GitHub issue comment event payload (simplified).
#[derive(Debug, Clone, Deserialize)]
pub struct IssueCommentEvent {
    /// Action type (created, edited, deleted).
    pub action: String,
    /// The issue (or PR) the comment belongs to.
    pub issue: IssueInfo,
    /// The comment itself.
    pub comment: CommentInfo,
    /// Repository info.
    pub repository: Repository,
}

/// Issue details within a comment event.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueInfo {
    /// Issue number (PR number when the issue is a PR).
    pub number: u64,
    /// Issue title.
    pub title: String,
    /// Issue body.
    #[serde(default)]
    pub body: Option<String>,
    /// Present when the "issue" is actually a pull request.
    #[serde(default)]
    pub pull_request: Option<Value>,
}

impl IssueInfo {
    /// Whether this comment thread belongs to a pull request.
    #[must_use]
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

/// Comment details within a comment event.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentInfo {
    /// Comment ID (for reactions).
    pub id: u64,
    /// Comment body.
    pub body: String,
    /// Comment author.
    pub user: GitHubUser,
}

impl CommentInfo {
    /// Comments from other bots are never processed.
    #[must_use]
    pub fn is_from_bot(&self) -> bool {
        self.user.login.ends_with("[bot]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pr_marker_distinguishes_prs_from_issues() {
        let on_pr: IssueCommentEvent = serde_json::from_value(serde_json::json!({
            "action": "created",
            "issue": {
                "number": 5,
                "title": "Add dark mode",
                "pull_request": { "url": "https://api.github.com/repos/a/b/pulls/5" },
            },
            "comment": { "id": 1, "body": "!sf do it", "user": { "login": "dev" } },
            "repository": {
                "name": "b",
                "full_name": "a/b",
                "owner": { "login": "a" },
            },
        }))
        .unwrap();
        assert!(on_pr.issue.is_pull_request());

        let on_issue: IssueInfo = serde_json::from_value(serde_json::json!({
            "number": 6,
            "title": "A plain issue",
        }))
        .unwrap();
        assert!(!on_issue.is_pull_request());
    }

    #[test]
    fn bot_comments_are_detected() {
        let comment = CommentInfo {
            id: 1,
            body: "!sf loop".to_string(),
            user: GitHubUser {
                login: "simpleflow[bot]".to_string(),
            },
        };
        assert!(comment.is_from_bot());
    }
}
