//! Publishing generated content as an isolated branch, commit and PR.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::{GitHubClient, PullRequest};
use crate::error::ScmError;

/// Wait after deleting a ref before recreating it; the ref store is not
/// read-your-deletes consistent.
const DEFAULT_REF_GRACE: Duration = Duration::from_secs(2);

/// Target repository of a publish operation.
#[derive(Debug, Clone)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

/// Everything needed to publish one file as a new branch + commit + PR.
///
/// Constructed fresh per publish; nothing survives the operation except the
/// branch and commit in the remote repository.
#[derive(Debug, Clone)]
pub struct CommitPlan {
    pub repo: RepoId,
    pub base_branch: String,
    pub target_branch: String,
    pub file_path: String,
    pub content: Vec<u8>,
    pub message: String,
}

/// Result of a publish operation that produced durable artifacts.
#[derive(Debug, Clone)]
pub enum PublishOutcome {
    /// Branch, commit and pull request all exist.
    Completed {
        branch: String,
        commit_sha: String,
        pr_number: u64,
        pr_url: String,
    },
    /// Branch and commit exist, but the pull request could not be opened.
    /// The artifacts are left in place for a manual PR.
    BranchOnly {
        branch: String,
        commit_sha: String,
        reason: String,
    },
}

/// Derive a branch name unique to this invocation.
///
/// Collision resistance comes from the timestamp plus a random suffix, so
/// concurrent publishes of the same path land on distinct branches.
#[must_use]
pub fn derive_branch_name(file_path: &str) -> String {
    let slug: String = file_path
        .chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() => c.to_ascii_lowercase(),
            _ => '-',
        })
        .collect();
    let timestamp = Utc::now().format("%Y%m%d-%H%M%S");
    let suffix = &Uuid::new_v4().simple().to_string()[..6];
    format!("simpleflow/docs/{slug}-{timestamp}-{suffix}")
}

/// Materializes generated content as a new commit without touching the
/// source branch.
pub struct CommitPublisher {
    client: GitHubClient,
    ref_grace: Duration,
}

impl CommitPublisher {
    #[must_use]
    pub fn new(client: GitHubClient) -> Self {
        Self {
            client,
            ref_grace: DEFAULT_REF_GRACE,
        }
    }

    /// Override the post-deletion grace period (tests use zero).
    #[must_use]
    pub fn with_ref_grace(mut self, ref_grace: Duration) -> Self {
        self.ref_grace = ref_grace;
        self
    }

    /// Execute the publish sequence.
    ///
    /// Steps are strictly ordered; each depends on the previous step's
    /// output. A failure before the final ref update is a full failure
    /// carrying the failed stage. A failure opening the PR alone yields
    /// [`PublishOutcome::BranchOnly`].
    ///
    /// # Errors
    ///
    /// Returns a stage-tagged [`ScmError`] when no durable artifact was
    /// produced.
    pub async fn publish(&self, plan: &CommitPlan) -> Result<PublishOutcome, ScmError> {
        let owner = &plan.repo.owner;
        let repo = &plan.repo.name;

        info!(
            owner = %owner,
            repo = %repo,
            base = %plan.base_branch,
            target = %plan.target_branch,
            path = %plan.file_path,
            "Publishing generated content"
        );

        // 1. Anchor everything on the current base head.
        let base_sha = self
            .client
            .branch_sha(owner, repo, &plan.base_branch)
            .await?;

        // 2. Clear any leftover target ref from an earlier run.
        let deleted = self
            .client
            .delete_branch(owner, repo, &plan.target_branch)
            .await?;
        if deleted {
            debug!(
                target = %plan.target_branch,
                grace_ms = self.ref_grace.as_millis() as u64,
                "Deleted stale target branch, waiting for ref store"
            );
            tokio::time::sleep(self.ref_grace).await;
        }

        // 3. A failure here is fatal; it is never silently retried.
        self.client
            .create_branch(owner, repo, &plan.target_branch, &base_sha)
            .await?;

        // 4-7. blob -> base tree -> overlay tree -> commit.
        let blob_sha = self.client.create_blob(owner, repo, &plan.content).await?;
        let base_tree = self.client.commit_tree_sha(owner, repo, &base_sha).await?;
        let tree_sha = self
            .client
            .create_tree(owner, repo, &base_tree, &plan.file_path, &blob_sha)
            .await?;
        let commit_sha = self
            .client
            .create_commit(owner, repo, &plan.message, &tree_sha, &base_sha)
            .await?;

        // 8. Point the target branch at the new commit.
        self.client
            .force_update_branch(owner, repo, &plan.target_branch, &commit_sha)
            .await?;

        // 9. The branch and commit are durable from here on; a PR failure
        //    is a partial success, not a rollback.
        let title = plan
            .message
            .lines()
            .next()
            .unwrap_or(&plan.message)
            .to_string();
        let body = format!(
            "Automated documentation for `{}`.\n\nGenerated by SimpleFlow.",
            plan.file_path
        );
        match self
            .client
            .create_pull(
                owner,
                repo,
                &title,
                &plan.target_branch,
                &plan.base_branch,
                &body,
            )
            .await
        {
            Ok(PullRequest {
                number, html_url, ..
            }) => Ok(PublishOutcome::Completed {
                branch: plan.target_branch.clone(),
                commit_sha,
                pr_number: number,
                pr_url: html_url,
            }),
            Err(error) => {
                warn!(
                    target = %plan.target_branch,
                    error = %error,
                    "Branch and commit created but PR creation failed"
                );
                Ok(PublishOutcome::BranchOnly {
                    branch: plan.target_branch.clone(),
                    commit_sha,
                    reason: error.to_string(),
                })
            }
        }
    }
}
