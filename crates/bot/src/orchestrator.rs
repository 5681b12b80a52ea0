//! Event orchestration: wiring GitHub events to remote functions and back.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use functions::{names, retry_with_backoff, RemoteFunction, RetryPolicy};
use scm::{derive_branch_name, CommitPlan, CommitPublisher, GitHubClient, PublishOutcome, RepoId};
use store::ContentStore;

use crate::events::{IssueCommentEvent, PullRequestEvent};
use crate::failure::{failure_comment, BotError};

const SUMMARY_MARKER: &str = "<!-- simpleflow:summary -->";

/// Reacts to repository events by calling remote functions and reflecting
/// their results back into GitHub.
///
/// Holds no mutable state; everything here is immutable after construction
/// and shared across events.
pub struct EventOrchestrator {
    scm: GitHubClient,
    publisher: CommitPublisher,
    store: Arc<dyn ContentStore>,
    invoker: Arc<dyn RemoteFunction>,
    retry: RetryPolicy,
    trigger: String,
}

impl EventOrchestrator {
    #[must_use]
    pub fn new(
        scm: GitHubClient,
        store: Arc<dyn ContentStore>,
        invoker: Arc<dyn RemoteFunction>,
        retry: RetryPolicy,
        trigger: String,
    ) -> Self {
        let publisher = CommitPublisher::new(scm.clone());
        Self {
            scm,
            publisher,
            store,
            invoker,
            retry,
            trigger,
        }
    }

    /// Override the commit publisher (tests shorten its ref grace period).
    #[must_use]
    pub fn with_publisher(mut self, publisher: CommitPublisher) -> Self {
        self.publisher = publisher;
        self
    }

    /// A pull request was opened: analyze each changed file, then write an
    /// aggregate summary into the PR body.
    pub async fn pull_request_opened(&self, event: &PullRequestEvent) -> Value {
        let owner = &event.repository.owner.login;
        let repo = &event.repository.name;
        let number = event.pull_request.number;
        let head_sha = &event.pull_request.head.sha;

        info!(owner = %owner, repo = %repo, number, "Processing opened pull request");

        let files = match self.scm.list_pull_files(owner, repo, number).await {
            Ok(files) => files,
            Err(e) => {
                let error = BotError::from(e);
                self.report_failure(owner, repo, number, "listing changed files", &error)
                    .await;
                return json!({ "status": "error", "error": error.to_string() });
            }
        };

        let files: Vec<_> = files
            .into_iter()
            .filter(|f| f.status != "removed")
            .collect();
        if files.is_empty() {
            debug!(owner = %owner, repo = %repo, number, "No analyzable files in pull request");
            return json!({ "status": "ignored", "reason": "no_files" });
        }

        // Per-file pipelines run concurrently; one failure never touches a
        // sibling file.
        let analyses = join_all(files.iter().map(|file| async move {
            self.analyze_file(owner, repo, number, head_sha, &file.filename)
                .await
        }))
        .await;

        let mut summaries = BTreeMap::new();
        let mut failed = 0usize;
        for (file, outcome) in files.iter().zip(analyses) {
            match outcome {
                Ok(summary) => {
                    summaries.insert(file.filename.clone(), summary);
                }
                Err(error) => {
                    failed += 1;
                    let context = format!("analyzing `{}`", file.filename);
                    self.report_failure(owner, repo, number, &context, &error)
                        .await;
                }
            }
        }

        if summaries.is_empty() {
            return json!({ "status": "error", "reason": "all_files_failed", "failed": failed });
        }

        // Aggregate step: a failure here aborts the rest of the event.
        let payload = json!({
            "summaries": serde_json::to_string(&summaries).unwrap_or_default(),
        });
        let summary = match retry_with_backoff(&self.retry, || {
            self.invoker.invoke(names::SUMMARIZE, &payload, None)
        })
        .await
        {
            Ok(value) => as_text(&value),
            Err(e) => {
                let error = BotError::from(e);
                self.report_failure(
                    owner,
                    repo,
                    number,
                    "generating the pull request summary",
                    &error,
                )
                .await;
                return json!({ "status": "error", "error": error.to_string() });
            }
        };

        if let Err(e) = self
            .publish_summary(owner, repo, number, &summaries, &summary)
            .await
        {
            self.report_failure(owner, repo, number, "publishing the summary", &e)
                .await;
            return json!({ "status": "error", "error": e.to_string() });
        }

        json!({
            "status": "processed",
            "event": "pull_request_opened",
            "analyzed": summaries.len(),
            "failed": failed,
        })
    }

    /// A pull request was merged: generate inline documentation for each
    /// changed file and publish it as a docs branch + PR.
    pub async fn pull_request_merged(&self, event: &PullRequestEvent) -> Value {
        let owner = &event.repository.owner.login;
        let repo = &event.repository.name;
        let number = event.pull_request.number;
        let base_branch = &event.pull_request.base.ref_name;

        info!(
            owner = %owner,
            repo = %repo,
            number,
            base_branch = %base_branch,
            "Processing merged pull request"
        );

        let files = match self.scm.list_pull_files(owner, repo, number).await {
            Ok(files) => files,
            Err(e) => {
                let error = BotError::from(e);
                self.report_failure(owner, repo, number, "listing changed files", &error)
                    .await;
                return json!({ "status": "error", "error": error.to_string() });
            }
        };

        let files: Vec<_> = files
            .into_iter()
            .filter(|f| f.status != "removed")
            .collect();
        if files.is_empty() {
            return json!({ "status": "ignored", "reason": "no_files" });
        }

        let outcomes = join_all(files.iter().map(|file| async move {
            self.document_file(owner, repo, number, base_branch, &file.filename)
                .await
        }))
        .await;

        let mut published = 0usize;
        let mut partial = 0usize;
        let mut failed = 0usize;
        for (file, outcome) in files.iter().zip(outcomes) {
            match outcome {
                Ok(PublishOutcome::Completed { pr_url, .. }) => {
                    published += 1;
                    let body = format!(
                        "📚 Documentation for `{}` is ready for review: {pr_url}",
                        file.filename
                    );
                    if let Err(e) = self.scm.post_comment(owner, repo, number, &body).await {
                        warn!(error = %e, "Failed to post documentation link");
                    }
                }
                Ok(PublishOutcome::BranchOnly { branch, reason, .. }) => {
                    partial += 1;
                    let body = format!(
                        "📚 Documentation for `{}` was committed to `{branch}`, but the \
                         pull request could not be opened ({reason}). Open it manually \
                         from that branch.",
                        file.filename
                    );
                    if let Err(e) = self.scm.post_comment(owner, repo, number, &body).await {
                        warn!(error = %e, "Failed to post partial-success notice");
                    }
                }
                Err(error) => {
                    failed += 1;
                    let context = format!("documenting `{}`", file.filename);
                    self.report_failure(owner, repo, number, &context, &error)
                        .await;
                }
            }
        }

        json!({
            "status": "processed",
            "event": "pull_request_merged",
            "published": published,
            "partial": partial,
            "failed": failed,
        })
    }

    /// A comment was created: when it carries the trigger token, draft a new
    /// issue (PR comments) or update the existing issue (issue comments).
    pub async fn comment_created(&self, event: &IssueCommentEvent) -> Value {
        if event.action != "created" {
            return json!({ "status": "ignored", "reason": "not_created" });
        }
        if event.comment.is_from_bot() {
            return json!({ "status": "ignored", "reason": "bot_comment" });
        }
        if !event.comment.body.contains(&self.trigger) {
            return json!({ "status": "ignored", "reason": "no_trigger" });
        }

        let owner = &event.repository.owner.login;
        let repo = &event.repository.name;
        let number = event.issue.number;

        info!(
            owner = %owner,
            repo = %repo,
            number,
            on_pull_request = event.issue.is_pull_request(),
            "Processing triggered comment"
        );

        if event.issue.is_pull_request() {
            self.create_issue_from_comment(owner, repo, number, &event.comment.body)
                .await
        } else {
            self.update_issue_from_comment(owner, repo, event).await
        }
    }

    /// Fetch, store and analyze one changed file.
    async fn analyze_file(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        reference: &str,
        path: &str,
    ) -> Result<String, BotError> {
        let content = self.scm.fetch_content(owner, repo, path, reference).await?;
        let key = store::derive_key(owner, repo, number, path);
        let key = self.store.put(&key, content).await?;

        let payload = json!({ "file_id": key });
        let value = retry_with_backoff(&self.retry, || {
            self.invoker.invoke(names::ANALYZE, &payload, None)
        })
        .await?;

        Ok(as_text(&value))
    }

    /// Fetch, store, document and publish one merged file.
    async fn document_file(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        base_branch: &str,
        path: &str,
    ) -> Result<PublishOutcome, BotError> {
        let content = self
            .scm
            .fetch_content(owner, repo, path, base_branch)
            .await?;
        let key = store::derive_key(owner, repo, number, path);
        let key = self.store.put(&key, content).await?;

        let payload = json!({ "file_id": key });
        let value = retry_with_backoff(&self.retry, || {
            self.invoker.invoke(names::DOCUMENT, &payload, None)
        })
        .await?;
        let documented = as_text(&value);

        let plan = CommitPlan {
            repo: RepoId::new(owner, repo),
            base_branch: base_branch.to_string(),
            target_branch: derive_branch_name(path),
            file_path: path.to_string(),
            content: documented.into_bytes(),
            message: format!("docs: add inline documentation for {path}"),
        };

        Ok(self.publisher.publish(&plan).await?)
    }

    /// Post the per-file analyses as a comment and merge the aggregate
    /// summary into the PR body.
    async fn publish_summary(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        analyses: &BTreeMap<String, String>,
        summary: &str,
    ) -> Result<(), BotError> {
        let mut comment = String::from("### 🔍 SimpleFlow file analysis\n");
        for (path, text) in analyses {
            comment.push_str(&format!(
                "\n<details>\n<summary><code>{path}</code></summary>\n\n{text}\n\n</details>\n"
            ));
        }
        self.scm.post_comment(owner, repo, number, &comment).await?;

        let pull = self.scm.get_pull(owner, repo, number).await?;
        let body = merge_summary(pull.body.as_deref(), summary);
        self.scm.update_pull_body(owner, repo, number, &body).await?;
        Ok(())
    }

    async fn create_issue_from_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        comment_body: &str,
    ) -> Value {
        let payload = json!({ "content": comment_body });
        let result = retry_with_backoff(&self.retry, || {
            self.invoker.invoke(names::ISSUE_CREATE, &payload, None)
        })
        .await
        .map_err(BotError::from)
        .and_then(|value| title_and_body(names::ISSUE_CREATE, &value));

        let (title, body) = match result {
            Ok(parts) => parts,
            Err(error) => {
                self.report_failure(owner, repo, number, "drafting an issue", &error)
                    .await;
                return json!({ "status": "error", "error": error.to_string() });
            }
        };

        match self.scm.create_issue(owner, repo, &title, &body).await {
            Ok(issue) => json!({
                "status": "processed",
                "event": "issue_created",
                "issue": issue.number,
            }),
            Err(e) => {
                let error = BotError::from(e);
                self.report_failure(owner, repo, number, "creating the issue", &error)
                    .await;
                json!({ "status": "error", "error": error.to_string() })
            }
        }
    }

    async fn update_issue_from_comment(
        &self,
        owner: &str,
        repo: &str,
        event: &IssueCommentEvent,
    ) -> Value {
        let number = event.issue.number;
        let payload = json!({
            "content": event.comment.body,
            "title": event.issue.title,
            "body": event.issue.body.clone().unwrap_or_default(),
        });
        let result = retry_with_backoff(&self.retry, || {
            self.invoker.invoke(names::ISSUE_UPDATE, &payload, None)
        })
        .await
        .map_err(BotError::from)
        .and_then(|value| title_and_body(names::ISSUE_UPDATE, &value));

        let (title, body) = match result {
            Ok(parts) => parts,
            Err(error) => {
                self.report_failure(owner, repo, number, "revising the issue", &error)
                    .await;
                return json!({ "status": "error", "error": error.to_string() });
            }
        };

        if let Err(e) = self
            .scm
            .update_issue(owner, repo, number, &title, &body)
            .await
        {
            let error = BotError::from(e);
            self.report_failure(owner, repo, number, "updating the issue", &error)
                .await;
            return json!({ "status": "error", "error": error.to_string() });
        }

        // Acknowledge the triggering comment; a reaction failure is not
        // worth a user-facing error.
        if let Err(e) = self
            .scm
            .add_reaction(owner, repo, event.comment.id, "+1")
            .await
        {
            warn!(error = %e, "Failed to add acknowledgement reaction");
        }

        json!({
            "status": "processed",
            "event": "issue_updated",
            "issue": number,
        })
    }

    /// Translate a caught failure into a comment on the triggering PR/issue.
    async fn report_failure(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        context: &str,
        error: &BotError,
    ) {
        error!(owner = %owner, repo = %repo, number, context, error = %error, "Event step failed");
        let body = failure_comment(context, error);
        if let Err(post_error) = self.scm.post_comment(owner, repo, number, &body).await {
            warn!(error = %post_error, "Failed to post failure comment");
        }
    }
}

/// Plain-text view of a remote function response.
fn as_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Extract the `{title, body}` pair issue functions return.
fn title_and_body(function: &str, value: &Value) -> Result<(String, String), BotError> {
    let title = value.get("title").and_then(Value::as_str);
    let body = value.get("body").and_then(Value::as_str);
    match (title, body) {
        (Some(title), Some(body)) => Ok((title.to_string(), body.to_string())),
        _ => Err(BotError::UnexpectedResponse {
            function: function.to_string(),
            reason: "missing `title` or `body` field".to_string(),
        }),
    }
}

/// Prepend the generated summary to the PR body, replacing any summary a
/// previous run left behind and preserving the author's own text.
fn merge_summary(original: Option<&str>, summary: &str) -> String {
    let original = strip_previous_summary(original.unwrap_or(""));
    if original.is_empty() {
        format!("{SUMMARY_MARKER}\n## 📋 Summary\n\n{summary}\n")
    } else {
        format!("{SUMMARY_MARKER}\n## 📋 Summary\n\n{summary}\n\n---\n\n{original}")
    }
}

fn strip_previous_summary(body: &str) -> &str {
    if !body.starts_with(SUMMARY_MARKER) {
        return body.trim();
    }
    match body.find("\n---\n") {
        Some(index) => body[index + "\n---\n".len()..].trim(),
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_text_unwraps_strings_and_serializes_objects() {
        assert_eq!(as_text(&json!("plain")), "plain");
        assert_eq!(as_text(&json!({"k": 1})), r#"{"k":1}"#);
    }

    #[test]
    fn title_and_body_requires_both_fields() {
        let ok = title_and_body("issue-create", &json!({"title": "t", "body": "b"})).unwrap();
        assert_eq!(ok, ("t".to_string(), "b".to_string()));

        let err = title_and_body("issue-create", &json!({"title": "t"})).unwrap_err();
        assert!(matches!(err, BotError::UnexpectedResponse { .. }));
    }

    #[test]
    fn merge_summary_preserves_author_body() {
        let merged = merge_summary(Some("Original description."), "The summary.");
        assert!(merged.starts_with(SUMMARY_MARKER));
        assert!(merged.contains("The summary."));
        assert!(merged.ends_with("Original description."));
    }

    #[test]
    fn merge_summary_replaces_previous_generated_section() {
        let first = merge_summary(Some("Author text."), "First summary.");
        let second = merge_summary(Some(&first), "Second summary.");
        assert!(second.contains("Second summary."));
        assert!(!second.contains("First summary."));
        assert!(second.ends_with("Author text."));
    }

    #[test]
    fn merge_summary_without_original_body() {
        let merged = merge_summary(None, "Only summary.");
        assert!(merged.contains("Only summary."));
        assert!(!merged.contains("---"));
    }
}
