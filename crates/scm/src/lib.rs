//! GitHub integration: a typed REST client and the commit publisher.
//!
//! The client covers the narrow surface the bot needs: pull request files,
//! file content, comments, issues, reactions, and the git data API (refs,
//! blobs, trees, commits). The publisher turns generated content into an
//! isolated branch + commit + pull request.

pub mod client;
pub mod error;
pub mod publisher;

pub use client::{
    ChangedFile, Comment, GitHubClient, Issue, PullRequest,
};
pub use error::{GitStage, ScmError};
pub use publisher::{derive_branch_name, CommitPlan, CommitPublisher, PublishOutcome, RepoId};
