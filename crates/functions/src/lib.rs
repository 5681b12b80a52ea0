//! Remote AI function invocation.
//!
//! This crate provides:
//! - A [`RemoteFunction`] trait with two transports: [`GatewayInvoker`]
//!   (API-gateway-backed) and [`DirectInvoker`] (URL-backed)
//! - Classified invocation failures ([`InvokeError`])
//! - A composable retry wrapper with exponential backoff
//! - Concurrent batch invocation with isolated per-request failures

pub mod batch;
pub mod invoke;
pub mod retry;

pub use batch::{invoke_batch, BatchOutcome, InvocationRequest};
pub use invoke::{
    DirectInvoker, Endpoint, GatewayInvoker, InvokeError, InvokeOptions, RemoteFunction,
};
pub use retry::{retry_with_backoff, Retryable, RetryPolicy};

/// Names of the logical remote functions the bot orchestrates.
pub mod names {
    /// Per-file summary of a changed file.
    pub const ANALYZE: &str = "analyze";
    /// Aggregate pull request summary over per-file summaries.
    pub const SUMMARIZE: &str = "summarize";
    /// Inline documentation generation for a file.
    pub const DOCUMENT: &str = "document";
    /// Draft a new issue from a comment.
    pub const ISSUE_CREATE: &str = "issue-create";
    /// Revise an existing issue from a comment.
    pub const ISSUE_UPDATE: &str = "issue-update";

    /// Every function the bot knows about.
    pub const ALL: [&str; 5] = [ANALYZE, SUMMARIZE, DOCUMENT, ISSUE_CREATE, ISSUE_UPDATE];
}
