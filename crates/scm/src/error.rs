//! Classified GitHub API failures.

use std::fmt;

use thiserror::Error;

/// Which git-object step failed during a publish sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitStage {
    Ref,
    Blob,
    Tree,
    Commit,
}

impl fmt::Display for GitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ref => "ref",
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
        };
        f.write_str(name)
    }
}

/// GitHub API failure, matched by variant rather than message text.
#[derive(Debug, Error)]
pub enum ScmError {
    /// The transport layer could not complete the request.
    #[error("transport error: {0}")]
    Transport(String),

    /// A non-2xx response from a repository-level endpoint.
    #[error("GitHub API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// A non-2xx response from a git data endpoint, tagged with the stage.
    #[error("git {stage} operation failed: {status} - {message}")]
    Git {
        stage: GitStage,
        status: u16,
        message: String,
    },

    /// The response did not have the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ScmError {
    pub(crate) fn transport(error: reqwest::Error) -> Self {
        Self::Transport(error.without_url().to_string())
    }

    /// Status code of the underlying API response, when there is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::Git { status, .. } => Some(*status),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }
}
