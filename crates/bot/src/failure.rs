//! Failure classification and user-facing failure messages.

use functions::InvokeError;
use scm::ScmError;
use store::StorageError;
use thiserror::Error;

/// Any failure an event pipeline can hit.
#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Invoke(#[from] InvokeError),

    #[error(transparent)]
    Scm(#[from] ScmError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The remote function answered, but not in the shape the flow needs.
    #[error("unexpected response from `{function}`: {reason}")]
    UnexpectedResponse { function: String, reason: String },
}

/// Coarse category shown to users so they know what to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    AiService,
    Git,
    Storage,
    Generic,
}

impl BotError {
    #[must_use]
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::Invoke(_) | Self::UnexpectedResponse { .. } => FailureCategory::AiService,
            Self::Scm(ScmError::Git { .. }) => FailureCategory::Git,
            Self::Scm(_) => FailureCategory::Generic,
            Self::Storage(_) => FailureCategory::Storage,
        }
    }
}

/// Render a failure as a comment body for the triggering PR/issue.
#[must_use]
pub fn failure_comment(context: &str, error: &BotError) -> String {
    let headline = match error.category() {
        FailureCategory::AiService => "The AI service is unavailable or returned an error.",
        FailureCategory::Git => "A git conflict interrupted the operation.",
        FailureCategory::Storage => "The content store could not be reached.",
        FailureCategory::Generic => "An unexpected error occurred.",
    };

    format!(
        "⚠️ **SimpleFlow could not finish {context}.**\n\n\
         {headline}\n\n\
         ```\n{error}\n```\n\n\
         Re-trigger the event to retry once the underlying problem is resolved."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use scm::GitStage;

    #[test]
    fn categories_follow_error_source() {
        let timeout = BotError::Invoke(InvokeError::Timeout {
            function: "analyze".to_string(),
            timeout: std::time::Duration::from_secs(30),
        });
        assert_eq!(timeout.category(), FailureCategory::AiService);

        let git = BotError::Scm(ScmError::Git {
            stage: GitStage::Tree,
            status: 409,
            message: "conflict".to_string(),
        });
        assert_eq!(git.category(), FailureCategory::Git);

        let api = BotError::Scm(ScmError::Api {
            status: 500,
            message: "oops".to_string(),
        });
        assert_eq!(api.category(), FailureCategory::Generic);

        let storage = BotError::Storage(StorageError::Transport("connection reset".to_string()));
        assert_eq!(storage.category(), FailureCategory::Storage);
    }

    #[test]
    fn comment_names_the_context_and_category() {
        let error = BotError::Invoke(InvokeError::Network {
            function: "summarize".to_string(),
            message: "dns failure".to_string(),
        });
        let comment = failure_comment("generating the pull request summary", &error);
        assert!(comment.contains("generating the pull request summary"));
        assert!(comment.contains("AI service"));
        assert!(comment.contains("dns failure"));
    }
}
