//! Error types shared across quizkit.
//!
//! `ProviderError` lives here rather than in `quizkit-providers` so the
//! question supply can downcast and classify failures for retry decisions
//! without string matching.

use thiserror::Error;

/// Errors that can occur when talking to a remote generation provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (missing or invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProviderError::AuthenticationFailed(_) | ProviderError::ModelNotFound(_)
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

/// A provider answered, but the content could not be turned into a question
/// or feedback.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("the model returned no content")]
    EmptyResponse,

    #[error("failed to parse generated JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] ModelError),
}

/// Violations of the question invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("question has no options")]
    NoOptions,

    #[error("answer '{answer}' is not one of the options")]
    AnswerNotInOptions { answer: String },

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

/// Rejected session operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("no questions were available for {category} / {difficulty}")]
    NoQuestions {
        category: String,
        difficulty: String,
    },

    #[error("question supply failed: {0}")]
    Supply(String),

    #[error("'{0}' is not one of the options")]
    UnknownOption(String),
}
