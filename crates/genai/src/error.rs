/// Errors surfaced by the generation backend.
///
/// Callers branch on the category: transient failures are retryable,
/// content-policy rejections are not, and malformed output is handled by
/// the caller's fallback path rather than retried.
#[derive(Debug, thiserror::Error)]
pub enum GenAiError {
    /// Network-level failure: connect, timeout, TLS.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status from the backend API.
    #[error("Backend API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The backend refused the prompt on content-policy grounds.
    #[error("Content policy rejection: {0}")]
    ContentPolicy(String),

    /// A 2xx response whose body did not contain usable output.
    #[error("Malformed backend response: {0}")]
    Malformed(String),
}

impl GenAiError {
    /// Whether retrying the same request may succeed.
    ///
    /// Transport failures, rate limiting (429) and server errors (5xx) are
    /// transient; policy rejections and malformed bodies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            GenAiError::Transport(_) => true,
            GenAiError::Api { status, .. } => *status == 429 || *status >= 500,
            GenAiError::ContentPolicy(_) | GenAiError::Malformed(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(GenAiError::Transport("timeout".into()).is_transient());
        assert!(GenAiError::Api {
            status: 429,
            message: "rate limited".into()
        }
        .is_transient());
        assert!(GenAiError::Api {
            status: 503,
            message: "overloaded".into()
        }
        .is_transient());
        assert!(!GenAiError::Api {
            status: 400,
            message: "bad request".into()
        }
        .is_transient());
        assert!(!GenAiError::ContentPolicy("blocked".into()).is_transient());
        assert!(!GenAiError::Malformed("empty".into()).is_transient());
    }
}
