use thiserror::Error;

/// Errors surfaced by the AI collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssistError {
    /// Configuration is inconsistent (e.g. gemini provider without an API key).
    #[error("invalid assist config: {0}")]
    InvalidConfig(String),
    /// Connection, DNS or timeout failure talking to the provider.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Provider answered with a non-success status.
    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    /// Provider answered, but not with the JSON shape we asked for.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
    /// Too many recent failures; calls are short-circuited for a while.
    #[error("circuit breaker is open for provider '{0}'")]
    CircuitOpen(String),
    /// A required input was empty.
    #[error("missing input: {0}")]
    MissingInput(&'static str),
}

impl AssistError {
    /// Worth retrying: network trouble, throttling, or a provider-side 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            AssistError::Transport(_) => true,
            AssistError::Http { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for AssistError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AssistError::MalformedResponse(err.to_string())
        } else {
            AssistError::Transport(err.to_string())
        }
    }
}
