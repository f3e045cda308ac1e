use thiserror::Error;

/// Terminal failure of a Generation Port call, after any adapter retries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationFailure {
    #[error("generation timed out")]
    Timeout,
    #[error("generation transport error: {0}")]
    Transport(String),
    #[error("generation upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("generation request rejected: {0}")]
    Rejected(String),
    #[error("structured output did not match `{shape}`: {detail}")]
    InvalidStructuredOutput { shape: String, detail: String },
}

impl GenerationFailure {
    pub fn invalid_output(shape: &str, detail: impl Into<String>) -> Self {
        Self::InvalidStructuredOutput {
            shape: shape.to_string(),
            detail: detail.into(),
        }
    }

    /// Transport hiccups, timeouts, throttling and 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport(_) => true,
            Self::Upstream { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            Self::Rejected(_) | Self::InvalidStructuredOutput { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchFailure {
    #[error("search transport error: {0}")]
    Transport(String),
    #[error("search upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("search response could not be decoded: {0}")]
    Decode(String),
}

impl SearchFailure {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Upstream { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) => false,
        }
    }
}

/// Fatal orchestration errors. Display text is safe to show to end users;
/// the underlying port failure is kept as the source.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("the safety check is temporarily unavailable, please try again shortly")]
    SafetyCheckUnavailable(#[source] GenerationFailure),
    #[error("the request could not be understood right now, please try again shortly")]
    ClassificationUnavailable(#[source] GenerationFailure),
}

impl WorkflowError {
    pub fn stage(&self) -> &'static str {
        match self {
            Self::SafetyCheckUnavailable(_) => "guardrail",
            Self::ClassificationUnavailable(_) => "classifier",
        }
    }

    pub fn failure(&self) -> &GenerationFailure {
        match self {
            Self::SafetyCheckUnavailable(failure) | Self::ClassificationUnavailable(failure) => {
                failure
            }
        }
    }
}
