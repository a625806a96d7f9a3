use thiserror::Error;

/// How a backend call failed. Drives the retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    MissingCredential,
    InvalidCredential,
    PermissionDenied,
    ModelNotFound,
    RateLimited,
    Connection,
    MalformedResponse,
    Unexpected,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_key",
            Self::InvalidCredential => "invalid_key",
            Self::PermissionDenied => "permission_denied",
            Self::ModelNotFound => "model_not_found",
            Self::RateLimited => "rate_limit",
            Self::Connection => "connection_error",
            Self::MalformedResponse => "invalid_response",
            Self::Unexpected => "unexpected_error",
        }
    }

    /// Rate limits back off exponentially, the other transient kinds use a
    /// fixed delay, everything else fails at once.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Connection | Self::Unexpected)
    }

    /// Map an HTTP status to a failure kind.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::InvalidCredential,
            403 => Self::PermissionDenied,
            404 => Self::ModelNotFound,
            429 => Self::RateLimited,
            _ => Self::Unexpected,
        }
    }
}

/// One failed backend call.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{provider} {}: {message}", kind.as_str())]
pub struct BackendError {
    pub provider: &'static str,
    pub kind: FailureKind,
    pub status: Option<u16>,
    pub message: String,
}

impl BackendError {
    pub fn new(provider: &'static str, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind,
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI not configured: {0}")]
    NotConfigured(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl AiError {
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            AiError::Backend(e) => Some(e.kind),
            _ => None,
        }
    }
}
