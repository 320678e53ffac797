//! Shared error type across meterline crates.

use thiserror::Error;

/// Stable error codes, used as the `outcome` label in export statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Invalid configuration or malformed input.
    BadRequest,
    /// Sink unreachable (connect/reset/DNS).
    Transport,
    /// Sink answered with a non-2xx status.
    Status,
    /// Push did not complete within its deadline.
    Timeout,
    /// Payload could not be serialized.
    Encode,
    /// Anything else.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::Transport => "TRANSPORT",
            ErrorCode::Status => "STATUS",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Encode => "ENCODE",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MeterlineError>;

/// Unified error type used by core and agent.
#[derive(Debug, Error)]
pub enum MeterlineError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("sink responded with status {0}")]
    Status(u16),
    #[error("timed out")]
    Timeout,
    #[error("encode: {0}")]
    Encode(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl MeterlineError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            MeterlineError::BadRequest(_) => ErrorCode::BadRequest,
            MeterlineError::Transport(_) => ErrorCode::Transport,
            MeterlineError::Status(_) => ErrorCode::Status,
            MeterlineError::Timeout => ErrorCode::Timeout,
            MeterlineError::Encode(_) => ErrorCode::Encode,
            MeterlineError::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl From<serde_json::Error> for MeterlineError {
    fn from(e: serde_json::Error) -> Self {
        MeterlineError::Encode(e.to_string())
    }
}
