//! Errors reported by external capabilities.

use std::fmt;
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ExternalServiceError>;

/// Broad class of an external capability failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Credentials or endpoint missing; the call was never made
    Unconfigured,
    /// Transport error or non-success status
    RequestFailed,
    /// The call did not finish in time
    Timeout,
    /// The call succeeded but its payload was unusable
    InvalidResponse,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unconfigured => "unconfigured",
            ErrorKind::RequestFailed => "request_failed",
            ErrorKind::Timeout => "timeout",
            ErrorKind::InvalidResponse => "invalid_response",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single external capability call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct ExternalServiceError {
    pub kind: ErrorKind,
    pub detail: String,
}

impl ExternalServiceError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn unconfigured(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unconfigured, detail)
    }

    pub fn request_failed(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestFailed, detail)
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, detail)
    }

    pub fn invalid_response(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidResponse, detail)
    }
}

impl From<reqwest::Error> for ExternalServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(e.to_string())
        } else if e.is_decode() {
            Self::invalid_response(e.to_string())
        } else {
            Self::request_failed(e.to_string())
        }
    }
}

impl From<std::io::Error> for ExternalServiceError {
    fn from(e: std::io::Error) -> Self {
        Self::request_failed(format!("local IO failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ExternalServiceError::invalid_response("missing candidates");
        assert_eq!(err.to_string(), "invalid_response: missing candidates");
        assert_eq!(err.kind, ErrorKind::InvalidResponse);
    }
}
