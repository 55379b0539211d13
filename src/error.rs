use std::{fmt, io};

use reqwest::StatusCode;
use thiserror::Error;

/// Classification of a failed catalog call.
///
/// Adapters map transport failures onto these kinds so the engine never has
/// to look at status codes or error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    RateLimited,
    Conflict,
    NotFound,
    Transient,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::RateLimited => "rate limited",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not found",
            ErrorKind::Transient => "transient",
            ErrorKind::Other => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct CatalogError {
    kind: ErrorKind,
    message: String,
}

impl CatalogError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Other, message)
    }

    /// Maps an HTTP status of a failed response onto an error kind.
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let kind = match status {
            StatusCode::UNAUTHORIZED => ErrorKind::Unauthorized,
            StatusCode::FORBIDDEN => ErrorKind::Forbidden,
            StatusCode::NOT_FOUND => ErrorKind::NotFound,
            StatusCode::CONFLICT => ErrorKind::Conflict,
            StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimited,
            s if s.is_server_error() => ErrorKind::Transient,
            StatusCode::REQUEST_TIMEOUT => ErrorKind::Transient,
            _ => ErrorKind::Other,
        };
        Self::new(kind, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// True for errors that mean the session is no longer valid.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.kind, ErrorKind::Unauthorized | ErrorKind::Forbidden)
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == ErrorKind::Conflict
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return CatalogError::from_status(status, err.to_string());
        }
        if err.is_timeout() || err.is_connect() || err.is_request() {
            return CatalogError::transient(err.to_string());
        }
        CatalogError::other(err.to_string())
    }
}

/// Raised by the batch writer when the destination session stops being
/// authorized. Carries the index of the batch that was being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("destination session expired while writing batch {batch_index}")]
pub struct HeaderExpired {
    pub batch_index: usize,
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint io error: {0}")]
    Io(#[from] io::Error),

    #[error("checkpoint serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    HeaderExpired(#[from] HeaderExpired),

    #[error("destination error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("cannot save progress: {0}")]
    Checkpoint(#[from] CheckpointError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (StatusCode::UNAUTHORIZED, ErrorKind::Unauthorized),
            (StatusCode::FORBIDDEN, ErrorKind::Forbidden),
            (StatusCode::NOT_FOUND, ErrorKind::NotFound),
            (StatusCode::CONFLICT, ErrorKind::Conflict),
            (StatusCode::TOO_MANY_REQUESTS, ErrorKind::RateLimited),
            (StatusCode::BAD_GATEWAY, ErrorKind::Transient),
            (StatusCode::SERVICE_UNAVAILABLE, ErrorKind::Transient),
            (StatusCode::BAD_REQUEST, ErrorKind::Other),
        ];
        for (status, kind) in cases {
            assert_eq!(CatalogError::from_status(status, "x").kind(), kind);
        }
    }

    #[test]
    fn unauthorized_class_includes_forbidden() {
        assert!(CatalogError::from_status(StatusCode::FORBIDDEN, "").is_unauthorized());
        assert!(CatalogError::unauthorized("").is_unauthorized());
        assert!(!CatalogError::conflict("").is_unauthorized());
        assert!(!CatalogError::transient("").is_unauthorized());
    }
}
