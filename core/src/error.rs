//! Error types carried inside a failed `Outcome`.
//!
//! # Design
//! Errors never cross the asynchronous boundary as `Err` values; every
//! failure reaches listeners as `Outcome::Failure(RequestError)`. The
//! `ErrorKind` tag lets callers tell a user-initiated cancellation from a
//! genuine failure without matching on message text. Transport failures are
//! reduced to an opaque `TransportErrorKind` plus a free-form detail so the
//! core stays independent of any particular networking library.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

/// Classification of a request failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    /// The transport could not complete the exchange.
    #[error("transport")]
    Transport,

    /// The server answered with a status of 400 or above.
    #[error("http status")]
    HttpStatus,

    /// A 304 arrived but nothing was known about the resource.
    #[error("no data for not-modified response")]
    NoDataForNotModified,

    /// The transport reported neither a body nor an error.
    #[error("empty response")]
    EmptyResponse,

    /// `cancel()` finalized the request before a response arrived.
    #[error("cancelled")]
    Cancelled,

    /// The request was rejected before reaching the transport.
    #[error("invalid request")]
    InvalidRequest,

    /// The request body could not be encoded.
    #[error("serialization")]
    Serialization,

    /// The response transformer panicked.
    #[error("transform failed")]
    TransformFailed,
}

/// Coarse category of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum TransportErrorKind {
    #[error("connection failed")]
    Connect,
    #[error("tls failure")]
    Tls,
    #[error("timed out")]
    Timeout,
    #[error("i/o error")]
    Io,
    #[error("transport error")]
    Other,
}

/// Failure reported by a `TransportHandle`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub detail: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// The error half of an `Outcome`.
///
/// `status` and `body` hold whatever the server sent, for diagnostics only.
#[derive(Debug, Clone, Error)]
#[error("{user_message}")]
pub struct RequestError {
    pub user_message: String,
    pub kind: ErrorKind,
    pub status: Option<u16>,
    pub body: Option<Bytes>,
    #[source]
    pub cause: Option<Arc<TransportError>>,
}

impl RequestError {
    pub fn new(kind: ErrorKind, user_message: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            kind,
            status: None,
            body: None,
            cause: None,
        }
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "Request cancelled")
    }

    pub fn no_data_for_not_modified() -> Self {
        Self::new(
            ErrorKind::NoDataForNotModified,
            "No data available for not-modified response",
        )
    }

    pub fn empty_response() -> Self {
        Self::new(ErrorKind::EmptyResponse, "Empty response")
    }

    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, reason)
    }

    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, format!("serialization failed: {}", reason.into()))
    }

    pub fn transform_failed() -> Self {
        Self::new(ErrorKind::TransformFailed, "Response transformation failed")
    }

    /// Build the failure for a transport error and/or an error status.
    ///
    /// The transport error, when present, supplies the message; otherwise
    /// the canonical reason phrase of the status does.
    pub fn from_exchange(
        status: Option<u16>,
        body: Option<Bytes>,
        cause: Option<TransportError>,
    ) -> Self {
        let (kind, user_message) = match (&cause, status) {
            (Some(err), _) => (ErrorKind::Transport, err.to_string()),
            (None, Some(code)) => (ErrorKind::HttpStatus, status_message(code)),
            (None, None) => (ErrorKind::Transport, "Request failed".to_string()),
        };
        Self {
            user_message,
            kind,
            status,
            body,
            cause: cause.map(Arc::new),
        }
    }

    pub fn is_cancellation(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}

fn status_message(code: u16) -> String {
    http::StatusCode::from_u16(code)
        .ok()
        .and_then(|status| status.canonical_reason())
        .map(str::to_lowercase)
        .unwrap_or_else(|| format!("HTTP {code}"))
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn status_errors_use_reason_phrase() {
        let err = RequestError::from_exchange(Some(404), Some(Bytes::from_static(b"gone")), None);
        assert_eq!(err.kind, ErrorKind::HttpStatus);
        assert_eq!(err.user_message, "not found");
        assert_eq!(err.status, Some(404));
        assert_eq!(err.body.as_deref(), Some(&b"gone"[..]));
        assert!(err.source().is_none());
    }

    #[test]
    fn unknown_status_falls_back_to_code() {
        let err = RequestError::from_exchange(Some(599), None, None);
        assert_eq!(err.user_message, "HTTP 599");
    }

    #[test]
    fn transport_error_wins_over_status() {
        let cause = TransportError::new(TransportErrorKind::Tls, "bad certificate");
        let err = RequestError::from_exchange(Some(500), None, Some(cause.clone()));
        assert_eq!(err.kind, ErrorKind::Transport);
        assert_eq!(err.user_message, "tls failure: bad certificate");
        assert_eq!(err.cause.as_deref(), Some(&cause));
        assert!(err.source().is_some());
    }

    #[test]
    fn cancellation_has_its_own_kind() {
        let err = RequestError::cancelled();
        assert!(err.is_cancellation());
        assert_eq!(err.to_string(), "Request cancelled");
        assert!(!RequestError::empty_response().is_cancellation());
    }
}
