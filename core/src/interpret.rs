//! Translation of a raw transport result into a typed outcome.

use crate::error::RequestError;
use crate::outcome::{Entity, Outcome, ResponseInfo};
use crate::transport::TransportResult;

const NOT_MODIFIED: u16 = 304;

/// Lookup of previously known data for the resource being requested.
///
/// Consulted only when the server answers 304.
pub trait LatestData: Send + Sync {
    fn latest_data(&self) -> Option<Entity>;
}

impl<F> LatestData for F
where
    F: Fn() -> Option<Entity> + Send + Sync,
{
    fn latest_data(&self) -> Option<Entity> {
        self()
    }
}

/// No previously known data, ever.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLatestData;

impl LatestData for NoLatestData {
    fn latest_data(&self) -> Option<Entity> {
        None
    }
}

/// Classify a transport result. The checks run in a fixed order: errors and
/// 4xx/5xx first, then 304, then any body, then the empty fallback.
pub fn interpret(result: TransportResult, latest: &dyn LatestData) -> ResponseInfo {
    let TransportResult { response, error } = result;
    let status = response.as_ref().map(|r| r.status);

    if error.is_some() || status.is_some_and(|s| s >= 400) {
        let body = response.and_then(|r| r.body);
        return ResponseInfo::failure(RequestError::from_exchange(status, body, error));
    }

    if status == Some(NOT_MODIFIED) {
        return match latest.latest_data() {
            Some(entity) => ResponseInfo::not_modified(entity),
            None => ResponseInfo::failure(RequestError::no_data_for_not_modified()),
        };
    }

    match response {
        Some(mut raw) => match raw.body.take() {
            Some(content) => {
                ResponseInfo::new_data(Outcome::Success(Entity::from_response(raw, content)))
            }
            None => ResponseInfo::failure(RequestError::empty_response()),
        },
        None => ResponseInfo::failure(RequestError::empty_response()),
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::error::{ErrorKind, TransportError, TransportErrorKind};
    use crate::http::RawResponse;

    fn ok(status: u16, body: &'static [u8]) -> TransportResult {
        TransportResult::response(RawResponse::new(status, Some(Bytes::from_static(body))))
    }

    fn cached() -> Option<Entity> {
        Some(Entity::new(&b"cached"[..]))
    }

    #[test]
    fn body_becomes_new_success() {
        let info = interpret(ok(200, b"{\"id\":1}"), &NoLatestData);
        assert!(info.is_new);
        let entity = info.outcome.entity().unwrap();
        assert_eq!(&entity.content[..], b"{\"id\":1}");
        assert_eq!(entity.status, 200);
    }

    #[test]
    fn response_headers_travel_with_the_entity() {
        let raw =
            RawResponse::new(200, Some(Bytes::from_static(b"x"))).with_header("ETag", "\"v2\"");
        let info = interpret(TransportResult::response(raw), &NoLatestData);
        assert_eq!(info.outcome.entity().unwrap().etag(), Some("\"v2\""));
    }

    #[test]
    fn empty_body_is_still_a_body() {
        let info = interpret(ok(204, b""), &NoLatestData);
        assert!(info.outcome.is_success());
    }

    #[test]
    fn not_modified_uses_latest_data() {
        let info = interpret(ok(304, b""), &cached);
        assert!(!info.is_new);
        assert_eq!(&info.outcome.entity().unwrap().content[..], b"cached");
    }

    #[test]
    fn not_modified_without_data_fails() {
        let info = interpret(ok(304, b""), &NoLatestData);
        assert!(info.is_new);
        assert_eq!(info.outcome.error().unwrap().kind, ErrorKind::NoDataForNotModified);
    }

    #[test]
    fn error_status_fails_with_diagnostics() {
        let info = interpret(ok(500, b"boom"), &cached);
        let err = info.outcome.error().unwrap();
        assert_eq!(err.kind, ErrorKind::HttpStatus);
        assert_eq!(err.status, Some(500));
        assert_eq!(err.body.as_deref(), Some(&b"boom"[..]));
        assert!(info.is_new);
    }

    #[test]
    fn transport_error_precedes_not_modified() {
        let mut result = ok(304, b"");
        result.error = Some(TransportError::new(TransportErrorKind::Io, "reset"));
        let info = interpret(result, &cached);
        assert_eq!(info.outcome.error().unwrap().kind, ErrorKind::Transport);
    }

    #[test]
    fn missing_body_and_error_is_empty_response() {
        let info = interpret(TransportResult::response(RawResponse::new(200, None)), &NoLatestData);
        assert_eq!(info.outcome.error().unwrap().kind, ErrorKind::EmptyResponse);

        let info = interpret(TransportResult::default(), &NoLatestData);
        assert_eq!(info.outcome.error().unwrap().kind, ErrorKind::EmptyResponse);
    }
}
