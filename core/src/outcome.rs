//! The terminal result of a request.

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::RequestError;
use crate::http::{find_header, RawResponse};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Response payload together with the metadata it arrived with.
///
/// Headers and status are opaque to the engine; they are kept so that
/// transformers and listeners can inspect them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub content: Bytes,
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl Entity {
    pub fn new(content: impl Into<Bytes>) -> Self {
        Self {
            content: content.into(),
            status: 200,
            headers: Vec::new(),
        }
    }

    pub(crate) fn from_response(response: RawResponse, content: Bytes) -> Self {
        Self {
            content,
            status: response.status,
            headers: response.headers,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> &str {
        self.header("content-type").unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    pub fn etag(&self) -> Option<&str> {
        self.header("etag")
    }

    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.content)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.content)
    }
}

/// Success or failure, and nothing else.
#[derive(Debug, Clone)]
pub enum Outcome {
    Success(Entity),
    Failure(RequestError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn entity(&self) -> Option<&Entity> {
        match self {
            Outcome::Success(entity) => Some(entity),
            Outcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&RequestError> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(err) => Some(err),
        }
    }
}

/// An outcome plus whether it carries freshly fetched data.
///
/// `is_new` is false only for a success that re-confirms previously known
/// data after a 304. Failures are always new.
#[derive(Debug, Clone)]
pub struct ResponseInfo {
    pub outcome: Outcome,
    pub is_new: bool,
}

impl ResponseInfo {
    pub fn new_data(outcome: Outcome) -> Self {
        Self { outcome, is_new: true }
    }

    pub fn not_modified(entity: Entity) -> Self {
        Self {
            outcome: Outcome::Success(entity),
            is_new: false,
        }
    }

    pub fn failure(error: RequestError) -> Self {
        Self::new_data(Outcome::Failure(error))
    }
}
