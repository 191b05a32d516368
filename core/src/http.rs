//! Plain-data descriptions of an HTTP exchange.
//!
//! # Design
//! The engine never touches sockets. It hands an `HttpRequest` to a
//! `TransportProvider` and receives a `RawResponse` back through the
//! transport's completion callback. Both types are owned data so a transport
//! can move them across threads freely.

use std::fmt;

use bytes::Bytes;
use serde::Serialize;

use crate::error::RequestError;

/// HTTP method for a request. Used only to label and route the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl RequestMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
            RequestMethod::Put => "PUT",
            RequestMethod::Patch => "PATCH",
            RequestMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// Header names are stored as given; transports decide how to encode them.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: RequestMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn new(method: RequestMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Serialize `input` as the JSON body and set the content type.
    pub fn with_json<T: Serialize + ?Sized>(mut self, input: &T) -> Result<Self, RequestError> {
        let body =
            serde_json::to_vec(input).map_err(|e| RequestError::serialization(e.to_string()))?;
        self.headers.push(("content-type".to_string(), "application/json".to_string()));
        self.body = Some(Bytes::from(body));
        Ok(self)
    }

    /// Human-readable label used in logs, e.g. `GET http://host/items`.
    pub fn description(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

/// What a transport observed from the server.
///
/// `body` is `None` when the transport received no body at all, which is
/// distinct from an empty body.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl RawResponse {
    pub fn new(status: u16, body: Option<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Case-insensitive header lookup shared by responses and entities.
pub(crate) fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_labels_are_uppercase() {
        assert_eq!(RequestMethod::Patch.to_string(), "PATCH");
        assert_eq!(RequestMethod::Delete.as_str(), "DELETE");
    }

    #[test]
    fn with_json_sets_body_and_content_type() {
        #[derive(Serialize)]
        struct Input {
            title: &'static str,
        }

        let req = HttpRequest::new(RequestMethod::Post, "http://localhost/items")
            .with_json(&Input { title: "Buy milk" })
            .unwrap();
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
        let body: serde_json::Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["title"], "Buy milk");
    }

    #[test]
    fn description_combines_method_and_url() {
        let req = HttpRequest::new(RequestMethod::Get, "http://localhost/items/1");
        assert_eq!(req.description(), "GET http://localhost/items/1");
    }

    #[test]
    fn header_lookup_ignores_case() {
        let headers = vec![("ETag".to_string(), "\"v1\"".to_string())];
        assert_eq!(find_header(&headers, "etag"), Some("\"v1\""));
        assert_eq!(find_header(&headers, "content-type"), None);
    }
}
