//! Base-URL bound factory for requests.
//!
//! # Design
//! `Client` holds a base URL, a transport provider, and the request context,
//! and carries no per-request state. Every method returns a request that has
//! already been started, or a `FailedRequest` when the request cannot be
//! attempted at all (malformed target, unserializable body). Since delivery
//! is always asynchronous, callers register listeners on the returned
//! request without racing its outcome.

use std::sync::Arc;

use serde::Serialize;

use crate::context::RequestContext;
use crate::error::RequestError;
use crate::http::{HttpRequest, RequestMethod};
use crate::interpret::{LatestData, NoLatestData};
use crate::outcome::Entity;
use crate::request::{FailedRequest, NetworkRequest, Request};
use crate::transport::TransportProvider;

/// Entity remembered by the caller and offered back on a 304.
struct Remembered(Option<Entity>);

impl LatestData for Remembered {
    fn latest_data(&self) -> Option<Entity> {
        self.0.clone()
    }
}

#[derive(Clone)]
pub struct Client {
    base_url: String,
    provider: Arc<dyn TransportProvider>,
    context: RequestContext,
}

impl Client {
    pub fn new(
        base_url: &str,
        provider: Arc<dyn TransportProvider>,
        context: RequestContext,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            provider,
            context,
        }
    }

    /// Resolve `path` against the base URL. Absolute `http(s)` URLs pass
    /// through unchanged.
    pub fn url(&self, path: &str) -> Result<String, RequestError> {
        let url = self.target(path);
        if !has_http_scheme(&url) || url.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(RequestError::invalid_request(format!("invalid URL: {url}")));
        }
        Ok(url)
    }

    /// The URL `path` resolves to, valid or not.
    fn target(&self, path: &str) -> String {
        if has_http_scheme(path) {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    pub fn request(&self, method: RequestMethod, path: &str) -> Arc<dyn Request> {
        let built = self.url(path).map(|url| HttpRequest::new(method, url));
        self.launch(method, path, built, Arc::new(NoLatestData))
    }

    pub fn get(&self, path: &str) -> Arc<dyn Request> {
        self.request(RequestMethod::Get, path)
    }

    pub fn send_json<T: Serialize + ?Sized>(
        &self,
        method: RequestMethod,
        path: &str,
        input: &T,
    ) -> Arc<dyn Request> {
        let built = self
            .url(path)
            .and_then(|url| HttpRequest::new(method, url).with_json(input));
        self.launch(method, path, built, Arc::new(NoLatestData))
    }

    /// GET that revalidates `latest`: its ETag goes out as `If-None-Match`
    /// and a 304 answer delivers it back as not-modified.
    pub fn load_if_changed(&self, path: &str, latest: Option<Entity>) -> Arc<dyn Request> {
        let built = self.url(path).map(|url| {
            let request = HttpRequest::new(RequestMethod::Get, url);
            match latest.as_ref().and_then(Entity::etag) {
                Some(etag) => request.with_header("if-none-match", etag),
                None => request,
            }
        });
        self.launch(RequestMethod::Get, path, built, Arc::new(Remembered(latest)))
    }

    fn launch(
        &self,
        method: RequestMethod,
        path: &str,
        built: Result<HttpRequest, RequestError>,
        latest: Arc<dyn LatestData>,
    ) -> Arc<dyn Request> {
        match built {
            Ok(request) => {
                let context = self.context.clone();
                let request = NetworkRequest::new(request, self.provider.as_ref(), context, latest);
                request.start();
                Arc::new(request)
            }
            Err(error) => Arc::new(FailedRequest::new(
                error,
                format!("{method} {}", self.target(path)),
                Arc::clone(&self.context.delivery),
            )),
        }
    }
}

fn has_http_scheme(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
