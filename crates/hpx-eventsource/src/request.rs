//! Outbound request construction.
//!
//! The [`EventSource`](crate::EventSource) asks its [`RequestFactory`] for a
//! fresh request on every connection attempt and then overwrites the
//! `Last-Event-ID` header on it, so factories should not rely on setting that
//! header themselves.

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, Request, Uri, header};

use crate::error::{EventSourceError, EventSourceResult};

/// Produces the request used for each connection attempt.
///
/// Implemented for any `Fn() -> http::Request<Bytes>` closure, which is the
/// place to add authentication or other per-attempt headers.
pub trait RequestFactory: Send + Sync + 'static {
    /// Build a new request.
    fn create_request(&self) -> Request<Bytes>;
}

impl<F> RequestFactory for F
where
    F: Fn() -> Request<Bytes> + Send + Sync + 'static,
{
    fn create_request(&self) -> Request<Bytes> {
        self()
    }
}

/// A static request description, cloned into every connection attempt.
///
/// Adds `Accept: text/event-stream` and `Cache-Control: no-cache` unless the
/// caller supplied those headers.
#[derive(Clone, Debug)]
pub struct RequestTemplate {
    /// Event stream endpoint.
    pub uri: Uri,
    /// HTTP method (usually GET, some APIs use POST).
    pub method: Method,
    /// Additional headers sent with every attempt.
    pub headers: HeaderMap,
    /// Optional request body (for POST-based streams).
    pub body: Option<Bytes>,
}

impl RequestTemplate {
    /// Create a GET template for `uri`.
    #[must_use]
    pub fn new(uri: Uri) -> Self {
        Self {
            uri,
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Parse `url` and create a GET template for it.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL is malformed or not absolute.
    pub fn parse(url: &str) -> EventSourceResult<Self> {
        let uri = url
            .parse::<Uri>()
            .map_err(|e| EventSourceError::config(format!("Invalid URL {url:?}: {e}")))?;
        let template = Self::new(uri);
        template.validate().map_err(EventSourceError::config)?;
        Ok(template)
    }

    /// Set the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Replace the additional headers.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Validate the template.
    ///
    /// # Errors
    ///
    /// Returns an error message string if the URI is not absolute.
    pub fn validate(&self) -> Result<(), String> {
        if self.uri.scheme().is_none() {
            return Err("URL must include a scheme".to_string());
        }
        if self.uri.authority().is_none() {
            return Err("URL must include a host".to_string());
        }
        Ok(())
    }
}

impl RequestFactory for RequestTemplate {
    fn create_request(&self) -> Request<Bytes> {
        let mut request = Request::new(self.body.clone().unwrap_or_default());
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.uri.clone();

        let headers = request.headers_mut();
        headers.clone_from(&self.headers);
        headers
            .entry(header::ACCEPT)
            .or_insert(HeaderValue::from_static("text/event-stream"));
        headers
            .entry(header::CACHE_CONTROL)
            .or_insert(HeaderValue::from_static("no-cache"));

        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_defaults() {
        let template = RequestTemplate::parse("http://example.com/events").expect("valid url");
        let request = template.create_request();

        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.uri(), "http://example.com/events");
        assert_eq!(request.headers()[header::ACCEPT], "text/event-stream");
        assert_eq!(request.headers()[header::CACHE_CONTROL], "no-cache");
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_template_keeps_caller_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert("x-api-key", HeaderValue::from_static("test-key"));

        let request = RequestTemplate::parse("https://example.com/stream")
            .expect("valid url")
            .method(Method::POST)
            .headers(headers)
            .body("subscribe")
            .create_request();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.headers()[header::ACCEPT], "*/*");
        assert_eq!(request.headers()["x-api-key"], "test-key");
        assert_eq!(request.body(), &Bytes::from_static(b"subscribe"));
    }

    #[test]
    fn test_parse_rejects_relative_url() {
        let err = RequestTemplate::parse("/events").expect_err("relative url");
        assert!(matches!(err, EventSourceError::Config { .. }));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(RequestTemplate::parse("http://exa mple.com").is_err());
    }

    #[test]
    fn test_closure_factory() {
        let factory = || {
            Request::builder()
                .uri("http://example.com/events")
                .header("authorization", "Bearer token")
                .body(Bytes::new())
                .expect("valid request")
        };

        let request = factory.create_request();
        assert_eq!(request.headers()["authorization"], "Bearer token");
    }
}
