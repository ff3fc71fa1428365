//! # PWAKit Router
//!
//! Cache-strategy request routing for the PWAKit offline-worker toolkit.
//!
//! Every intercepted request is classified into one of four routing classes
//! and satisfied by the matching strategy:
//!
//! 1. **Pass-through**: cross-origin or non-HTTPS traffic is never touched
//! 2. **Document**: network-first with cache-then-offline-document fallback
//! 3. **Data API**: network-only, failures propagate unmasked
//! 4. **Static asset**: cache-first, opportunistic dynamic-partition fills
//!
//! The router is a pure function of (request, store, fetcher, config): both
//! the cache store and the network are injected traits, so the whole decision
//! surface is unit-testable without a browser runtime.

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use thiserror::Error;
use url::Url;

use pwakit_cache::{request_key, CacheEntry};

pub mod classify;
pub mod router;

pub use classify::{classify, HostMatcher, RouteClass};
pub use router::{CacheRouter, Routed, RouterConfig};

// ==================== Errors ====================

/// Errors that can occur during request routing.
#[derive(Error, Debug, Clone)]
pub enum RouterError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

// ==================== Requests ====================

/// Request mode, mirroring the fetch API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// A page navigation.
    Navigate,
    SameOrigin,
    #[default]
    NoCors,
    Cors,
}

/// What the request is for, mirroring the fetch API destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestDestination {
    Document,
    Script,
    Style,
    Image,
    Font,
    Manifest,
    Worker,
    /// No specific destination (e.g. programmatic fetch).
    #[default]
    Empty,
}

/// An intercepted request descriptor.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub mode: RequestMode,
    pub destination: RequestDestination,
}

impl FetchRequest {
    /// Create a GET request.
    pub fn get(url: Url) -> Self {
        Self {
            url,
            method: Method::GET,
            headers: HeaderMap::new(),
            mode: RequestMode::NoCors,
            destination: RequestDestination::Empty,
        }
    }

    /// Create a GET request from a URL string.
    pub fn parse(url: &str) -> Result<Self, RouterError> {
        let url = Url::parse(url).map_err(|e| RouterError::InvalidUrl(e.to_string()))?;
        Ok(Self::get(url))
    }

    /// Create a page-navigation request.
    pub fn navigation(url: Url) -> Self {
        let mut request = Self::get(url);
        request.mode = RequestMode::Navigate;
        request.destination = RequestDestination::Document;
        request.headers.insert(
            http::header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml"),
        );
        request
    }

    /// Add a header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the destination.
    pub fn destination(mut self, destination: RequestDestination) -> Self {
        self.destination = destination;
        self
    }

    /// Set the mode.
    pub fn mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    /// Whether the Accept header asks for HTML.
    pub fn accepts_html(&self) -> bool {
        self.headers
            .get(http::header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("text/html"))
            .unwrap_or(false)
    }

    /// Whether this is a document-class request: a navigation, a document
    /// destination, or an Accept header indicating HTML.
    pub fn is_document(&self) -> bool {
        self.mode == RequestMode::Navigate
            || self.destination == RequestDestination::Document
            || self.accepts_html()
    }

    /// The cache key this request is stored under.
    pub fn cache_key(&self) -> String {
        request_key(self.method.as_str(), self.url.as_str())
    }
}

// ==================== Responses ====================

/// Response type, mirroring the fetch API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    /// Same-origin response; headers and body are fully visible.
    #[default]
    Basic,
    /// Cross-origin response passed CORS checks.
    Cors,
    /// Cross-origin no-cors response; body is not inspectable.
    Opaque,
}

/// A response produced by the router, either live or from cache.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub response_type: ResponseType,
    /// Whether this response was served from a cache partition.
    pub from_cache: bool,
}

impl FetchResponse {
    /// Create a same-origin 200 response.
    pub fn ok(body: Bytes) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body,
            response_type: ResponseType::Basic,
            from_cache: false,
        }
    }

    /// Check if the status is 2xx.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Whether the static-asset strategy may cache this response: exactly
    /// status 200 and same-origin. Opaque and error responses are returned
    /// to the caller but never stored.
    pub fn is_cacheable(&self) -> bool {
        self.status == StatusCode::OK && self.response_type == ResponseType::Basic
    }

    /// Convert into a cache entry keyed by the originating request.
    pub fn to_entry(&self, request: &FetchRequest) -> CacheEntry {
        let mut entry = CacheEntry::new(
            request.url.as_str(),
            self.status.as_u16(),
            self.body.to_vec(),
        );
        entry.method = request.method.as_str().to_string();
        for (name, value) in self.headers.iter() {
            if let Ok(v) = value.to_str() {
                entry.headers.insert(name.to_string(), v.to_string());
            }
        }
        entry
    }

    /// Rebuild a response from a cache entry.
    pub fn from_entry(entry: CacheEntry) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in entry.headers.iter() {
            if let (Ok(n), Ok(v)) = (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                headers.insert(n, v);
            }
        }

        Self {
            status: StatusCode::from_u16(entry.status).unwrap_or(StatusCode::OK),
            headers,
            body: Bytes::from(entry.body),
            response_type: ResponseType::Basic,
            from_cache: true,
        }
    }
}

// ==================== Fetcher ====================

/// Network abstraction the router fetches through.
///
/// The router sets no timeouts of its own; implementations own network
/// timing. A returned error is a resolved network failure, not a partial
/// response.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, RouterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let url = Url::parse("https://parish.example/app.js").unwrap();
        let request = FetchRequest::get(url.clone())
            .destination(RequestDestination::Script)
            .header(
                http::header::ACCEPT,
                HeaderValue::from_static("application/javascript"),
            );

        assert_eq!(request.url, url);
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.destination, RequestDestination::Script);
        assert!(!request.is_document());
    }

    #[test]
    fn test_navigation_request_is_document() {
        let url = Url::parse("https://parish.example/dashboard").unwrap();
        let request = FetchRequest::navigation(url);

        assert_eq!(request.mode, RequestMode::Navigate);
        assert!(request.accepts_html());
        assert!(request.is_document());
    }

    #[test]
    fn test_accept_header_marks_document() {
        let url = Url::parse("https://parish.example/page").unwrap();
        let request = FetchRequest::get(url).header(
            http::header::ACCEPT,
            HeaderValue::from_static("text/html,*/*;q=0.8"),
        );

        assert!(request.is_document());
    }

    #[test]
    fn test_parse_rejects_bad_url() {
        assert!(matches!(
            FetchRequest::parse("not a url"),
            Err(RouterError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_cache_key_round_trip() {
        let request = FetchRequest::parse("https://parish.example/logo.png").unwrap();
        assert_eq!(request.cache_key(), "GET https://parish.example/logo.png");

        let response = FetchResponse::ok(Bytes::from_static(b"png"));
        let entry = response.to_entry(&request);
        assert_eq!(entry.key(), request.cache_key());

        let restored = FetchResponse::from_entry(entry);
        assert_eq!(restored.status, StatusCode::OK);
        assert_eq!(restored.body, Bytes::from_static(b"png"));
        assert!(restored.from_cache);
    }

    #[test]
    fn test_cacheable_responses() {
        let ok = FetchResponse::ok(Bytes::new());
        assert!(ok.is_cacheable());

        let mut not_found = FetchResponse::ok(Bytes::new());
        not_found.status = StatusCode::NOT_FOUND;
        assert!(!not_found.is_cacheable());

        let mut opaque = FetchResponse::ok(Bytes::new());
        opaque.response_type = ResponseType::Opaque;
        assert!(!opaque.is_cacheable());
    }

    #[test]
    fn test_entry_preserves_headers() {
        let request = FetchRequest::parse("https://parish.example/style.css").unwrap();
        let mut response = FetchResponse::ok(Bytes::from_static(b"body{}"));
        response.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("text/css"),
        );

        let entry = response.to_entry(&request);
        assert_eq!(entry.headers.get("content-type").map(String::as_str), Some("text/css"));

        let restored = FetchResponse::from_entry(entry);
        assert_eq!(
            restored.headers.get("content-type").and_then(|v| v.to_str().ok()),
            Some("text/css")
        );
    }
}
