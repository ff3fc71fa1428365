//! Request classification for cache-strategy routing.

use tracing::trace;
use url::Url;

use crate::FetchRequest;

/// Matches the backend data-service host by substring.
///
/// The pattern is matched against the request host only, so a path that
/// happens to contain the pattern never triggers the data-API class.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    pattern: String,
}

impl HostMatcher {
    /// Create a matcher for a host substring (e.g. `"supabase.co"`).
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    /// Check whether a URL's host matches.
    pub fn matches(&self, url: &Url) -> bool {
        url.host_str().map_or(false, |host| host.contains(&self.pattern))
    }
}

/// The four mutually exclusive routing classes, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Cross-origin or non-HTTPS: the router does not intervene.
    PassThrough,
    /// Navigation/document request: network-first.
    Document,
    /// Backend data-service request: network-only, no caching.
    DataApi,
    /// Everything else (scripts, styles, images, manifests): cache-first.
    StaticAsset,
}

impl RouteClass {
    /// Class name for log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::PassThrough => "pass_through",
            RouteClass::Document => "document",
            RouteClass::DataApi => "data_api",
            RouteClass::StaticAsset => "static_asset",
        }
    }
}

/// Classify a request against the worker origin and the data-service host.
///
/// Ordered, first match wins. Insecure traffic always passes through. A
/// cross-origin request passes through unless it targets the data-service
/// host, in which case it belongs to the network-only class; same-origin
/// requests fall through document → data-API → static-asset.
pub fn classify(request: &FetchRequest, origin: &Url, data_host: &HostMatcher) -> RouteClass {
    let class = classify_inner(request, origin, data_host);
    trace!(url = %request.url, class = class.as_str(), "classified request");
    class
}

fn classify_inner(request: &FetchRequest, origin: &Url, data_host: &HostMatcher) -> RouteClass {
    if request.url.scheme() != "https" {
        return RouteClass::PassThrough;
    }

    if request.url.origin() != origin.origin() {
        if data_host.matches(&request.url) {
            return RouteClass::DataApi;
        }
        return RouteClass::PassThrough;
    }

    if request.is_document() {
        return RouteClass::Document;
    }

    if data_host.matches(&request.url) {
        return RouteClass::DataApi;
    }

    RouteClass::StaticAsset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RequestDestination;

    fn origin() -> Url {
        Url::parse("https://parish.example").unwrap()
    }

    fn data_host() -> HostMatcher {
        HostMatcher::new("data.backend.example")
    }

    fn classify_url(url: &str) -> RouteClass {
        let request = FetchRequest::parse(url).unwrap();
        classify(&request, &origin(), &data_host())
    }

    #[test]
    fn test_non_https_passes_through() {
        assert_eq!(classify_url("http://parish.example/app.js"), RouteClass::PassThrough);
        assert_eq!(classify_url("ftp://parish.example/file"), RouteClass::PassThrough);
    }

    #[test]
    fn test_cross_origin_passes_through() {
        assert_eq!(
            classify_url("https://cdn.thirdparty.example/lib.js"),
            RouteClass::PassThrough
        );
    }

    #[test]
    fn test_data_host_is_network_only() {
        assert_eq!(
            classify_url("https://data.backend.example/rest/v1/requests"),
            RouteClass::DataApi
        );
    }

    #[test]
    fn test_navigation_is_document_class() {
        let request = FetchRequest::navigation(Url::parse("https://parish.example/").unwrap());
        assert_eq!(classify(&request, &origin(), &data_host()), RouteClass::Document);
    }

    #[test]
    fn test_document_destination_without_navigate_mode() {
        let request = FetchRequest::parse("https://parish.example/about.html")
            .unwrap()
            .destination(RequestDestination::Document);
        assert_eq!(classify(&request, &origin(), &data_host()), RouteClass::Document);
    }

    #[test]
    fn test_everything_else_is_static_asset() {
        assert_eq!(
            classify_url("https://parish.example/src/assets/images/logo.png"),
            RouteClass::StaticAsset
        );
        assert_eq!(classify_url("https://parish.example/app.js"), RouteClass::StaticAsset);
        assert_eq!(
            classify_url("https://parish.example/manifest.json"),
            RouteClass::StaticAsset
        );
    }

    #[test]
    fn test_host_matcher_ignores_path() {
        let matcher = HostMatcher::new("data.backend.example");
        let path_only = Url::parse("https://parish.example/data.backend.example").unwrap();
        assert!(!matcher.matches(&path_only));

        let subdomain = Url::parse("https://api.data.backend.example/v1").unwrap();
        assert!(matcher.matches(&subdomain));
    }
}
