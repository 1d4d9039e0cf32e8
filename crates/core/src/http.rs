//! Request and response types passed between the page, the offline cache
//! controller, the cache store, and the network.

use bytes::Bytes;
use url::Url;

/// What kind of resource a request is for.
///
/// Only `Document` (a full-page navigation) is eligible for the offline
/// fallback page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destination {
    Document,
    Asset,
    #[default]
    Empty,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Document => "document",
            Destination::Asset => "asset",
            Destination::Empty => "",
        }
    }
}

/// Response tainting, as seen by the page.
///
/// Only `Basic` (same-origin) responses are written to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Basic,
    Cors,
    Opaque,
    Error,
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Basic => "basic",
            ResponseKind::Cors => "cors",
            ResponseKind::Opaque => "opaque",
            ResponseKind::Error => "error",
        }
    }

    /// Parse a stored kind; unknown values decode as `Opaque`.
    pub fn parse(s: &str) -> Self {
        match s {
            "basic" => ResponseKind::Basic,
            "cors" => ResponseKind::Cors,
            "error" => ResponseKind::Error,
            _ => ResponseKind::Opaque,
        }
    }
}

/// An outgoing request from a page.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub destination: Destination,
}

impl Request {
    /// A GET for a sub-resource.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url, destination: Destination::Empty }
    }

    /// A GET for a full-page navigation.
    pub fn navigate(url: Url) -> Self {
        Self { method: "GET".into(), url, destination: Destination::Document }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    pub fn is_navigation(&self) -> bool {
        self.destination == Destination::Document
    }

    /// Normalized method: uppercase.
    pub fn normalized_method(&self) -> String {
        self.method.to_ascii_uppercase()
    }

    /// URL used for cache matching: the request URL without its fragment.
    pub fn cache_url(&self) -> Url {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url
    }
}

/// A full response: status, headers, and body.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub kind: ResponseKind,
    pub url: Url,
}

impl Response {
    /// Whether the status is in the 2xx range.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Eligible for write-through caching: exactly 200 and same-origin.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.kind == ResponseKind::Basic
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, kind: ResponseKind) -> Response {
        Response {
            status,
            status_text: String::new(),
            headers: vec![("Content-Type".into(), "text/html".into())],
            body: Bytes::from_static(b"<html></html>"),
            kind,
            url: Url::parse("https://example.com/").unwrap(),
        }
    }

    #[test]
    fn test_cacheable_requires_200_and_basic() {
        assert!(response(200, ResponseKind::Basic).is_cacheable());
        assert!(!response(200, ResponseKind::Cors).is_cacheable());
        assert!(!response(204, ResponseKind::Basic).is_cacheable());
        assert!(!response(404, ResponseKind::Basic).is_cacheable());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let r = response(200, ResponseKind::Basic);
        assert_eq!(r.content_type(), Some("text/html"));
        assert_eq!(r.header("CONTENT-TYPE"), Some("text/html"));
        assert_eq!(r.header("etag"), None);
    }

    #[test]
    fn test_cache_url_strips_fragment() {
        let req = Request::get(Url::parse("https://example.com/a?b=1#top").unwrap());
        assert_eq!(req.cache_url().as_str(), "https://example.com/a?b=1");
    }

    #[test]
    fn test_method_checks() {
        let url = Url::parse("https://example.com/").unwrap();
        assert!(Request::get(url.clone()).with_method("get").is_get());
        assert!(!Request::get(url.clone()).with_method("POST").is_get());
        assert_eq!(Request::get(url).with_method("head").normalized_method(), "HEAD");
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(ResponseKind::parse("basic"), ResponseKind::Basic);
        assert_eq!(ResponseKind::parse("bogus"), ResponseKind::Opaque);
    }
}
