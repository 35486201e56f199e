// Request/response types the worker reasons about
use reqwest::{Method, StatusCode, Url};

use crate::error::{Result, WorkerError};

/// What the request is for. Only documents get the offline page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Top-level page navigation
    Document,
    /// Images, scripts, JSON, anything else
    Other,
}

/// An outbound request as the worker sees it
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub destination: Destination,
}

impl Request {
    pub fn new(method: Method, url: &str, destination: Destination) -> Result<Self> {
        Ok(Self {
            method,
            url: parse_url(url)?,
            destination,
        })
    }

    /// GET for a non-document resource
    pub fn get(url: &str) -> Result<Self> {
        Self::new(Method::GET, url, Destination::Other)
    }

    /// GET for a top-level page
    pub fn document(url: &str) -> Result<Self> {
        Self::new(Method::GET, url, Destination::Document)
    }

    pub fn is_document(&self) -> bool {
        self.destination == Destination::Document
    }

    /// Key used for cache lookups
    pub fn cache_key(&self) -> String {
        cache_key(&self.url)
    }
}

/// Where a response came from, browser style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Same-origin response - the only kind worth caching
    Basic,
    /// Cross-origin response with readable body
    Cors,
    /// Cross-origin response we can't look into
    Opaque,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub url: Url,
    pub status: StatusCode,
    pub kind: ResponseKind,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    /// Same-origin response with no headers
    pub fn basic(url: Url, status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url,
            status,
            kind: ResponseKind::Basic,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// 200 from our own origin
    pub fn is_cacheable(&self) -> bool {
        self.status == StatusCode::OK && self.kind == ResponseKind::Basic
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

pub(crate) fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| WorkerError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Resolve `path` against `origin`, leaving absolute URLs alone
pub fn resolve(origin: &Url, path: &str) -> Result<Url> {
    origin.join(path).map_err(|e| WorkerError::InvalidUrl {
        url: path.to_string(),
        reason: e.to_string(),
    })
}

/// Cache key for `url`: the full URL minus any fragment
pub fn cache_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.into()
}

/// Scheme, host and port all match
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_drops_fragment() {
        let request = Request::get("http://localhost:3000/deals?page=2#top").unwrap();
        assert_eq!(request.cache_key(), "http://localhost:3000/deals?page=2");
        assert_eq!(
            cache_key(&Url::parse("http://localhost:3000/deals?page=2").unwrap()),
            request.cache_key()
        );
    }

    #[test]
    fn test_same_origin() {
        let origin = Url::parse("http://localhost:3000").unwrap();
        assert!(same_origin(&origin, &Url::parse("http://localhost:3000/deals?x=1").unwrap()));
        assert!(!same_origin(&origin, &Url::parse("http://localhost:4000/").unwrap()));
        assert!(!same_origin(&origin, &Url::parse("https://localhost:3000/").unwrap()));
        assert!(!same_origin(&origin, &Url::parse("http://cdn.example.com/a.png").unwrap()));
    }

    #[test]
    fn test_resolve() {
        let origin = Url::parse("http://localhost:3000").unwrap();
        assert_eq!(
            resolve(&origin, "/offline.html").unwrap().as_str(),
            "http://localhost:3000/offline.html"
        );
        assert_eq!(
            resolve(&origin, "https://cdn.example.com/x.js").unwrap().as_str(),
            "https://cdn.example.com/x.js"
        );
    }

    #[test]
    fn test_only_basic_200_is_cacheable() {
        let url = Url::parse("http://localhost:3000/a").unwrap();
        assert!(Response::basic(url.clone(), StatusCode::OK, "x").is_cacheable());
        assert!(!Response::basic(url.clone(), StatusCode::NOT_FOUND, "x").is_cacheable());
        assert!(!Response::basic(url.clone(), StatusCode::NO_CONTENT, "").is_cacheable());
        assert!(!Response::basic(url, StatusCode::OK, "x")
            .with_kind(ResponseKind::Cors)
            .is_cacheable());
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let url = Url::parse("http://localhost:3000/a").unwrap();
        let resp = Response::basic(url, StatusCode::OK, "x").with_header("Content-Type", "text/html");
        assert_eq!(resp.header("content-type"), Some("text/html"));
        assert_eq!(resp.header("etag"), None);
    }

    #[test]
    fn test_bad_url_rejected() {
        assert!(matches!(
            Request::get("not a url"),
            Err(WorkerError::InvalidUrl { .. })
        ));
    }
}
