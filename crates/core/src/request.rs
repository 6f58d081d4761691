//! Request descriptors and response snapshots.
//!
//! These are the values that flow between the dispatcher, the caching
//! strategies, the network fetcher and the cache stores. Header names are
//! always stored lowercased.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;
use crate::location::{self, UrlError};

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub method: String,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: Option<Vec<u8>>,
}

impl RequestDescriptor {
    /// A GET request for an absolute URL.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url, headers: Vec::new(), body: None }
    }

    /// Build a request from a possibly root-relative URL string.
    pub fn parse(method: &str, url: &str, origin: Option<&Url>) -> Result<Self, Error> {
        let url = location::resolve(url, origin).map_err(|e: UrlError| Error::InvalidUrl(e.to_string()))?;
        Ok(Self { method: method.trim().to_ascii_uppercase(), url, headers: Vec::new(), body: None })
    }

    /// Add a header, replacing any existing value.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        let name = name.to_ascii_lowercase();
        self.headers.retain(|(n, _)| *n != name);
        self.headers.push((name, value.to_string()));
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// Whether the `Accept` header asks for an HTML document.
    ///
    /// A missing header counts as non-HTML.
    pub fn accepts_html(&self) -> bool {
        self.header("accept").is_some_and(|v| v.contains("text/html"))
    }
}

/// Where a response handed back to the page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    OfflinePage,
    Synthesized,
}

/// A response snapshot: status, headers and body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl StoredResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, status_text: reason_phrase(status).to_string(), headers: Vec::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        let name = name.to_ascii_lowercase();
        self.headers.retain(|(n, _)| *n != name);
        self.headers.push((name, value.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// 2xx, the same range `Response.ok` covers.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Header names listed in `Vary`, lowercased.
    pub fn vary(&self) -> Vec<String> {
        self.header("vary")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_ascii_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The synthesized response returned when an HTML navigation has no
    /// network and no cached fallback page.
    pub fn offline() -> Self {
        Self {
            status: 503,
            status_text: "Service Unavailable".into(),
            headers: vec![("content-type".into(), "text/plain".into())],
            body: b"Offline - No network connection".to_vec(),
        }
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_root_relative() {
        let origin = Url::parse("https://dharmaputra.example").unwrap();
        let req = RequestDescriptor::parse("get", "/index.html", Some(&origin)).unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.url.as_str(), "https://dharmaputra.example/index.html");
        assert!(req.is_get());
    }

    #[test]
    fn test_parse_invalid() {
        let result = RequestDescriptor::parse("GET", "/x", None);
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_headers_case_insensitive() {
        let req = RequestDescriptor::get(Url::parse("https://a.example/").unwrap())
            .with_header("Accept", "text/html,application/xhtml+xml")
            .with_header("ACCEPT", "text/html");
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.header("accept"), Some("text/html"));
        assert!(req.accepts_html());
    }

    #[test]
    fn test_accepts_html_missing_header() {
        let req = RequestDescriptor::get(Url::parse("https://a.example/").unwrap());
        assert!(!req.accepts_html());
    }

    #[test]
    fn test_vary_parsing() {
        let resp = StoredResponse::new(200, "x").with_header("Vary", "Accept-Encoding, Accept");
        assert_eq!(resp.vary(), vec!["accept-encoding".to_string(), "accept".to_string()]);
        assert!(StoredResponse::new(200, "x").vary().is_empty());
    }

    #[test]
    fn test_offline_response() {
        let resp = StoredResponse::offline();
        assert_eq!(resp.status, 503);
        assert_eq!(resp.status_text, "Service Unavailable");
        assert_eq!(resp.content_type(), Some("text/plain"));
        assert!(!resp.is_ok());
    }

    #[test]
    fn test_is_ok_range() {
        assert!(StoredResponse::new(204, "").is_ok());
        assert!(!StoredResponse::new(304, "").is_ok());
        assert!(!StoredResponse::new(404, "").is_ok());
    }
}
