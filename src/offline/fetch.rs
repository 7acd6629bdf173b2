//! Request/response model and the network seam of the offline cache.
//!
//! The manager never talks to the network directly; it goes through a
//! [`Fetcher`]. [`HttpFetcher`] is the production implementation. Tests and
//! embedders supply their own to script outages and count live requests.

use crate::error::SuiteError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::{Origin, Url};

/// How a request was issued; selects the cache policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level document navigation (network-first).
    Navigate,
    /// Same-origin subresource.
    SameOrigin,
    /// Cross-origin subresource fetched with CORS.
    Cors,
    /// Cross-origin subresource fetched without CORS.
    NoCors,
}

/// Who may read a response body, mirroring the fetch response types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response.
    Basic,
    /// Cross-origin response the client may read.
    Cors,
    /// Cross-origin response with a hidden body and status.
    Opaque,
    /// Network error surfaced as a response.
    Error,
}

/// A request routed through the cache manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRequest {
    pub url: Url,
    pub mode: RequestMode,
}

impl CacheRequest {
    pub fn new(url: Url, mode: RequestMode) -> Self {
        Self { url, mode }
    }

    /// A document navigation.
    pub fn navigate(url: Url) -> Self {
        Self::new(url, RequestMode::Navigate)
    }

    /// A subresource request; mode is derived from the URL's origin.
    pub fn asset(url: Url, scope: &Url) -> Self {
        let mode = if url.origin() == scope.origin() {
            RequestMode::SameOrigin
        } else {
            RequestMode::Cors
        };
        Self::new(url, mode)
    }

    /// Resolve `input` (absolute, or relative to `scope`) into a request.
    pub fn parse(input: &str, scope: &Url, mode: RequestMode) -> Result<Self, SuiteError> {
        let url = scope.join(input).map_err(|e| SuiteError::InvalidUrl {
            input: input.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(url, mode))
    }

    /// Cache key: the absolute URL without its fragment.
    pub fn key(&self) -> String {
        cache_key(&self.url)
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}

/// Normalise a URL into the string the cache is keyed by.
pub fn cache_key(url: &Url) -> String {
    let mut u = url.clone();
    u.set_fragment(None);
    u.to_string()
}

/// A response as stored in, or served from, the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub url: String,
    pub status: u16,
    pub response_type: ResponseType,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CachedResponse {
    /// Convenience constructor for a 200 response.
    pub fn ok(url: impl Into<String>, response_type: ResponseType, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            status: 200,
            response_type,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// 2xx status.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Eligible for the cache-first write-back: exactly 200 and readable.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200
            && matches!(self.response_type, ResponseType::Basic | ResponseType::Cors)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The live-network primitive: one attempt, no retries.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Resolve with any HTTP status; fail only when no response arrived.
    async fn fetch(&self, request: &CacheRequest) -> Result<CachedResponse, SuiteError>;
}

/// `reqwest`-backed fetcher.
///
/// Responses from the scope's origin are typed `basic`, everything else
/// `cors` (a native client can always read the body, so nothing is opaque).
pub struct HttpFetcher {
    client: reqwest::Client,
    origin: Origin,
    timeout_secs: Option<u64>,
}

impl HttpFetcher {
    /// `timeout_secs: None` leaves requests unbounded.
    pub fn new(scope: &Url, timeout_secs: Option<u64>) -> Result<Self, SuiteError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("silentsuite/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| SuiteError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            origin: scope.origin(),
            timeout_secs,
        })
    }

    fn response_type_for(&self, url: &Url) -> ResponseType {
        if url.origin() == self.origin {
            ResponseType::Basic
        } else {
            ResponseType::Cors
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &CacheRequest) -> Result<CachedResponse, SuiteError> {
        let url = request.url.as_str();
        debug!("GET {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                SuiteError::NetworkTimeout {
                    url: url.to_string(),
                    secs: self.timeout_secs.unwrap_or_default(),
                }
            } else {
                SuiteError::Network {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();

        let body = response.bytes().await.map_err(|e| SuiteError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(CachedResponse {
            url: cache_key(&request.url),
            status,
            response_type: self.response_type_for(&request.url),
            headers,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> Url {
        Url::parse("https://tools.example/suite/").unwrap()
    }

    #[test]
    fn key_strips_fragment_keeps_query() {
        let r = CacheRequest::parse("./index.html?v=2#top", &scope(), RequestMode::Navigate).unwrap();
        assert_eq!(r.key(), "https://tools.example/suite/index.html?v=2");
    }

    #[test]
    fn asset_mode_follows_origin() {
        let same = CacheRequest::asset(scope().join("style.css").unwrap(), &scope());
        assert_eq!(same.mode, RequestMode::SameOrigin);
        let cross = CacheRequest::asset(
            Url::parse("https://cdn.example/lib.js").unwrap(),
            &scope(),
        );
        assert_eq!(cross.mode, RequestMode::Cors);
    }

    #[test]
    fn cacheability_rules() {
        let mut r = CachedResponse::ok("u", ResponseType::Basic, b"x".to_vec());
        assert!(r.is_cacheable());
        r.response_type = ResponseType::Cors;
        assert!(r.is_cacheable());
        r.response_type = ResponseType::Opaque;
        assert!(!r.is_cacheable());
        r.response_type = ResponseType::Basic;
        r.status = 206;
        assert!(r.is_ok());
        assert!(!r.is_cacheable());
        r.status = 404;
        assert!(!r.is_ok());
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut r = CachedResponse::ok("u", ResponseType::Basic, Vec::new());
        r.headers.push(("Content-Type".into(), "text/css".into()));
        assert_eq!(r.header("content-type"), Some("text/css"));
        assert_eq!(r.header("etag"), None);
    }

    #[test]
    fn http_fetcher_types_by_origin() {
        let f = HttpFetcher::new(&scope(), Some(5)).unwrap();
        assert_eq!(
            f.response_type_for(&scope().join("a.js").unwrap()),
            ResponseType::Basic
        );
        assert_eq!(
            f.response_type_for(&Url::parse("https://cdn.example/a.js").unwrap()),
            ResponseType::Cors
        );
    }
}
