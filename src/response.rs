//! Response envelope
//!
//! Every successful call yields a [`Response`]: the decoded value plus the
//! pagination cursors and rate-limit counters found in the response headers.
//! Building an envelope never fails. Missing or malformed metadata just
//! leaves the corresponding field empty; decoding failures are reported
//! before an envelope exists.

use std::sync::OnceLock;

use http::{HeaderMap, StatusCode};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

/// A pagination cursor taken from a `Link` header
///
/// The id parameters of the link are exposed so callers can build their
/// own query instead of following the URL verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    url: Url,
    max_id: Option<String>,
    min_id: Option<String>,
    since_id: Option<String>,
}

impl PageLink {
    /// Parse a cursor URL, returning `None` if it is not a valid absolute URL
    pub fn parse(url: &str) -> Option<Self> {
        let url = Url::parse(url.trim()).ok()?;
        let mut link = Self {
            url,
            max_id: None,
            min_id: None,
            since_id: None,
        };
        for (name, value) in link.url.query_pairs() {
            match name.as_ref() {
                "max_id" => link.max_id = Some(value.into_owned()),
                "min_id" => link.min_id = Some(value.into_owned()),
                "since_id" => link.since_id = Some(value.into_owned()),
                _ => {}
            }
        }
        Some(link)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn max_id(&self) -> Option<&str> {
        self.max_id.as_deref()
    }

    pub fn min_id(&self) -> Option<&str> {
        self.min_id.as_deref()
    }

    pub fn since_id(&self) -> Option<&str> {
        self.since_id.as_deref()
    }
}

/// Next/previous page cursors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pagination {
    next: Option<PageLink>,
    prev: Option<PageLink>,
}

fn link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"<([^>]*)>\s*;\s*rel="?([^";,]+)"?"#).expect("link header pattern is valid")
    })
}

impl Pagination {
    /// Build from already-extracted cursor URLs
    ///
    /// URLs that fail to parse are dropped.
    pub fn new(next: Option<&str>, prev: Option<&str>) -> Self {
        Self {
            next: next.and_then(PageLink::parse),
            prev: prev.and_then(PageLink::parse),
        }
    }

    /// Parse a `Link` header value
    ///
    /// Recognizes `rel="next"` and `rel="prev"` (or `"previous"`); other
    /// relations and malformed entries are ignored.
    pub fn from_link_header(value: &str) -> Self {
        let mut next = None;
        let mut prev = None;
        for captures in link_pattern().captures_iter(value) {
            let (Some(url), Some(rels)) = (captures.get(1), captures.get(2)) else {
                continue;
            };
            let url = url.as_str();
            for rel in rels.as_str().split_whitespace() {
                match rel {
                    "next" if next.is_none() => next = Some(url),
                    "prev" | "previous" if prev.is_none() => prev = Some(url),
                    _ => {}
                }
            }
        }
        let pagination = Self::new(next, prev);
        if (next.is_some() && pagination.next.is_none())
            || (prev.is_some() && pagination.prev.is_none())
        {
            tracing::warn!(link = value, "dropping unparseable pagination link");
        }
        pagination
    }

    /// Extract pagination from response headers
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(http::header::LINK)
            .and_then(|v| v.to_str().ok())
            .map(Self::from_link_header)
            .unwrap_or_default()
    }

    /// Cursor for the next (older) page
    pub fn next(&self) -> Option<&PageLink> {
        self.next.as_ref()
    }

    /// Cursor for the previous (newer) page
    pub fn prev(&self) -> Option<&PageLink> {
        self.prev.as_ref()
    }

    /// Check if neither cursor is present
    pub fn is_empty(&self) -> bool {
        self.next.is_none() && self.prev.is_none()
    }
}

/// Rate-limit counters from `X-RateLimit-*` headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    /// Reset time as sent by the server (ISO 8601)
    pub reset: Option<String>,
}

impl RateLimit {
    /// Extract rate-limit counters, `None` if the server sent none
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let text = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
        };
        let rate_limit = Self {
            limit: text("x-ratelimit-limit").and_then(|s| s.parse().ok()),
            remaining: text("x-ratelimit-remaining").and_then(|s| s.parse().ok()),
            reset: text("x-ratelimit-reset"),
        };
        if rate_limit == Self::default() {
            None
        } else {
            Some(rate_limit)
        }
    }
}

/// Error entity returned by the server on failure
#[derive(Debug, Deserialize)]
struct ErrorEntity {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Decoded value plus response metadata
///
/// Immutable once built and owned by the caller that issued the request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    value: T,
    status: StatusCode,
    pagination: Pagination,
    rate_limit: Option<RateLimit>,
}

impl<T> Response<T> {
    /// Wrap a value with its pagination cursors
    pub fn new(value: T, pagination: Pagination) -> Self {
        Self {
            value,
            status: StatusCode::OK,
            pagination,
            rate_limit: None,
        }
    }

    /// Wrap a value, reading metadata from the response headers
    pub fn from_parts(value: T, status: StatusCode, headers: &HeaderMap) -> Self {
        Self {
            value,
            status,
            pagination: Pagination::from_headers(headers),
            rate_limit: RateLimit::from_headers(headers),
        }
    }

    /// Get the decoded value
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Take the decoded value
    pub fn into_value(self) -> T {
        self.value
    }

    /// Get the HTTP status code
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the pagination cursors
    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    /// Cursor for the next page
    pub fn next(&self) -> Option<&PageLink> {
        self.pagination.next()
    }

    /// Cursor for the previous page
    pub fn prev(&self) -> Option<&PageLink> {
        self.pagination.prev()
    }

    /// Get the rate-limit counters
    pub fn rate_limit(&self) -> Option<&RateLimit> {
        self.rate_limit.as_ref()
    }

    /// Transform the value, keeping the metadata
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            value: f(self.value),
            status: self.status,
            pagination: self.pagination,
            rate_limit: self.rate_limit,
        }
    }
}

impl<T: DeserializeOwned> Response<T> {
    /// Decode a raw HTTP exchange
    ///
    /// Non-success statuses become [`Error::Api`]; an empty body decodes as
    /// JSON `null`.
    pub fn decode(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Result<Self> {
        if !status.is_success() {
            return Err(api_error(status, body));
        }
        let body = if body.iter().all(u8::is_ascii_whitespace) {
            b"null".as_slice()
        } else {
            body
        };
        let value = serde_json::from_slice(body)?;
        Ok(Self::from_parts(value, status, headers))
    }
}

fn api_error(status: StatusCode, body: &[u8]) -> Error {
    match serde_json::from_slice::<ErrorEntity>(body) {
        Ok(entity) => Error::api(status, entity.error, entity.error_description),
        Err(_) => {
            let text = String::from_utf8_lossy(body).trim().to_string();
            let error = if text.is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                text
            };
            Error::api(status, error, None)
        }
    }
}
