use http::Method;
use url::Url;

use crate::body::{EncodedBody, RequestBody};
use crate::error::Result;
use crate::query::{Query, QueryItem};

/// Transport-independent description of an API call
///
/// A request is a method, a path relative to the instance (or an absolute
/// URL, as found in pagination links), ordered query items and an optional
/// encoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    path: String,
    query: Vec<QueryItem>,
    body: Option<EncodedBody>,
}

impl Request {
    /// Create a new request
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append the items of a query descriptor
    pub fn query(mut self, query: &impl Query) -> Self {
        if let Some(items) = query.query_items() {
            self.query.extend(items);
        }
        self
    }

    /// Set the body from a body descriptor
    pub fn body(mut self, body: &impl RequestBody) -> Result<Self> {
        self.body = body.encode()?;
        Ok(self)
    }

    /// Get the HTTP method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the query items
    pub fn query_items(&self) -> &[QueryItem] {
        &self.query
    }

    /// Get the body
    pub fn encoded_body(&self) -> Option<&EncodedBody> {
        self.body.as_ref()
    }

    /// Take the body out of the request
    pub fn into_body(self) -> Option<EncodedBody> {
        self.body
    }

    /// Resolve the full URL against an instance base URL
    ///
    /// `/api/...` paths are resolved below the base path, so an instance
    /// served from `https://host/mastodon` keeps its prefix. Absolute URLs
    /// replace the base.
    pub fn url(&self, base: &Url) -> Result<Url> {
        let mut url = match self.path.strip_prefix('/') {
            Some(relative) => {
                let mut base = base.clone();
                if !base.path().ends_with('/') {
                    let path = format!("{}/", base.path());
                    base.set_path(&path);
                }
                base.join(relative)?
            }
            None => base.join(&self.path)?,
        };
        if !self.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(self.query.iter().map(|item| (&item.name, &item.value)));
        }
        Ok(url)
    }
}
