//! Reversed-URL keys.
//!
//! Pages are stored and partitioned under their reversed URL so that pages of
//! the same site sort next to each other:
//!
//! ```text
//! http://bar.foo.com:8983/to/index.html?a=b  <->  com.foo.bar:http:8983/to/index.html?a=b
//! ```

use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Parse and normalize a URL, returning its canonical string form
pub fn normalize_url(url: &str) -> Result<String> {
    Url::parse(url)
        .map(|u| u.to_string())
        .map_err(|e| GraphError::InvalidUrl(format!("{}: {}", url, e)))
}

/// Reverse a URL into its partition key form
pub fn reverse_url(url: &str) -> Result<String> {
    let parsed =
        Url::parse(url).map_err(|e| GraphError::InvalidUrl(format!("{}: {}", url, e)))?;

    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| GraphError::InvalidUrl(format!("{}: missing host", url)))?;

    // IPv6 literals would collide with the ':' separators of the key
    if host.contains(':') {
        return Err(GraphError::InvalidUrl(format!(
            "{}: IPv6 hosts cannot be reversed",
            url
        )));
    }

    let mut key = String::with_capacity(url.len());
    key.push_str(&host.split('.').rev().collect::<Vec<_>>().join("."));
    key.push(':');
    key.push_str(parsed.scheme());

    if let Some(port) = parsed.port() {
        key.push(':');
        key.push_str(&port.to_string());
    }

    key.push_str(parsed.path());

    if let Some(query) = parsed.query() {
        key.push('?');
        key.push_str(query);
    }

    if let Some(fragment) = parsed.fragment() {
        key.push('#');
        key.push_str(fragment);
    }

    Ok(key)
}

/// Turn a reversed key back into the URL it was built from
pub fn unreverse_url(reversed: &str) -> Result<String> {
    let path_begin = reversed.find('/').unwrap_or(reversed.len());
    let (head, rest) = reversed.split_at(path_begin);

    let mut splits = head.split(':');
    let reversed_host = splits
        .next()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| GraphError::InvalidGroupKey(format!("{}: missing host", reversed)))?;
    let scheme = splits
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GraphError::InvalidGroupKey(format!("{}: missing scheme", reversed)))?;
    let port = splits.next();

    if splits.next().is_some() {
        return Err(GraphError::InvalidGroupKey(format!(
            "{}: too many ':' separators",
            reversed
        )));
    }

    let mut url = String::with_capacity(reversed.len() + 3);
    url.push_str(scheme);
    url.push_str("://");
    url.push_str(&reversed_host.split('.').rev().collect::<Vec<_>>().join("."));

    if let Some(port) = port {
        if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GraphError::InvalidGroupKey(format!(
                "{}: bad port '{}'",
                reversed, port
            )));
        }
        url.push(':');
        url.push_str(port);
    }

    url.push_str(rest);
    Ok(url)
}

/// The grouping identity of one merge invocation: the reversed URL of the
/// focus page.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(String);

impl GroupKey {
    /// Wrap an already reversed key without validating it
    pub fn new(reversed: impl Into<String>) -> Self {
        Self(reversed.into())
    }

    pub fn from_url(url: &str) -> Result<Self> {
        reverse_url(url).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the focus URL
    pub fn url(&self) -> Result<String> {
        unreverse_url(&self.0)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
