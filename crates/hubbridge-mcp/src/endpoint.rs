//! Remote endpoint description and session fingerprints.

use crate::negotiate::TransportMode;
use hubbridge_util::redact_headers;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The URL and headers identifying a remote tool service.
///
/// Headers are kept sorted so the same set always serializes the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Server URL.
    pub url: String,

    /// Headers sent with every request.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl Endpoint {
    /// Create an endpoint without headers.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Look up a header by exact name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// A copy safe to print: credentials are masked.
    pub fn redacted(&self) -> Self {
        Self {
            url: self.url.clone(),
            headers: redact_headers(&self.headers),
        }
    }
}

/// Identity of a session: two endpoints with equal fingerprints share one.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionFingerprint {
    mode: TransportMode,
    url: String,
    headers: String,
}

impl SessionFingerprint {
    /// Fingerprint `endpoint` reached through `mode`.
    pub fn new(mode: TransportMode, endpoint: &Endpoint) -> Self {
        // A string-keyed map of strings always serializes.
        let headers = serde_json::to_string(&endpoint.headers).unwrap_or_default();
        Self {
            mode,
            url: endpoint.url.clone(),
            headers,
        }
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Debug for SessionFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Header values are credentials; show only their size.
        f.debug_struct("SessionFingerprint")
            .field("mode", &self.mode)
            .field("url", &self.url)
            .field("headers_len", &self.headers.len())
            .finish()
    }
}
