//! Transport mode negotiation.
//!
//! Picks which wire transport speaks to an endpoint, from an explicit hint or
//! from the shape of the URL. Construction of the transport is left to a
//! [`TransportFactory`](crate::TransportFactory).

use std::fmt;
use url::Url;

/// The two wire variants of the MCP protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportMode {
    /// Legacy event-stream transport: GET opens a stream, POSTs go to the
    /// endpoint the stream announces.
    Sse,
    /// Streamable HTTP: every message is a POST to the endpoint URL.
    StreamableHttp,
}

impl TransportMode {
    /// Parse a transport hint. Unknown hints yield `None`.
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.trim().to_lowercase().as_str() {
            "sse" => Some(Self::Sse),
            "http" | "streamablehttp" | "streamable" => Some(Self::StreamableHttp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sse => "sse",
            Self::StreamableHttp => "streamable-http",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Choose the transport mode for `url`.
///
/// A recognised hint always wins. Otherwise a URL whose path ends in `/sse`
/// selects SSE and everything else uses streamable HTTP.
pub fn negotiate(url: &str, hint: Option<&str>) -> TransportMode {
    if let Some(mode) = hint.and_then(TransportMode::from_hint) {
        return mode;
    }

    let path_is_sse = match Url::parse(url) {
        Ok(parsed) => parsed.path().ends_with("/sse"),
        Err(_) => url
            .split(&['?', '#'][..])
            .next()
            .is_some_and(|path| path.ends_with("/sse")),
    };

    if path_is_sse || url.contains("/sse?") {
        TransportMode::Sse
    } else {
        TransportMode::StreamableHttp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_sse_wins_over_url() {
        assert_eq!(negotiate("https://x/mcp", Some("sse")), TransportMode::Sse);
        assert_eq!(negotiate("https://x/mcp", Some(" SSE ")), TransportMode::Sse);
    }

    #[test]
    fn test_http_hints() {
        for hint in ["http", "streamableHttp", "STREAMABLE", "StreamableHTTP"] {
            assert_eq!(
                negotiate("https://x/sse", Some(hint)),
                TransportMode::StreamableHttp,
                "hint {hint}"
            );
        }
    }

    #[test]
    fn test_url_shape_without_hint() {
        assert_eq!(negotiate("https://x/sse", None), TransportMode::Sse);
        assert_eq!(negotiate("https://x/mcp", None), TransportMode::StreamableHttp);
        assert_eq!(negotiate("https://x/sse?key=1", None), TransportMode::Sse);
        assert_eq!(
            negotiate("https://x/sse/extra", None),
            TransportMode::StreamableHttp
        );
    }

    #[test]
    fn test_unknown_hint_falls_back_to_url() {
        assert_eq!(negotiate("https://x/sse", Some("websocket")), TransportMode::Sse);
        assert_eq!(negotiate("https://x/mcp", Some("")), TransportMode::StreamableHttp);
    }

    #[test]
    fn test_unparseable_url() {
        assert_eq!(negotiate("hub/sse", None), TransportMode::Sse);
        assert_eq!(negotiate("hub/sse?x=1", None), TransportMode::Sse);
        assert_eq!(negotiate("hub/mcp", None), TransportMode::StreamableHttp);
    }
}
