use crate::error::Error;
use url::Url;

/// Whether the endpoint should speak plain TCP or wrap the socket in TLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Ws,
    Wss,
}

/// A parsed `ws[s]://host[:port]` target. The path is carried separately by the
/// caller (spec §6), so it is not part of this struct.
#[derive(Debug, Clone)]
pub struct WsUrl {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
}

impl WsUrl {
    /// Host header value: `host` alone when the port matches the scheme's default,
    /// `host:port` otherwise. Mirrors the teacher's `request_host_field` logic.
    pub fn host_header(&self) -> String {
        let default_port = match self.scheme {
            Scheme::Ws => 80,
            Scheme::Wss => 443,
        };
        if self.port == default_port {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Parses a `ws://` or `wss://` URL into scheme, host and port, defaulting the port
/// to 80/443 when absent. The path component of `url` is ignored — callers that want
/// a path pass it separately to `connect`.
pub fn parse_ws_url(url: &str) -> Result<WsUrl, Error> {
    let parsed = Url::parse(url)?;

    let scheme = match parsed.scheme() {
        "ws" => Scheme::Ws,
        "wss" => Scheme::Wss,
        _ => return Err(Error::InvalidSchemeURL),
    };

    let host = parsed.host_str().ok_or(Error::URLNoHost)?.to_string();
    let default_port = match scheme {
        Scheme::Ws => 80,
        Scheme::Wss => 443,
    };
    let port = parsed.port().unwrap_or(default_port);

    Ok(WsUrl { scheme, host, port })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ws_with_default_port() {
        let parsed = parse_ws_url("ws://example.com/chat").unwrap();
        assert_eq!(parsed.scheme, Scheme::Ws);
        assert_eq!(parsed.host, "example.com");
        assert_eq!(parsed.port, 80);
        assert_eq!(parsed.host_header(), "example.com");
    }

    #[test]
    fn parses_wss_with_default_port() {
        let parsed = parse_ws_url("wss://example.com").unwrap();
        assert_eq!(parsed.scheme, Scheme::Wss);
        assert_eq!(parsed.port, 443);
        assert_eq!(parsed.host_header(), "example.com");
    }

    #[test]
    fn parses_explicit_port() {
        let parsed = parse_ws_url("ws://localhost:9000").unwrap();
        assert_eq!(parsed.port, 9000);
        assert_eq!(parsed.host_header(), "localhost:9000");
    }

    #[test]
    fn rejects_non_websocket_scheme() {
        let err = parse_ws_url("http://example.com").unwrap_err();
        assert!(matches!(err, Error::InvalidSchemeURL));
    }

    #[test]
    fn rejects_missing_host() {
        // A bare scheme with no authority fails to parse as a URL at all.
        let err = parse_ws_url("ws:///path").unwrap_err();
        assert!(matches!(err, Error::URLNoHost) || matches!(err, Error::URLParseError { .. }));
    }
}
