use crate::error::Error;
use crate::transport::Transport;
use crate::url::WsUrl;
use base64::prelude::*;
use rand::Rng;
use sha1::{Digest, Sha1};

const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B13";
const MAX_RESPONSE_BYTES: usize = 16 * 1024;

/// Builds and sends the opening HTTP/1.1 Upgrade request (spec §4.1), then reads and
/// validates the server's response. Returns the nonce that was sent so the caller
/// never needs to re-derive it.
pub fn perform_handshake(transport: &mut Transport, url: &WsUrl, path: &str) -> Result<(), Error> {
    let nonce = generate_nonce();
    let request = build_request(url, path, &nonce);

    write_all(transport, request.as_bytes())?;
    let response = read_response(transport)?;
    validate_response(&response, &nonce)
}

fn generate_nonce() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    BASE64_STANDARD.encode(bytes)
}

/// Exact header order from spec §4.1: request line, Host, Upgrade, Connection,
/// Sec-WebSocket-Key, Sec-WebSocket-Version.
fn build_request(url: &WsUrl, path: &str, nonce: &str) -> String {
    format!(
        "GET {path} HTTP/1.1\r\n\
         Host: {host}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {nonce}\r\n\
         Sec-WebSocket-Version: 13\r\n\
         \r\n",
        path = path,
        host = url.host_header(),
        nonce = nonce,
    )
}

fn write_all(transport: &mut Transport, mut buf: &[u8]) -> Result<(), Error> {
    while !buf.is_empty() {
        let written = transport.write(buf).map_err(|source| Error::IOError { source })?;
        if written == 0 {
            return Err(Error::ShortWrite);
        }
        buf = &buf[written..];
    }
    transport.flush().map_err(|source| Error::IOError { source })?;
    Ok(())
}

/// Reads from the transport, byte chunk at a time, until the header-terminating
/// `\r\n\r\n` appears or the response exceeds a sane cap. There is no length framing
/// on an HTTP response line+headers, so this has to grow the buffer as it reads.
fn read_response(transport: &mut Transport) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 512];

    loop {
        let n = transport.read(&mut chunk).map_err(|source| Error::IOError { source })?;
        if n == 0 {
            return Err(Error::IncompleteHttpResponse);
        }
        buf.extend_from_slice(&chunk[..n]);

        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            return Ok(buf);
        }
        if buf.len() > MAX_RESPONSE_BYTES {
            return Err(Error::IncompleteHttpResponse);
        }
    }
}

/// Parses and validates a raw HTTP/1.1 response against the nonce sent in the
/// request. Public so both `perform_handshake` and fuzz/test harnesses can exercise
/// the response parser directly against arbitrary bytes.
pub fn validate_response(raw: &[u8], nonce: &str) -> Result<(), Error> {
    let mut headers = [httparse::EMPTY_HEADER; 32];
    let mut response = httparse::Response::new(&mut headers);
    response.parse(raw)?;

    if response.code != Some(101) {
        return Err(Error::NotSwitchingProtocols);
    }

    let accept_header = response
        .headers
        .iter()
        .find(|header| header.name.eq_ignore_ascii_case("sec-websocket-accept"))
        .ok_or(Error::MissingAcceptHeader)?;

    let expected = accept_value(nonce);
    if accept_header.value != expected.as_bytes() {
        return Err(Error::InvalidAcceptKey);
    }

    Ok(())
}

/// base64( SHA1( nonce + GUID ) ), per RFC 6455 §1.3.
fn accept_value(nonce: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(nonce.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    BASE64_STANDARD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_value_matches_rfc_example() {
        // RFC 6455 §1.3 worked example.
        let value = accept_value("dGhlIHNhbXBsZSBub25jZQ==");
        assert_eq!(value, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn request_has_exact_header_order() {
        let url = WsUrl {
            scheme: crate::url::Scheme::Ws,
            host: "example.com".to_string(),
            port: 80,
        };
        let request = build_request(&url, "/chat", "abc123==");
        let lines: Vec<&str> = request.split("\r\n").collect();
        assert_eq!(lines[0], "GET /chat HTTP/1.1");
        assert_eq!(lines[1], "Host: example.com");
        assert_eq!(lines[2], "Upgrade: websocket");
        assert_eq!(lines[3], "Connection: Upgrade");
        assert_eq!(lines[4], "Sec-WebSocket-Key: abc123==");
        assert_eq!(lines[5], "Sec-WebSocket-Version: 13");
    }

    #[test]
    fn validate_response_accepts_any_header_name_case() {
        let nonce = "dGhlIHNhbXBsZSBub25jZQ==";
        let expected = accept_value(nonce);
        let raw = format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             sEc-WebSocket-ACCEPT: {expected}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             \r\n"
        );
        validate_response(raw.as_bytes(), nonce).unwrap();
    }

    #[test]
    fn validate_response_rejects_non_101_status() {
        let raw = b"HTTP/1.1 400 Bad Request\r\n\r\n";
        let err = validate_response(raw, "nonce").unwrap_err();
        assert!(matches!(err, Error::NotSwitchingProtocols));
    }

    #[test]
    fn validate_response_rejects_missing_accept_header() {
        let raw = b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\n\r\n";
        let err = validate_response(raw, "nonce").unwrap_err();
        assert!(matches!(err, Error::MissingAcceptHeader));
    }

    #[test]
    fn validate_response_rejects_wrong_accept_value() {
        let raw = b"HTTP/1.1 101 Switching Protocols\r\nSec-WebSocket-Accept: wrong==\r\n\r\n";
        let err = validate_response(raw, "dGhlIHNhbXBsZSBub25jZQ==").unwrap_err();
        assert!(matches!(err, Error::InvalidAcceptKey));
    }
}
