use pki_types::InvalidDnsNameError;
use std::io;
use std::string::FromUtf8Error;
use thiserror::Error;
use url::ParseError;

/// Every failure kind this endpoint can produce, surfaced internally as a typed
/// `Result<_, Error>` and, at the public boundary, flattened into the single
/// error flag plus last-error message described by the endpoint's status surface.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{source}")]
    IOError {
        #[from]
        source: io::Error,
    },

    #[error("{source}")]
    TlsError {
        #[from]
        source: rustls::Error,
    },

    #[error("{source}")]
    DnsNameError {
        #[from]
        source: InvalidDnsNameError,
    },

    #[cfg(feature = "feature-native-tls")]
    #[error("{source}")]
    NativeTlsError {
        #[from]
        source: native_tls::Error,
    },

    #[error("{source}")]
    FromUtf8Error {
        #[from]
        source: FromUtf8Error,
    },

    #[error("{source}")]
    URLParseError {
        #[from]
        source: ParseError,
    },

    #[error("invalid scheme in WebSocket URL, expected ws or wss")]
    InvalidSchemeURL,

    #[error("URL has no host")]
    URLNoHost,

    // Handshake errors
    #[error("{source}")]
    HttpParseError {
        #[from]
        source: httparse::Error,
    },

    #[error("incomplete HTTP response from server during handshake")]
    IncompleteHttpResponse,

    #[error("server did not respond with HTTP/1.1 101 Switching Protocols")]
    NotSwitchingProtocols,

    #[error("server response is missing the Sec-WebSocket-Accept header")]
    MissingAcceptHeader,

    #[error("server sent an invalid Sec-WebSocket-Accept value")]
    InvalidAcceptKey,

    // Framing errors
    #[error("invalid opcode: `{0:#x}`")]
    InvalidOpcode(u8),

    #[error("reserved bits must be zero, no extensions were negotiated")]
    ReservedBitsSet,

    #[error("server sent a masked frame, servers must not mask frames")]
    MaskedServerFrame,

    #[error("control frames must not be fragmented")]
    FragmentedControlFrame,

    #[error("control frame payload exceeds 125 bytes")]
    ControlFramePayloadTooLarge,

    // Fragmentation errors
    #[error("received a new data frame while a fragmented message is already in progress")]
    FragmentedMessageInProgress,

    #[error("received a continuation frame but no fragmented message is in progress")]
    UnexpectedContinuation,

    // Endpoint state errors
    #[error("operation not valid on a closed endpoint")]
    NotOpen,

    #[error("server closed the connection")]
    ConnectionClosed,

    #[error("transport write was short or returned zero bytes, connection dropped")]
    ShortWrite,
}
