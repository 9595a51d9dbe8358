//! Blocking client-side WebSocket implementation ([RFC 6455](https://datatracker.ietf.org/doc/html/rfc6455)).
//!
//! This crate opens a single client connection over raw TCP or TLS, performs the
//! HTTP/1.1 upgrade handshake, and exchanges framed text/binary messages with a
//! server. It is synchronous and single-connection: no runtime, no background
//! tasks, no internal locks. An [`Endpoint`] is constructed closed, driven to
//! OPEN by [`Endpoint::connect`], and used from one thread at a time.
//!
//! ```no_run
//! use lockwebsock::{ClientConfig, Endpoint};
//!
//! let mut endpoint = Endpoint::new(ClientConfig::default());
//! endpoint.connect("ws://localhost:9000", "/").unwrap();
//! endpoint.send("hello").unwrap();
//! endpoint.close(1000).unwrap();
//! ```

pub mod config;
pub mod endpoint;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod message;
mod sigpipe;
pub mod transport;
pub mod url;

pub use config::{ClientConfig, LocalInterface};
pub use endpoint::Endpoint;
pub use error::Error;
pub use frame::OpCode;
pub use message::Message;
pub use url::{Scheme, WsUrl};
