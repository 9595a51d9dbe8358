use crate::config::{ClientConfig, LocalInterface};
use crate::error::Error;
use crate::frame::{decode_header, encode_frame, extended_length_size, DecodedHeader, Frame, OpCode};
use crate::handshake;
use crate::message::{self, Message, PongSink, ReceiveSink};
use crate::transport::Transport;
use crate::url::parse_ws_url;
use std::io;

/// Worst-case framing overhead for a single frame: 2-byte header, 8-byte extended
/// length, 4-byte mask. Payloads above `buffer_size - FRAME_OVERHEAD` are fragmented.
const FRAME_OVERHEAD: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    Closing,
}

struct Reassembly {
    opcode: OpCode,
    buffer: Vec<u8>,
}

/// A single client-side WebSocket connection (spec §3 "Endpoint"). Not `Sync`: the
/// application must not call `send`/`basic_read`/`receive` concurrently from
/// different threads on the same instance.
pub struct Endpoint {
    config: ClientConfig,
    transport: Option<Transport>,
    state: State,
    error: bool,
    last_error: String,
    reassembly: Option<Reassembly>,
    ping_backlog: usize,
    ping_counter: usize,
    receive_sink: Option<ReceiveSink>,
    pong_sink: Option<PongSink>,
    local_interface: Option<LocalInterface>,
}

impl Endpoint {
    pub fn new(config: ClientConfig) -> Self {
        let ping_backlog = config.ping_backlog;
        Self {
            config,
            transport: None,
            state: State::Closed,
            error: false,
            last_error: String::new(),
            reassembly: None,
            ping_backlog,
            ping_counter: 0,
            receive_sink: None,
            pong_sink: None,
            local_interface: None,
        }
    }

    /// Parses `url`, opens the transport, and performs the opening handshake against
    /// `path`. On success the endpoint transitions CLOSED → OPEN.
    pub fn connect(&mut self, url: &str, path: &str) -> Result<(), Error> {
        self.local_interface = None;
        self.connect_inner(url, path)
    }

    /// As `connect`, but binds the TCP socket to `local` before connecting.
    pub fn interface_connect(&mut self, url: &str, path: &str, local: LocalInterface) -> Result<(), Error> {
        self.local_interface = Some(local);
        self.connect_inner(url, path)
    }

    fn connect_inner(&mut self, url: &str, path: &str) -> Result<(), Error> {
        match self.try_connect(url, path) {
            Ok(transport) => {
                self.transport = Some(transport);
                self.state = State::Open;
                self.error = false;
                self.last_error.clear();
                self.reassembly = None;
                self.ping_counter = 0;
                Ok(())
            }
            Err(err) => {
                self.error = true;
                self.last_error = err.to_string();
                self.state = State::Closed;
                Err(err)
            }
        }
    }

    fn try_connect(&self, url: &str, path: &str) -> Result<Transport, Error> {
        let ws_url = parse_ws_url(url)?;
        let mut transport = Transport::connect(&ws_url, self.local_interface.as_ref())?;
        handshake::perform_handshake(&mut transport, &ws_url, path)?;
        Ok(transport)
    }

    /// Puts the underlying socket in non-blocking mode: `receive`/`basic_read` return
    /// immediately with no frame and no state change when nothing is ready, instead of
    /// blocking the calling thread (spec §5, the non-blocking endpoint flavor).
    pub fn set_nonblocking(&mut self, nonblocking: bool) -> Result<(), Error> {
        match &self.transport {
            Some(transport) => transport.set_nonblocking(nonblocking).map_err(|source| Error::IOError { source }),
            None => Err(Error::NotOpen),
        }
    }

    pub fn set_receive_function<F>(&mut self, sink: F)
    where
        F: FnMut(*const u8, usize, usize) + Send + 'static,
    {
        self.receive_sink = Some(Box::new(sink));
    }

    pub fn set_pong_function<F>(&mut self, sink: F)
    where
        F: FnMut(*const u8, usize, usize) + Send + 'static,
    {
        self.pong_sink = Some(Box::new(sink));
    }

    /// 1 means respond to every ping; N means a PONG is sent only after N pings have
    /// accumulated without one being sent (spec §4.4 "Interleaved control frames").
    pub fn set_ping_backlog(&mut self, n: usize) {
        self.ping_backlog = n.max(1);
    }

    pub fn is_open(&self) -> bool {
        self.state == State::Open
    }

    /// `true` means the last operation failed; see `get_error_message` for why.
    pub fn status(&self) -> bool {
        self.error
    }

    pub fn get_error_message(&self) -> &str {
        &self.last_error
    }

    /// Resets the error flag, but only while the endpoint is OPEN — on a closed or
    /// closing endpoint the only way to clear the flag is a fresh successful `connect`.
    pub fn clear(&mut self) {
        if self.state == State::Open {
            self.error = false;
            self.last_error.clear();
        }
    }

    /// Sends `payload` as a TEXT message, fragmenting across CONTINUATION frames when
    /// it exceeds the outbound buffer (spec §4.5).
    pub fn send(&mut self, payload: &str) -> Result<(), Error> {
        self.send_with_opcode(OpCode::Text, payload.as_bytes())
    }

    /// As `send`, but frames the payload as BINARY instead of TEXT (§4.5.1 expansion).
    pub fn send_binary(&mut self, payload: &[u8]) -> Result<(), Error> {
        self.send_with_opcode(OpCode::Binary, payload)
    }

    fn send_with_opcode(&mut self, opcode: OpCode, payload: &[u8]) -> Result<(), Error> {
        if self.state != State::Open {
            return Err(Error::NotOpen);
        }

        let max_chunk = self.config.buffer_size.saturating_sub(FRAME_OVERHEAD).max(1);

        if payload.len() <= max_chunk {
            return self.write_frame_checked(true, opcode, payload);
        }

        let mut chunks = payload.chunks(max_chunk).peekable();
        let first = chunks.next().expect("payload is non-empty in this branch");
        self.write_frame_checked(false, opcode, first)?;

        while let Some(chunk) = chunks.next() {
            let is_last = chunks.peek().is_none();
            self.write_frame_checked(is_last, OpCode::Continue, chunk)?;
        }

        Ok(())
    }

    /// Sends a PING with an empty payload.
    pub fn ping(&mut self) -> Result<(), Error> {
        if self.state != State::Open {
            return Err(Error::NotOpen);
        }
        self.write_frame_checked(true, OpCode::Ping, &[])
    }

    /// Sends a manual PONG with a zero-filled payload of `len` bytes (clamped to the
    /// 125-byte control-frame limit). Resets the received-ping counter, matching the
    /// rule that any PONG — automatic or application-initiated — clears it (§4.4).
    pub fn pong(&mut self, len: usize) -> Result<(), Error> {
        if self.state != State::Open {
            return Err(Error::NotOpen);
        }
        let payload = vec![0u8; len.min(crate::frame::MAX_CONTROL_PAYLOAD)];
        self.write_frame_checked(true, OpCode::Pong, &payload)?;
        self.ping_counter = 0;
        Ok(())
    }

    /// Sends a CLOSE frame carrying `status_code` big-endian (spec §6) and transitions
    /// OPEN → CLOSING. A well-behaved peer's answering CLOSE then drives CLOSING →
    /// CLOSED the next time `basic_read`/`receive` is called.
    pub fn close(&mut self, status_code: u16) -> Result<(), Error> {
        if self.state != State::Open {
            return Ok(());
        }
        let payload = status_code.to_be_bytes();
        self.write_frame_checked(true, OpCode::Close, &payload)?;
        self.state = State::Closing;
        Ok(())
    }

    fn write_frame_checked(&mut self, fin: bool, opcode: OpCode, payload: &[u8]) -> Result<(), Error> {
        let encoded = encode_frame(fin, opcode, payload);
        let transport = self.transport.as_mut().ok_or(Error::NotOpen)?;
        let write_result = transport.write(&encoded);
        match write_result {
            Ok(n) if n == encoded.len() => Ok(()),
            Ok(_) => {
                let err = Error::ShortWrite;
                self.teardown(&err);
                Err(err)
            }
            Err(source) => {
                let err = Error::IOError { source };
                self.teardown(&err);
                Err(err)
            }
        }
    }

    /// Drives one read cycle via the C-style sink contract (spec §6): delivers at most
    /// one reassembled message to the registered receive sink, or returns having
    /// handled a standalone control frame, or returns immediately with no change in
    /// the non-blocking variant when nothing is ready.
    pub fn basic_read(&mut self) -> Result<(), Error> {
        self.receive().map(|_| ())
    }

    /// As `basic_read`, but also returns the delivered message directly — the safe
    /// Rust-native counterpart to the C-style sink (§4.6.1 expansion).
    ///
    /// Drives exactly one read cycle (spec §6): pulls a single wire frame and
    /// returns. `Ok(None)` covers every case that doesn't complete a message —
    /// nothing ready yet (non-blocking), a lone control frame handled out-of-band, or
    /// the first/middle frame of a fragmented message starting or continuing
    /// reassembly. A caller reassembling a multi-frame message therefore calls this
    /// repeatedly until it sees `Ok(Some(_))`.
    ///
    /// Also callable while CLOSING: after `close` sends our CLOSE frame, the peer's
    /// answering CLOSE has to be read through this same path to drive CLOSING → CLOSED
    /// (spec §4.4 table). Only a CLOSED endpoint rejects the call.
    pub fn receive(&mut self) -> Result<Option<Message>, Error> {
        if self.state == State::Closed {
            return Err(Error::NotOpen);
        }

        let frame = match self.read_one_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(None),
            Err(err) => {
                if matches!(err, Error::ConnectionClosed) {
                    self.teardown_clean();
                    return Ok(None);
                }
                self.fail_protocol(&err);
                return Err(err);
            }
        };

        match frame.opcode {
            OpCode::Text | OpCode::Binary => {
                if self.reassembly.is_some() {
                    let err = Error::FragmentedMessageInProgress;
                    self.fail_protocol(&err);
                    return Err(err);
                }
                if frame.fin {
                    return Ok(Some(self.deliver(frame.opcode, frame.payload)));
                }
                self.reassembly = Some(Reassembly {
                    opcode: frame.opcode,
                    buffer: frame.payload,
                });
                Ok(None)
            }
            OpCode::Continue => match self.reassembly.take() {
                Some(mut reassembly) => {
                    reassembly.buffer.extend_from_slice(&frame.payload);
                    if frame.fin {
                        return Ok(Some(self.deliver(reassembly.opcode, reassembly.buffer)));
                    }
                    self.reassembly = Some(reassembly);
                    Ok(None)
                }
                None => {
                    let err = Error::UnexpectedContinuation;
                    self.fail_protocol(&err);
                    Err(err)
                }
            },
            OpCode::Ping => {
                self.ping_counter += 1;
                if self.ping_counter >= self.ping_backlog {
                    self.write_frame_checked(true, OpCode::Pong, &frame.payload)?;
                    self.ping_counter = 0;
                }
                Ok(None)
            }
            OpCode::Pong => {
                if let Some(sink) = self.pong_sink.as_mut() {
                    let capacity = frame.payload.capacity().max(self.config.buffer_size);
                    message::dispatch(sink, &frame.payload, capacity);
                }
                Ok(None)
            }
            OpCode::Close => {
                // Already CLOSING means we initiated the close handshake ourselves and
                // this is the peer's answering CLOSE — just tear down (spec §4.4 table).
                // Still OPEN means the peer initiated it, so echo a CLOSE back first.
                if self.state == State::Open {
                    if let Some(transport) = self.transport.as_mut() {
                        let code = frame
                            .payload
                            .get(0..2)
                            .map(|bytes| u16::from_be_bytes([bytes[0], bytes[1]]))
                            .unwrap_or(1000);
                        let encoded = encode_frame(true, OpCode::Close, &code.to_be_bytes());
                        let _ = transport.write(&encoded);
                    }
                }
                self.reassembly = None;
                self.transport = None;
                self.state = State::Closed;
                Ok(None)
            }
        }
    }

    fn deliver(&mut self, opcode: OpCode, payload: Vec<u8>) -> Message {
        let capacity = payload.capacity().max(self.config.buffer_size);
        if let Some(sink) = self.receive_sink.as_mut() {
            message::dispatch(sink, &payload, capacity);
        }
        match opcode {
            OpCode::Binary => Message::Binary(payload),
            _ => match String::from_utf8(payload) {
                Ok(text) => Message::Text(text),
                Err(err) => Message::Binary(err.into_bytes()),
            },
        }
    }

    /// Reads exactly one frame, or `Ok(None)` if the non-blocking transport has
    /// nothing ready yet (only possible before any byte of a new frame has arrived).
    fn read_one_frame(&mut self) -> Result<Option<Frame>, Error> {
        let mut header = [0u8; 2];
        match self.fill_exact(&mut header, true)? {
            Fill::WouldBlock => return Ok(None),
            Fill::Filled => {}
        }

        let ext_len_size = extended_length_size(header[1]);
        let mut ext_len = [0u8; 8];
        if ext_len_size > 0 {
            self.fill_exact(&mut ext_len[..ext_len_size], false)?;
        }

        let DecodedHeader { fin, opcode, payload_len } = decode_header(
            header,
            if ext_len_size > 0 { Some(&ext_len[..ext_len_size]) } else { None },
        )?;

        let mut payload = vec![0u8; payload_len as usize];
        if !payload.is_empty() {
            self.fill_exact(&mut payload, false)?;
        }

        Ok(Some(Frame::new(fin, opcode, payload)))
    }

    /// Fills `buf` completely, spinning across `WouldBlock` as needed. `allow_initial_wouldblock`
    /// is set only for the first read of a brand new frame's header: there, a `WouldBlock`
    /// before any byte arrives means "nothing ready" and is surfaced to the caller rather
    /// than spun on. Once a frame is in flight (header already read), every subsequent
    /// read for that same frame must eventually complete, since the peer is already
    /// mid-frame — a `WouldBlock` there is retried rather than reported as "no frame".
    fn fill_exact(&mut self, buf: &mut [u8], allow_initial_wouldblock: bool) -> Result<Fill, Error> {
        let transport = self.transport.as_mut().ok_or(Error::NotOpen)?;
        let mut filled = 0;
        loop {
            match transport.read(&mut buf[filled..]) {
                Ok(0) => return Err(Error::ConnectionClosed),
                Ok(n) => {
                    filled += n;
                    if filled == buf.len() {
                        return Ok(Fill::Filled);
                    }
                }
                Err(source) if source.kind() == io::ErrorKind::WouldBlock => {
                    if filled == 0 && allow_initial_wouldblock {
                        return Ok(Fill::WouldBlock);
                    }
                }
                Err(source) => return Err(Error::IOError { source }),
            }
        }
    }

    /// Best-effort CLOSE(1002), then tears down without propagating a second error.
    fn fail_protocol(&mut self, err: &Error) {
        if self.state != State::Closed {
            let payload = 1002u16.to_be_bytes();
            if let Some(transport) = self.transport.as_mut() {
                let encoded = encode_frame(true, OpCode::Close, &payload);
                let _ = transport.write(&encoded);
            }
        }
        self.teardown(err);
    }

    fn teardown(&mut self, err: &Error) {
        self.error = true;
        self.last_error = err.to_string();
        self.state = State::Closed;
        self.transport = None;
        self.reassembly = None;
    }

    /// Tears down without setting the error flag: the peer closing is not a failure.
    fn teardown_clean(&mut self) {
        self.state = State::Closed;
        self.transport = None;
        self.reassembly = None;
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

enum Fill {
    Filled,
    WouldBlock,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_endpoint_starts_closed() {
        let endpoint = Endpoint::default();
        assert!(!endpoint.is_open());
        assert!(!endpoint.status());
    }

    #[test]
    fn send_on_closed_endpoint_fails_without_transport() {
        let mut endpoint = Endpoint::default();
        let err = endpoint.send("hi").unwrap_err();
        assert!(matches!(err, Error::NotOpen));
        assert!(!endpoint.status(), "send on a never-opened endpoint must not itself raise the error flag");
    }

    #[test]
    fn close_on_closed_endpoint_is_a_no_op() {
        let mut endpoint = Endpoint::default();
        assert!(endpoint.close(1000).is_ok());
        assert!(!endpoint.is_open());
    }

    #[test]
    fn set_ping_backlog_clamps_to_at_least_one() {
        let mut endpoint = Endpoint::default();
        endpoint.set_ping_backlog(0);
        assert_eq!(endpoint.ping_backlog, 1);
    }

    #[test]
    fn clear_is_a_no_op_while_closed() {
        let mut endpoint = Endpoint::default();
        endpoint.error = true;
        endpoint.last_error = "boom".to_string();
        endpoint.clear();
        assert!(endpoint.status(), "clear must only take effect while OPEN");
    }
}
