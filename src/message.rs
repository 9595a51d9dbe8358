use crate::error::Error;
use crate::frame::{Frame, OpCode};

/// One reassembled application-level message, classified by the opcode its first
/// (or only) data frame carried. Generalizes the teacher's `Message` enum to a
/// synchronous endpoint; fragmentation into frames moved to `endpoint.rs` since the
/// chunk size now depends on the endpoint's configured buffer, not a free parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Text(String),
    Binary(Vec<u8>),
}

impl Message {
    pub fn from_frame(frame: Frame) -> Result<Self, Error> {
        match frame.opcode {
            OpCode::Text => Ok(Message::Text(String::from_utf8(frame.payload)?)),
            OpCode::Binary => Ok(Message::Binary(frame.payload)),
            other => Err(Error::InvalidOpcode(other.as_u8())),
        }
    }

    pub fn as_binary(&self) -> &[u8] {
        match self {
            Message::Text(text) => text.as_bytes(),
            Message::Binary(data) => data,
        }
    }

    pub fn as_text(&self) -> Result<String, Error> {
        match self {
            Message::Text(text) => Ok(text.clone()),
            Message::Binary(data) => Ok(String::from_utf8(data.clone())?),
        }
    }

    pub fn opcode(&self) -> OpCode {
        match self {
            Message::Text(_) => OpCode::Text,
            Message::Binary(_) => OpCode::Binary,
        }
    }
}

/// The fixed three-argument sink contract from spec §4.7/§9: pointer, payload length,
/// buffer capacity. The return value is unused by the core; a sink that wants to
/// short-circuit its own processing does so with an ordinary `return`, not by
/// signalling the caller.
pub type ReceiveSink = Box<dyn FnMut(*const u8, usize, usize) + Send>;
pub type PongSink = Box<dyn FnMut(*const u8, usize, usize) + Send>;

pub(crate) fn dispatch(sink: &mut (dyn FnMut(*const u8, usize, usize) + Send), payload: &[u8], capacity: usize) {
    sink(payload.as_ptr(), payload.len(), capacity);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::OpCode;

    #[test]
    fn text_frame_converts_to_message() {
        let frame = Frame::new(true, OpCode::Text, b"hello".to_vec());
        let message = Message::from_frame(frame).unwrap();
        assert_eq!(message, Message::Text("hello".to_string()));
    }

    #[test]
    fn binary_frame_converts_to_message() {
        let frame = Frame::new(true, OpCode::Binary, vec![1, 2, 3]);
        let message = Message::from_frame(frame).unwrap();
        assert_eq!(message, Message::Binary(vec![1, 2, 3]));
    }

    #[test]
    fn control_opcode_rejected() {
        let frame = Frame::new(true, OpCode::Ping, vec![]);
        assert!(Message::from_frame(frame).is_err());
    }

    #[test]
    fn as_binary_reflects_variant() {
        assert_eq!(Message::Text("ab".into()).as_binary(), b"ab");
        assert_eq!(Message::Binary(vec![9, 9]).as_binary(), &[9, 9]);
    }

    #[test]
    fn invalid_utf8_binary_fails_as_text() {
        let message = Message::Binary(vec![0xff, 0xfe]);
        assert!(message.as_text().is_err());
    }
}
