use crate::error::Error;
use rand::Rng;

/// Control frames (ping/pong/close) MUST NOT carry more than this many payload bytes
/// and MUST NOT be fragmented.
pub const MAX_CONTROL_PAYLOAD: usize = 125;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Continue,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl OpCode {
    pub fn from_byte(byte: u8) -> Result<Self, Error> {
        match byte {
            0x0 => Ok(OpCode::Continue),
            0x1 => Ok(OpCode::Text),
            0x2 => Ok(OpCode::Binary),
            0x8 => Ok(OpCode::Close),
            0x9 => Ok(OpCode::Ping),
            0xA => Ok(OpCode::Pong),
            other => Err(Error::InvalidOpcode(other)),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            OpCode::Continue => 0x0,
            OpCode::Text => 0x1,
            OpCode::Binary => 0x2,
            OpCode::Close => 0x8,
            OpCode::Ping => 0x9,
            OpCode::Pong => 0xA,
        }
    }

    pub fn is_control(&self) -> bool {
        matches!(self, OpCode::Close | OpCode::Ping | OpCode::Pong)
    }

    pub fn is_data(&self) -> bool {
        matches!(self, OpCode::Text | OpCode::Binary)
    }
}

/// One decoded RFC 6455 frame: header plus payload, already unmasked if it carried one.
#[derive(Debug, Clone)]
pub struct Frame {
    pub fin: bool,
    pub opcode: OpCode,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(fin: bool, opcode: OpCode, payload: Vec<u8>) -> Self {
        Self { fin, opcode, payload }
    }
}

/// Encodes a single client-to-server frame: masked, with a freshly generated key.
///
/// Mirrors the header layout the teacher's `write_frame_client` produces, generalized
/// to a plain byte-vector return so it is transport-agnostic.
pub fn encode_frame(fin: bool, opcode: OpCode, payload: &[u8]) -> Vec<u8> {
    let mask: [u8; 4] = rand::rng().random();

    let payload_len = payload.len();
    let mut out = Vec::with_capacity(payload_len + 14);

    let first_byte = ((fin as u8) << 7) | opcode.as_u8();
    out.push(first_byte);

    if payload_len <= 125 {
        out.push(0b1000_0000 | payload_len as u8);
    } else if payload_len <= 65535 {
        out.push(0b1000_0000 | 126);
        out.extend_from_slice(&(payload_len as u16).to_be_bytes());
    } else {
        out.push(0b1000_0000 | 127);
        out.extend_from_slice(&(payload_len as u64).to_be_bytes());
    }

    out.extend_from_slice(&mask);
    out.extend(payload.iter().enumerate().map(|(i, &b)| b ^ mask[i % 4]));

    out
}

/// The portion of an inbound frame decoded from its header, validated against every
/// RFC 6455 rule this client enforces on receive (RSV bits, server-side masking,
/// control-frame fragmentation/size).
pub struct DecodedHeader {
    pub fin: bool,
    pub opcode: OpCode,
    pub payload_len: u64,
}

/// Decodes the fixed 2-byte header plus optional extended-length bytes of an inbound
/// frame. `ext_len` must be `Some` with 2 bytes when the 7-bit length field reads 126,
/// or 8 bytes when it reads 127 — the caller reads those bytes only after seeing the
/// fixed header, so this function never performs I/O itself.
///
/// Per RFC 6455, frames sent server-to-client are never masked and never carry
/// extensions; both are treated as protocol violations here since none are negotiated.
pub fn decode_header(header: [u8; 2], ext_len: Option<&[u8]>) -> Result<DecodedHeader, Error> {
    let fin = (header[0] & 0b1000_0000) != 0;
    let rsv = header[0] & 0b0111_0000;
    let opcode = OpCode::from_byte(header[0] & 0b0000_1111)?;

    if rsv != 0 {
        return Err(Error::ReservedBitsSet);
    }

    if !fin && opcode.is_control() {
        return Err(Error::FragmentedControlFrame);
    }

    let masked = (header[1] & 0b1000_0000) != 0;
    if masked {
        return Err(Error::MaskedServerFrame);
    }

    let mut length = (header[1] & 0b0111_1111) as u64;

    if length == 126 {
        let bytes = ext_len.expect("caller must supply the 2 extended-length bytes");
        length = u16::from_be_bytes([bytes[0], bytes[1]]) as u64;
    } else if length == 127 {
        let bytes = ext_len.expect("caller must supply the 8 extended-length bytes");
        length = u64::from_be_bytes(bytes.try_into().expect("8 bytes"));
    }

    if opcode.is_control() && length > MAX_CONTROL_PAYLOAD as u64 {
        return Err(Error::ControlFramePayloadTooLarge);
    }

    Ok(DecodedHeader { fin, opcode, payload_len: length })
}

/// How many extra bytes of extended length follow the 2-byte fixed header, given the
/// 7-bit length field read from byte 1 (mask bit included or not, it's masked off).
pub fn extended_length_size(length_field: u8) -> usize {
    match length_field & 0b0111_1111 {
        126 => 2,
        127 => 8,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_round_trips() {
        for byte in [0x0, 0x1, 0x2, 0x8, 0x9, 0xA] {
            let op = OpCode::from_byte(byte).unwrap();
            assert_eq!(op.as_u8(), byte);
        }
        assert!(OpCode::from_byte(0x3).is_err());
    }

    #[test]
    fn control_opcodes_classified() {
        assert!(OpCode::Close.is_control());
        assert!(OpCode::Ping.is_control());
        assert!(OpCode::Pong.is_control());
        assert!(!OpCode::Text.is_control());
        assert!(!OpCode::Binary.is_control());
        assert!(!OpCode::Continue.is_control());
    }

    fn unmask(mut payload: Vec<u8>, mask: [u8; 4]) -> Vec<u8> {
        for (i, b) in payload.iter_mut().enumerate() {
            *b ^= mask[i % 4];
        }
        payload
    }

    #[test]
    fn encode_sets_mask_bit_and_masks_payload() {
        let payload = b"hello world";
        let encoded = encode_frame(true, OpCode::Text, payload);

        assert_eq!(encoded[0], 0b1000_0001); // FIN=1, opcode=TEXT
        assert_eq!(encoded[1] & 0b1000_0000, 0b1000_0000); // MASK=1
        let len = (encoded[1] & 0b0111_1111) as usize;
        assert_eq!(len, payload.len());

        let mask: [u8; 4] = encoded[2..6].try_into().unwrap();
        let masked_payload = encoded[6..].to_vec();
        assert_eq!(unmask(masked_payload, mask), payload);
    }

    #[test]
    fn encode_uses_16_bit_length_form_above_125() {
        let payload = vec![0u8; 200];
        let encoded = encode_frame(true, OpCode::Binary, &payload);
        assert_eq!(encoded[1] & 0b0111_1111, 126);
        let len = u16::from_be_bytes([encoded[2], encoded[3]]) as usize;
        assert_eq!(len, 200);
    }

    #[test]
    fn encode_uses_64_bit_length_form_above_65535() {
        let payload = vec![0u8; 70_000];
        let encoded = encode_frame(true, OpCode::Binary, &payload);
        assert_eq!(encoded[1] & 0b0111_1111, 127);
        let len = u64::from_be_bytes(encoded[2..10].try_into().unwrap()) as usize;
        assert_eq!(len, 70_000);
    }

    #[test]
    fn decode_rejects_masked_server_frame() {
        let header = [0b1000_0001, 0b1000_0101]; // FIN, TEXT, MASK=1, len=5
        let err = decode_header(header, None).unwrap_err();
        assert!(matches!(err, Error::MaskedServerFrame));
    }

    #[test]
    fn decode_rejects_reserved_bits() {
        let header = [0b1100_0001, 0b0000_0101]; // RSV1 set
        let err = decode_header(header, None).unwrap_err();
        assert!(matches!(err, Error::ReservedBitsSet));
    }

    #[test]
    fn decode_rejects_fragmented_control_frame() {
        let header = [0b0000_1001, 0b0000_0000]; // FIN=0, PING
        let err = decode_header(header, None).unwrap_err();
        assert!(matches!(err, Error::FragmentedControlFrame));
    }

    #[test]
    fn decode_rejects_oversized_control_payload() {
        let header = [0b1000_1000, 126]; // FIN, CLOSE, len-form=126
        let err = decode_header(header, Some(&[0, 200])).unwrap_err();
        assert!(matches!(err, Error::ControlFramePayloadTooLarge));
    }

    #[test]
    fn decode_reads_extended_length_forms() {
        let header = [0b1000_0010, 126];
        let decoded = decode_header(header, Some(&[0x01, 0x00])).unwrap();
        assert_eq!(decoded.payload_len, 256);

        let header = [0b1000_0010, 127];
        let decoded = decode_header(header, Some(&0x0001_0000u64.to_be_bytes())).unwrap();
        assert_eq!(decoded.payload_len, 0x0001_0000);
    }

    #[test]
    fn extended_length_size_matches_length_field() {
        assert_eq!(extended_length_size(10), 0);
        assert_eq!(extended_length_size(126), 2);
        assert_eq!(extended_length_size(127), 8);
        assert_eq!(extended_length_size(0b1000_0000 | 126), 2);
    }
}
