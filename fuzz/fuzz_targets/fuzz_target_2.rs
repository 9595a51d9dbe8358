#![no_main]

use libfuzzer_sys::fuzz_target;
use lockwebsock::handshake::validate_response;

// Exercises the Sec-WebSocket-Accept response parser against arbitrary HTTP response
// text. The nonce is fixed since only the parser's robustness is under test, not the
// accept-value comparison itself.
fuzz_target!(|data: &[u8]| {
    let _ = validate_response(data, "dGhlIHNhbXBsZSBub25jZQ==");
});
