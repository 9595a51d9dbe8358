#![no_main]

use libfuzzer_sys::fuzz_target;
use lockwebsock::frame::{decode_header, extended_length_size};

// Exercises the inbound frame-header decoder against arbitrary bytes: it must never
// panic, only ever return `Ok` or a typed `Err`. The first two bytes are the fixed
// header; the length field there determines how many (if any) extended-length bytes
// to feed from the rest of the input, mirroring how `Endpoint::read_one_frame` reads
// the wire.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let header = [data[0], data[1]];
    let ext_len_size = extended_length_size(header[1]);
    let rest = &data[2..];

    if rest.len() < ext_len_size {
        return;
    }

    let ext_len = if ext_len_size > 0 { Some(&rest[..ext_len_size]) } else { None };
    let _ = decode_header(header, ext_len);
});
