#![no_main]

use libfuzzer_sys::fuzz_target;
use socket_load::codec::decode_server_message;

fuzz_target!(|data: &[u8]| {
    let _ = decode_server_message(data);
});
