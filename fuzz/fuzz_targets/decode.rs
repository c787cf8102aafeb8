#![no_main]

use libfuzzer_sys::fuzz_target;
use rns::parser;

fuzz_target!(|data: &[u8]| {
    let _ = parser::decode(data);
});
