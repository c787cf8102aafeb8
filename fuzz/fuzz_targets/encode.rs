#![no_main]

use libfuzzer_sys::fuzz_target;
use rns::parser;
use rns::structs::{Message, MESSAGE_SIZE_LIMIT_TCP};

fuzz_target!(|message: Message| {
    let _ = parser::encode(&message, MESSAGE_SIZE_LIMIT_TCP);
});
