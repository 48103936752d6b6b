//! Fuzz target for Dockerfile instruction parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = imagegate_domain::dockerfile::parse(text);
    }
});
