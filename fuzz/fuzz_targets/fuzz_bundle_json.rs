//! Fuzz target for policy bundle parsing and validation.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_bundle_json
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Errors are fine; panics are not.
    let _ = imagegate_domain::parse_bundle_json(data);
});
