//! Fuzz target for policy and whitelist file parsing.
//!
//! Goal: The parsers should **never panic** on any input, and anything they
//! accept must survive a render/parse cycle.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_policy_text
//! ```

#![no_main]

use imagegate_settings::{
    parse_policy_text, parse_whitelist_text, render_policy_text, render_whitelist_text,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(rules) = parse_policy_text(text) {
        let _ = parse_policy_text(&render_policy_text(&rules));
    }

    if let Ok(items) = parse_whitelist_text(text) {
        let rendered = render_whitelist_text(&items);
        let reparsed = parse_whitelist_text(&rendered).expect("rendered whitelist reparses");
        assert_eq!(reparsed.len(), items.len());
    }
});
