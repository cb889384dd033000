//! Fuzz target for dynamic-choice expansion.
//!
//! Run with: cargo +nightly fuzz run fuzz_dynamic_expand

#![no_main]

use libfuzzer_sys::fuzz_target;
use promptsmith_core::expand::expand_dynamic;
use rand::SeedableRng;
use rand::rngs::StdRng;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let mut rng = StdRng::seed_from_u64(0);
    let expanded = expand_dynamic(text, &mut rng);
    // Expansion only ever removes characters.
    assert!(expanded.chars().count() <= text.chars().count());
});
