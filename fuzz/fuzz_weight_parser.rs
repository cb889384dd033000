//! Fuzz target for the weight-bracket codec.
//!
//! Run with: cargo +nightly fuzz run fuzz_weight_parser
//!
//! Parses arbitrary text, serializes it, and parses the output again. When
//! the last tag sits at depth 0 the serialized form must reparse to the same
//! tags and depths.

#![no_main]

use libfuzzer_sys::fuzz_target;
use promptsmith_core::TokenSequence;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let seq = TokenSequence::parse(text);
    let serialized = seq.to_prompt_string();
    let reparsed = TokenSequence::parse(&serialized);

    if seq.tokens().last().is_none_or(|t| t.depth == 0) {
        assert_eq!(reparsed, seq, "serialized: {serialized:?}");
    }
});
