//! Decoding of inline `content` payloads.
//!
//! Payloads are plain base64 or data URLs (`data:image/png;base64,iVBOR...`). Decoding is lenient
//! in the way browsers and Node are: the standard and URL-safe alphabets are both accepted,
//! anything else is skipped, and decoding ends at the first `=`. Garbage in produces garbage (or
//! nothing) out rather than an error.

use base64::{
    Engine as _,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

/// Returns the text after the last comma, or the whole input when there is none.
pub fn strip_data_url_prefix(content: &str) -> &str {
    match content.rsplit_once(',') {
        Some((_, payload)) => payload,
        None => content,
    }
}

/// Decodes base64 without rejecting malformed input.
pub fn decode_lenient(input: &str) -> Vec<u8> {
    let mut symbols: String = input
        .chars()
        .take_while(|c| *c != '=')
        .filter_map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '+' | '/' => Some(c),
            '-' => Some('+'),
            '_' => Some('/'),
            _ => None,
        })
        .collect();

    // A lone symbol in the final quantum carries fewer than eight bits
    if symbols.len() % 4 == 1 {
        symbols.pop();
    }

    LENIENT.decode(symbols).unwrap_or_default()
}

/// Strips any data URL header and decodes the remaining base64.
pub fn decode_content(content: &str) -> Vec<u8> {
    decode_lenient(strip_data_url_prefix(content))
}
