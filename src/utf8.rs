//! Character segmentation for the feature extractors.
//!
//! Words reach the dictionary as `String`s (the tokenizer decodes lossily), so
//! every byte sequence handled here is valid UTF-8 and a "character" is one
//! code point of 1 to 4 bytes.

/// True if `b` is a UTF-8 continuation byte (`10xxxxxx`).
pub fn is_continuation(b: u8) -> bool {
    (b & 0xC0) == 0x80
}

/// Split `s` into its characters, each one a subslice of `s`.
pub fn characters(s: &str) -> impl Iterator<Item = &str> + '_ {
    s.char_indices().map(move |(i, c)| &s[i..i + c.len_utf8()])
}
