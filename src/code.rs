//! Canonicalization of caller-supplied security codes.
//!
//! Every map lookup in the pipeline keys on the normalized form; raw codes
//! never reach a cache or a provider.

/// Offset between the fullwidth forms block (U+FF01..=U+FF5E) and ASCII.
const FULLWIDTH_OFFSET: u32 = 0xFEE0;

/// Canonicalize a raw security code: trim surrounding whitespace and map
/// fullwidth ASCII-range characters to their halfwidth equivalents.
///
/// Total over all strings. Whitespace-only input yields an empty string;
/// callers are expected to drop empty results before resolution.
pub fn normalize_code(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|ch| match ch {
            '\u{FF01}'..='\u{FF5E}' => {
                char::from_u32(ch as u32 - FULLWIDTH_OFFSET).unwrap_or(ch)
            }
            _ => ch,
        })
        .collect()
}

/// Whether a normalized code has the canonical listed-equity shape
/// (exactly four ASCII digits). Codes of this shape are eligible for the
/// primary exchange feed.
pub fn is_listed_equity(code: &str) -> bool {
    code.len() == 4 && code.bytes().all(|b| b.is_ascii_digit())
}
