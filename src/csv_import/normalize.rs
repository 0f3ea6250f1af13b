//! Unicode normalization for free-text statement fields.

use unicode_normalization::UnicodeNormalization;

/// Applies NFKC normalization to `text`.
///
/// The exports mix full-width and half-width forms of digits, Latin letters
/// and punctuation for the same merchant; compatibility folding collapses
/// them to one canonical form so a merchant name is stored identically across
/// files and issuers. Never applied to date or numeric cells.
pub fn nfkc(text: &str) -> String {
    text.nfkc().collect()
}
