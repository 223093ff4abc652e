//! Name canonicalization for reference matching

use unicode_normalization::UnicodeNormalization;

/// Canonical matching key for a horse name.
///
/// NFKC fold (full-width Latin and half-width kana collapse), trim, lowercase.
pub fn normalize_name(name: &str) -> String {
    let folded: String = name.nfkc().collect();
    folded.trim().to_lowercase()
}
