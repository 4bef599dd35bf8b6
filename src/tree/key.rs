//! Key validation shared by pages, spaces, translations and language codes.

/// Returns true if `key` can be used as a map key anywhere in the tree.
///
/// A valid key is non-empty and contains no whitespace character. There is
/// no length limit and no other charset restriction.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.chars().any(char::is_whitespace)
}

/// Highest position an array-shaped space may hold. Exports materialize
/// every position up to the largest one, so this caps their length.
pub const MAX_ARRAY_INDEX: usize = 9_999;

/// Position named by `key` when it is a number.
pub(crate) fn array_position(key: &str) -> Option<usize> {
    key.parse().ok()
}
