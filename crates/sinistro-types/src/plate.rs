//! Vehicle plate normalization.
//!
//! Plates are typed by hand into the ledger, so the same vehicle shows up
//! as `abc-1234`, `ABC1234` or ` abc 1234 `. Every equality comparison on
//! plates goes through [`normalize_plate`].

/// Canonicalize a plate for comparison: uppercase, alphanumerics only.
///
/// Returns an empty string when the input carries no alphanumeric
/// characters at all; callers treat that as "no plate".
pub fn normalize_plate(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_uppercase)
        .collect()
}
