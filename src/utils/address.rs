//! Syntactic address checks and free-text address extraction.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

// One '@', no whitespace, and a domain with a dot that has text on both sides.
static ADDRESS_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
        .expect("Address shape regex failed to compile. This is a bug.")
});

/// Returns true if `candidate` looks like an email address.
///
/// This is a shape check only. Whether the mailbox exists is for the
/// verification service to decide.
pub fn has_valid_shape(candidate: &str) -> bool {
    ADDRESS_SHAPE.is_match(candidate)
}

/// Splits free text on newlines, commas and semicolons and keeps the
/// well-shaped addresses, deduplicated in first-seen order.
pub fn parse_addresses_from_text(text: &str) -> Vec<String> {
    let candidates = text
        .split(['\n', ',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty() && has_valid_shape(s))
        .map(str::to_string);
    dedupe_preserving_order(candidates)
}

/// Drops repeated addresses, keeping the first occurrence. Comparison is exact.
pub fn dedupe_preserving_order<I>(addresses: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    addresses
        .into_iter()
        .filter(|address| seen.insert(address.clone()))
        .collect()
}
