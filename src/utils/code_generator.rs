//! Random identifiers: order numbers and slug suffixes.

use base64::Engine as _;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// Random bytes in an order number, 12 characters once encoded.
const ORDER_RANDOM_BYTES: usize = 9;

/// Alphabet for slug suffixes (lowercase, no look-alikes).
const SUFFIX_ALPHABET: &[u8] = b"abcdefghjkmnpqrstuvwxyz23456789";

static ORDER_NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{8}-[A-Za-z0-9_-]{12}$").expect("valid regex"));

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buffer = [0u8; N];
    getrandom::fill(&mut buffer).expect("Failed to generate random bytes");
    buffer
}

/// Generates an order number `YYYYMMDD-<12 url-safe chars>`.
///
/// The format fits the gateway's order id rules (6-64 characters of
/// letters, digits, `-` and `_`).
///
/// # Panics
///
/// Panics if the system random number generator fails (extremely rare).
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let random =
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes::<ORDER_RANDOM_BYTES>());
    format!("{}-{}", now.format("%Y%m%d"), random)
}

/// Returns true if `value` looks like an order number issued by
/// [`generate_order_number`].
pub fn is_order_number(value: &str) -> bool {
    ORDER_NUMBER_REGEX.is_match(value)
}

/// Generates a lowercase suffix of `len` characters for slugs.
pub fn random_suffix(len: usize) -> String {
    let bytes = random_bytes::<16>();
    bytes
        .iter()
        .take(len.min(16))
        .map(|b| SUFFIX_ALPHABET[*b as usize % SUFFIX_ALPHABET.len()] as char)
        .collect()
}
