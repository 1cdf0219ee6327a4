//! URL slugs for programs.

use regex::Regex;
use std::sync::LazyLock;

use crate::utils::code_generator::random_suffix;

/// Longest slug base derived from a title, before any suffix.
pub const MAX_SLUG_BASE: usize = 60;

/// Lowercase ASCII words separated by single hyphens.
pub static SLUG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid regex"));

/// Derives a slug from a title.
///
/// ASCII letters and digits are kept (lowercased); every other run of
/// characters becomes one hyphen. Returns `None` if the title has no ASCII
/// letters, since a purely numeric or non-Latin title gives no readable slug.
pub fn slugify(title: &str) -> Option<String> {
    if !title.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }

    slug.truncate(MAX_SLUG_BASE);
    Some(slug.trim_end_matches('-').to_string())
}

/// A slug candidate with a random suffix, used on collisions.
pub fn with_suffix(base: Option<&str>) -> String {
    match base {
        Some(base) => format!("{}-{}", base, random_suffix(6)),
        None => format!("program-{}", random_suffix(8)),
    }
}

pub fn is_valid_slug(slug: &str) -> bool {
    slug.len() <= MAX_SLUG_BASE + 10 && SLUG_REGEX.is_match(slug)
}
