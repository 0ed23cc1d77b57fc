//! Slug generation for public maps: lowercase, URL-safe, deduplicated.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref INVALID_CHARS: Regex = Regex::new(r"[^a-z0-9-]").unwrap();
    static ref DASH_RUN: Regex = Regex::new(r"-{2,}").unwrap();
}

const MIN_LEN: usize = 3;
const MAX_LEN: usize = 50;
const FALLBACK: &str = "public-map";

/// Normalise arbitrary input into a URL-safe slug candidate.
///
/// - lowercase
/// - every character outside `[a-z0-9-]` becomes `-`
/// - runs of `-` collapse to one
/// - leading/trailing `-` trimmed
/// - too-short results are prefixed with `map-`
/// - result truncated to 50 characters, re-trimmed
/// - empty input yields `"public-map"`
///
/// `slugify` is idempotent: `slugify(&slugify(s)) == slugify(s)`.
pub fn slugify(input: &str) -> String {
    let lower = input.to_lowercase();
    let replaced = INVALID_CHARS.replace_all(&lower, "-");
    let collapsed = DASH_RUN.replace_all(&replaced, "-");
    let mut trimmed = collapsed.trim_matches('-').to_string();

    if trimmed.len() < MIN_LEN && !trimmed.is_empty() {
        trimmed = format!("map-{trimmed}");
    }

    if trimmed.is_empty() {
        return FALLBACK.to_string();
    }

    if trimmed.len() > MAX_LEN {
        trimmed.truncate(MAX_LEN);
        trimmed = trimmed.trim_end_matches('-').to_string();
    }

    if trimmed.is_empty() {
        return FALLBACK.to_string();
    }

    trimmed
}

/// Append the lowest unused `-{n}` suffix, starting at 1, given a predicate
/// that reports whether a candidate is already taken.
pub fn disambiguate(base: &str, mut is_taken: impl FnMut(&str) -> bool) -> String {
    if !is_taken(base) {
        return base.to_string();
    }
    let mut n = 1u32;
    loop {
        let candidate = format!("{base}-{n}");
        if !is_taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_slugify() {
        assert_eq!(slugify("My Map"), "my-map");
        assert_eq!(slugify("  Weird!! Name__2  "), "weird-name-2");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(slugify(""), "public-map");
        assert_eq!(slugify("###"), "public-map");
    }

    #[test]
    fn test_short_input_prefixed() {
        assert_eq!(slugify("ab"), "map-ab");
    }

    #[test]
    fn test_truncation() {
        let long = "a".repeat(80);
        let s = slugify(&long);
        assert!(s.len() <= MAX_LEN);
    }

    #[test]
    fn test_idempotent() {
        for input in ["My Map!!", "", "ab", &"x".repeat(100), "a--b---c"] {
            let once = slugify(input);
            let twice = slugify(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
            assert!(once.len() >= MIN_LEN && once.len() <= MAX_LEN);
            assert!(!once.starts_with('-') && !once.ends_with('-'));
            assert!(!once.contains("--"));
        }
    }

    #[test]
    fn test_disambiguate_collision() {
        let taken = ["my-map", "my-map-1"];
        let result = disambiguate("my-map", |c| taken.contains(&c));
        assert_eq!(result, "my-map-2");
    }

    #[test]
    fn test_disambiguate_no_collision() {
        let result = disambiguate("free-slug", |_| false);
        assert_eq!(result, "free-slug");
    }
}
