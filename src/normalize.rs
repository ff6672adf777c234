//! Artist name normalization.
//!
//! Two different outputs come from a raw artist name:
//! - the canonical display name (`normalize_artist_name`): trimmed, symbol
//!   runs at both ends removed, title-cased unless it looks like an acronym;
//! - the match key (`artist_match_key`): ASCII-folded and lower-cased, for
//!   lookups that should ignore casing and diacritics.
//!
//! Both are pure functions of the raw string.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use unicode_normalization::UnicodeNormalization;

use crate::models::Track;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Leading run of anything that is not a letter or digit ("*NSYNC", zero-width spaces).
pub static LEADING_SYMBOLS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\p{L}\p{N}]+").unwrap());

/// Trailing run of anything that is not a letter or digit ("NSYNC*", "Artist!!").
pub static TRAILING_SYMBOLS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+$").unwrap());

/// Regex to collapse multiple whitespace into single space
pub static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Minimum Jaro-Winkler similarity for a fuzzy artist suggestion.
pub const SUGGESTION_THRESHOLD: f64 = 0.75;

// ============================================================================
// CASING
// ============================================================================

fn is_cased(c: char) -> bool {
    c.is_uppercase() || c.is_lowercase()
}

/// At least one cased character and no lower-case one ("NSYNC", "AC/DC", "2PAC").
pub fn is_all_upper(s: &str) -> bool {
    s.chars().any(char::is_uppercase) && !s.chars().any(char::is_lowercase)
}

/// Map a char through a case conversion only when it stays a single char.
/// Multi-char expansions ("ß" → "SS") would break idempotence.
fn single_char_case<I: Iterator<Item = char>>(c: char, mut mapped: I) -> char {
    match (mapped.next(), mapped.next()) {
        (Some(m), None) => m,
        _ => c,
    }
}

/// Word-wise title case: a cased char following a non-cased char starts a word.
/// Boundaries are judged on the output, so titlecase digraphs ("ǅ") behave the
/// same on a second pass.
/// "sum 41" → "Sum 41", "the weeknd" → "The Weeknd", "o'neil" → "O'Neil".
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_cased = false;
    for c in s.chars() {
        let mapped = if prev_cased {
            single_char_case(c, c.to_lowercase())
        } else {
            single_char_case(c, c.to_uppercase())
        };
        out.push(mapped);
        prev_cased = is_cased(mapped);
    }
    out
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Canonical display name for a raw artist name.
///
/// Returns `None` for a missing name or one with no letters/digits at all.
/// Fully upper-case names are treated as intentional acronyms and kept verbatim.
pub fn normalize_artist_name(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    let stripped = LEADING_SYMBOLS.replace(trimmed, "");
    let stripped = TRAILING_SYMBOLS.replace(&stripped, "");

    if stripped.is_empty() {
        return None;
    }
    if is_all_upper(&stripped) {
        return Some(stripped.into_owned());
    }
    Some(title_case(&stripped))
}

pub fn is_combining_mark(c: char) -> bool {
    matches!(c, '\u{0300}'..='\u{036F}' | '\u{1AB0}'..='\u{1AFF}' |
             '\u{1DC0}'..='\u{1DFF}' | '\u{20D0}'..='\u{20FF}' |
             '\u{FE20}'..='\u{FE2F}')
}

/// Fold to lower-case ASCII: strip diacritics, then transliterate the rest.
pub fn fold_to_ascii(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    any_ascii(&stripped).to_lowercase()
}

/// Case- and accent-insensitive key for matching artist names.
/// "Beyoncé" and "BEYONCE" share a key; "Guns N' Roses" and "guns n roses" do not.
pub fn artist_match_key(name: &str) -> String {
    let folded = fold_to_ascii(name).replace(" & ", " and ");
    MULTI_SPACE.replace_all(folded.trim(), " ").into_owned()
}

/// Sorted, de-duplicated canonical names for an artist selector.
pub fn canonical_artist_names<'a, I>(rows: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Track>,
{
    rows.into_iter()
        .filter_map(|t| normalize_artist_name(Some(&t.artist_name)))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ============================================================================
// FUZZY LOOKUP
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ArtistSuggestion {
    pub name: String,
    pub score: f64,
}

/// Rank `names` against a free-text query.
///
/// Exact key matches score 1.0, substring matches at least 0.9, everything
/// else by Jaro-Winkler over match keys. Ties keep `names` order.
pub fn suggest_artists(names: &[String], query: &str, limit: usize) -> Vec<ArtistSuggestion> {
    let query_key = artist_match_key(query);
    if query_key.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<ArtistSuggestion> = names
        .iter()
        .filter_map(|name| {
            let key = artist_match_key(name);
            let similarity = strsim::jaro_winkler(&key, &query_key);
            let score = if key == query_key {
                1.0
            } else if key.contains(&query_key) {
                similarity.max(0.9)
            } else {
                similarity
            };
            (score >= SUGGESTION_THRESHOLD).then(|| ArtistSuggestion {
                name: name.clone(),
                score,
            })
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(limit);
    scored
}

// ============================================================================
// TESTS
// ============================================================================
