//! Genre tags: parsing, corpus frequencies and pairwise co-occurrence.
//!
//! Every consumer reads the same parsed representation (`TagIndex`), so
//! frequency counts, co-occurrence and genre filters cannot drift apart.

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::models::Track;

/// Pairs seen on fewer rows than this are left out of co-occurrence results.
pub const DEFAULT_MIN_COOCCURRENCE: usize = 5;

/// Genre strings meaning "no genre data". Compared case-insensitively.
pub const NO_GENRE_SENTINELS: [&str; 2] = ["not available", "n/a"];

fn is_sentinel(tag: &str) -> bool {
    NO_GENRE_SENTINELS
        .iter()
        .any(|s| tag.eq_ignore_ascii_case(s))
}

/// Split a raw comma-delimited genre string into a tag set.
///
/// Segments are trimmed; empty segments and sentinels are dropped. Case is
/// preserved, so "Pop" and "pop" stay distinct tags.
pub fn parse_tags(raw: Option<&str>) -> BTreeSet<String> {
    let Some(raw) = raw else {
        return BTreeSet::new();
    };
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty() && !is_sentinel(tag))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Unordered tag pair, stored with `a < b`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagPair {
    pub a: String,
    pub b: String,
    pub count: usize,
}

/// Parsed tag sets, one per table row, in table order.
#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    tags: Vec<BTreeSet<String>>,
}

impl TagIndex {
    pub fn build(rows: &[Track]) -> Self {
        let tags = rows
            .par_iter()
            .map(|t| parse_tags(t.artist_genres.as_deref()))
            .collect();
        Self { tags }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tags of the row at `idx`; empty for out-of-range indices.
    pub fn tags(&self, idx: usize) -> &BTreeSet<String> {
        static EMPTY: BTreeSet<String> = BTreeSet::new();
        self.tags.get(idx).unwrap_or(&EMPTY)
    }

    /// Per-row tag frequencies: a tag is counted once for every track carrying it.
    /// Ordered by count descending, then tag.
    pub fn tag_counts(&self) -> Vec<TagCount> {
        let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
        for set in &self.tags {
            for tag in set {
                *counts.entry(tag.as_str()).or_default() += 1;
            }
        }
        let mut out: Vec<TagCount> = counts
            .into_iter()
            .map(|(tag, count)| TagCount {
                tag: tag.to_string(),
                count,
            })
            .collect();
        out.sort_by(|x, y| y.count.cmp(&x.count).then_with(|| x.tag.cmp(&y.tag)));
        out
    }

    /// Sorted list of every distinct tag.
    pub fn all_tags(&self) -> Vec<String> {
        self.tags
            .iter()
            .flatten()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Pair counts over rows, pairs below `min_count` excluded.
    ///
    /// Quadratic in tags per row, which is small. Ordered by count
    /// descending, then lexicographically by pair.
    pub fn cooccurrence(&self, min_count: usize) -> Vec<TagPair> {
        let mut pairs: FxHashMap<(&str, &str), usize> = FxHashMap::default();
        for set in &self.tags {
            // BTreeSet iteration is sorted, so (a, b) is already canonical
            let tags: Vec<&str> = set.iter().map(String::as_str).collect();
            for i in 0..tags.len() {
                for j in (i + 1)..tags.len() {
                    *pairs.entry((tags[i], tags[j])).or_default() += 1;
                }
            }
        }

        let mut out: Vec<TagPair> = pairs
            .into_iter()
            .filter(|(_, count)| *count >= min_count)
            .map(|((a, b), count)| TagPair {
                a: a.to_string(),
                b: b.to_string(),
                count,
            })
            .collect();
        out.sort_by(|x, y| {
            y.count
                .cmp(&x.count)
                .then_with(|| (&x.a, &x.b).cmp(&(&y.a, &y.b)))
        });
        out
    }

    /// Every row of every artist that carries `tag` on at least one row.
    /// `rows` must be the slice this index was built from.
    pub fn rows_with_tag<'a>(&self, rows: &'a [Track], tag: &str) -> Vec<&'a Track> {
        debug_assert_eq!(rows.len(), self.tags.len());
        let artists: FxHashSet<&str> = rows
            .iter()
            .zip(&self.tags)
            .filter(|(_, set)| set.contains(tag))
            .map(|(t, _)| t.artist_name.as_str())
            .collect();
        rows.iter()
            .filter(|t| artists.contains(t.artist_name.as_str()))
            .collect()
    }
}

/// Tag frequencies for a whole table.
pub fn corpus_tag_counts(rows: &[Track]) -> Vec<TagCount> {
    TagIndex::build(rows).tag_counts()
}

/// Tag pair co-occurrence for a whole table.
pub fn cooccurrence(rows: &[Track], min_count: usize) -> Vec<TagPair> {
    TagIndex::build(rows).cooccurrence(min_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{track, with_genres};

    fn set(tags: &[&str]) -> BTreeSet<String> {
        tags.iter().map(|s| s.to_string()).collect()
    }

    fn rows(genres: &[&str]) -> Vec<Track> {
        genres
            .iter()
            .enumerate()
            .map(|(i, g)| with_genres(track(&format!("t{}", i), &format!("a{}", i)), g))
            .collect()
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags(None), BTreeSet::new());
        assert_eq!(parse_tags(Some("Pop, Pop, rock")), set(&["Pop", "rock"]));
        assert_eq!(parse_tags(Some("pop, Pop")), set(&["Pop", "pop"]));
        assert_eq!(parse_tags(Some(" , indie ,, ")), set(&["indie"]));
        assert_eq!(parse_tags(Some("not available")), BTreeSet::new());
        assert_eq!(parse_tags(Some("Not Available, jazz")), set(&["jazz"]));
        assert_eq!(parse_tags(Some("N/A")), BTreeSet::new());
    }

    #[test]
    fn test_tag_counts_per_row() {
        let mut table = rows(&["pop, rock", "pop", "jazz"]);
        // Same artist twice: counted once per track
        table.push(with_genres(track("t3", "a1"), "pop"));
        let counts = corpus_tag_counts(&table);
        assert_eq!(
            counts[0],
            TagCount {
                tag: "pop".to_string(),
                count: 3
            }
        );
        assert_eq!(counts[1].tag, "jazz");
        assert_eq!(counts[2].tag, "rock");
    }

    #[test]
    fn test_cooccurrence_symmetric() {
        let table = rows(&["Pop, Rock", "Rock, Pop"]);
        let pairs = cooccurrence(&table, 1);
        assert_eq!(
            pairs,
            vec![TagPair {
                a: "Pop".to_string(),
                b: "Rock".to_string(),
                count: 2
            }]
        );
    }

    #[test]
    fn test_cooccurrence_threshold_and_order() {
        let mut genres = vec!["a, b"; 5];
        genres.extend(vec!["c, d"; 6]);
        genres.extend(vec!["a, c"; 5]);
        genres.extend(vec!["x, y"; 4]);
        let pairs = cooccurrence(&rows(&genres), DEFAULT_MIN_COOCCURRENCE);
        let keys: Vec<(&str, &str, usize)> = pairs
            .iter()
            .map(|p| (p.a.as_str(), p.b.as_str(), p.count))
            .collect();
        assert_eq!(keys, vec![("c", "d", 6), ("a", "b", 5), ("a", "c", 5)]);
    }

    #[test]
    fn test_cooccurrence_ignores_duplicate_tags() {
        let pairs = cooccurrence(&rows(&["pop, pop, rock"]), 1);
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].a.as_str(), pairs[0].b.as_str()), ("pop", "rock"));
    }

    #[test]
    fn test_rows_with_tag_by_artist() {
        let table = vec![
            with_genres(track("t0", "alpha"), "pop"),
            track("t1", "alpha"),
            with_genres(track("t2", "beta"), "rock"),
        ];
        let index = TagIndex::build(&table);
        let hits = index.rows_with_tag(&table, "pop");
        let names: Vec<&str> = hits.iter().map(|t| t.track_name.as_str()).collect();
        assert_eq!(names, vec!["t0", "t1"]);
        assert!(index.rows_with_tag(&table, "metal").is_empty());
        assert_eq!(index.all_tags(), vec!["pop".to_string(), "rock".to_string()]);
        assert!(index.tags(1).is_empty());
        assert!(index.tags(99).is_empty());
    }
}
