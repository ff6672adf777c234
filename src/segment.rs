//! Rule-based artist segmentation.
//!
//! Rules form a priority cascade: they are evaluated in order and the first
//! match wins, so the same thresholds in a different order give different
//! labels. A mandatory fallback makes the cascade total.

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::aggregate::{GroupKey, GroupValue};
use crate::models::Track;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Segment {
    Superstar,
    Star,
    Emerging,
    Promising,
    Independent,
}

impl Segment {
    pub const ALL: [Segment; 5] = [
        Segment::Superstar,
        Segment::Star,
        Segment::Emerging,
        Segment::Promising,
        Segment::Independent,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Segment::Superstar => "Superstars",
            Segment::Star => "Stars",
            Segment::Emerging => "Emerging",
            Segment::Promising => "Promising",
            Segment::Independent => "Independent",
        }
    }

    /// Position in the default cascade, top tier first.
    pub fn rank(self) -> u32 {
        self as u32
    }
}

/// A rule condition. Null attributes never satisfy a threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Popularity and followers both at or above the minimums.
    AtLeast { popularity: f64, followers: u64 },
    PopularityAtLeast(f64),
    FollowersAtLeast(u64),
}

impl Predicate {
    pub fn matches(&self, popularity: Option<f64>, followers: Option<u64>) -> bool {
        match *self {
            Predicate::AtLeast {
                popularity: min_pop,
                followers: min_followers,
            } => {
                popularity.is_some_and(|p| p >= min_pop)
                    && followers.is_some_and(|f| f >= min_followers)
            }
            Predicate::PopularityAtLeast(min) => popularity.is_some_and(|p| p >= min),
            Predicate::FollowersAtLeast(min) => followers.is_some_and(|f| f >= min),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentRule {
    pub predicate: Predicate,
    pub label: Segment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentRules {
    pub rules: Vec<SegmentRule>,
    pub fallback: Segment,
}

impl Default for SegmentRules {
    fn default() -> Self {
        let rule = |popularity: f64, followers: u64, label: Segment| SegmentRule {
            predicate: Predicate::AtLeast {
                popularity,
                followers,
            },
            label,
        };
        Self {
            rules: vec![
                rule(80.0, 5_000_000, Segment::Superstar),
                rule(65.0, 1_000_000, Segment::Star),
                rule(50.0, 100_000, Segment::Emerging),
                rule(35.0, 10_000, Segment::Promising),
            ],
            fallback: Segment::Independent,
        }
    }
}

impl SegmentRules {
    pub fn new(rules: Vec<SegmentRule>, fallback: Segment) -> Self {
        Self { rules, fallback }
    }

    /// First matching rule's label, else the fallback.
    pub fn assign(&self, popularity: Option<f64>, followers: Option<u64>) -> Segment {
        self.rules
            .iter()
            .find(|r| r.predicate.matches(popularity, followers))
            .map_or(self.fallback, |r| r.label)
    }

    pub fn assign_track(&self, track: &Track) -> Segment {
        self.assign(track.artist_popularity, track.artist_followers)
    }
}

impl GroupKey for SegmentRules {
    fn key(&self, track: &Track) -> GroupValue {
        let segment = self.assign_track(track);
        GroupValue::Ordinal {
            rank: segment.rank(),
            label: segment.label(),
        }
    }
}

/// Segment under the default rules.
pub fn segment(popularity: f64, followers: u64) -> Segment {
    SegmentRules::default().assign(Some(popularity), Some(followers))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistSegment {
    pub artist_name: String,
    pub artist_popularity: Option<f64>,
    pub artist_followers: Option<u64>,
    pub segment: Segment,
}

/// One entry per artist, taken from that artist's first row.
///
/// Artist attributes are denormalized, so any row would do; the first keeps
/// output in table order.
pub fn segment_artists(rows: &[Track], rules: &SegmentRules) -> Vec<ArtistSegment> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    rows.iter()
        .filter(|t| seen.insert(t.artist_name.as_str()))
        .map(|t| ArtistSegment {
            artist_name: t.artist_name.clone(),
            artist_popularity: t.artist_popularity,
            artist_followers: t.artist_followers,
            segment: rules.assign_track(t),
        })
        .collect()
}
