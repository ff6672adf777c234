//! Bucketing schemes for continuous columns.
//!
//! Every scheme is a pure function of one track, implemented as a
//! `GroupKey`, so buckets are computed on the fly and the table is never
//! extended with derived columns.

use serde::Serialize;

use crate::aggregate::{GroupKey, GroupValue};
use crate::models::Track;

// ============================================================================
// Duration
// ============================================================================

/// Fixed duration bins in minutes, closed on the right: `(0, 2]`, `(2, 4]`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DurationScheme {
    /// Overview page: 0-2, 2-4, 4-6, 6-10, 10+.
    Overview,
    /// Duration detail page: 0-2, 2-3, 3-4, 4-5, 5+.
    Detail,
}

const OVERVIEW_EDGES: [f64; 6] = [0.0, 2.0, 4.0, 6.0, 10.0, 20.0];
const OVERVIEW_LABELS: [&str; 5] = ["0-2min", "2-4min", "4-6min", "6-10min", "10+min"];

const DETAIL_EDGES: [f64; 7] = [0.0, 2.0, 3.0, 4.0, 5.0, 10.0, 20.0];
const DETAIL_LABELS: [&str; 6] = ["0-2min", "2-3min", "3-4min", "4-5min", "5-10min", "10+min"];

impl DurationScheme {
    pub fn edges(self) -> &'static [f64] {
        match self {
            DurationScheme::Overview => &OVERVIEW_EDGES,
            DurationScheme::Detail => &DETAIL_EDGES,
        }
    }

    pub fn labels(self) -> &'static [&'static str] {
        match self {
            DurationScheme::Overview => &OVERVIEW_LABELS,
            DurationScheme::Detail => &DETAIL_LABELS,
        }
    }

    /// Bucket index and label for a duration.
    ///
    /// `None` for zero, negative, non-finite, or anything above the last edge.
    pub fn bucket(self, minutes: f64) -> Option<(usize, &'static str)> {
        let edges = self.edges();
        if !minutes.is_finite() {
            return None;
        }
        edges
            .windows(2)
            .position(|w| minutes > w[0] && minutes <= w[1])
            .map(|i| (i, self.labels()[i]))
    }
}

impl GroupKey for DurationScheme {
    fn key(&self, track: &Track) -> GroupValue {
        track
            .track_duration_min
            .and_then(|m| self.bucket(m))
            .map_or(GroupValue::Null, |(i, label)| GroupValue::Ordinal {
                rank: i as u32,
                label,
            })
    }
}

// ============================================================================
// Artist Popularity
// ============================================================================

pub const POPULARITY_BAND_LABELS: [&str; 5] = ["Very low", "Low", "Medium", "High", "Very high"];

/// Five equal-width bands over the observed artist popularity range,
/// closed on the right. The lowest observed value lands in the first band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PopularityBands {
    pub min: f64,
    pub max: f64,
}

impl PopularityBands {
    /// Fit bands to the finite values; `None` when there are none.
    pub fn fit<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        let mut range: Option<(f64, f64)> = None;
        for v in values.into_iter().filter(|v| v.is_finite()) {
            range = Some(match range {
                None => (v, v),
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
            });
        }
        range.map(|(min, max)| Self { min, max })
    }

    pub fn width(&self) -> f64 {
        (self.max - self.min) / POPULARITY_BAND_LABELS.len() as f64
    }

    /// Band of a value; `None` outside the fitted range.
    /// A degenerate range puts every value in the middle band.
    pub fn band(&self, value: f64) -> Option<(usize, &'static str)> {
        if !value.is_finite() || value < self.min || value > self.max {
            return None;
        }
        let last = POPULARITY_BAND_LABELS.len() - 1;
        let idx = if self.max == self.min {
            last / 2
        } else {
            let steps = ((value - self.min) / self.width()).ceil() as isize - 1;
            steps.clamp(0, last as isize) as usize
        };
        Some((idx, POPULARITY_BAND_LABELS[idx]))
    }
}

impl GroupKey for PopularityBands {
    fn key(&self, track: &Track) -> GroupValue {
        track
            .artist_popularity
            .and_then(|p| self.band(p))
            .map_or(GroupValue::Null, |(i, label)| GroupValue::Ordinal {
                rank: i as u32,
                label,
            })
    }
}

// ============================================================================
// Release Age
// ============================================================================

const AGE_BANDS: [(i32, i32, &str); 5] = [
    (0, 1, "0-1 years"),
    (2, 5, "2-5 years"),
    (6, 10, "6-10 years"),
    (11, 20, "11-20 years"),
    (21, i32::MAX, "20+ years"),
];

/// Album age relative to a reference year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgeBands {
    pub reference_year: i32,
}

impl AgeBands {
    pub fn new(reference_year: i32) -> Self {
        Self { reference_year }
    }

    /// Band for a release year; `None` for releases after the reference year.
    pub fn band(&self, release_year: i32) -> Option<(usize, &'static str)> {
        let age = self.reference_year.checked_sub(release_year)?;
        AGE_BANDS
            .iter()
            .position(|&(lo, hi, _)| age >= lo && age <= hi)
            .map(|i| (i, AGE_BANDS[i].2))
    }
}

impl GroupKey for AgeBands {
    fn key(&self, track: &Track) -> GroupValue {
        track
            .release_year()
            .and_then(|y| self.band(y))
            .map_or(GroupValue::Null, |(i, label)| GroupValue::Ordinal {
                rank: i as u32,
                label,
            })
    }
}

/// Calendar year of release, as a plain integer group.
pub struct ReleaseYear;

impl GroupKey for ReleaseYear {
    fn key(&self, track: &Track) -> GroupValue {
        track
            .release_year()
            .map_or(GroupValue::Null, |y| GroupValue::Int(i64::from(y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{released, scored, track, with_artist_stats};

    #[test]
    fn test_duration_overview_right_closed() {
        let s = DurationScheme::Overview;
        assert_eq!(s.bucket(2.0), Some((0, "0-2min")));
        assert_eq!(s.bucket(2.0001), Some((1, "2-4min")));
        assert_eq!(s.bucket(3.5), Some((1, "2-4min")));
        assert_eq!(s.bucket(10.0), Some((3, "6-10min")));
        assert_eq!(s.bucket(15.0), Some((4, "10+min")));
        assert_eq!(s.bucket(20.0), Some((4, "10+min")));
    }

    #[test]
    fn test_duration_out_of_range() {
        let s = DurationScheme::Overview;
        assert_eq!(s.bucket(0.0), None);
        assert_eq!(s.bucket(-1.0), None);
        assert_eq!(s.bucket(25.0), None);
        assert_eq!(s.bucket(f64::NAN), None);
        assert_eq!(s.key(&track("t", "a")), GroupValue::Null);
    }

    #[test]
    fn test_duration_detail() {
        let s = DurationScheme::Detail;
        assert_eq!(s.bucket(3.0), Some((1, "2-3min")));
        assert_eq!(s.bucket(3.4), Some((2, "3-4min")));
        assert_eq!(s.bucket(7.0), Some((4, "5-10min")));
        assert_eq!(
            s.key(&scored("t", "a", 50.0, 4.5)),
            GroupValue::Ordinal {
                rank: 3,
                label: "4-5min"
            }
        );
    }

    #[test]
    fn test_popularity_bands() {
        let bands = PopularityBands::fit(vec![0.0, 50.0, 100.0]).unwrap();
        assert_eq!(bands.width(), 20.0);
        assert_eq!(bands.band(0.0), Some((0, "Very low")));
        assert_eq!(bands.band(20.0), Some((0, "Very low")));
        assert_eq!(bands.band(21.0), Some((1, "Low")));
        assert_eq!(bands.band(50.0), Some((2, "Medium")));
        assert_eq!(bands.band(100.0), Some((4, "Very high")));
        assert_eq!(bands.band(101.0), None);

        let t = with_artist_stats(track("t", "a"), 85.0, 10);
        assert_eq!(
            bands.key(&t),
            GroupValue::Ordinal {
                rank: 4,
                label: "Very high"
            }
        );
    }

    #[test]
    fn test_popularity_bands_degenerate() {
        assert_eq!(PopularityBands::fit(Vec::<f64>::new()), None);
        let bands = PopularityBands::fit(vec![42.0, f64::NAN, 42.0]).unwrap();
        assert_eq!(bands.band(42.0), Some((2, "Medium")));
    }

    #[test]
    fn test_age_bands() {
        let bands = AgeBands::new(2024);
        assert_eq!(bands.band(2024), Some((0, "0-1 years")));
        assert_eq!(bands.band(2023), Some((0, "0-1 years")));
        assert_eq!(bands.band(2019), Some((1, "2-5 years")));
        assert_eq!(bands.band(2004), Some((3, "11-20 years")));
        assert_eq!(bands.band(1990), Some((4, "20+ years")));
        assert_eq!(bands.band(2030), None);
        assert_eq!(
            bands.key(&released(track("t", "a"), 2016)),
            GroupValue::Ordinal {
                rank: 2,
                label: "6-10 years"
            }
        );
    }

    #[test]
    fn test_release_year_key() {
        assert_eq!(ReleaseYear.key(&released(track("t", "a"), 1999)), GroupValue::Int(1999));
        assert_eq!(ReleaseYear.key(&track("t", "a")), GroupValue::Null);
    }
}
