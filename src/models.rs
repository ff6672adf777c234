//! Core data models for the track insights pipeline.
//!
//! This module contains the typed track record, the immutable table that
//! every view reads from, column identifiers for generic aggregation, and
//! the load instrumentation counters.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::ops::Deref;

use crate::error::{InsightsError, Result};

// ============================================================================
// Source Schema
// ============================================================================

pub const COL_TRACK_NAME: &str = "track_name";
pub const COL_ARTIST_NAME: &str = "artist_name";
pub const COL_ARTIST_POPULARITY: &str = "artist_popularity";
pub const COL_ARTIST_FOLLOWERS: &str = "artist_followers";
pub const COL_ARTIST_GENRES: &str = "artist_genres";
pub const COL_ALBUM_NAME: &str = "album_name";
pub const COL_ALBUM_RELEASE_DATE: &str = "album_release_date";
pub const COL_ALBUM_TYPE: &str = "album_type";
pub const COL_TRACK_POPULARITY: &str = "track_popularity";
pub const COL_TRACK_DURATION_MIN: &str = "track_duration_min";
pub const COL_EXPLICIT: &str = "explicit";

/// The eleven canonical columns, in the order they are selected from the source.
pub const SOURCE_COLUMNS: [&str; 11] = [
    COL_TRACK_NAME,
    COL_ARTIST_NAME,
    COL_ARTIST_POPULARITY,
    COL_ARTIST_FOLLOWERS,
    COL_ARTIST_GENRES,
    COL_ALBUM_NAME,
    COL_ALBUM_RELEASE_DATE,
    COL_ALBUM_TYPE,
    COL_TRACK_POPULARITY,
    COL_TRACK_DURATION_MIN,
    COL_EXPLICIT,
];

// ============================================================================
// Categorical Columns
// ============================================================================

/// Tri-state explicit flag. Labels follow the dataset's display language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Explicit {
    Yes,
    No,
    Unknown,
}

impl Explicit {
    pub fn label(self) -> &'static str {
        match self {
            Explicit::Yes => "Sim",
            Explicit::No => "Não",
            Explicit::Unknown => "Não informado",
        }
    }

    /// Strict mapping from a raw source cell.
    ///
    /// Only booleans and empty/missing markers are defined; any other token
    /// is an error so schema drift is not masked as "unknown".
    pub fn from_source(raw: Option<&str>) -> Result<Explicit> {
        let Some(raw) = raw else {
            return Ok(Explicit::Unknown);
        };
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" | "1.0" => Ok(Explicit::Yes),
            "false" | "0" | "0.0" => Ok(Explicit::No),
            "" | "nan" | "null" | "none" | "na" => Ok(Explicit::Unknown),
            _ => Err(InsightsError::UnrecognizedExplicit(trimmed.to_string())),
        }
    }
}

/// Album release type. Anything outside the fixed set is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AlbumType {
    Album,
    Single,
    Compilation,
    Unknown,
}

impl AlbumType {
    pub fn as_str(self) -> &'static str {
        match self {
            AlbumType::Album => "album",
            AlbumType::Single => "single",
            AlbumType::Compilation => "compilation",
            AlbumType::Unknown => "unknown",
        }
    }

    /// The selectable album types, in display order.
    pub fn known() -> [AlbumType; 3] {
        [AlbumType::Album, AlbumType::Single, AlbumType::Compilation]
    }
}

impl From<Option<&str>> for AlbumType {
    fn from(s: Option<&str>) -> Self {
        match s.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("album") => AlbumType::Album,
            Some("single") => AlbumType::Single,
            Some("compilation") => AlbumType::Compilation,
            _ => AlbumType::Unknown,
        }
    }
}

// ============================================================================
// Track Record
// ============================================================================

/// One song. Artist attributes are denormalized onto every track of that artist.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub track_name: String,
    pub artist_name: String, // raw, as found in the source
    pub album_name: Option<String>,
    pub track_popularity: Option<f64>,   // 0-100
    pub track_duration_min: Option<f64>, // minutes
    pub album_type: AlbumType,
    pub explicit: Explicit,
    pub album_release_date: Option<NaiveDate>,
    pub artist_popularity: Option<f64>, // 0-100
    pub artist_followers: Option<u64>,
    pub artist_genres: Option<String>, // raw comma-delimited string
}

impl Track {
    pub fn release_year(&self) -> Option<i32> {
        self.album_release_date.map(|d| d.year())
    }
}

// ============================================================================
// Column Access
// ============================================================================

/// Column identifier for generic grouping and measuring.
///
/// Covers the eleven stored fields plus two derived numeric columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Field {
    TrackName,
    ArtistName,
    AlbumName,
    AlbumType,
    Explicit,
    ArtistGenres,
    AlbumReleaseDate,
    TrackPopularity,
    TrackDurationMin,
    ArtistPopularity,
    ArtistFollowers,
    /// Year of `album_release_date`.
    ReleaseYear,
    /// 1.0 for explicit tracks, 0.0 otherwise. Its mean is the explicit share.
    ExplicitFlag,
}

/// A single cell value, borrowed from the track where possible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Null,
    Number(f64),
    Text(&'a str),
    Date(NaiveDate),
}

impl Field {
    /// Numeric columns compared on the correlation page.
    pub const CORRELATED: [Field; 4] = [
        Field::TrackPopularity,
        Field::ArtistPopularity,
        Field::TrackDurationMin,
        Field::ArtistFollowers,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::TrackName => COL_TRACK_NAME,
            Field::ArtistName => COL_ARTIST_NAME,
            Field::AlbumName => COL_ALBUM_NAME,
            Field::AlbumType => COL_ALBUM_TYPE,
            Field::Explicit => COL_EXPLICIT,
            Field::ArtistGenres => COL_ARTIST_GENRES,
            Field::AlbumReleaseDate => COL_ALBUM_RELEASE_DATE,
            Field::TrackPopularity => COL_TRACK_POPULARITY,
            Field::TrackDurationMin => COL_TRACK_DURATION_MIN,
            Field::ArtistPopularity => COL_ARTIST_POPULARITY,
            Field::ArtistFollowers => COL_ARTIST_FOLLOWERS,
            Field::ReleaseYear => "release_year",
            Field::ExplicitFlag => "explicit_flag",
        }
    }

    pub fn value(self, track: &Track) -> Value<'_> {
        match self {
            Field::TrackName => Value::Text(&track.track_name),
            Field::ArtistName => Value::Text(&track.artist_name),
            Field::AlbumName => track.album_name.as_deref().map_or(Value::Null, Value::Text),
            Field::AlbumType => Value::Text(track.album_type.as_str()),
            Field::Explicit => Value::Text(track.explicit.label()),
            Field::ArtistGenres => track
                .artist_genres
                .as_deref()
                .map_or(Value::Null, Value::Text),
            Field::AlbumReleaseDate => track.album_release_date.map_or(Value::Null, Value::Date),
            _ => self.number(track).map_or(Value::Null, Value::Number),
        }
    }

    /// Numeric projection; `None` for nulls and non-numeric columns.
    pub fn number(self, track: &Track) -> Option<f64> {
        match self {
            Field::TrackPopularity => track.track_popularity,
            Field::TrackDurationMin => track.track_duration_min,
            Field::ArtistPopularity => track.artist_popularity,
            Field::ArtistFollowers => track.artist_followers.map(|f| f as f64),
            Field::ReleaseYear => track.release_year().map(f64::from),
            Field::ExplicitFlag => Some(if track.explicit == Explicit::Yes {
                1.0
            } else {
                0.0
            }),
            _ => None,
        }
        .filter(|v| v.is_finite())
    }
}

// ============================================================================
// Table
// ============================================================================

/// The normalized dataset. Built once by the loader, never mutated afterwards.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    rows: Vec<Track>,
}

impl Table {
    pub fn new(rows: Vec<Track>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Track] {
        &self.rows
    }

    /// Number of canonical columns, for summary displays.
    pub fn column_count(&self) -> usize {
        SOURCE_COLUMNS.len()
    }

    /// Rows matching `pred`, borrowed.
    pub fn filter<F>(&self, pred: F) -> Vec<&Track>
    where
        F: Fn(&Track) -> bool,
    {
        self.rows.iter().filter(|t| pred(t)).collect()
    }
}

impl Deref for Table {
    type Target = [Track];

    fn deref(&self) -> &[Track] {
        &self.rows
    }
}

impl FromIterator<Track> for Table {
    fn from_iter<I: IntoIterator<Item = Track>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Track;
    type IntoIter = std::slice::Iter<'a, Track>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Data-quality counters collected while loading.
/// Value-level noise is recovered locally and only shows up here.
#[derive(Default, Debug, Clone, PartialEq, Serialize)]
pub struct LoadStats {
    pub total_records: usize,
    pub malformed_records: usize,

    // Row filter
    pub dropped_missing_track_name: usize,
    pub dropped_missing_artist_name: usize,

    // Value coercions
    pub invalid_numbers: usize,
    pub invalid_dates: usize,
    pub missing_dates: usize,
    pub unknown_explicit: usize,
    pub unrecognized_explicit: usize,
    pub unknown_album_types: usize,

    pub retained_rows: usize,

    // Timing
    pub elapsed_seconds: f64,
}

impl LoadStats {
    pub fn dropped_rows(&self) -> usize {
        self.dropped_missing_track_name + self.dropped_missing_artist_name
    }

    /// Percentage of well-formed records that survived the row filter.
    pub fn retention_rate(&self) -> f64 {
        let considered = self.total_records - self.malformed_records;
        if considered == 0 {
            0.0
        } else {
            100.0 * self.retained_rows as f64 / considered as f64
        }
    }

    /// Log stats to stderr in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
