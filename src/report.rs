//! Page-level views.
//!
//! Each function turns a `Dataset` (plus the page's selection parameters)
//! into a plain serializable struct. An empty selection yields `None` or an
//! empty list; a derived figure with too little data yields `None` for that
//! figure only.

use serde::Serialize;

use crate::aggregate::{group_stat, mean, numbers, top_n, top_tracks, value_counts, GroupKey, GroupValue, Order, StatOp};
use crate::buckets::DurationScheme;
use crate::correlation::{correlation_matrix, fit_fields, fit_trend, CorrelatedPair, CorrelationMatrix, Trend};
use crate::dataset::Dataset;
use crate::genre::{TagCount, TagPair};
use crate::models::{AlbumType, Field, Track};
use crate::normalize::normalize_artist_name;
use crate::outliers::{counts_per_group, detect, OutlierScope};
use crate::segment::{Segment, SegmentRules};

/// First year shown in the yearly evolution series.
pub const TEMPORAL_START_YEAR: i32 = 2010;
pub const TOP_ARTISTS: usize = 10;
/// Candidate pool for the shortest/longest hit lists.
pub const DURATION_EXTREME_POOL: usize = 10;
pub const DURATION_HITS: usize = 5;

// ============================================================================
// Shared Rows
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSummary {
    pub track_name: String,
    pub artist_name: String,
    pub album_name: Option<String>,
    pub track_popularity: Option<f64>,
    pub track_duration_min: Option<f64>,
}

impl From<&Track> for TrackSummary {
    fn from(t: &Track) -> Self {
        Self {
            track_name: t.track_name.clone(),
            artist_name: t.artist_name.clone(),
            album_name: t.album_name.clone(),
            track_popularity: t.track_popularity,
            track_duration_min: t.track_duration_min,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearCount {
    pub year: i64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelCount {
    pub label: GroupValue,
    pub count: usize,
}

/// Track popularity within one category of a bucketing scheme.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStat {
    pub category: GroupValue,
    pub tracks: usize,
    pub mean_popularity: Option<f64>,
    pub median_popularity: Option<f64>,
    /// Tracks above the category's own upper IQR fence.
    pub outliers_above: usize,
}

fn category_stats<K: GroupKey>(rows: &[Track], key: &K) -> Vec<CategoryStat> {
    let stats = group_stat(
        rows,
        key,
        &[
            (Field::TrackPopularity, StatOp::Mean),
            (Field::TrackPopularity, StatOp::Median),
        ],
    );
    let outliers = counts_per_group(rows, Field::TrackPopularity, key);

    stats
        .rows
        .into_iter()
        .filter(|r| !r.key.is_null())
        .map(|r| {
            let outliers_above = outliers
                .iter()
                .find(|(k, _)| *k == r.key)
                .map_or(0, |(_, o)| o.above.len());
            CategoryStat {
                tracks: r.size,
                mean_popularity: r.values[0],
                median_popularity: r.values[1],
                outliers_above,
                category: r.key,
            }
        })
        .collect()
}

/// First category with the extreme value of `metric`, in category order.
fn pick<F>(cats: &[CategoryStat], metric: F, order: Order) -> Option<GroupValue>
where
    F: Fn(&CategoryStat) -> Option<f64>,
{
    top_n(cats, metric, 1, order)
        .into_iter()
        .next()
        .map(|c| c.category)
}

fn releases_per_year<'a, I>(rows: I) -> Vec<YearCount>
where
    I: IntoIterator<Item = &'a Track>,
{
    let mut years: Vec<YearCount> = value_counts(rows, &Field::ReleaseYear)
        .into_iter()
        .filter_map(|(k, count)| Some(YearCount { year: k.as_int()?, count }))
        .collect();
    years.sort_by_key(|y| y.year);
    years
}

fn display_artist(raw: &str) -> String {
    normalize_artist_name(Some(raw)).unwrap_or_else(|| raw.to_string())
}

// ============================================================================
// Home
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomeSummary {
    pub rows: usize,
    pub columns: usize,
    pub unique_artists: usize,
    pub unique_albums: usize,
    pub album_types: usize,
    pub most_popular_artist: Option<String>,
    pub mean_popularity: Option<f64>,
    pub mean_duration_min: Option<f64>,
}

pub fn home_summary(ds: &Dataset) -> HomeSummary {
    let table = ds.table();
    let all = |_: &Track| GroupValue::Null;
    let stats = group_stat(
        table,
        &all,
        &[
            (Field::ArtistName, StatOp::NUnique),
            (Field::AlbumName, StatOp::NUnique),
        ],
    );
    let nunique = |i: usize| {
        stats
            .rows
            .first()
            .and_then(|r| r.values[i])
            .map_or(0, |v| v as usize)
    };

    let album_types = AlbumType::known()
        .iter()
        .filter(|at| table.iter().any(|t| t.album_type == **at))
        .count();
    let most_popular_artist = top_tracks(table, Field::ArtistPopularity, 1, Order::Descending)
        .first()
        .filter(|t| t.artist_popularity.is_some())
        .map(|t| display_artist(&t.artist_name));

    HomeSummary {
        rows: table.len(),
        columns: table.column_count(),
        unique_artists: nunique(0),
        unique_albums: nunique(1),
        album_types,
        most_popular_artist,
        mean_popularity: mean(&numbers(table, Field::TrackPopularity)),
        mean_duration_min: mean(&numbers(table, Field::TrackDurationMin)),
    }
}

// ============================================================================
// Overview
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistScore {
    pub artist_name: String,
    pub mean_artist_popularity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub duration_categories: Vec<CategoryStat>,
    pub most_common_duration: Option<GroupValue>,
    pub most_popular_duration: Option<GroupValue>,
    /// Lowest median popularity.
    pub least_popular_duration: Option<GroupValue>,
    pub most_outliers_duration: Option<GroupValue>,
    pub popularity_bands: Vec<CategoryStat>,
    pub album_types: Vec<LabelCount>,
    pub top_artists: Vec<ArtistScore>,
    pub releases_per_year: Vec<YearCount>,
    /// Least-squares slope of releases per year; `None` with fewer than two years.
    pub release_trend_slope: Option<f64>,
    pub peak_year: Option<YearCount>,
    pub quietest_year: Option<YearCount>,
}

pub fn overview(ds: &Dataset) -> Overview {
    let table = ds.table();
    let durations = category_stats(table, &DurationScheme::Overview);
    let popularity_bands = ds
        .popularity_bands()
        .map(|bands| category_stats(table, &bands))
        .unwrap_or_default();

    let album_types = value_counts(table, &Field::AlbumType)
        .into_iter()
        .map(|(label, count)| LabelCount { label, count })
        .collect();

    let top_artists = group_stat(table, &Field::ArtistName, &[(Field::ArtistPopularity, StatOp::Mean)])
        .top_n(Field::ArtistPopularity, StatOp::Mean, TOP_ARTISTS, Order::Descending)
        .rows
        .into_iter()
        .filter_map(|r| {
            Some(ArtistScore {
                mean_artist_popularity: r.values[0]?,
                artist_name: r.key.to_string(),
            })
        })
        .collect();

    let years = releases_per_year(table);
    let (xs, ys): (Vec<f64>, Vec<f64>) = years.iter().map(|y| (y.year as f64, y.count as f64)).unzip();
    let release_trend_slope = fit_trend(&xs, &ys).ok().map(|t| t.slope);
    let count = |y: &YearCount| Some(y.count as f64);

    Overview {
        most_common_duration: pick(&durations, |c| Some(c.tracks as f64), Order::Descending),
        most_popular_duration: pick(&durations, |c| c.mean_popularity, Order::Descending),
        least_popular_duration: pick(&durations, |c| c.median_popularity, Order::Ascending),
        most_outliers_duration: pick(&durations, |c| Some(c.outliers_above as f64), Order::Descending),
        duration_categories: durations,
        popularity_bands,
        album_types,
        top_artists,
        release_trend_slope,
        peak_year: top_n(&years, count, 1, Order::Descending).into_iter().next(),
        quietest_year: top_n(&years, count, 1, Order::Ascending).into_iter().next(),
        releases_per_year: years,
    }
}

// ============================================================================
// Artist
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlbumScore {
    pub album_name: String,
    pub mean_popularity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistProfile {
    pub artist: String,
    pub tracks: usize,
    pub artist_followers: Option<u64>,
    pub artist_popularity: Option<f64>,
    pub mean_duration_min: Option<f64>,
    /// Most popular first.
    pub tracks_by_popularity: Vec<TrackSummary>,
    pub releases_per_year: Vec<YearCount>,
    pub albums: Vec<AlbumScore>,
}

impl ArtistProfile {
    pub fn top_track(&self) -> Option<&TrackSummary> {
        self.tracks_by_popularity.first()
    }

    pub fn top_album(&self) -> Option<&AlbumScore> {
        self.albums.first()
    }
}

/// Profile of the artist whose canonical name is `name`; `None` when no row matches.
pub fn artist_profile(ds: &Dataset, name: &str) -> Option<ArtistProfile> {
    let rows = ds.rows_for_artist(name);
    if rows.is_empty() {
        return None;
    }

    let albums = group_stat(rows.iter().copied(), &Field::AlbumName, &[(Field::TrackPopularity, StatOp::Mean)])
        .sorted_by(Field::TrackPopularity, StatOp::Mean, Order::Descending)
        .rows
        .into_iter()
        .filter_map(|r| match r.key {
            GroupValue::Text(album_name) => Some(AlbumScore {
                album_name,
                mean_popularity: r.values[0]?,
            }),
            _ => None,
        })
        .collect();

    let tracks_by_popularity = top_tracks(rows.iter().copied(), Field::TrackPopularity, rows.len(), Order::Descending)
        .into_iter()
        .map(TrackSummary::from)
        .collect();

    Some(ArtistProfile {
        artist: display_artist(name),
        tracks: rows.len(),
        artist_followers: rows.iter().filter_map(|t| t.artist_followers).max(),
        artist_popularity: numbers(rows.iter().copied(), Field::ArtistPopularity)
            .into_iter()
            .reduce(f64::max),
        mean_duration_min: mean(&numbers(rows.iter().copied(), Field::TrackDurationMin)),
        tracks_by_popularity,
        releases_per_year: releases_per_year(rows.iter().copied()),
        albums,
    })
}

// ============================================================================
// Popularity
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendLine {
    pub x: Field,
    pub y: Field,
    /// `None` when the pair has too few usable points.
    pub trend: Option<Trend>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopularityView {
    pub matrix: CorrelationMatrix,
    pub pairs: Vec<CorrelatedPair>,
    pub trends: Vec<TrendLine>,
}

/// Axes plotted against track popularity.
pub const TREND_AXES: [Field; 3] = [Field::ArtistPopularity, Field::ArtistFollowers, Field::TrackDurationMin];

pub fn popularity_view(ds: &Dataset) -> PopularityView {
    let table = ds.table();
    let matrix = correlation_matrix(table, &Field::CORRELATED);
    let trends = TREND_AXES
        .iter()
        .map(|&x| TrendLine {
            x,
            y: Field::TrackPopularity,
            trend: fit_fields(table, x, Field::TrackPopularity).ok(),
        })
        .collect();
    PopularityView {
        pairs: matrix.pairs(),
        matrix,
        trends,
    }
}

// ============================================================================
// Duration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationView {
    pub buckets: Vec<CategoryStat>,
    /// Bucket with the highest mean popularity.
    pub ideal_bucket: Option<GroupValue>,
    pub ideal_mean_popularity: Option<f64>,
    /// Most popular among the shortest tracks.
    pub short_hits: Vec<TrackSummary>,
    /// Most popular among the longest tracks.
    pub long_hits: Vec<TrackSummary>,
    pub mean_duration_min: Option<f64>,
    pub mean_popularity: Option<f64>,
    pub duration_popularity_r: Option<f64>,
    /// Tracks outside the duration fences of the whole table, longest first.
    pub exceptional_durations: Vec<TrackSummary>,
}

fn duration_hits(rows: &[&Track], order: Order) -> Vec<TrackSummary> {
    let pool = top_n(rows, |t| t.track_duration_min, DURATION_EXTREME_POOL, order);
    top_n(&pool, |t| t.track_popularity, DURATION_HITS, Order::Descending)
        .into_iter()
        .map(TrackSummary::from)
        .collect()
}

pub fn duration_view(ds: &Dataset) -> DurationView {
    let table = ds.table();
    let buckets = category_stats(table, &DurationScheme::Detail);
    let ideal = top_n(&buckets, |c| c.mean_popularity, 1, Order::Descending)
        .into_iter()
        .next()
        .filter(|c| c.mean_popularity.is_some());

    let timed = table.filter(|t| Field::TrackDurationMin.number(t).is_some());
    let matrix = correlation_matrix(table, &[Field::TrackDurationMin, Field::TrackPopularity]);

    let flagged = detect(table.rows(), Field::TrackDurationMin, OutlierScope::Whole);
    let extremes: Vec<&Track> = flagged
        .above
        .iter()
        .chain(&flagged.below)
        .map(|&i| &table.rows()[i])
        .collect();

    DurationView {
        ideal_mean_popularity: ideal.as_ref().and_then(|c| c.mean_popularity),
        ideal_bucket: ideal.map(|c| c.category),
        short_hits: duration_hits(&timed, Order::Ascending),
        long_hits: duration_hits(&timed, Order::Descending),
        mean_duration_min: mean(&numbers(table, Field::TrackDurationMin)),
        mean_popularity: mean(&numbers(table, Field::TrackPopularity)),
        duration_popularity_r: matrix.get(Field::TrackDurationMin, Field::TrackPopularity),
        exceptional_durations: top_n(&extremes, |t| t.track_duration_min, extremes.len(), Order::Descending)
            .into_iter()
            .map(TrackSummary::from)
            .collect(),
        buckets,
    }
}

// ============================================================================
// Genres
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreOverview {
    pub distinct_tags: usize,
    pub tag_counts: Vec<TagCount>,
    pub cooccurrence: Vec<TagPair>,
}

pub fn genre_overview(ds: &Dataset, min_cooccurrence: usize, top: usize) -> GenreOverview {
    let mut cooccurrence = ds.cooccurrence(min_cooccurrence);
    cooccurrence.truncate(top);
    GenreOverview {
        distinct_tags: ds.tag_counts().len(),
        tag_counts: ds.tag_counts().iter().take(top).cloned().collect(),
        cooccurrence,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreArtist {
    pub artist_name: String,
    pub mean_track_popularity: Option<f64>,
    pub artist_popularity: Option<f64>,
    pub artist_followers: Option<f64>,
    pub tracks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreProfile {
    pub tag: String,
    pub unique_artists: usize,
    pub tracks: usize,
    pub mean_popularity: Option<f64>,
    pub mean_duration_min: Option<f64>,
    pub top_artists: Vec<GenreArtist>,
}

/// Profile of every artist carrying `tag`; `None` for an empty selection.
pub fn genre_profile(ds: &Dataset, tag: &str) -> Option<GenreProfile> {
    let rows = ds.rows_with_tag(tag);
    if rows.is_empty() {
        return None;
    }

    let measures = [
        (Field::TrackPopularity, StatOp::Mean),
        (Field::ArtistPopularity, StatOp::Max),
        (Field::ArtistFollowers, StatOp::Max),
    ];
    let by_artist = group_stat(rows.iter().copied(), &Field::ArtistName, &measures);
    let unique_artists = by_artist.len();
    let top_artists = by_artist
        .top_n(Field::TrackPopularity, StatOp::Mean, TOP_ARTISTS, Order::Descending)
        .rows
        .into_iter()
        .map(|r| GenreArtist {
            artist_name: r.key.to_string(),
            mean_track_popularity: r.values[0],
            artist_popularity: r.values[1],
            artist_followers: r.values[2],
            tracks: r.size,
        })
        .collect();

    Some(GenreProfile {
        tag: tag.to_string(),
        unique_artists,
        tracks: rows.len(),
        mean_popularity: mean(&numbers(rows.iter().copied(), Field::TrackPopularity)),
        mean_duration_min: mean(&numbers(rows.iter().copied(), Field::TrackDurationMin)),
        top_artists,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreComparison {
    pub tag: String,
    pub mean_popularity: Option<f64>,
    pub mean_duration_min: Option<f64>,
    pub tracks: usize,
    pub unique_artists: usize,
}

/// Side-by-side genre figures. Tags with no matching rows are left out.
pub fn genre_comparison(ds: &Dataset, tags: &[String]) -> Vec<GenreComparison> {
    tags.iter()
        .filter_map(|tag| genre_profile(ds, tag))
        .map(|p| GenreComparison {
            tag: p.tag,
            mean_popularity: p.mean_popularity,
            mean_duration_min: p.mean_duration_min,
            tracks: p.tracks,
            unique_artists: p.unique_artists,
        })
        .collect()
}

/// Default comparison set: the selected tag plus the most frequent ones.
pub fn default_comparison_tags(ds: &Dataset, selected: &str, extra: usize) -> Vec<String> {
    let mut tags = vec![selected.to_string()];
    tags.extend(
        ds.tag_counts()
            .iter()
            .map(|c| c.tag.clone())
            .filter(|t| t != selected)
            .take(extra),
    );
    tags
}

// ============================================================================
// Insights
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearStat {
    pub year: i64,
    pub tracks: usize,
    pub mean_popularity: Option<f64>,
    pub mean_duration_min: Option<f64>,
    pub mean_artist_popularity: Option<f64>,
    pub explicit_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentStat {
    pub segment: Segment,
    pub label: &'static str,
    pub tracks: usize,
    pub unique_artists: usize,
    pub mean_popularity: Option<f64>,
    pub mean_duration_min: Option<f64>,
    pub explicit_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightsView {
    pub yearly: Vec<YearStat>,
    pub segments: Vec<SegmentStat>,
}

pub fn insights_view(ds: &Dataset, rules: &SegmentRules) -> InsightsView {
    let table = ds.table();

    let recent = table.filter(|t| t.release_year().is_some_and(|y| y >= TEMPORAL_START_YEAR));
    let yearly = group_stat(
        recent,
        &Field::ReleaseYear,
        &[
            (Field::TrackPopularity, StatOp::Mean),
            (Field::TrackDurationMin, StatOp::Mean),
            (Field::ArtistPopularity, StatOp::Mean),
            (Field::ExplicitFlag, StatOp::Mean),
        ],
    )
    .rows
    .into_iter()
    .filter_map(|r| {
        Some(YearStat {
            year: r.key.as_int()?,
            tracks: r.size,
            mean_popularity: r.values[0],
            mean_duration_min: r.values[1],
            mean_artist_popularity: r.values[2],
            explicit_percent: r.values[3].map(|share| share * 100.0),
        })
    })
    .collect();

    let by_segment = group_stat(
        table,
        rules,
        &[
            (Field::TrackPopularity, StatOp::Mean),
            (Field::TrackDurationMin, StatOp::Mean),
            (Field::ArtistName, StatOp::NUnique),
            (Field::ExplicitFlag, StatOp::Mean),
        ],
    );
    let segments = Segment::ALL
        .iter()
        .filter_map(|&segment| {
            let key = GroupValue::Ordinal {
                rank: segment.rank(),
                label: segment.label(),
            };
            let row = by_segment.rows.iter().find(|r| r.key == key)?;
            Some(SegmentStat {
                segment,
                label: segment.label(),
                tracks: row.size,
                mean_popularity: row.values[0],
                mean_duration_min: row.values[1],
                unique_artists: row.values[2].map_or(0, |v| v as usize),
                explicit_percent: row.values[3].map(|share| share * 100.0),
            })
        })
        .collect();

    InsightsView { yearly, segments }
}
