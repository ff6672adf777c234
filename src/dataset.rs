//! Data-access object for a loaded dataset.
//!
//! A `Dataset` is built once per source and handed by reference to every
//! view. Derived structures that several views share (genre tag sets,
//! canonical artist names, tag counts, popularity bands) are computed on
//! first use and then reused; nothing is ever written back into the table.

use once_cell::sync::OnceCell;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::buckets::PopularityBands;
use crate::error::{InsightsError, Result};
use crate::genre::{TagCount, TagIndex, TagPair};
use crate::load::load;
use crate::models::{Field, LoadStats, Table, Track};
use crate::normalize::{canonical_artist_names, normalize_artist_name, suggest_artists, ArtistSuggestion};

#[derive(Debug)]
pub struct Dataset {
    source: Option<PathBuf>,
    table: Table,
    stats: LoadStats,
    tag_index: OnceCell<TagIndex>,
    tag_counts: OnceCell<Vec<TagCount>>,
    artist_names: OnceCell<Vec<String>>,
    popularity_bands: OnceCell<Option<PopularityBands>>,
}

impl Dataset {
    pub fn open(path: &Path) -> Result<Self> {
        let (table, stats) = load(path)?;
        let mut dataset = Self::from_table(table, stats);
        dataset.source = Some(path.to_path_buf());
        Ok(dataset)
    }

    pub fn from_table(table: Table, stats: LoadStats) -> Self {
        Self {
            source: None,
            table,
            stats,
            tag_index: OnceCell::new(),
            tag_counts: OnceCell::new(),
            artist_names: OnceCell::new(),
            popularity_bands: OnceCell::new(),
        }
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    // ------------------------------------------------------------------------
    // Genres
    // ------------------------------------------------------------------------

    pub fn tag_index(&self) -> &TagIndex {
        self.tag_index.get_or_init(|| TagIndex::build(&self.table))
    }

    pub fn tag_counts(&self) -> &[TagCount] {
        self.tag_counts.get_or_init(|| self.tag_index().tag_counts())
    }

    pub fn cooccurrence(&self, min_count: usize) -> Vec<TagPair> {
        self.tag_index().cooccurrence(min_count)
    }

    pub fn rows_with_tag(&self, tag: &str) -> Vec<&Track> {
        self.tag_index().rows_with_tag(&self.table, tag)
    }

    // ------------------------------------------------------------------------
    // Artists
    // ------------------------------------------------------------------------

    /// Sorted canonical artist names, for an artist selector.
    pub fn canonical_artists(&self) -> &[String] {
        self.artist_names
            .get_or_init(|| canonical_artist_names(&self.table))
    }

    /// Rows whose raw artist name normalizes to `canonical`.
    pub fn rows_for_artist(&self, canonical: &str) -> Vec<&Track> {
        let Some(wanted) = normalize_artist_name(Some(canonical)) else {
            return Vec::new();
        };
        self.table
            .filter(|t| normalize_artist_name(Some(&t.artist_name)).as_deref() == Some(wanted.as_str()))
    }

    pub fn suggest_artists(&self, query: &str, limit: usize) -> Vec<ArtistSuggestion> {
        suggest_artists(self.canonical_artists(), query, limit)
    }

    /// Bands fitted to the whole table's artist popularity.
    pub fn popularity_bands(&self) -> Option<PopularityBands> {
        *self.popularity_bands.get_or_init(|| {
            PopularityBands::fit(self.table.iter().filter_map(|t| Field::ArtistPopularity.number(t)))
        })
    }
}

// ============================================================================
// Process-wide Cache
// ============================================================================

/// Loads each source at most once for the life of the cache.
///
/// Keyed by canonicalized path. Entries are never invalidated; a changed
/// file is only re-read by a new cache (in practice, a new process).
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: Mutex<FxHashMap<PathBuf, Arc<Dataset>>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&self, path: &Path) -> Result<Arc<Dataset>> {
        let key = std::fs::canonicalize(path).map_err(|source| InsightsError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        // Held across the load so concurrent callers never read a file twice
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = entries.get(&key) {
            return Ok(Arc::clone(existing));
        }
        let dataset = Arc::new(Dataset::open(&key)?);
        entries.insert(key, Arc::clone(&dataset));
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_table;
    use std::io::Write;

    const HEADER: &str = "track_name,artist_name,artist_popularity,artist_followers,artist_genres,album_name,album_release_date,album_type,track_popularity,track_duration_min,explicit";

    fn write_csv(rows: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        for row in rows {
            writeln!(file, "{}", row).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_cache_loads_once() {
        let file = write_csv(&["Song,Artist,50,1000,pop,Al,2020-01-01,album,40,3.0,True"]);
        let cache = DatasetCache::new();
        let first = cache.get_or_load(file.path()).unwrap();
        let second = cache.get_or_load(file.path()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_eq!(first.table().len(), 1);
    }

    #[test]
    fn test_cache_is_not_invalidated() {
        let mut file = write_csv(&["Song,Artist,50,1000,pop,Al,2020-01-01,album,40,3.0,True"]);
        let cache = DatasetCache::new();
        let first = cache.get_or_load(file.path()).unwrap();

        writeln!(file, "Other,Artist,50,1000,pop,Al,2020-01-01,album,40,3.0,False").unwrap();
        file.flush().unwrap();

        let again = cache.get_or_load(file.path()).unwrap();
        assert_eq!(again.table().len(), 1);
        assert!(Arc::ptr_eq(&first, &again));

        // A fresh cache sees the new row
        let fresh = DatasetCache::new().get_or_load(file.path()).unwrap();
        assert_eq!(fresh.table().len(), 2);
    }

    #[test]
    fn test_cache_survives_poisoned_lock() {
        let file = write_csv(&["Song,Artist,50,1000,pop,Al,2020-01-01,album,40,3.0,True"]);
        let cache = DatasetCache::new();
        let first = cache.get_or_load(file.path()).unwrap();

        let poisoned = std::thread::scope(|s| {
            s.spawn(|| {
                let _guard = cache.entries.lock().unwrap();
                panic!("poison the cache lock");
            })
            .join()
        });
        assert!(poisoned.is_err());
        assert!(cache.entries.is_poisoned());

        assert_eq!(cache.len(), 1);
        assert!(!cache.is_empty());
        let again = cache.get_or_load(file.path()).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
    }

    #[test]
    fn test_cache_missing_file() {
        let cache = DatasetCache::new();
        assert!(matches!(
            cache.get_or_load(Path::new("/nonexistent/tracks.csv")),
            Err(InsightsError::Io { .. })
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_memoized_views_are_shared() {
        let dataset = Dataset::from_table(sample_table(), LoadStats::default());
        let a = dataset.tag_index() as *const TagIndex;
        let b = dataset.tag_index() as *const TagIndex;
        assert_eq!(a, b);
        assert_eq!(dataset.tag_counts()[0].tag, "pop");
        assert_eq!(dataset.tag_counts()[0].count, 3);
        assert!(dataset.source().is_none());
    }

    #[test]
    fn test_rows_for_artist_uses_canonical_name() {
        let dataset = Dataset::from_table(sample_table(), LoadStats::default());
        assert_eq!(
            dataset.canonical_artists(),
            &["Dua Lipa".to_string(), "NSYNC".to_string(), "Small Band".to_string()]
        );
        assert_eq!(dataset.rows_for_artist("Dua Lipa").len(), 2);
        assert_eq!(dataset.rows_for_artist("nsync").len(), 0);
        assert_eq!(dataset.rows_for_artist("NSYNC").len(), 1);
        assert!(dataset.rows_for_artist("Nobody").is_empty());
        assert_eq!(dataset.suggest_artists("dua", 1)[0].name, "Dua Lipa");
    }

    #[test]
    fn test_popularity_bands_fit_to_table() {
        let dataset = Dataset::from_table(sample_table(), LoadStats::default());
        let bands = dataset.popularity_bands().unwrap();
        assert_eq!((bands.min, bands.max), (30.0, 88.0));
    }
}
