//! Dataset loader: CSV → typed, cleaned `Table`.
//!
//! Column selection is exact. The eleven canonical columns are located by
//! header name, anything else in the file is ignored, and a missing one is
//! fatal before a single row is read. Cell-level noise (bad numbers, bad
//! dates, odd explicit markers, short records) is coerced to null and
//! counted in `LoadStats`; it never aborts the load.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Instant;

use crate::error::{InsightsError, Result};
use crate::models::*;
use crate::progress::{dataset_bar, format_duration, log_records};

/// Cell contents treated as missing, in addition to blank cells.
const NULL_TOKENS: [&str; 6] = ["nan", "NaN", "null", "NULL", "None", "NA"];

/// Accepted date layouts, tried in order. Partial dates fall back below.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Header positions of the canonical columns.
struct ColumnIndex {
    track_name: usize,
    artist_name: usize,
    artist_popularity: usize,
    artist_followers: usize,
    artist_genres: usize,
    album_name: usize,
    album_release_date: usize,
    album_type: usize,
    track_popularity: usize,
    track_duration_min: usize,
    explicit: usize,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let find = |column: &'static str| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or(InsightsError::MissingColumn { column })
        };
        Ok(Self {
            track_name: find(COL_TRACK_NAME)?,
            artist_name: find(COL_ARTIST_NAME)?,
            artist_popularity: find(COL_ARTIST_POPULARITY)?,
            artist_followers: find(COL_ARTIST_FOLLOWERS)?,
            artist_genres: find(COL_ARTIST_GENRES)?,
            album_name: find(COL_ALBUM_NAME)?,
            album_release_date: find(COL_ALBUM_RELEASE_DATE)?,
            album_type: find(COL_ALBUM_TYPE)?,
            track_popularity: find(COL_TRACK_POPULARITY)?,
            track_duration_min: find(COL_TRACK_DURATION_MIN)?,
            explicit: find(COL_EXPLICIT)?,
        })
    }
}

// ============================================================================
// Cell Coercion
// ============================================================================

fn cell(record: &StringRecord, idx: usize) -> Option<&str> {
    let raw = record.get(idx)?.trim();
    if raw.is_empty() || NULL_TOKENS.contains(&raw) {
        None
    } else {
        Some(raw)
    }
}

fn parse_number(raw: Option<&str>, stats: &mut LoadStats) -> Option<f64> {
    let raw = raw?;
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            stats.invalid_numbers += 1;
            None
        }
    }
}

fn parse_count(raw: Option<&str>, stats: &mut LoadStats) -> Option<u64> {
    match parse_number(raw, stats) {
        Some(v) if v >= 0.0 => Some(v.round() as u64),
        Some(_) => {
            stats.invalid_numbers += 1;
            None
        }
        None => None,
    }
}

/// Permissive date parsing: anything unparsable becomes `None`.
pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    // "2020-05-01 00:00:00" and ISO timestamps carry a usable date prefix
    let date_part = raw.split(['T', ' ']).next().unwrap_or(raw);

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(date_part, fmt) {
            return Some(d);
        }
    }

    // Year-month and year-only precision
    let mut parts = date_part.splitn(2, '-');
    let year: i32 = parts.next()?.parse().ok()?;
    if !(1000..=9999).contains(&year) {
        return None;
    }
    let month: u32 = match parts.next() {
        Some(m) => m.parse().ok()?,
        None => 1,
    };
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn parse_explicit(raw: Option<&str>, stats: &mut LoadStats) -> Explicit {
    match Explicit::from_source(raw) {
        Ok(Explicit::Unknown) => {
            stats.unknown_explicit += 1;
            Explicit::Unknown
        }
        Ok(value) => value,
        Err(_) => {
            stats.unrecognized_explicit += 1;
            stats.unknown_explicit += 1;
            Explicit::Unknown
        }
    }
}

fn parse_record(record: &StringRecord, cols: &ColumnIndex, stats: &mut LoadStats) -> Option<Track> {
    let track_name = cell(record, cols.track_name).map(str::to_string);
    let artist_name = cell(record, cols.artist_name).map(str::to_string);

    let explicit = parse_explicit(cell(record, cols.explicit), stats);

    let album_release_date = match cell(record, cols.album_release_date) {
        Some(raw) => {
            let parsed = parse_release_date(raw);
            if parsed.is_none() {
                stats.invalid_dates += 1;
            }
            parsed
        }
        None => {
            stats.missing_dates += 1;
            None
        }
    };

    let raw_album_type = cell(record, cols.album_type);
    let album_type = AlbumType::from(raw_album_type);
    if album_type == AlbumType::Unknown {
        stats.unknown_album_types += 1;
    }

    let track_popularity = parse_number(cell(record, cols.track_popularity), stats);
    let track_duration_min = parse_number(cell(record, cols.track_duration_min), stats);
    let artist_popularity = parse_number(cell(record, cols.artist_popularity), stats);
    let artist_followers = parse_count(cell(record, cols.artist_followers), stats);

    // Row filter runs last so coercion counters include dropped rows
    let Some(track_name) = track_name else {
        stats.dropped_missing_track_name += 1;
        return None;
    };
    let Some(artist_name) = artist_name else {
        stats.dropped_missing_artist_name += 1;
        return None;
    };

    Some(Track {
        track_name,
        artist_name,
        album_name: cell(record, cols.album_name).map(str::to_string),
        track_popularity,
        track_duration_min,
        album_type,
        explicit,
        album_release_date,
        artist_popularity,
        artist_followers,
        artist_genres: cell(record, cols.artist_genres).map(str::to_string),
    })
}

// ============================================================================
// Entry Points
// ============================================================================

/// Load and normalize the dataset at `path`.
pub fn load(path: &Path) -> Result<(Table, LoadStats)> {
    let file = File::open(path).map_err(|source| InsightsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let total_bytes = file.metadata().ok().map(|m| m.len());
    load_from_reader(file, total_bytes)
}

/// Load from any CSV source. `total_bytes` only sizes the progress bar.
pub fn load_from_reader<R: Read>(reader: R, total_bytes: Option<u64>) -> Result<(Table, LoadStats)> {
    let start = Instant::now();
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers = rdr.headers()?.clone();
    let cols = ColumnIndex::resolve(&headers)?;

    let pb = dataset_bar(total_bytes, "Reading dataset");
    let mut stats = LoadStats::default();
    let mut rows = Vec::new();
    let mut record = StringRecord::new();

    loop {
        match rdr.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => return Err(e.into()),
            Err(_) => {
                // Short/long or non-UTF-8 records are skipped, not fatal
                stats.total_records += 1;
                stats.malformed_records += 1;
                continue;
            }
        }
        stats.total_records += 1;
        if let Some(track) = parse_record(&record, &cols, &mut stats) {
            rows.push(track);
        }
        pb.set_position(record.position().map_or(0, |p| p.byte()));
        log_records("load", stats.total_records as u64);
    }

    stats.retained_rows = rows.len();
    stats.elapsed_seconds = start.elapsed().as_secs_f64();
    pb.finish_with_message(format!(
        "Read {} tracks ({} dropped, {} malformed) in {}",
        stats.retained_rows,
        stats.dropped_rows(),
        stats.malformed_records,
        format_duration(start.elapsed())
    ));

    Ok((Table::new(rows), stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "track_id,track_name,artist_name,artist_popularity,artist_followers,artist_genres,album_name,album_release_date,album_type,track_popularity,track_duration_min,explicit";

    fn load_str(body: &str) -> Result<(Table, LoadStats)> {
        let csv = format!("{}\n{}", HEADER, body);
        load_from_reader(csv.as_bytes(), None)
    }

    #[test]
    fn test_load_selects_and_types_columns() {
        let (table, stats) = load_str(
            "x1,Levitating,Dua Lipa,88,40123456,\"dance pop, pop\",Future Nostalgia,2020-03-27,album,90,3.38,True\n",
        )
        .unwrap();
        assert_eq!(table.len(), 1);
        let t = &table[0];
        assert_eq!(t.track_name, "Levitating");
        assert_eq!(t.artist_followers, Some(40_123_456));
        assert_eq!(t.artist_genres.as_deref(), Some("dance pop, pop"));
        assert_eq!(t.album_release_date, NaiveDate::from_ymd_opt(2020, 3, 27));
        assert_eq!(t.album_type, AlbumType::Album);
        assert_eq!(t.explicit, Explicit::Yes);
        assert_eq!(t.track_duration_min, Some(3.38));
        assert_eq!(stats.retained_rows, 1);
        assert_eq!(table.column_count(), 11);
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let csv = "track_name,artist_name,artist_followers,artist_genres,album_name,album_release_date,album_type,track_popularity,track_duration_min,explicit\nA,B,1,pop,X,2020-01-01,album,5,3.0,True\n";
        let err = load_from_reader(csv.as_bytes(), None).unwrap_err();
        assert!(matches!(
            err,
            InsightsError::MissingColumn {
                column: "artist_popularity"
            }
        ));
    }

    #[test]
    fn test_explicit_tri_state() {
        let (table, stats) = load_str(
            "1,A,X,50,10,pop,Al,2020-01-01,album,10,3.0,False\n\
             2,B,X,50,10,pop,Al,2020-01-01,album,10,3.0,\n\
             3,C,X,50,10,pop,Al,2020-01-01,album,10,3.0,maybe\n",
        )
        .unwrap();
        assert_eq!(table[0].explicit, Explicit::No);
        assert_eq!(table[1].explicit, Explicit::Unknown);
        assert_eq!(table[2].explicit, Explicit::Unknown);
        assert_eq!(stats.unknown_explicit, 2);
        assert_eq!(stats.unrecognized_explicit, 1);
    }

    #[test]
    fn test_drops_rows_missing_identifiers() {
        let (table, stats) = load_str(
            "1,,X,50,10,pop,Al,2020-01-01,album,10,3.0,True\n\
             2,Song,,50,10,pop,Al,2020-01-01,album,10,3.0,True\n\
             3,Song,Artist,50,10,pop,Al,2020-01-01,album,10,3.0,True\n",
        )
        .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(stats.dropped_missing_track_name, 1);
        assert_eq!(stats.dropped_missing_artist_name, 1);
        assert_eq!(stats.dropped_rows(), 2);
    }

    #[test]
    fn test_bad_values_become_null() {
        let (table, stats) = load_str(
            "1,Song,Artist,high,-5,,Al,not a date,vinyl,abc,3.5,True\n",
        )
        .unwrap();
        let t = &table[0];
        assert_eq!(t.artist_popularity, None);
        assert_eq!(t.artist_followers, None);
        assert_eq!(t.track_popularity, None);
        assert_eq!(t.album_release_date, None);
        assert_eq!(t.album_type, AlbumType::Unknown);
        assert_eq!(t.artist_genres, None);
        assert_eq!(stats.invalid_numbers, 3);
        assert_eq!(stats.invalid_dates, 1);
        assert_eq!(stats.unknown_album_types, 1);
    }

    #[test]
    fn test_malformed_record_skipped() {
        let (table, stats) = load_str(
            "1,Song,Artist,50,10\n\
             2,Other,Artist,50,10,pop,Al,2020-01-01,album,10,3.0,True\n",
        )
        .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].track_name, "Other");
        assert_eq!(stats.malformed_records, 1);
        assert_eq!(stats.total_records, 2);
    }

    #[test]
    fn test_parse_release_date_precision() {
        assert_eq!(parse_release_date("2019-07-12"), NaiveDate::from_ymd_opt(2019, 7, 12));
        assert_eq!(
            parse_release_date("2019-07-12 00:00:00"),
            NaiveDate::from_ymd_opt(2019, 7, 12)
        );
        assert_eq!(parse_release_date("2019-07"), NaiveDate::from_ymd_opt(2019, 7, 1));
        assert_eq!(parse_release_date("1998"), NaiveDate::from_ymd_opt(1998, 1, 1));
        assert_eq!(parse_release_date("12/07/2019"), NaiveDate::from_ymd_opt(2019, 7, 12));
        assert_eq!(parse_release_date("2019-13"), None);
        assert_eq!(parse_release_date("soon"), None);
        assert_eq!(parse_release_date("0000-00-00"), None);
    }

    #[test]
    fn test_load_is_deterministic() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        writeln!(file, "1,B,Y,40,10,rock,Al,2001-01-01,single,30,4.0,False").unwrap();
        writeln!(file, "2,A,X,50,10,pop,Al,2020-01-01,album,10,3.0,True").unwrap();
        file.flush().unwrap();

        let (first, stats_a) = load(file.path()).unwrap();
        let (second, stats_b) = load(file.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(stats_a.retained_rows, stats_b.retained_rows);
        assert_eq!(first[0].track_name, "B");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load(Path::new("/nonexistent/tracks.csv")).unwrap_err();
        assert!(matches!(err, InsightsError::Io { .. }));
    }
}
