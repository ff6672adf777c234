//! Track builders shared by unit tests.

use chrono::NaiveDate;

use crate::models::{AlbumType, Explicit, Table, Track};

pub fn track(name: &str, artist: &str) -> Track {
    Track {
        track_name: name.to_string(),
        artist_name: artist.to_string(),
        album_name: None,
        track_popularity: None,
        track_duration_min: None,
        album_type: AlbumType::Album,
        explicit: Explicit::Unknown,
        album_release_date: None,
        artist_popularity: None,
        artist_followers: None,
        artist_genres: None,
    }
}

/// Track with the measures most views read.
pub fn scored(name: &str, artist: &str, popularity: f64, duration_min: f64) -> Track {
    Track {
        track_popularity: Some(popularity),
        track_duration_min: Some(duration_min),
        ..track(name, artist)
    }
}

pub fn with_artist_stats(mut t: Track, popularity: f64, followers: u64) -> Track {
    t.artist_popularity = Some(popularity);
    t.artist_followers = Some(followers);
    t
}

pub fn with_genres(mut t: Track, genres: &str) -> Track {
    t.artist_genres = Some(genres.to_string());
    t
}

pub fn released(mut t: Track, year: i32) -> Track {
    t.album_release_date = NaiveDate::from_ymd_opt(year, 1, 1);
    t
}

/// A small catalog covering every view: three artists, mixed genres and years.
pub fn sample_table() -> Table {
    let mut rows = vec![
        released(
            with_genres(
                with_artist_stats(scored("Levitating", "dua lipa", 90.0, 3.4), 88.0, 40_000_000),
                "dance pop, pop, uk pop",
            ),
            2020,
        ),
        released(
            with_genres(
                with_artist_stats(scored("Physical", "dua lipa", 70.0, 3.2), 88.0, 40_000_000),
                "dance pop, pop, uk pop",
            ),
            2020,
        ),
        released(
            with_genres(
                with_artist_stats(scored("Bye Bye Bye", "*NSYNC", 75.0, 3.3), 70.0, 2_000_000),
                "boy band, pop",
            ),
            2000,
        ),
        released(
            with_genres(
                with_artist_stats(scored("Epic Jam", "small band", 20.0, 12.5), 30.0, 5_000),
                "not available",
            ),
            2015,
        ),
        with_artist_stats(scored("Interlude", "small band", 10.0, 1.5), 30.0, 5_000),
    ];
    rows[0].album_type = AlbumType::Single;
    rows[0].explicit = Explicit::Yes;
    rows[1].album_name = Some("Future Nostalgia".to_string());
    rows[0].album_name = Some("Future Nostalgia".to_string());
    rows[2].album_type = AlbumType::Compilation;
    rows[2].album_name = Some("No Strings Attached".to_string());
    rows[2].explicit = Explicit::No;
    Table::new(rows)
}
