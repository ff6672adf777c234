use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

use track_insights::models::AlbumType;
use track_insights::progress::{format_duration, set_quiet};
use track_insights::report;
use track_insights::safety::validate_output_path;
use track_insights::segment::SegmentRules;
use track_insights::simulator::{estimate, SimulatorInput};
use track_insights::{genre, DatasetCache};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum View {
    Home,
    Overview,
    Artist,
    Artists,
    Popularity,
    Duration,
    Genres,
    Genre,
    Insights,
    Simulate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum AlbumKind {
    Single,
    Album,
    Compilation,
}

impl From<AlbumKind> for AlbumType {
    fn from(kind: AlbumKind) -> Self {
        match kind {
            AlbumKind::Single => AlbumType::Single,
            AlbumKind::Album => AlbumType::Album,
            AlbumKind::Compilation => AlbumType::Compilation,
        }
    }
}

#[derive(Parser)]
#[command(name = "track-insights")]
#[command(about = "Compute dashboard views over a music track CSV and print them as JSON")]
struct Args {
    /// Track dataset (CSV with the eleven canonical columns)
    source: PathBuf,

    #[arg(long, value_enum, default_value = "home")]
    view: View,

    /// Canonical artist name for the artist view
    #[arg(long)]
    artist: Option<String>,

    /// Genre tag for the genre view
    #[arg(long)]
    genre: Option<String>,

    /// Genres to compare against (comma-separated); defaults to the most frequent tags
    #[arg(long)]
    compare: Option<String>,

    #[arg(long, default_value_t = genre::DEFAULT_MIN_COOCCURRENCE)]
    min_cooccurrence: usize,

    /// Length of ranked lists (tags, pairs, artist suggestions)
    #[arg(long, default_value = "15")]
    top: usize,

    /// Write the view to this JSON file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write load statistics as JSON to this file
    #[arg(long)]
    stats_out: Option<PathBuf>,

    /// Hide progress bars; print periodic progress lines instead
    #[arg(long)]
    log_only: bool,

    #[arg(long, default_value = "0")]
    workers: usize,

    // Simulator inputs
    #[arg(long, default_value = "70")]
    artist_popularity: f64,

    #[arg(long, default_value = "5")]
    followers_millions: f64,

    #[arg(long, default_value = "3.5")]
    duration: f64,

    #[arg(long, value_enum, default_value = "single")]
    album_type: AlbumKind,
}

/// Number of extra tags added to a default genre comparison.
const DEFAULT_COMPARISON_EXTRA: usize = 3;

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).context("Failed to serialize view")
}

fn main() -> Result<()> {
    let args = Args::parse();
    set_quiet(args.log_only);

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    for out in [&args.output, &args.stats_out].into_iter().flatten() {
        validate_output_path(out, "json", &[args.source.as_path()])?;
    }

    let start = Instant::now();

    let view = if args.view == View::Simulate {
        let input = SimulatorInput {
            artist_popularity: args.artist_popularity,
            followers_millions: args.followers_millions,
            duration_min: args.duration,
            album_type: args.album_type.into(),
        };
        to_json(&estimate(&input).context("Invalid simulator input")?)?
    } else {
        eprintln!("Loading dataset: {:?}", args.source);
        let cache = DatasetCache::new();
        let ds = cache
            .get_or_load(&args.source)
            .with_context(|| format!("Failed to load dataset {:?}", args.source))?;

        let stats = ds.stats();
        stats.log_phase("load");
        if stats.unrecognized_explicit > 0 {
            eprintln!(
                "[WARN] {} explicit values were not booleans and were treated as unknown",
                stats.unrecognized_explicit
            );
        }
        if let Some(path) = &args.stats_out {
            stats.write_to_file(path).context("Failed to write stats")?;
        }

        match args.view {
            View::Home => to_json(&report::home_summary(&ds))?,
            View::Overview => to_json(&report::overview(&ds))?,
            View::Artists => to_json(&ds.canonical_artists())?,
            View::Artist => {
                let Some(name) = args.artist.as_deref() else {
                    bail!("--artist is required for the artist view");
                };
                let profile = report::artist_profile(&ds, name);
                if profile.is_none() {
                    eprintln!("No tracks found for artist {:?}", name);
                    for s in ds.suggest_artists(name, args.top.min(5)) {
                        eprintln!("  did you mean {:?}? ({:.2})", s.name, s.score);
                    }
                }
                to_json(&profile)?
            }
            View::Popularity => to_json(&report::popularity_view(&ds))?,
            View::Duration => to_json(&report::duration_view(&ds))?,
            View::Genres => to_json(&report::genre_overview(&ds, args.min_cooccurrence, args.top))?,
            View::Genre => {
                let Some(tag) = args.genre.as_deref() else {
                    bail!("--genre is required for the genre view");
                };
                let tags: Vec<String> = match &args.compare {
                    Some(list) => list
                        .split(',')
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect(),
                    None => report::default_comparison_tags(&ds, tag, DEFAULT_COMPARISON_EXTRA),
                };
                let profile = report::genre_profile(&ds, tag);
                if profile.is_none() {
                    eprintln!("No artists found for genre {:?}", tag);
                }
                serde_json::json!({
                    "profile": to_json(&profile)?,
                    "comparison": to_json(&report::genre_comparison(&ds, &tags))?,
                })
            }
            View::Insights => to_json(&report::insights_view(&ds, &SegmentRules::default()))?,
            View::Simulate => unreachable!("handled before loading"),
        }
    };

    let body = serde_json::to_string_pretty(&view)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, body).with_context(|| format!("Failed to write {:?}", path))?;
            eprintln!("Wrote {:?}", path);
        }
        None => println!("{}", body),
    }

    eprintln!("Done in {}", format_duration(start.elapsed()));
    Ok(())
}
